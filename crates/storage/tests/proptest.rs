//! Property-based tests for bitstore-storage using proptest.

use bitstore_core::schema::TableBuilder;
use bitstore_core::{Error, Record, Value, ValueKind};
use bitstore_index::{Bitset, IndexMap};
use bitstore_storage::{ListStore, MemoryBlobStore, TableStore};
use proptest::prelude::*;

#[derive(Clone, Debug)]
enum Op {
    Append(i64),
    Extend(Vec<i64>),
    Set(usize, i64),
    Pop(usize),
    Reset,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0i64..4).prop_map(Op::Append),
        1 => prop::collection::vec(0i64..4, 0..6).prop_map(Op::Extend),
        2 => (0usize..32, 0i64..4).prop_map(|(s, v)| Op::Set(s, v)),
        2 => (0usize..32).prop_map(Op::Pop),
        1 => Just(Op::Reset),
    ]
}

fn list_store() -> ListStore {
    let mut store = ListStore::new("model", vec!["id".to_string(), "v".to_string()], vec![]).unwrap();
    store.index_attr("v").unwrap();
    store
}

/// Model row: id, value, changed.
type ModelRow = (i64, i64, bool);

fn apply(store: &mut ListStore, model: &mut Vec<ModelRow>, next_id: &mut i64, op: &Op) {
    match op {
        Op::Append(v) => {
            store.append(vec![Value::Integer(*next_id), Value::Integer(*v)]).unwrap();
            model.push((*next_id, *v, true));
            *next_id += 1;
        }
        Op::Extend(values) => {
            let rows = values
                .iter()
                .enumerate()
                .map(|(i, v)| vec![Value::Integer(*next_id + i as i64), Value::Integer(*v)])
                .collect();
            store.extend(rows).unwrap();
            for v in values {
                model.push((*next_id, *v, true));
                *next_id += 1;
            }
        }
        Op::Set(slot, v) if !model.is_empty() => {
            let slot = slot % model.len();
            store.set(slot, "v", Value::Integer(*v)).unwrap();
            model[slot].1 = *v;
            model[slot].2 = true;
        }
        Op::Pop(slot) if !model.is_empty() => {
            let slot = slot % model.len();
            let row = store.pop(slot).unwrap();
            let (id, v, _) = model.remove(slot);
            assert_eq!(row, vec![Value::Integer(id), Value::Integer(v)]);
        }
        Op::Reset => {
            store.reset_changed(None).unwrap();
            model.iter_mut().for_each(|row| row.2 = false);
        }
        _ => {}
    }
}

fn people() -> TableStore {
    let def = TableBuilder::new("People")
        .unwrap()
        .add_column("id", ValueKind::Int)
        .unwrap()
        .add_column_with_default("note", ValueKind::Str, "")
        .unwrap()
        .add_column_with_default("score", ValueKind::Float, 0)
        .unwrap()
        .add_unique(&["id"])
        .unwrap()
        .build()
        .unwrap();
    let mut table = TableStore::new(def).unwrap();
    table.index_attr("id").unwrap();
    table.index_attr("note").unwrap();
    table
}

fn person(id: i64) -> Vec<Value> {
    let note = if id % 3 == 0 { "fizz" } else { "" };
    vec![Value::Integer(id), Value::from(note)]
}

/// Everything a rejected mutation must leave untouched.
#[derive(Debug, PartialEq)]
struct TableState {
    rows: Vec<Record>,
    changed: Vec<Bitset>,
    rows_changed: Bitset,
    values_changed: Vec<Vec<usize>>,
    buckets: Vec<Option<IndexMap>>,
}

fn table_state(table: &TableStore) -> TableState {
    let index = table.index();
    TableState {
        rows: table.dump(true),
        changed: table.changed().to_vec(),
        rows_changed: table.rows_changed(),
        values_changed: (0..table.len()).map(|slot| table.values_changed(slot)).collect(),
        buckets: ["id", "note", "score"]
            .iter()
            .map(|column| index.and_then(|ix| ix.buckets(column)).cloned())
            .collect(),
    }
}

fn score_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => (-4000i32..4000).prop_map(|q| Value::Float(f64::from(q) / 4.0)),
        1 => Just(Value::Float(f64::NAN)),
        1 => Just(Value::Float(f64::INFINITY)),
        1 => Just(Value::Float(f64::NEG_INFINITY)),
        1 => Just(Value::Null),
    ]
}

proptest! {
    /// Test that rows, change masks and index buckets follow row positions
    /// through appends, batches, updates and compaction.
    #[test]
    fn list_store_matches_model(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut store = list_store();
        let mut model: Vec<ModelRow> = Vec::new();
        let mut next_id = 0;

        for op in &ops {
            apply(&mut store, &mut model, &mut next_id, op);

            prop_assert_eq!(store.len(), model.len());
            let rows: Vec<Vec<Value>> = model
                .iter()
                .map(|(id, v, _)| vec![Value::Integer(*id), Value::Integer(*v)])
                .collect();
            prop_assert_eq!(store.dump(), rows);

            let changed: Vec<usize> = model
                .iter()
                .enumerate()
                .filter(|(_, row)| row.2)
                .map(|(i, _)| i)
                .collect();
            prop_assert_eq!(store.rows_changed().iter().collect::<Vec<_>>(), changed);

            for v in 0..4 {
                let expected: Vec<usize> = model
                    .iter()
                    .enumerate()
                    .filter(|(_, row)| row.1 == v)
                    .map(|(i, _)| i)
                    .collect();
                prop_assert_eq!(store.find_all("v", &Value::Integer(v)).unwrap(), expected);
            }
        }
    }

    /// Test that an indexed store and a rebuilt index agree.
    #[test]
    fn reindex_matches_incremental(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let mut store = list_store();
        let mut model = Vec::new();
        let mut next_id = 0;
        for op in &ops {
            apply(&mut store, &mut model, &mut next_id, op);
        }
        let incremental = store.index().unwrap().buckets("v").unwrap().clone();
        store.reindex();
        prop_assert_eq!(store.index().unwrap().buckets("v").unwrap(), &incremental);
    }

    /// Test that a batch is applied whole or not at all: a rejected batch
    /// leaves rows, change masks and index buckets as they were.
    #[test]
    fn table_extend_is_all_or_nothing(
        existing in prop::collection::btree_set(0i64..20, 0..10),
        batch in prop::collection::vec(0i64..20, 1..10)
    ) {
        let mut table = people();
        table.extend(existing.iter().map(|id| person(*id)).collect()).unwrap();
        if !table.is_empty() {
            table.reset_changed(Some(0)).unwrap();
        }
        let before = table_state(&table);

        let mut seen = existing.clone();
        let clean = batch.iter().all(|id| seen.insert(*id));

        let result = table.extend(batch.iter().map(|id| person(*id)).collect());
        if clean {
            prop_assert!(result.is_ok());
            prop_assert_eq!(table.len(), existing.len() + batch.len());
            for id in &batch {
                let slot = table.find_unique(&[Value::Integer(*id)]);
                prop_assert!(slot.is_some());
                let bucket = table.index().unwrap().bucket("id", &Value::Integer(*id)).cloned();
                prop_assert_eq!(bucket.map(|b| b.iter().collect::<Vec<_>>()), slot.map(|s| vec![s]));
            }
        } else {
            let is_batch = matches!(result, Err(Error::Batch { .. }));
            prop_assert!(is_batch);
            prop_assert_eq!(table_state(&table), before);
        }
        prop_assert_eq!(table.keys().len(), table.len());
    }

    /// Test that saving and loading reproduces every row, including
    /// non-finite and null floats.
    #[test]
    fn table_save_load_round_trips(scores in prop::collection::vec(score_strategy(), 0..20)) {
        let mut table = people();
        table
            .extend(
                scores
                    .iter()
                    .enumerate()
                    .map(|(i, score)| {
                        let mut row = person(i as i64);
                        row.push(score.clone());
                        row
                    })
                    .collect(),
            )
            .unwrap();
        let mut blobs = MemoryBlobStore::new();
        table.save(&mut blobs).unwrap();

        let mut restored = people();
        prop_assert_eq!(restored.load(&blobs).unwrap(), scores.len());
        prop_assert_eq!(restored.dump(true), table.dump(true));
        prop_assert_eq!(
            restored.index().unwrap().buckets("note"),
            table.index().unwrap().buckets("note")
        );
    }
}
