//! Property-based tests for bitstore-index using proptest.

use bitstore_core::Value;
use bitstore_index::{bit_indexes, bit_remove, bitslice_insert, power2, Bitset, Indexer};
use proptest::prelude::*;

/// Reference model: a bitset as a sorted list of positions.
fn positions(set: &Bitset) -> Vec<usize> {
    bit_indexes(set)
}

#[derive(Clone, Debug)]
enum Op {
    Append(i64),
    Set(usize, i64),
    Pop(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0i64..5).prop_map(Op::Append),
        (0usize..64, 0i64..5).prop_map(|(s, v)| Op::Set(s, v)),
        (0usize..64).prop_map(Op::Pop),
    ]
}

/// Every row sits in exactly one bucket, and that bucket is its value's.
fn assert_partition(indexer: &Indexer, column: &[Value]) -> Result<(), TestCaseError> {
    let buckets = indexer.buckets("v").unwrap();
    let mut union = Bitset::new();
    for (value, bucket) in buckets {
        prop_assert!(!bucket.is_empty());
        prop_assert!((&union & bucket).is_empty(), "buckets overlap");
        union |= bucket;
        for slot in bucket.iter() {
            prop_assert_eq!(&column[slot], value);
        }
    }
    prop_assert_eq!(union, Bitset::ones(column.len()));
    Ok(())
}

proptest! {
    /// Test that bit_remove matches removing from a position list.
    #[test]
    fn bit_remove_matches_model(
        bits in prop::collection::btree_set(0usize..300, 0..60),
        slot in 0usize..320
    ) {
        let set: Bitset = bits.iter().copied().collect();
        let removed = bit_remove(&set, slot as i64).unwrap();
        let expected: Vec<usize> = bits
            .iter()
            .filter(|&&b| b != slot)
            .map(|&b| if b > slot { b - 1 } else { b })
            .collect();
        prop_assert_eq!(positions(&removed), expected);
    }

    /// Test that bitslice_insert opens a gap of the requested width.
    #[test]
    fn bitslice_insert_matches_model(
        bits in prop::collection::btree_set(0usize..200, 0..40),
        at in 0usize..220,
        width in 0usize..130
    ) {
        let set: Bitset = bits.iter().copied().collect();
        let inserted = bitslice_insert(&set, at as i64, width as i64, &Bitset::ones(width)).unwrap();
        let mut expected: Vec<usize> = bits
            .iter()
            .map(|&b| if b >= at { b + width } else { b })
            .collect();
        expected.extend(at..at + width);
        expected.sort_unstable();
        prop_assert_eq!(positions(&inserted), expected);
    }

    /// Test that power2 sets exactly one bit.
    #[test]
    fn power2_single_bit(n in 0i64..1000) {
        let set = power2(n).unwrap();
        prop_assert_eq!(set.count(), 1);
        prop_assert_eq!(set.bit_length(), n as usize + 1);
    }

    /// Test that the bucket partition survives random append/set/pop sequences.
    #[test]
    fn indexer_partition_invariant(ops in prop::collection::vec(op_strategy(), 1..80)) {
        let mut column: Vec<Value> = Vec::new();
        let mut indexer = Indexer::new(vec!["v".to_string()]);
        indexer.index_attr("v", &[column.clone()]).unwrap();

        for op in ops {
            match op {
                Op::Append(v) => {
                    let value = Value::Integer(v);
                    indexer.append_index(column.len(), &[value.clone()]);
                    column.push(value);
                }
                Op::Set(slot, v) if slot < column.len() => {
                    let value = Value::Integer(v);
                    indexer.update_index("v", slot, &column[slot], &value);
                    column[slot] = value;
                }
                Op::Pop(slot) if slot < column.len() => {
                    indexer.pop_index(slot);
                    column.remove(slot);
                }
                _ => {}
            }
            assert_partition(&indexer, &column)?;
        }

        let mut rebuilt = Indexer::new(vec!["v".to_string()]);
        rebuilt.index_attr("v", &[column.clone()]).unwrap();
        prop_assert_eq!(rebuilt.buckets("v"), indexer.buckets("v"));
    }
}
