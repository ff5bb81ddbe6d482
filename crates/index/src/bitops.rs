//! Integer-bitset primitives.
//!
//! Free functions over [`Bitset`] taking signed positions, for callers that
//! carry positions as plain integers. A negative position or width, or a
//! value wider than its declared width, is a `Domain` error. None of these
//! mutate their input.

use crate::bitset::Bitset;
use alloc::format;
use alloc::vec::Vec;
use bitstore_core::{Error, Result};

fn position(what: &str, n: i64) -> Result<usize> {
    usize::try_from(n).map_err(|_| Error::domain(format!("{} must be >= 0, got {}", what, n)))
}

fn checked_value(value: &Bitset, width: usize) -> Result<()> {
    if value.bit_length() > width {
        return Err(Error::domain(format!(
            "value {} is wider than {} bits",
            value, width
        )));
    }
    Ok(())
}

/// Returns the bitset with only bit `n` set.
pub fn power2(n: i64) -> Result<Bitset> {
    Ok(Bitset::from_bit(position("power", n)?))
}

/// Returns the number of set bits.
#[inline]
pub fn bit_count(mask: &Bitset) -> usize {
    mask.count()
}

/// Returns the set bit positions in ascending order.
pub fn bit_indexes(mask: &Bitset) -> Vec<usize> {
    mask.iter().collect()
}

/// Deletes bit `slot` and moves every higher bit down one position.
///
/// This keeps "bit position == row position" true for a stored bitset after
/// the row at `slot` is physically removed.
pub fn bit_remove(mask: &Bitset, slot: i64) -> Result<Bitset> {
    Ok(mask.remove(position("slot", slot)?))
}

/// Inserts `width` bits taken from `value` at `at`, moving bits `>= at` up
/// by `width`.
pub fn bitslice_insert(mask: &Bitset, at: i64, width: i64, value: &Bitset) -> Result<Bitset> {
    let at = position("index", at)?;
    let width = position("width", width)?;
    checked_value(value, width)?;
    Ok(mask.insert_slice(at, width, value))
}

/// Returns bit `n`.
pub fn bit_get(mask: &Bitset, n: i64) -> Result<bool> {
    Ok(mask.get(position("index", n)?))
}

/// Returns `mask` with bit `n` set.
pub fn bit_set(mask: &Bitset, n: i64) -> Result<Bitset> {
    let mut out = mask.clone();
    out.set(position("index", n)?);
    Ok(out)
}

/// Returns `mask` with bit `n` cleared.
pub fn bit_clear(mask: &Bitset, n: i64) -> Result<Bitset> {
    let mut out = mask.clone();
    out.clear(position("index", n)?);
    Ok(out)
}

/// Returns `mask` with bit `n` flipped.
pub fn bit_toggle(mask: &Bitset, n: i64) -> Result<Bitset> {
    let mut out = mask.clone();
    out.toggle(position("index", n)?);
    Ok(out)
}

/// Inserts a single bit (0 or 1) before position `at`.
pub fn bit_insert(mask: &Bitset, at: i64, bit: i64) -> Result<Bitset> {
    let at = position("index", at)?;
    let value = match bit {
        0 => Bitset::new(),
        1 => Bitset::from_bit(0),
        _ => return Err(Error::domain(format!("bit must be 0 or 1, got {}", bit))),
    };
    Ok(mask.insert_slice(at, 1, &value))
}

/// Returns bits `at..at + width`, moved down to position 0.
pub fn bitslice_get(mask: &Bitset, at: i64, width: i64) -> Result<Bitset> {
    Ok(mask.slice(position("index", at)?, position("width", width)?))
}

/// Overwrites bits `at..at + width` with `value`.
pub fn bitslice_set(mask: &Bitset, at: i64, width: i64, value: &Bitset) -> Result<Bitset> {
    let at = position("index", at)?;
    let width = position("width", width)?;
    checked_value(value, width)?;
    Ok(mask.set_slice(at, width, value))
}

/// Deletes bits `at..at + width`, moving higher bits down by `width`.
pub fn bitslice_remove(mask: &Bitset, at: i64, width: i64) -> Result<Bitset> {
    Ok(mask.remove_slice(position("index", at)?, position("width", width)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn bits(value: u128) -> Bitset {
        Bitset::from(value)
    }

    #[test]
    fn test_power2() {
        assert_eq!(power2(0).unwrap(), bits(1));
        assert_eq!(power2(5).unwrap(), bits(32));
        assert_eq!(power2(100).unwrap().bit_length(), 101);
        assert!(matches!(power2(-1), Err(Error::Domain { .. })));
    }

    #[test]
    fn test_count_and_indexes() {
        let mask = bits(0b1011_0100);
        assert_eq!(bit_count(&mask), 4);
        assert_eq!(bit_indexes(&mask), vec![2, 4, 5, 7]);
        assert!(bit_indexes(&Bitset::new()).is_empty());
    }

    #[test]
    fn test_bit_remove() {
        assert_eq!(bit_remove(&bits(0b1101), 1).unwrap(), bits(0b111));
        assert_eq!(bit_remove(&bits(0b1101), 0).unwrap(), bits(0b110));
        assert_eq!(bit_remove(&bits(0b1101), 3).unwrap(), bits(0b101));
        assert!(bit_remove(&bits(1), -2).is_err());
    }

    #[test]
    fn test_bitslice_insert() {
        // three existing rows, two appended
        let mask = bitslice_insert(&bits(0b001), 3, 2, &Bitset::ones(2)).unwrap();
        assert_eq!(mask, bits(0b11001));
        assert!(bitslice_insert(&bits(1), 0, 2, &bits(0b111)).is_err());
        assert!(bitslice_insert(&bits(1), -1, 2, &bits(0b1)).is_err());
    }

    #[test]
    fn test_single_bit_ops() {
        let mask = bits(0b100);
        assert!(bit_get(&mask, 2).unwrap());
        assert!(!bit_get(&mask, 1).unwrap());
        assert_eq!(bit_set(&mask, 0).unwrap(), bits(0b101));
        assert_eq!(bit_clear(&mask, 2).unwrap(), Bitset::new());
        assert_eq!(bit_toggle(&mask, 1).unwrap(), bits(0b110));
        assert!(bit_get(&mask, -1).is_err());
    }

    #[test]
    fn test_bit_insert() {
        assert_eq!(bit_insert(&bits(0b11), 1, 0).unwrap(), bits(0b101));
        assert_eq!(bit_insert(&bits(0b11), 1, 1).unwrap(), bits(0b111));
        assert!(bit_insert(&bits(0b11), 1, 2).is_err());
    }

    #[test]
    fn test_slice_helpers() {
        let mask = bits(0b1110_0101);
        assert_eq!(bitslice_get(&mask, 4, 4).unwrap(), bits(0b1110));
        assert_eq!(bitslice_set(&mask, 0, 4, &bits(0b1010)).unwrap(), bits(0b1110_1010));
        assert!(bitslice_set(&mask, 0, 2, &bits(0b111)).is_err());
        assert_eq!(bitslice_remove(&mask, 0, 4).unwrap(), bits(0b1110));
    }
}
