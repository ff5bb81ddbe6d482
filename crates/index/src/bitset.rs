//! Growable integer bitset.
//!
//! A `Bitset` behaves like an unbounded non-negative integer whose bit `i`
//! stands for row position `i`. Words are little-endian and kept normalized
//! (no trailing zero words), so equal sets always compare and hash equal.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt;
use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign};

const WORD: usize = 64;

/// A set of non-negative positions stored as a little-endian bit vector.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Bitset {
    words: Vec<u64>,
}

impl Bitset {
    /// Creates an empty bitset.
    #[inline]
    pub const fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Creates a bitset with only bit `n` set.
    pub fn from_bit(n: usize) -> Self {
        let mut words = vec![0u64; n / WORD + 1];
        words[n / WORD] = 1u64 << (n % WORD);
        Self { words }
    }

    /// Creates a bitset with bits `0..width` set.
    pub fn ones(width: usize) -> Self {
        let mut words = vec![u64::MAX; width / WORD];
        let rem = width % WORD;
        if rem > 0 {
            words.push((1u64 << rem) - 1);
        }
        Self { words }
    }

    /// Creates a bitset from little-endian words.
    pub fn from_words(words: Vec<u64>) -> Self {
        let mut set = Self { words };
        set.normalize();
        set
    }

    /// Returns the little-endian words.
    #[inline]
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Returns the mask as an integer when it fits in 128 bits.
    pub fn to_u128(&self) -> Option<u128> {
        match self.words.as_slice() {
            [] => Some(0),
            [lo] => Some(*lo as u128),
            [lo, hi] => Some(((*hi as u128) << WORD) | *lo as u128),
            _ => None,
        }
    }

    /// Returns whether no bit is set.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns the number of set bits.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns one past the highest set bit, or 0 when empty.
    pub fn bit_length(&self) -> usize {
        match self.words.last() {
            Some(w) => self.words.len() * WORD - w.leading_zeros() as usize,
            None => 0,
        }
    }

    /// Returns whether bit `n` is set.
    #[inline]
    pub fn get(&self, n: usize) -> bool {
        self.words
            .get(n / WORD)
            .map_or(false, |w| (w >> (n % WORD)) & 1 == 1)
    }

    /// Sets bit `n`.
    pub fn set(&mut self, n: usize) {
        let i = n / WORD;
        if i >= self.words.len() {
            self.words.resize(i + 1, 0);
        }
        self.words[i] |= 1u64 << (n % WORD);
    }

    /// Clears bit `n`.
    pub fn clear(&mut self, n: usize) {
        if let Some(w) = self.words.get_mut(n / WORD) {
            *w &= !(1u64 << (n % WORD));
            self.normalize();
        }
    }

    /// Flips bit `n`.
    pub fn toggle(&mut self, n: usize) {
        if self.get(n) {
            self.clear(n);
        } else {
            self.set(n);
        }
    }

    /// Clears every bit.
    #[inline]
    pub fn reset(&mut self) {
        self.words.clear();
    }

    /// Returns an iterator over set positions in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            words: &self.words,
            index: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    /// Returns the lowest set position that is `>= n`.
    pub fn lowest_at_or_after(&self, n: usize) -> Option<usize> {
        let mut i = n / WORD;
        let mut w = *self.words.get(i)? & (u64::MAX << (n % WORD));
        loop {
            if w != 0 {
                return Some(i * WORD + w.trailing_zeros() as usize);
            }
            i += 1;
            w = *self.words.get(i)?;
        }
    }

    /// Returns the bits of `self` that are not in `other`.
    pub fn and_not(&self, other: &Bitset) -> Bitset {
        let words = self
            .words
            .iter()
            .enumerate()
            .map(|(i, w)| w & !other.words.get(i).copied().unwrap_or(0))
            .collect();
        Self::from_words(words)
    }

    /// Returns only the bits below position `n`.
    pub fn low(&self, n: usize) -> Bitset {
        let full = n / WORD;
        let rem = n % WORD;
        let mut words: Vec<u64> = self.words.iter().take(full).copied().collect();
        if rem > 0 {
            if let Some(w) = self.words.get(full) {
                words.push(w & ((1u64 << rem) - 1));
            }
        }
        Self::from_words(words)
    }

    /// Returns `self >> n`.
    pub fn shift_down(&self, n: usize) -> Bitset {
        let skip = n / WORD;
        let bits = n % WORD;
        if skip >= self.words.len() {
            return Bitset::new();
        }
        let src = &self.words[skip..];
        let words = (0..src.len())
            .map(|i| {
                let mut w = src[i] >> bits;
                if bits > 0 {
                    if let Some(next) = src.get(i + 1) {
                        w |= next << (WORD - bits);
                    }
                }
                w
            })
            .collect();
        Self::from_words(words)
    }

    /// Returns `self << n`.
    pub fn shift_up(&self, n: usize) -> Bitset {
        if self.is_empty() {
            return Bitset::new();
        }
        let bits = n % WORD;
        let mut words = vec![0u64; n / WORD];
        words.reserve(self.words.len() + 1);
        if bits == 0 {
            words.extend_from_slice(&self.words);
        } else {
            let mut carry = 0u64;
            for w in &self.words {
                words.push((w << bits) | carry);
                carry = w >> (WORD - bits);
            }
            if carry != 0 {
                words.push(carry);
            }
        }
        Self { words }
    }

    /// Deletes bit `slot`, moving every higher bit down one position.
    pub fn remove(&self, slot: usize) -> Bitset {
        self.remove_slice(slot, 1)
    }

    /// Deletes `width` bits starting at `at`, moving higher bits down.
    pub fn remove_slice(&self, at: usize, width: usize) -> Bitset {
        if at >= self.bit_length() {
            return self.clone();
        }
        self.low(at) | self.shift_down(at + width).shift_up(at)
    }

    /// Opens `width` bits at `at`, moving bits `>= at` up, and fills the gap
    /// with the low `width` bits of `value`.
    pub fn insert_slice(&self, at: usize, width: usize, value: &Bitset) -> Bitset {
        self.low(at) | value.low(width).shift_up(at) | self.shift_down(at).shift_up(at + width)
    }

    /// Returns bits `at..at + width` moved down to position 0.
    pub fn slice(&self, at: usize, width: usize) -> Bitset {
        self.shift_down(at).low(width)
    }

    /// Overwrites bits `at..at + width` with the low `width` bits of `value`.
    pub fn set_slice(&self, at: usize, width: usize, value: &Bitset) -> Bitset {
        self.low(at)
            | value.low(width).shift_up(at)
            | self.shift_down(at + width).shift_up(at + width)
    }

    fn normalize(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

/// Iterator over the set positions of a [`Bitset`].
pub struct Iter<'a> {
    words: &'a [u64],
    index: usize,
    current: u64,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.current != 0 {
                let tz = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.index * WORD + tz);
            }
            self.index += 1;
            self.current = *self.words.get(self.index)?;
        }
    }
}

impl<'a> IntoIterator for &'a Bitset {
    type Item = usize;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl FromIterator<usize> for Bitset {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = Bitset::new();
        for n in iter {
            set.set(n);
        }
        set
    }
}

impl From<u64> for Bitset {
    fn from(value: u64) -> Self {
        Self::from_words(vec![value])
    }
}

impl From<u128> for Bitset {
    fn from(value: u128) -> Self {
        Self::from_words(vec![value as u64, (value >> WORD) as u64])
    }
}

impl BitOr for &Bitset {
    type Output = Bitset;

    fn bitor(self, rhs: &Bitset) -> Bitset {
        let (long, short) = if self.words.len() >= rhs.words.len() {
            (self, rhs)
        } else {
            (rhs, self)
        };
        let mut words = long.words.clone();
        for (w, s) in words.iter_mut().zip(&short.words) {
            *w |= s;
        }
        Bitset { words }
    }
}

impl BitOr for Bitset {
    type Output = Bitset;

    fn bitor(mut self, rhs: Bitset) -> Bitset {
        self |= &rhs;
        self
    }
}

impl BitOrAssign<&Bitset> for Bitset {
    fn bitor_assign(&mut self, rhs: &Bitset) {
        if rhs.words.len() > self.words.len() {
            self.words.resize(rhs.words.len(), 0);
        }
        for (w, r) in self.words.iter_mut().zip(&rhs.words) {
            *w |= r;
        }
    }
}

impl BitAnd for &Bitset {
    type Output = Bitset;

    fn bitand(self, rhs: &Bitset) -> Bitset {
        let words = self
            .words
            .iter()
            .zip(&rhs.words)
            .map(|(a, b)| a & b)
            .collect();
        Bitset::from_words(words)
    }
}

impl BitAndAssign<&Bitset> for Bitset {
    fn bitand_assign(&mut self, rhs: &Bitset) {
        self.words.truncate(rhs.words.len());
        for (w, r) in self.words.iter_mut().zip(&rhs.words) {
            *w &= r;
        }
        self.normalize();
    }
}

impl BitXor for &Bitset {
    type Output = Bitset;

    fn bitxor(self, rhs: &Bitset) -> Bitset {
        let mut out = self.clone();
        out ^= rhs;
        out
    }
}

impl BitXorAssign<&Bitset> for Bitset {
    fn bitxor_assign(&mut self, rhs: &Bitset) {
        if rhs.words.len() > self.words.len() {
            self.words.resize(rhs.words.len(), 0);
        }
        for (w, r) in self.words.iter_mut().zip(&rhs.words) {
            *w ^= r;
        }
        self.normalize();
    }
}

/// Binary digits, most significant first; `0` when empty.
impl fmt::Display for Bitset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut words = self.words.iter().rev();
        match words.next() {
            None => write!(f, "0"),
            Some(top) => {
                write!(f, "{:b}", top)?;
                for w in words {
                    write!(f, "{:064b}", w)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for Bitset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bitset(0b{})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    fn bits(value: u128) -> Bitset {
        Bitset::from(value)
    }

    #[test]
    fn test_bitset_new() {
        let set = Bitset::new();
        assert!(set.is_empty());
        assert_eq!(set.count(), 0);
        assert_eq!(set.bit_length(), 0);
        assert_eq!(set.to_string(), "0");
    }

    #[test]
    fn test_set_get_clear() {
        let mut set = Bitset::new();
        set.set(3);
        set.set(70);
        assert!(set.get(3));
        assert!(set.get(70));
        assert!(!set.get(4));
        assert_eq!(set.count(), 2);
        assert_eq!(set.bit_length(), 71);

        set.clear(70);
        assert_eq!(set.words().len(), 1);
        assert_eq!(set, bits(0b1000));

        set.toggle(0);
        set.toggle(3);
        assert_eq!(set, bits(1));
    }

    #[test]
    fn test_ones() {
        assert_eq!(Bitset::ones(0), Bitset::new());
        assert_eq!(Bitset::ones(3), bits(0b111));
        assert_eq!(Bitset::ones(64).count(), 64);
        assert_eq!(Bitset::ones(65).bit_length(), 65);
    }

    #[test]
    fn test_iter_ascending() {
        let set: Bitset = [130, 2, 64, 5].into_iter().collect();
        let positions: Vec<usize> = set.iter().collect();
        assert_eq!(positions, vec![2, 5, 64, 130]);
    }

    #[test]
    fn test_lowest_at_or_after() {
        let set: Bitset = [2, 64, 130].into_iter().collect();
        assert_eq!(set.lowest_at_or_after(0), Some(2));
        assert_eq!(set.lowest_at_or_after(3), Some(64));
        assert_eq!(set.lowest_at_or_after(64), Some(64));
        assert_eq!(set.lowest_at_or_after(65), Some(130));
        assert_eq!(set.lowest_at_or_after(131), None);
        assert_eq!(set.lowest_at_or_after(1000), None);
    }

    #[test]
    fn test_remove_shifts_down() {
        // 0b1_0110 minus bit 1 -> 0b1010
        assert_eq!(bits(0b10110).remove(1), bits(0b1010));
        assert_eq!(bits(0b10110).remove(0), bits(0b1011));
        assert_eq!(bits(0b10110).remove(10), bits(0b10110));

        let set: Bitset = [0, 63, 64, 128].into_iter().collect();
        let expected: Bitset = [0, 62, 63, 127].into_iter().collect();
        assert_eq!(set.remove(1), expected);
    }

    #[test]
    fn test_insert_slice() {
        assert_eq!(bits(0b101).insert_slice(1, 2, &bits(0b11)), bits(0b10111));
        assert_eq!(bits(0b111).insert_slice(3, 4, &Bitset::ones(4)), bits(0b111_1111));
        let wide = Bitset::ones(60).insert_slice(60, 10, &Bitset::ones(10));
        assert_eq!(wide, Bitset::ones(70));
    }

    #[test]
    fn test_slices() {
        let set = bits(0b1101_0110);
        assert_eq!(set.slice(1, 3), bits(0b011));
        assert_eq!(set.set_slice(0, 4, &bits(0b1111)), bits(0b1101_1111));
        assert_eq!(set.remove_slice(2, 3), bits(0b110_10));
    }

    #[test]
    fn test_shifts_across_words() {
        let set: Bitset = [1, 63].into_iter().collect();
        let up: Bitset = [66, 128].into_iter().collect();
        assert_eq!(set.shift_up(65), up);
        assert_eq!(up.shift_down(65), set);
        assert_eq!(set.shift_down(200), Bitset::new());
    }

    #[test]
    fn test_bit_ops() {
        let a = bits(0b1100);
        let b = bits(0b1010);
        assert_eq!(&a | &b, bits(0b1110));
        assert_eq!(&a & &b, bits(0b1000));
        assert_eq!(&a ^ &b, bits(0b0110));
        assert_eq!(a.and_not(&b), bits(0b0100));
        assert!((&a & &bits(0b0011)).is_empty());
    }

    #[test]
    fn test_u128_round_trip() {
        let value = (1u128 << 100) | 5;
        assert_eq!(Bitset::from(value).to_u128(), Some(value));
        assert_eq!(Bitset::from_bit(200).to_u128(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(bits(0b1011).to_string(), "1011");
        let text = Bitset::from_bit(64).to_string();
        assert_eq!(text.len(), 65);
        assert!(text.starts_with("10"));
    }
}
