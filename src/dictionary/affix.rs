//! Packed affix records, append-text indexes, and strip-string interning.
//!
//! Affix rules compile down to fixed-size 8-byte records addressed by
//! ordinal: flag, strip ordinal, condition ordinal (with the cross-product
//! bit packed into its low bit), and append flag-set ordinal, each a
//! big-endian `u16`. The literal append text itself never lives in the
//! record; it is the key of an [`AffixIndex`] mapping each distinct append
//! string to the ordinals of all rules that share it.

use ahash::AHashMap;
use byteorder::{BigEndian, ByteOrder};

use crate::dictionary::flags::Flag;
use crate::error::{Result, StemmaError};

/// Bytes per packed affix record.
const RECORD_SIZE: usize = 8;

/// A decoded affix rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AffixRecord {
    /// Flag a word must carry for this rule to apply.
    pub flag: Flag,
    /// Ordinal of the text restored when the append is removed.
    pub strip_ord: u16,
    /// Ordinal of the condition pattern.
    pub pattern_ord: u16,
    /// Whether this rule may combine with an affix of the opposite kind.
    pub cross_product: bool,
    /// Ordinal of the continuation-class flag set granted to derived forms.
    pub append_flags_ord: u16,
}

/// Fixed-size packed records for affix rules, addressed by ordinal.
///
/// Ordinals are assigned monotonically across both directions during the
/// single compiler pass; prefix and suffix rules share one store.
#[derive(Debug, Default)]
pub struct AffixStore {
    data: Vec<u8>,
}

impl AffixStore {
    pub fn new() -> Self {
        AffixStore::default()
    }

    /// Append one record, returning its ordinal.
    pub fn push(
        &mut self,
        flag: Flag,
        strip_ord: u16,
        pattern_ord: u16,
        cross_product: bool,
        append_flags_ord: u16,
    ) -> u32 {
        let ord = (self.data.len() / RECORD_SIZE) as u32;
        let mut record = [0u8; RECORD_SIZE];
        BigEndian::write_u16(&mut record[0..2], flag);
        BigEndian::write_u16(&mut record[2..4], strip_ord);
        BigEndian::write_u16(&mut record[4..6], pattern_ord << 1 | cross_product as u16);
        BigEndian::write_u16(&mut record[6..8], append_flags_ord);
        self.data.extend_from_slice(&record);
        ord
    }

    /// Decode the record at `ord`.
    pub fn get(&self, ord: u32) -> AffixRecord {
        let offset = ord as usize * RECORD_SIZE;
        let packed = BigEndian::read_u16(&self.data[offset + 4..]);
        AffixRecord {
            flag: BigEndian::read_u16(&self.data[offset..]),
            strip_ord: BigEndian::read_u16(&self.data[offset + 2..]),
            pattern_ord: packed >> 1,
            cross_product: packed & 1 == 1,
            append_flags_ord: BigEndian::read_u16(&self.data[offset + 6..]),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len() / RECORD_SIZE
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Maps an affix's literal append text to all rule ordinals sharing it.
///
/// Answers "all rules whose append text equals exactly this span"; one
/// index exists per direction.
#[derive(Debug, Default)]
pub struct AffixIndex {
    map: AHashMap<String, Vec<u32>>,
}

impl AffixIndex {
    pub fn new() -> Self {
        AffixIndex::default()
    }

    pub fn add(&mut self, append: &str, ord: u32) {
        self.map.entry(append.to_string()).or_default().push(ord);
    }

    pub fn lookup(&self, append: &str) -> Option<&[u32]> {
        self.map.get(append).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Number of distinct append strings.
    pub fn len(&self) -> usize {
        self.map.len()
    }
}

/// Interned strip strings; ordinal 0 is the empty string.
#[derive(Debug)]
pub struct StripTable {
    entries: Vec<String>,
    seen: AHashMap<String, u16>,
}

impl StripTable {
    pub fn new() -> Self {
        let mut seen = AHashMap::new();
        seen.insert(String::new(), 0);
        StripTable {
            entries: vec![String::new()],
            seen,
        }
    }

    pub fn intern(&mut self, strip: &str) -> Result<u16> {
        if let Some(&ord) = self.seen.get(strip) {
            return Ok(ord);
        }
        let ord = self.entries.len();
        if ord > u16::MAX as usize {
            return Err(StemmaError::CapacityExceeded("strip strings"));
        }
        self.seen.insert(strip.to_string(), ord as u16);
        self.entries.push(strip.to_string());
        Ok(ord as u16)
    }

    pub fn get(&self, ord: u16) -> &str {
        &self.entries[ord as usize]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        false // ordinal 0 always exists
    }
}

impl Default for StripTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_round_trip() {
        let mut store = AffixStore::new();
        let a = store.push(65, 3, 7, true, 12);
        let b = store.push(0x2061, 0, 0, false, 0);
        assert_eq!(a, 0);
        assert_eq!(b, 1);
        assert_eq!(store.len(), 2);

        assert_eq!(
            store.get(0),
            AffixRecord {
                flag: 65,
                strip_ord: 3,
                pattern_ord: 7,
                cross_product: true,
                append_flags_ord: 12,
            }
        );
        assert_eq!(
            store.get(1),
            AffixRecord {
                flag: 0x2061,
                strip_ord: 0,
                pattern_ord: 0,
                cross_product: false,
                append_flags_ord: 0,
            }
        );
    }

    #[test]
    fn test_cross_product_bit_does_not_leak() {
        let mut store = AffixStore::new();
        store.push(1, 0, i16::MAX as u16, true, 0);
        let record = store.get(0);
        assert_eq!(record.pattern_ord, i16::MAX as u16);
        assert!(record.cross_product);
    }

    #[test]
    fn test_affix_index_groups_by_append() {
        let mut index = AffixIndex::new();
        index.add("s", 0);
        index.add("ed", 1);
        index.add("s", 2);
        assert_eq!(index.lookup("s"), Some(&[0, 2][..]));
        assert_eq!(index.lookup("ed"), Some(&[1][..]));
        assert_eq!(index.lookup("ing"), None);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_strip_table_interning() {
        let mut table = StripTable::new();
        assert_eq!(table.intern("").unwrap(), 0);
        let y = table.intern("y").unwrap();
        assert_eq!(table.intern("y").unwrap(), y);
        assert_eq!(table.get(y), "y");
        assert_eq!(table.get(0), "");
        assert_eq!(table.len(), 2);
    }
}
