//! Morphological flag parsing and flag-set interning.
//!
//! Flags tag words and affix rules to control which affix applications are
//! legal. The affix file picks one of three notations with its `FLAG`
//! directive; the notation is global and fixed for the lifetime of the
//! dictionary, so it is modeled as a closed enum dispatched by matching
//! rather than a trait object.
//!
//! Flag sets are encoded as fixed-width big-endian 2-byte values and
//! interned byte-wise in a [`FlagSetTable`]; every table reserves ordinal 0
//! for the empty set.

use ahash::AHashMap;
use byteorder::{BigEndian, ByteOrder};

use crate::error::{Result, StemmaError};

/// A single morphological flag. Its meaning depends on the active notation.
pub type Flag = u16;

/// The flag notation selected by the `FLAG` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagNotation {
    /// One flag per codepoint. The default, also used for `FLAG UTF-8`.
    #[default]
    Simple,
    /// `FLAG num`: comma-separated decimal flag values.
    Numeric,
    /// `FLAG long`: pairs of ASCII characters combined into one flag.
    DoubleAscii,
}

impl FlagNotation {
    /// Resolve the argument of a `FLAG` directive.
    pub fn from_directive(flag_type: &str) -> Result<FlagNotation> {
        match flag_type {
            "num" => Ok(FlagNotation::Numeric),
            "UTF-8" => Ok(FlagNotation::Simple),
            "long" => Ok(FlagNotation::DoubleAscii),
            _ => Err(StemmaError::invalid_argument(format!(
                "Unknown flag type: {flag_type}"
            ))),
        }
    }

    /// Parse a string that must contain exactly one flag.
    pub fn parse_flag(&self, raw: &str) -> Result<Flag> {
        let flags = self.parse_flags(raw)?;
        if flags.len() != 1 {
            return Err(StemmaError::invalid_argument(format!(
                "expected only one flag, got: {raw}"
            )));
        }
        Ok(flags[0])
    }

    /// Parse a string into multiple flags, in input order.
    pub fn parse_flags(&self, raw: &str) -> Result<Vec<Flag>> {
        match self {
            FlagNotation::Simple => Ok(raw.chars().map(|c| c as u16).collect()),
            FlagNotation::Numeric => {
                let mut flags = Vec::new();
                for part in raw.trim().split(',') {
                    let digits: String = part.chars().filter(char::is_ascii_digit).collect();
                    // empty flags show up in real dictionaries (danish, nepali);
                    // tolerate them silently
                    if digits.is_empty() {
                        continue;
                    }
                    let value = digits.parse::<u16>().map_err(|_| {
                        StemmaError::invalid_argument(format!("Invalid numeric flag: {part}"))
                    })?;
                    flags.push(value);
                }
                Ok(flags)
            }
            FlagNotation::DoubleAscii => {
                if raw.is_empty() {
                    return Ok(Vec::new());
                }
                let chars: Vec<char> = raw.chars().collect();
                if chars.len() % 2 == 1 {
                    return Err(StemmaError::invalid_argument(format!(
                        "Invalid flags (should be even number of characters): {raw}"
                    )));
                }
                let mut flags = Vec::with_capacity(chars.len() / 2);
                for pair in chars.chunks_exact(2) {
                    let (f1, f2) = (pair[0] as u32, pair[1] as u32);
                    if f1 >= 256 || f2 >= 256 {
                        return Err(StemmaError::invalid_argument(format!(
                            "Invalid flags (long flags must be double ASCII): {raw}"
                        )));
                    }
                    flags.push((f1 << 8 | f2) as u16);
                }
                Ok(flags)
            }
        }
    }
}

/// Encode flags as fixed-width big-endian 2-byte values.
pub(crate) fn encode_flags(flags: &[Flag]) -> Vec<u8> {
    let mut bytes = vec![0u8; flags.len() * 2];
    for (i, &flag) in flags.iter().enumerate() {
        BigEndian::write_u16(&mut bytes[i * 2..], flag);
    }
    bytes
}

/// Decode a big-endian flag-set encoding.
pub(crate) fn decode_flags(bytes: &[u8]) -> Vec<Flag> {
    bytes.chunks_exact(2).map(BigEndian::read_u16).collect()
}

/// Interns flag sets to stable ordinals, deduplicating on the byte encoding.
///
/// Sets are sorted ascending and deduplicated before interning, so the same
/// collection of flags always maps to the same ordinal. Ordinal 0 is the
/// empty set. The number of unique sets is in practice small (a few hundred
/// even for heavily inflected languages).
#[derive(Debug)]
pub struct FlagSetTable {
    entries: Vec<Vec<u8>>,
    seen: AHashMap<Vec<u8>, u32>,
}

impl FlagSetTable {
    pub fn new() -> Self {
        let mut seen = AHashMap::new();
        seen.insert(Vec::new(), 0);
        FlagSetTable {
            entries: vec![Vec::new()],
            seen,
        }
    }

    /// Intern a flag set, returning its stable ordinal.
    pub fn intern(&mut self, mut flags: Vec<Flag>) -> u32 {
        flags.sort_unstable();
        flags.dedup();
        let bytes = encode_flags(&flags);
        if let Some(&ord) = self.seen.get(&bytes) {
            return ord;
        }
        let ord = self.entries.len() as u32;
        self.seen.insert(bytes.clone(), ord);
        self.entries.push(bytes);
        ord
    }

    /// Decode the flag set stored at `ord`.
    pub fn decode(&self, ord: u32) -> Vec<Flag> {
        decode_flags(&self.entries[ord as usize])
    }

    /// Whether the set at `ord` contains `flag`.
    pub fn has_flag(&self, ord: u32, flag: Flag) -> bool {
        self.entries[ord as usize]
            .chunks_exact(2)
            .any(|pair| BigEndian::read_u16(pair) == flag)
    }

    /// Number of interned flag sets, including the reserved empty set.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        false // ordinal 0 always exists
    }
}

impl Default for FlagSetTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_notation() {
        let notation = FlagNotation::Simple;
        assert_eq!(notation.parse_flags("AzB").unwrap(), vec![65, 122, 66]);
        assert_eq!(notation.parse_flag("A").unwrap(), 65);
        assert!(notation.parse_flag("AB").is_err());
    }

    #[test]
    fn test_numeric_notation() {
        let notation = FlagNotation::Numeric;
        assert_eq!(notation.parse_flags("1,2,3").unwrap(), vec![1, 2, 3]);
        // empty tokens after stripping are silently dropped
        assert_eq!(notation.parse_flags("1,,3").unwrap(), vec![1, 3]);
        // stray non-digits are stripped per token
        assert_eq!(notation.parse_flags("12X,3").unwrap(), vec![12, 3]);
        assert!(notation.parse_flags("99999").is_err());
    }

    #[test]
    fn test_double_ascii_notation() {
        let notation = FlagNotation::DoubleAscii;
        assert_eq!(
            notation.parse_flags("AaBb").unwrap(),
            vec![(b'A' as u16) << 8 | b'a' as u16, (b'B' as u16) << 8 | b'b' as u16]
        );
        assert_eq!(notation.parse_flags("").unwrap(), Vec::<Flag>::new());
        // odd-length input is malformed
        assert!(notation.parse_flags("AaB").is_err());
        // halves up to U+00FF pack fine; anything wider is malformed
        assert_eq!(
            notation.parse_flags("Aé").unwrap(),
            vec![(b'A' as u16) << 8 | 0xe9]
        );
        assert!(notation.parse_flags("Aあ").is_err());
    }

    #[test]
    fn test_from_directive() {
        assert_eq!(
            FlagNotation::from_directive("num").unwrap(),
            FlagNotation::Numeric
        );
        assert_eq!(
            FlagNotation::from_directive("UTF-8").unwrap(),
            FlagNotation::Simple
        );
        assert_eq!(
            FlagNotation::from_directive("long").unwrap(),
            FlagNotation::DoubleAscii
        );
        assert!(FlagNotation::from_directive("short").is_err());
    }

    #[test]
    fn test_encode_decode_round_trip() {
        for notation in [
            FlagNotation::Simple,
            FlagNotation::Numeric,
            FlagNotation::DoubleAscii,
        ] {
            let raw = match notation {
                FlagNotation::Simple => "CAB",
                FlagNotation::Numeric => "3,1,2",
                FlagNotation::DoubleAscii => "zzaabb",
            };
            let flags = notation.parse_flags(raw).unwrap();
            let mut expected = flags.clone();
            expected.sort_unstable();
            expected.dedup();
            assert_eq!(decode_flags(&encode_flags(&expected)), expected);

            let mut table = FlagSetTable::new();
            let ord = table.intern(flags);
            assert_eq!(table.decode(ord), expected);
        }
    }

    #[test]
    fn test_interner_dedups() {
        let mut table = FlagSetTable::new();
        let a = table.intern(vec![2, 1]);
        let b = table.intern(vec![1, 2, 2]);
        assert_eq!(a, b);
        assert_eq!(table.len(), 2);

        // ordinal 0 is always the empty set
        assert_eq!(table.intern(Vec::new()), 0);
        assert_eq!(table.decode(0), Vec::<Flag>::new());
    }

    #[test]
    fn test_has_flag() {
        let mut table = FlagSetTable::new();
        let ord = table.intern(vec![10, 300, 65]);
        assert!(table.has_flag(ord, 300));
        assert!(table.has_flag(ord, 65));
        assert!(!table.has_flag(ord, 11));
        assert!(!table.has_flag(0, 10));
    }
}
