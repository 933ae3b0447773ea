//! Longest-match character substitution tables (`ICONV`/`OCONV`).

use ahash::AHashMap;

/// A longest-match input/output substitution table.
///
/// At each position the longest mapped span wins; unmapped characters pass
/// through unchanged. `ICONV` tables rewrite query and dictionary text
/// before lookup, `OCONV` tables rewrite emitted stems.
#[derive(Debug, Default)]
pub struct ConversionTable {
    map: AHashMap<String, String>,
    /// Longest key, in codepoints.
    max_key_len: usize,
}

impl ConversionTable {
    pub(crate) fn new() -> Self {
        ConversionTable::default()
    }

    /// Insert a mapping, returning `false` if `from` was already mapped.
    pub(crate) fn insert(&mut self, from: String, to: String) -> bool {
        self.max_key_len = self.max_key_len.max(from.chars().count());
        self.map.insert(from, to).is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Rewrite `input`, replacing the longest mapped span at each position.
    pub fn apply(&self, input: &str) -> String {
        let chars: Vec<char> = input.chars().collect();
        let mut output = String::with_capacity(input.len());
        let mut probe = String::new();
        let mut i = 0;
        while i < chars.len() {
            let longest = self.max_key_len.min(chars.len() - i);
            let mut matched = 0;
            for len in (1..=longest).rev() {
                probe.clear();
                probe.extend(chars[i..i + len].iter());
                if let Some(replacement) = self.map.get(&probe) {
                    output.push_str(replacement);
                    matched = len;
                    break;
                }
            }
            if matched == 0 {
                output.push(chars[i]);
                i += 1;
            } else {
                i += matched;
            }
        }
        output
    }
}
