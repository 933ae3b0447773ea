//! Interned condition-pattern automata.
//!
//! Every affix rule carries a condition constraining the stems it may apply
//! to. Conditions are tiny regular patterns over codepoints; many rules
//! share the same one, so compiled patterns are deduplicated by their final
//! pattern text. Ordinal 0 is reserved for the match-anything pattern and
//! never compiles or runs a matcher at all.

use ahash::AHashMap;
use regex::Regex;

use crate::error::{Result, StemmaError};

/// The pattern text reserved for ordinal 0.
pub const MATCH_ANY: &str = ".*";

/// Deduplicated table of compiled condition patterns.
#[derive(Debug)]
pub struct ConditionTable {
    patterns: Vec<Option<Regex>>,
    seen: AHashMap<String, u16>,
}

impl ConditionTable {
    pub fn new() -> Self {
        let mut seen = AHashMap::new();
        seen.insert(MATCH_ANY.to_string(), 0);
        ConditionTable {
            patterns: vec![None],
            seen,
        }
    }

    /// Intern the final (template-expanded) pattern text.
    ///
    /// Deduplication happens on this text, not the source condition, so
    /// e.g. a prefix condition `x` and a literal pattern `x.*` coincide.
    pub fn intern(&mut self, pattern: &str) -> Result<u16> {
        if let Some(&ord) = self.seen.get(pattern) {
            return Ok(ord);
        }
        let ord = self.patterns.len();
        if ord > i16::MAX as usize {
            return Err(StemmaError::CapacityExceeded("condition patterns"));
        }
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            StemmaError::invalid_argument(format!("Invalid condition pattern {pattern}: {e}"))
        })?;
        self.seen.insert(pattern.to_string(), ord as u16);
        self.patterns.push(Some(regex));
        Ok(ord as u16)
    }

    /// Feed `left`'s codepoints, then `right`'s, through the pattern at
    /// `ord` and report whether the whole concatenation is accepted.
    pub fn matches(&self, ord: u16, left: &[char], right: &[char]) -> bool {
        match &self.patterns[ord as usize] {
            None => true,
            Some(regex) => {
                let mut candidate = String::with_capacity(left.len() + right.len());
                candidate.extend(left.iter());
                candidate.extend(right.iter());
                regex.is_match(&candidate)
            }
        }
    }

    /// Number of interned patterns, including the reserved ordinal 0.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        false // ordinal 0 always exists
    }
}

impl Default for ConditionTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_match_any_ordinal() {
        let table = ConditionTable::new();
        assert!(table.matches(0, &chars("anything"), &chars("at all")));
        assert!(table.matches(0, &[], &[]));
    }

    #[test]
    fn test_intern_dedups_on_final_text() {
        let mut table = ConditionTable::new();
        let a = table.intern(".*[^aeiou]y").unwrap();
        let b = table.intern(".*[^aeiou]y").unwrap();
        assert_eq!(a, b);
        assert_eq!(table.len(), 2);

        assert_eq!(table.intern(MATCH_ANY).unwrap(), 0);
    }

    #[test]
    fn test_suffix_style_match() {
        let mut table = ConditionTable::new();
        let ord = table.intern(".*[^aeiou]y").unwrap();
        // remainder then strip, as the suffix branch feeds them
        assert!(table.matches(ord, &chars("happ"), &chars("y")));
        assert!(!table.matches(ord, &chars("pla"), &chars("y")));
    }

    #[test]
    fn test_prefix_style_match() {
        let mut table = ConditionTable::new();
        let ord = table.intern("qu.*").unwrap();
        // strip then remainder, as the prefix branch feeds them
        assert!(table.matches(ord, &chars("qu"), &chars("ick")));
        assert!(!table.matches(ord, &[], &chars("ick")));
    }

    #[test]
    fn test_escaped_dash_is_literal() {
        let mut table = ConditionTable::new();
        let ord = table.intern(".*\\-like").unwrap();
        assert!(table.matches(ord, &chars("cat-like"), &[]));
        assert!(!table.matches(ord, &chars("catlike"), &[]));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let mut table = ConditionTable::new();
        assert!(table.intern("[unclosed").is_err());
    }
}
