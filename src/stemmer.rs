//! Recursive affix-stripping stemmer.
//!
//! A [`Stemmer`] borrows a compiled [`Dictionary`] and recovers all valid
//! dictionary stems for a query word: direct word-index hits plus every stem
//! reachable by stripping affixes under the cross-product, continuation
//! class and circumfix rules. The search is a bounded recursion of at most
//! two prefixes and two suffixes, so stemming never runs away regardless of
//! input length. Stemming has no error path; unknown input yields an empty
//! list.

use ahash::AHashSet;

use crate::dictionary::{Dictionary, Flag};

/// Case shape of a query word, deciding which folded variants to try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WordCase {
    /// Query as given only.
    Exact,
    /// Leading uppercase, rest lowercase; also try the all-lowercase fold.
    Title,
    /// All uppercase; also try the title and lowercase folds.
    Upper,
}

/// Finds dictionary stems for words.
///
/// Cheap to construct; create one per logical caller and share the
/// [`Dictionary`] between them. A single instance is not meant for
/// concurrent use.
pub struct Stemmer<'a> {
    dictionary: &'a Dictionary,
}

impl<'a> Stemmer<'a> {
    pub fn new(dictionary: &'a Dictionary) -> Stemmer<'a> {
        Stemmer { dictionary }
    }

    /// Find the stem(s) of the provided word.
    ///
    /// Duplicates are preserved; see [`Stemmer::unique_stems`] for a
    /// deduplicated view.
    pub fn stem(&self, word: &str) -> Vec<String> {
        let cleaned;
        let word = if self.dictionary.needs_input_cleaning {
            cleaned = self.dictionary.clean_input(word);
            cleaned.as_str()
        } else {
            word
        };
        let chars: Vec<char> = word.chars().collect();

        match self.case_of(&chars) {
            WordCase::Upper => {
                // upper: union exact, title and lower variants
                let title = self.case_fold_title(&chars);
                let lower = self.case_fold_lower(&title);
                let mut stems = self.do_stem(&chars);
                stems.extend(self.do_stem(&title));
                stems.extend(self.do_stem(&lower));
                stems
            }
            WordCase::Title => {
                // title: union exact and lower variants
                let lower = self.case_fold_lower(&chars);
                let mut stems = self.do_stem(&chars);
                stems.extend(self.do_stem(&lower));
                stems
            }
            WordCase::Exact => self.do_stem(&chars),
        }
    }

    /// Find the unique stem(s) of the provided word, first occurrence wins.
    pub fn unique_stems(&self, word: &str) -> Vec<String> {
        let stems = self.stem(word);
        if stems.len() < 2 {
            return stems;
        }
        let mut seen = AHashSet::new();
        let mut deduped = Vec::with_capacity(stems.len());
        for stem in stems {
            let key: String = if self.dictionary.ignore_case {
                stem.chars().map(|c| self.dictionary.case_fold(c)).collect()
            } else {
                stem.clone()
            };
            if seen.insert(key) {
                deduped.push(stem);
            }
        }
        deduped
    }

    fn case_of(&self, word: &[char]) -> WordCase {
        if self.dictionary.ignore_case || word.is_empty() || !word[0].is_uppercase() {
            return WordCase::Exact;
        }
        let mut seen_upper = false;
        let mut seen_lower = false;
        for &c in &word[1..] {
            let upper = c.is_uppercase();
            seen_upper |= upper;
            seen_lower |= !upper;
        }
        if !seen_lower {
            WordCase::Upper
        } else if !seen_upper {
            WordCase::Title
        } else {
            WordCase::Exact
        }
    }

    /// Fold everything but the first character.
    fn case_fold_title(&self, word: &[char]) -> Vec<char> {
        word.iter()
            .enumerate()
            .map(|(i, &c)| if i == 0 { c } else { self.dictionary.case_fold(c) })
            .collect()
    }

    /// Fold the first character of an already title-cased word.
    fn case_fold_lower(&self, word: &[char]) -> Vec<char> {
        let mut lower = word.to_vec();
        if let Some(first) = lower.first_mut() {
            *first = self.dictionary.case_fold(*first);
        }
        lower
    }

    fn do_stem(&self, word: &[char]) -> Vec<String> {
        let mut stems = Vec::new();
        let text: String = word.iter().collect();
        if let Some(forms) = self.dictionary.words.get(&text) {
            for _ in forms {
                stems.push(self.new_stem(word));
            }
        }
        stems.extend(self.strip_affixes(word, None, None, None, 0, true, true, false, false));
        stems
    }

    /// One stripping pass over `word`.
    ///
    /// `previous` is the rule just removed (so it is not removed twice in a
    /// row), `prev_flag` its flag for continuation cross-checks, and
    /// `prefix_flag` the flag of the innermost removed prefix, still to be
    /// validated against the word when a suffix comes off later.
    #[allow(clippy::too_many_arguments)]
    fn strip_affixes(
        &self,
        word: &[char],
        previous: Option<u32>,
        prev_flag: Option<Flag>,
        prefix_flag: Option<Flag>,
        depth: u8,
        do_prefix: bool,
        do_suffix: bool,
        previous_was_prefix: bool,
        circumfix: bool,
    ) -> Vec<String> {
        let dict = self.dictionary;
        let mut stems = Vec::new();

        if do_prefix && !dict.prefixes.is_empty() {
            let limit = if dict.full_strip {
                word.len()
            } else {
                word.len().saturating_sub(1)
            };
            let mut key = String::new();
            for i in 0..limit {
                if i > 0 {
                    key.push(word[i - 1]);
                }
                let Some(rules) = dict.prefixes.lookup(&key) else {
                    continue;
                };
                for &ord in rules {
                    if Some(ord) == previous {
                        continue;
                    }
                    let rule = dict.affixes.get(ord);

                    let compatible = if depth == 0 {
                        true
                    } else if rule.cross_product {
                        // cross check the previous affix's flag against the
                        // candidate's continuation class
                        match prev_flag {
                            Some(f) => {
                                self.has_cross_checked_flag(f, rule.append_flags_ord, false)
                            }
                            None => false,
                        }
                    } else {
                        false
                    };
                    if !compatible {
                        continue;
                    }

                    let strip: Vec<char> = dict.strips.get(rule.strip_ord).chars().collect();
                    let remainder = &word[i..];
                    if !dict.conditions.matches(rule.pattern_ord, &strip, remainder) {
                        continue;
                    }
                    let mut stripped = strip;
                    stripped.extend_from_slice(remainder);
                    stems.extend(self.apply_affix(&stripped, ord, None, depth, true, circumfix));
                }
            }
        }

        if do_suffix && !dict.suffixes.is_empty() {
            let limit = if dict.full_strip { 0 } else { 1 };
            for i in (limit..=word.len()).rev() {
                let key: String = word[i..].iter().collect();
                let Some(rules) = dict.suffixes.lookup(&key) else {
                    continue;
                };
                for &ord in rules {
                    if Some(ord) == previous {
                        continue;
                    }
                    let rule = dict.affixes.get(ord);

                    let compatible = if depth == 0 {
                        true
                    } else if rule.cross_product {
                        match prev_flag {
                            Some(f) => self.has_cross_checked_flag(
                                f,
                                rule.append_flags_ord,
                                previous_was_prefix,
                            ),
                            None => false,
                        }
                    } else {
                        false
                    };
                    if !compatible {
                        continue;
                    }

                    let strip: Vec<char> = dict.strips.get(rule.strip_ord).chars().collect();
                    let stem_part = &word[..i];
                    if !dict.conditions.matches(rule.pattern_ord, stem_part, &strip) {
                        continue;
                    }
                    let mut stripped = stem_part.to_vec();
                    stripped.extend_from_slice(&strip);
                    stems.extend(self.apply_affix(
                        &stripped,
                        ord,
                        prefix_flag,
                        depth,
                        false,
                        circumfix,
                    ));
                }
            }
        }

        stems
    }

    /// Check `stripped` against the word index under `affix`'s gates, then
    /// recurse per the cross-product policy.
    fn apply_affix(
        &self,
        stripped: &[char],
        affix: u32,
        prefix_flag: Option<Flag>,
        depth: u8,
        is_prefix: bool,
        mut circumfix: bool,
    ) -> Vec<String> {
        let dict = self.dictionary;
        let rule = dict.affixes.get(affix);
        let mut stems = Vec::new();

        let text: String = stripped.iter().collect();
        if let Some(forms) = dict.words.get(&text) {
            // the first prefix was already chained against the second one,
            // so it is not checked against the word again
            let chained_prefix = dict.complex_prefixes && depth == 1 && is_prefix;
            for &form in forms {
                if !dict.flag_sets.has_flag(form, rule.flag) {
                    continue;
                }
                if !chained_prefix {
                    if let Some(pf) = prefix_flag {
                        // a pending prefix must be sanctioned by the word
                        // itself or chained through this suffix's
                        // continuation class
                        if !dict.flag_sets.has_flag(form, pf)
                            && !self.has_cross_checked_flag(pf, rule.append_flags_ord, false)
                        {
                            continue;
                        }
                    }
                }
                if let Some(cf) = dict.circumfix {
                    // a circumfix-marked prefix requires a circumfix-marked
                    // suffix, and vice versa
                    let marked = dict.flag_sets.has_flag(rule.append_flags_ord as u32, cf);
                    if marked != circumfix {
                        continue;
                    }
                }
                stems.push(self.new_stem(stripped));
            }
        }

        if let Some(cf) = dict.circumfix {
            if !circumfix && is_prefix {
                circumfix = dict.flag_sets.has_flag(rule.append_flags_ord as u32, cf);
            }
        }

        if rule.cross_product {
            if depth == 0 {
                if is_prefix {
                    // first prefix removed; combine with a suffix, and with
                    // a second prefix in complex-prefix mode
                    stems.extend(self.strip_affixes(
                        stripped,
                        Some(affix),
                        Some(rule.flag),
                        Some(rule.flag),
                        1,
                        dict.complex_prefixes && dict.two_stage_affix,
                        true,
                        true,
                        circumfix,
                    ));
                } else if !dict.complex_prefixes && dict.two_stage_affix {
                    // first suffix removed; combine with another suffix
                    stems.extend(self.strip_affixes(
                        stripped,
                        Some(affix),
                        Some(rule.flag),
                        prefix_flag,
                        1,
                        false,
                        true,
                        false,
                        circumfix,
                    ));
                }
            } else if depth == 1 {
                if is_prefix && dict.complex_prefixes {
                    // second prefix removed; go look for a suffix
                    stems.extend(self.strip_affixes(
                        stripped,
                        Some(affix),
                        Some(rule.flag),
                        Some(rule.flag),
                        2,
                        false,
                        true,
                        true,
                        circumfix,
                    ));
                } else if !is_prefix && !dict.complex_prefixes && dict.two_stage_affix {
                    // a prefix then a suffix removed; one more suffix may follow
                    stems.extend(self.strip_affixes(
                        stripped,
                        Some(affix),
                        Some(rule.flag),
                        prefix_flag,
                        2,
                        false,
                        true,
                        false,
                        circumfix,
                    ));
                }
            }
        }

        stems
    }

    fn has_cross_checked_flag(&self, flag: Flag, append_flags_ord: u16, match_empty: bool) -> bool {
        (append_flags_ord == 0 && match_empty)
            || self
                .dictionary
                .flag_sets
                .has_flag(append_flags_ord as u32, flag)
    }

    fn new_stem(&self, word: &[char]) -> String {
        let text: String = word.iter().collect();
        if self.dictionary.needs_output_cleaning {
            self.dictionary.oconv.apply(&text)
        } else {
            text
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn compile(affix: &str, dic: &str) -> Dictionary {
        Dictionary::compile(Cursor::new(affix), vec![Cursor::new(dic)], false).unwrap()
    }

    fn compile_ignore_case(affix: &str, dic: &str) -> Dictionary {
        Dictionary::compile(Cursor::new(affix), vec![Cursor::new(dic)], true).unwrap()
    }

    #[test]
    fn test_suffix_stemming() {
        let affix = "SET UTF-8\nSFX A Y 1\nSFX A 0 s .\n";
        let dict = compile(affix, "2\ncat\nrun/A\n");
        let stemmer = Stemmer::new(&dict);
        assert_eq!(stemmer.stem("runs"), vec!["run"]);
        assert_eq!(stemmer.stem("run"), vec!["run"]);
        assert_eq!(stemmer.stem("cat"), vec!["cat"]);
        // "cat" carries no flag, so "cats" does not analyze
        assert!(stemmer.stem("cats").is_empty());
        assert!(stemmer.stem("dogs").is_empty());
    }

    #[test]
    fn test_prefix_suffix_composition() {
        let affix = "SET UTF-8\n\
                     PFX P Y 1\n\
                     PFX P 0 un .\n\
                     SFX A Y 1\n\
                     SFX A 0 ly .\n";
        let dict = compile(affix, "1\nhappy/PA\n");
        let stemmer = Stemmer::new(&dict);
        assert_eq!(stemmer.stem("unhappyly"), vec!["happy"]);
        assert_eq!(stemmer.stem("unhappy"), vec!["happy"]);
        assert_eq!(stemmer.stem("happyly"), vec!["happy"]);
        assert_eq!(stemmer.stem("happy"), vec!["happy"]);
    }

    #[test]
    fn test_cross_product_gates_composition() {
        let affix = "SET UTF-8\n\
                     PFX P N 1\n\
                     PFX P 0 un .\n\
                     SFX A Y 1\n\
                     SFX A 0 ly .\n";
        let dict = compile(affix, "1\nhappy/PA\n");
        let stemmer = Stemmer::new(&dict);
        // the prefix alone still applies
        assert_eq!(stemmer.stem("unhappy"), vec!["happy"]);
        // but without cross product it cannot combine with the suffix
        assert!(stemmer.stem("unhappyly").is_empty());
    }

    #[test]
    fn test_continuation_class_two_suffixes() {
        let affix = "SET UTF-8\n\
                     SFX A Y 1\n\
                     SFX A 0 able/B .\n\
                     SFX B Y 1\n\
                     SFX B 0 s .\n";
        let dict = compile(affix, "1\ndrink/A\n");
        let stemmer = Stemmer::new(&dict);
        assert_eq!(stemmer.stem("drinkable"), vec!["drink"]);
        assert_eq!(stemmer.stem("drinkables"), vec!["drink"]);
        // "s" is only reachable through the continuation class of "able"
        assert!(stemmer.stem("drinks").is_empty());
    }

    #[test]
    fn test_suffix_not_reapplied_immediately() {
        let affix = "SET UTF-8\nSFX A Y 1\nSFX A 0 s/A .\n";
        let dict = compile(affix, "1\ncat/A\n");
        let stemmer = Stemmer::new(&dict);
        assert_eq!(stemmer.stem("cats"), vec!["cat"]);
        assert!(stemmer.stem("catss").is_empty());
    }

    #[test]
    fn test_condition_blocks_application() {
        let affix = "SET UTF-8\nSFX A Y 1\nSFX A y ies [^aeiou]y\n";
        let dict = compile(affix, "2\nparty/A\nplay/A\n");
        let stemmer = Stemmer::new(&dict);
        assert_eq!(stemmer.stem("parties"), vec!["party"]);
        // "play" ends in vowel + y, so the condition rejects it
        assert!(stemmer.stem("plaies").is_empty());
    }

    #[test]
    fn test_circumfix_pairing() {
        let affix = "SET UTF-8\n\
                     CIRCUMFIX X\n\
                     PFX A Y 1\n\
                     PFX A 0 leg/X .\n\
                     SFX C Y 2\n\
                     SFX C 0 obb .\n\
                     SFX C 0 obb/AX .\n";
        let dict = compile(affix, "1\nnagy/C\n");
        let stemmer = Stemmer::new(&dict);
        // prefix and suffix both marked with the circumfix flag pair up
        assert_eq!(stemmer.stem("legnagyobb"), vec!["nagy"]);
        // the unmarked suffix rule still applies on its own
        assert_eq!(stemmer.stem("nagyobb"), vec!["nagy"]);
        // the circumfix prefix without its paired suffix yields nothing
        assert!(stemmer.stem("legnagy").is_empty());
    }

    #[test]
    fn test_complex_prefixes() {
        let affix = "SET UTF-8\n\
                     COMPLEXPREFIXES\n\
                     PFX A Y 1\n\
                     PFX A 0 pre .\n\
                     PFX B Y 1\n\
                     PFX B 0 mid/A .\n\
                     SFX C Y 1\n\
                     SFX C 0 s .\n";
        let dict = compile(affix, "1\nfold/BC\n");
        let stemmer = Stemmer::new(&dict);
        // two prefixes, chained through the inner continuation class
        assert_eq!(stemmer.stem("premidfold"), vec!["fold"]);
        // two prefixes plus a suffix
        assert_eq!(stemmer.stem("premidfolds"), vec!["fold"]);
        // the outer prefix cannot attach without the chaining inner one
        assert!(stemmer.stem("prefolds").is_empty());
    }

    #[test]
    fn test_full_strip() {
        let affix = "SET UTF-8\nFULLSTRIP\nSFX A Y 1\nSFX A foo bar .\n";
        let dict = compile(affix, "1\nfoo/A\n");
        let stemmer = Stemmer::new(&dict);
        // the whole word is the affix append; only FULLSTRIP allows that
        assert_eq!(stemmer.stem("bar"), vec!["foo"]);

        let affix = "SET UTF-8\nSFX A Y 1\nSFX A foo bar .\n";
        let dict = compile(affix, "1\nfoo/A\n");
        let stemmer = Stemmer::new(&dict);
        assert!(stemmer.stem("bar").is_empty());
    }

    #[test]
    fn test_case_variants() {
        let dict = compile("SET UTF-8\n", "2\nberlin\nHans\n");
        let stemmer = Stemmer::new(&dict);
        assert_eq!(stemmer.stem("berlin"), vec!["berlin"]);
        // title case falls back to the lowercase fold
        assert_eq!(stemmer.stem("Berlin"), vec!["berlin"]);
        // all caps tries exact, title and lower folds
        assert_eq!(stemmer.stem("BERLIN"), vec!["berlin"]);
        assert_eq!(stemmer.stem("HANS"), vec!["Hans"]);
        assert_eq!(stemmer.stem("Hans"), vec!["Hans"]);
        // mixed case matches exactly or not at all
        assert!(stemmer.stem("BeRlin").is_empty());
        assert!(stemmer.stem("hans").is_empty());
    }

    #[test]
    fn test_ignore_case() {
        let affix = "SET UTF-8\nSFX A Y 1\nSFX A 0 s .\n";
        let dict = compile_ignore_case(affix, "1\nParis/A\n");
        let stemmer = Stemmer::new(&dict);
        assert_eq!(stemmer.stem("PARIS"), vec!["paris"]);
        assert_eq!(stemmer.stem("parises"), Vec::<String>::new());
        assert_eq!(stemmer.stem("PARISs"), vec!["paris"]);
    }

    #[test]
    fn test_ignore_chars_on_query() {
        let affix = "SET UTF-8\nIGNORE '\nSFX A Y 1\nSFX A 0 s .\n";
        let dict = compile(affix, "1\ncan't/A\n");
        let stemmer = Stemmer::new(&dict);
        assert_eq!(stemmer.stem("can't"), vec!["cant"]);
        assert_eq!(stemmer.stem("can'ts"), vec!["cant"]);
    }

    #[test]
    fn test_output_conversion() {
        let affix = "SET UTF-8\nOCONV 1\nOCONV ss \u{df}\n";
        let dict = compile(affix, "1\nglass\n");
        let stemmer = Stemmer::new(&dict);
        assert_eq!(stemmer.stem("glass"), vec!["gla\u{df}"]);
    }

    #[test]
    fn test_unique_stems() {
        let affix = "SET UTF-8\nSFX A Y 1\nSFX A 0 s .\n";
        let dict = compile(affix, "2\ncat\ncat/A\n");
        let stemmer = Stemmer::new(&dict);
        // both dictionary entries report the direct match
        assert_eq!(stemmer.stem("cat"), vec!["cat", "cat"]);
        assert_eq!(stemmer.unique_stems("cat"), vec!["cat"]);
    }

    #[test]
    fn test_empty_and_unknown_input() {
        let dict = compile("SET UTF-8\n", "1\ncat\n");
        let stemmer = Stemmer::new(&dict);
        assert!(stemmer.stem("").is_empty());
        assert!(stemmer.stem("zzz").is_empty());
    }

    #[test]
    fn test_identical_input_compiles_identically() {
        let affix = "SET UTF-8\n\
                     PFX P Y 1\n\
                     PFX P 0 un .\n\
                     SFX A Y 1\n\
                     SFX A 0 ly .\n";
        let dic = "2\nhappy/PA\nrun\n";
        let first = compile(affix, dic);
        let second = compile(affix, dic);
        let a = Stemmer::new(&first);
        let b = Stemmer::new(&second);
        for word in ["unhappyly", "happy", "run", "runs", "unknown"] {
            assert_eq!(a.stem(word), b.stem(word), "diverged on {word}");
        }
    }
}
