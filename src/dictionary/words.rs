//! Word-index construction from dictionary streams.
//!
//! Dictionary lines are normalized into a scratch stream (`/` becomes the
//! flag separator, backslash escapes are resolved, a morph separator marks
//! where morphological comments begin), externally sorted on the word
//! portion, then merged: adjacent lines sharing a surface form have their
//! flags decoded, interned, and accumulated into one [`WordIndex`] entry.
//! The merge requires non-decreasing word order from the sorted stream; a
//! regression means the stream is corrupt and is a fatal error.

use std::cmp::Ordering;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};

use ahash::AHashMap;

use crate::dictionary::Compiler;
use crate::error::{Result, StemmaError};
use crate::util::sort::LineSorter;

/// An unescaped `/` becomes this separator between a word and its flags.
pub(crate) const FLAG_SEPARATOR: char = '\u{1f}';
/// Marks the boundary of the word/flag part; morphological comments follow.
pub(crate) const MORPH_SEPARATOR: char = '\u{1e}';

/// Surface word → interned flag-set ordinals.
///
/// Duplicate surface forms merge their ordinal lists.
#[derive(Debug, Default)]
pub struct WordIndex {
    map: AHashMap<String, Vec<u32>>,
}

impl WordIndex {
    pub(crate) fn new() -> Self {
        WordIndex::default()
    }

    fn insert(&mut self, word: String, ords: Vec<u32>) {
        self.map.entry(word).or_default().extend(ords);
    }

    /// All flag-set ordinals registered for `word`.
    pub fn get(&self, word: &str) -> Option<&[u32]> {
        self.map.get(word).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Resolve backslash escapes and mark the flag/morph boundaries.
///
/// `/` in the word part becomes [`FLAG_SEPARATOR`]; a [`MORPH_SEPARATOR`]
/// is appended at the morphological boundary. Stray separator codepoints in
/// the input are dropped (they occur in corrupt real-world dictionaries).
fn unescape_entry(entry: &str) -> String {
    let chars: Vec<char> = entry.chars().collect();
    let end = morph_boundary(&chars);
    let mut out = String::with_capacity(entry.len() + 1);
    let mut i = 0;
    while i < end {
        let ch = chars[i];
        if ch == '\\' && i + 1 < chars.len() {
            out.push(chars[i + 1]);
            i += 1;
        } else if ch == '/' {
            out.push(FLAG_SEPARATOR);
        } else if ch == MORPH_SEPARATOR || ch == FLAG_SEPARATOR {
            // dropped
        } else {
            out.push(ch);
        }
        i += 1;
    }
    out.push(MORPH_SEPARATOR);
    for &c in &chars[end..] {
        if c != FLAG_SEPARATOR && c != MORPH_SEPARATOR {
            out.push(c);
        }
    }
    out
}

/// Index of the first space/tab that starts a morphological comment.
///
/// Words may themselves contain spaces, so the boundary is the first
/// whitespace followed by a two-letter tag and a colon (`po:`, `st:`, ...)
/// or by a tab.
fn morph_boundary(line: &[char]) -> usize {
    let mut end = match index_of_space_or_tab(line, 0) {
        None => return line.len(),
        Some(e) => e,
    };
    loop {
        if line[end] == '\t'
            || (end + 3 < line.len()
                && line[end + 1].is_alphabetic()
                && line[end + 2].is_alphabetic()
                && line[end + 3] == ':')
        {
            return end;
        }
        end = match index_of_space_or_tab(line, end + 1) {
            None => return line.len(),
            Some(e) => e,
        };
    }
}

fn index_of_space_or_tab(line: &[char], start: usize) -> Option<usize> {
    line[start..]
        .iter()
        .position(|&c| c == ' ' || c == '\t')
        .map(|p| p + start)
}

fn word_portion(line: &[u8]) -> &[u8] {
    let sep = line
        .iter()
        .position(|&b| b == FLAG_SEPARATOR as u8 || b == MORPH_SEPARATOR as u8);
    match sep {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Order scratch lines by their word portion, tie-breaking on the full raw
/// line so identical surface forms stay grouped deterministically.
pub(crate) fn compare_entries(a: &[u8], b: &[u8]) -> Ordering {
    word_portion(a)
        .cmp(word_portion(b))
        .then_with(|| a.cmp(b))
}

impl Compiler {
    /// Read the dictionary streams into a sorted scratch stream and merge
    /// the result into a [`WordIndex`].
    pub(crate) fn read_dictionary_files<D: BufRead>(
        &mut self,
        dictionaries: Vec<D>,
    ) -> Result<WordIndex> {
        let mut scratch = BufWriter::new(tempfile::tempfile()?);
        for dictionary in dictionaries {
            let mut lines = dictionary.lines();
            // the first line is an entry-count hint, and an unreliable one
            lines.next().transpose()?;
            for line in lines {
                let line = line?;
                if line.is_empty()
                    || line.starts_with('/')
                    || line.starts_with('#')
                    || line.starts_with('\t')
                {
                    continue;
                }
                let mut entry = unescape_entry(&line);
                if self.needs_input_cleaning {
                    // clean the word portion only; flags and comments pass through
                    let sep = entry
                        .find(FLAG_SEPARATOR)
                        .or_else(|| entry.find(MORPH_SEPARATOR));
                    if let Some(sep) = sep {
                        let cleaned = self.clean_input(&entry[..sep]);
                        entry = cleaned + &entry[sep..];
                    }
                }
                scratch.write_all(entry.as_bytes())?;
                scratch.write_all(b"\n")?;
            }
        }
        let mut scratch = scratch.into_inner().map_err(|e| e.into_error())?;
        scratch.seek(SeekFrom::Start(0))?;

        let mut sorted = BufWriter::new(tempfile::tempfile()?);
        LineSorter::new(compare_entries).sort(BufReader::new(scratch), &mut sorted)?;
        let mut sorted = sorted.into_inner().map_err(|e| e.into_error())?;
        sorted.seek(SeekFrom::Start(0))?;

        self.merge_sorted_entries(BufReader::new(sorted))
    }

    fn merge_sorted_entries<R: BufRead>(&mut self, reader: R) -> Result<WordIndex> {
        let mut index = WordIndex::new();
        let mut current_entry: Option<String> = None;
        let mut current_ords: Vec<u32> = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let end = line.find(MORPH_SEPARATOR).unwrap_or(line.len());
            let (entry, flags) = match line.find(FLAG_SEPARATOR) {
                None => (&line[..end], Vec::new()),
                Some(sep) => {
                    let mut flag_part = line[sep + 1..end].to_string();
                    if !self.aliases.is_empty() {
                        let alias = flag_part.trim().parse::<usize>().map_err(|_| {
                            StemmaError::invalid_argument(format!(
                                "invalid flag alias reference: {flag_part}"
                            ))
                        })?;
                        flag_part = self.alias_value(alias)?.to_string();
                    }
                    (&line[..sep], self.notation.parse_flags(&flag_part)?)
                }
            };

            let ord = self.flag_sets.intern(flags);
            match &mut current_entry {
                Some(previous) => match entry.cmp(previous.as_str()) {
                    Ordering::Less => {
                        return Err(StemmaError::OrderingViolation {
                            entry: entry.to_string(),
                            previous: previous.clone(),
                        });
                    }
                    Ordering::Greater => {
                        let word = std::mem::replace(previous, entry.to_string());
                        index.insert(word, std::mem::take(&mut current_ords));
                    }
                    Ordering::Equal => {}
                },
                None => current_entry = Some(entry.to_string()),
            }
            current_ords.push(ord);
        }

        if let Some(word) = current_entry {
            index.insert(word, current_ords);
        }
        Ok(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_unescape_entry_flag_separator() {
        assert_eq!(unescape_entry("drink/RQ"), format!("drink{FLAG_SEPARATOR}RQ{MORPH_SEPARATOR}"));
        assert_eq!(unescape_entry("cat"), format!("cat{MORPH_SEPARATOR}"));
    }

    #[test]
    fn test_unescape_entry_backslash_escape() {
        // an escaped slash is part of the word, not a flag separator
        assert_eq!(unescape_entry("a\\/b"), format!("a/b{MORPH_SEPARATOR}"));
    }

    #[test]
    fn test_unescape_entry_morph_comment() {
        let entry = unescape_entry("drink/Q po:verb");
        assert_eq!(
            entry,
            format!("drink{FLAG_SEPARATOR}Q{MORPH_SEPARATOR} po:verb")
        );
    }

    #[test]
    fn test_morph_boundary_word_with_space() {
        // a space not followed by a tag:colon pattern belongs to the word
        let chars: Vec<char> = "a priori".chars().collect();
        assert_eq!(morph_boundary(&chars), chars.len());

        let chars: Vec<char> = "a priori po:adv".chars().collect();
        assert_eq!(morph_boundary(&chars), "a priori".len());
    }

    #[test]
    fn test_merge_rejects_out_of_order_input() {
        let mut compiler = Compiler::new(false);
        let stream = format!("banana{MORPH_SEPARATOR}\napple{MORPH_SEPARATOR}\n");
        match compiler.merge_sorted_entries(Cursor::new(stream.as_bytes())) {
            Err(StemmaError::OrderingViolation { entry, previous }) => {
                assert_eq!(entry, "apple");
                assert_eq!(previous, "banana");
            }
            other => panic!("expected ordering violation, got {other:?}"),
        }
    }

    #[test]
    fn test_compare_entries_groups_words() {
        let a = unescape_entry("run/A");
        let b = unescape_entry("run/B");
        let c = unescape_entry("runner");
        assert_eq!(compare_entries(a.as_bytes(), a.as_bytes()), Ordering::Equal);
        assert_eq!(compare_entries(a.as_bytes(), b.as_bytes()), Ordering::Less);
        // "run" sorts before "runner" even though '/' > 'n' would say otherwise
        assert_eq!(compare_entries(b.as_bytes(), c.as_bytes()), Ordering::Less);
    }
}
