//! Dictionary compilation.
//!
//! [`Dictionary::compile`] turns an affix-rule stream plus one or more
//! dictionary streams into a set of compact immutable tables: interned flag
//! sets, strip strings and condition patterns, packed affix records with
//! per-direction append-text indexes, and a word index mapping every surface
//! form to its flag sets. Compilation is atomic; any error aborts the whole
//! pass and leaves nothing behind. The compiled [`Dictionary`] is never
//! mutated afterward and may be shared freely across threads.

pub mod affix;
pub mod condition;
pub mod conversion;
pub mod flags;
pub mod words;

use std::io::BufRead;

use crate::error::{Result, StemmaError};

pub use affix::{AffixIndex, AffixRecord, AffixStore, StripTable};
pub use condition::{ConditionTable, MATCH_ANY};
pub use conversion::ConversionTable;
pub use flags::{Flag, FlagNotation, FlagSetTable};
pub use words::WordIndex;

const ALIAS_KEY: &str = "AF";
const PREFIX_KEY: &str = "PFX";
const SUFFIX_KEY: &str = "SFX";
const FLAG_KEY: &str = "FLAG";
const COMPLEX_PREFIXES_KEY: &str = "COMPLEXPREFIXES";
const CIRCUMFIX_KEY: &str = "CIRCUMFIX";
const IGNORE_KEY: &str = "IGNORE";
const ICONV_KEY: &str = "ICONV";
const OCONV_KEY: &str = "OCONV";
const FULL_STRIP_KEY: &str = "FULLSTRIP";
const LANGUAGE_KEY: &str = "LANG";

/// A compiled, immutable morphological dictionary.
///
/// Built once by [`Dictionary::compile`]; all queries go through a
/// [`Stemmer`](crate::stemmer::Stemmer) borrowing it.
#[derive(Debug)]
pub struct Dictionary {
    pub(crate) flag_sets: FlagSetTable,
    pub(crate) strips: StripTable,
    pub(crate) conditions: ConditionTable,
    pub(crate) affixes: AffixStore,
    pub(crate) prefixes: AffixIndex,
    pub(crate) suffixes: AffixIndex,
    pub(crate) words: WordIndex,
    encoding: String,
    pub(crate) complex_prefixes: bool,
    /// Whether any affix rule carries continuation flags; gates the second
    /// stripping pass.
    pub(crate) two_stage_affix: bool,
    pub(crate) circumfix: Option<Flag>,
    pub(crate) full_strip: bool,
    pub(crate) language: Option<String>,
    pub(crate) alternate_casing: bool,
    /// Sorted characters stripped from all input before lookup.
    pub(crate) ignore: Vec<char>,
    pub(crate) iconv: ConversionTable,
    pub(crate) oconv: ConversionTable,
    pub(crate) ignore_case: bool,
    pub(crate) needs_input_cleaning: bool,
    pub(crate) needs_output_cleaning: bool,
}

impl Dictionary {
    /// Compile an affix stream and dictionary streams into a [`Dictionary`].
    ///
    /// The streams must already be decoded text; the declared encoding name
    /// is only recorded (see [`Dictionary::encoding`]). With `ignore_case`
    /// all words and queries are case folded during cleaning and no case
    /// variants are tried at query time.
    pub fn compile<A: BufRead, D: BufRead>(
        mut affix: A,
        dictionaries: Vec<D>,
        ignore_case: bool,
    ) -> Result<Dictionary> {
        let mut affix_text = String::new();
        affix.read_to_string(&mut affix_text)?;
        let encoding = read_encoding_name(&affix_text)?;

        let mut compiler = Compiler::new(ignore_case);
        compiler.parse_affix_file(&affix_text)?;
        let words = compiler.read_dictionary_files(dictionaries)?;
        Ok(compiler.finish(encoding, words))
    }

    /// The encoding name declared by the affix file's `SET` line.
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Number of distinct surface forms in the word index.
    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// The language declared by a `LANG` directive, if any.
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub(crate) fn case_fold(&self, c: char) -> char {
        case_fold(c, self.alternate_casing)
    }

    pub(crate) fn clean_input(&self, input: &str) -> String {
        clean_input(
            input,
            &self.ignore,
            self.ignore_case,
            &self.iconv,
            self.alternate_casing,
        )
    }
}

/// Mutable compilation context, frozen into a [`Dictionary`] at the end.
///
/// Holds every intern table and directive-driven setting; parse functions
/// take it by reference so no global state is involved.
pub(crate) struct Compiler {
    pub(crate) notation: FlagNotation,
    pub(crate) aliases: Vec<String>,
    aliases_expected: Option<usize>,
    pub(crate) flag_sets: FlagSetTable,
    strips: StripTable,
    conditions: ConditionTable,
    affixes: AffixStore,
    prefixes: AffixIndex,
    suffixes: AffixIndex,
    complex_prefixes: bool,
    two_stage_affix: bool,
    circumfix: Option<Flag>,
    full_strip: bool,
    language: Option<String>,
    alternate_casing: bool,
    ignore: Vec<char>,
    iconv: ConversionTable,
    oconv: ConversionTable,
    ignore_case: bool,
    pub(crate) needs_input_cleaning: bool,
    needs_output_cleaning: bool,
}

impl Compiler {
    fn new(ignore_case: bool) -> Self {
        Compiler {
            notation: FlagNotation::default(),
            aliases: Vec::new(),
            aliases_expected: None,
            flag_sets: FlagSetTable::new(),
            strips: StripTable::new(),
            conditions: ConditionTable::new(),
            affixes: AffixStore::new(),
            prefixes: AffixIndex::new(),
            suffixes: AffixIndex::new(),
            complex_prefixes: false,
            two_stage_affix: false,
            circumfix: None,
            full_strip: false,
            language: None,
            alternate_casing: false,
            ignore: Vec::new(),
            iconv: ConversionTable::new(),
            oconv: ConversionTable::new(),
            ignore_case,
            needs_input_cleaning: ignore_case,
            needs_output_cleaning: false,
        }
    }

    fn parse_affix_file(&mut self, text: &str) -> Result<()> {
        let mut lines = text.lines();
        let mut line_number = 0usize;
        while let Some(line) = lines.next() {
            line_number += 1;
            let line = line.trim_start_matches('\u{feff}');
            if line.starts_with(ALIAS_KEY) {
                self.parse_alias(line, line_number)?;
            } else if line.starts_with(PREFIX_KEY) {
                self.parse_affix_block(line, false, &mut lines, &mut line_number)?;
            } else if line.starts_with(SUFFIX_KEY) {
                self.parse_affix_block(line, true, &mut lines, &mut line_number)?;
            } else if line.starts_with(FLAG_KEY) {
                let arg = second_field(line, line_number, "Illegal FLAG declaration")?;
                self.notation = FlagNotation::from_directive(arg)?;
            } else if line.starts_with(COMPLEX_PREFIXES_KEY) {
                self.complex_prefixes = true;
            } else if line.starts_with(CIRCUMFIX_KEY) {
                let arg = second_field(line, line_number, "Illegal CIRCUMFIX declaration")?;
                self.circumfix = Some(self.notation.parse_flag(arg)?);
            } else if line.starts_with(IGNORE_KEY) {
                let arg = second_field(line, line_number, "Illegal IGNORE declaration")?;
                self.ignore = arg.chars().collect();
                self.ignore.sort_unstable();
                self.needs_input_cleaning = true;
            } else if line.starts_with(ICONV_KEY) || line.starts_with(OCONV_KEY) {
                let input = line.starts_with(ICONV_KEY);
                let arg = second_field(line, line_number, "Illegal conversion declaration")?;
                let count = arg.parse::<usize>().map_err(|_| {
                    StemmaError::parse(line_number, format!("Illegal conversion count: {arg}"))
                })?;
                let table = self.parse_conversions(&mut lines, &mut line_number, count)?;
                if input {
                    self.iconv = table;
                    self.needs_input_cleaning = true;
                } else {
                    self.oconv = table;
                    self.needs_output_cleaning = true;
                }
            } else if line.starts_with(FULL_STRIP_KEY) {
                self.full_strip = true;
            } else if line.starts_with(LANGUAGE_KEY) {
                // everything after the key is the language tag
                let arg = line[LANGUAGE_KEY.len()..].trim();
                self.alternate_casing = arg == "tr_TR" || arg == "az_AZ";
                self.language = Some(arg.to_string());
            }
        }
        Ok(())
    }

    /// Parse one `PFX`/`SFX` block: a header naming the flag, cross-product
    /// marker and rule count, then that many rule lines.
    fn parse_affix_block<'a, I: Iterator<Item = &'a str>>(
        &mut self,
        header: &str,
        is_suffix: bool,
        lines: &mut I,
        line_number: &mut usize,
    ) -> Result<()> {
        let args: Vec<&str> = header.split_whitespace().collect();
        if args.len() < 4 {
            return Err(StemmaError::parse(
                *line_number,
                format!("affix block header with fewer than four elements: {header}"),
            ));
        }
        let cross_product = args[2] == "Y";
        let rule_count = args[3].parse::<usize>().map_err(|_| {
            StemmaError::parse(*line_number, format!("invalid rule count: {}", args[3]))
        })?;

        for _ in 0..rule_count {
            let line = lines.next().ok_or_else(|| {
                StemmaError::parse(*line_number, "unexpected end of affix file")
            })?;
            *line_number += 1;
            let rule_args: Vec<&str> = line.split_whitespace().collect();
            if rule_args.len() < 4 {
                return Err(StemmaError::parse(
                    *line_number,
                    format!("affix rule with fewer than four elements: {line}"),
                ));
            }

            let flag = self.notation.parse_flag(rule_args[1])?;
            let strip = if rule_args[2] == "0" { "" } else { rule_args[2] };

            let mut affix_arg = rule_args[3];
            let mut append_flags = Vec::new();
            if let Some(sep) = affix_arg.rfind('/') {
                let mut flag_part = affix_arg[sep + 1..].to_string();
                affix_arg = &affix_arg[..sep];
                if !self.aliases.is_empty() {
                    let alias = flag_part.parse::<usize>().map_err(|_| {
                        StemmaError::invalid_argument(format!(
                            "invalid flag alias reference: {flag_part}"
                        ))
                    })?;
                    flag_part = self.alias_value(alias)?.to_string();
                }
                append_flags = self.notation.parse_flags(&flag_part)?;
                // continuation flags anywhere enable the second stripping pass
                self.two_stage_affix = true;
            }
            // zero affix means an empty append
            if affix_arg == "0" {
                affix_arg = "";
            }

            let mut condition = rule_args.get(4).copied().unwrap_or(".").to_string();
            // at least the gascon affix file has an unclosed bracket
            if condition.starts_with('[') && !condition.contains(']') {
                condition.push(']');
            }
            // a dash has no special meaning here, so it must be escaped
            if condition.contains('-') {
                condition = escape_dash(&condition);
            }

            let pattern = if condition == "." || condition == strip {
                // the stripped text trivially satisfies its own condition
                MATCH_ANY.to_string()
            } else if is_suffix {
                format!(".*{condition}")
            } else {
                format!("{condition}.*")
            };

            let pattern_ord = self.conditions.intern(&pattern)?;
            let strip_ord = self.strips.intern(strip)?;
            let append_flags_ord = self.flag_sets.intern(append_flags);
            if append_flags_ord > i16::MAX as u32 {
                return Err(StemmaError::CapacityExceeded("append flag sets"));
            }

            let ord = self.affixes.push(
                flag,
                strip_ord,
                pattern_ord,
                cross_product,
                append_flags_ord as u16,
            );

            let append = if self.needs_input_cleaning {
                self.clean_input(affix_arg)
            } else {
                affix_arg.to_string()
            };
            if is_suffix {
                self.suffixes.add(&append, ord);
            } else {
                self.prefixes.add(&append, ord);
            }
        }
        Ok(())
    }

    /// `AF` lines: the first declares the alias count, the rest append one
    /// alias value each, referenced later by 1-based index.
    fn parse_alias(&mut self, line: &str, line_number: usize) -> Result<()> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match self.aliases_expected {
            None => {
                let count = parts
                    .get(1)
                    .and_then(|p| p.parse::<usize>().ok())
                    .ok_or_else(|| {
                        StemmaError::parse(line_number, format!("Illegal AF declaration: {line}"))
                    })?;
                self.aliases_expected = Some(count);
                self.aliases.reserve(count);
            }
            Some(_) => {
                let value = parts.get(1).copied().unwrap_or("");
                self.aliases.push(value.to_string());
            }
        }
        Ok(())
    }

    pub(crate) fn alias_value(&self, id: usize) -> Result<&str> {
        id.checked_sub(1)
            .and_then(|i| self.aliases.get(i))
            .map(String::as_str)
            .ok_or(StemmaError::AliasResolution(id))
    }

    fn parse_conversions<'a, I: Iterator<Item = &'a str>>(
        &mut self,
        lines: &mut I,
        line_number: &mut usize,
        count: usize,
    ) -> Result<ConversionTable> {
        let mut table = ConversionTable::new();
        for _ in 0..count {
            let line = lines.next().ok_or_else(|| {
                StemmaError::parse(*line_number, "unexpected end of affix file")
            })?;
            *line_number += 1;
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() != 3 {
                return Err(StemmaError::parse(
                    *line_number,
                    format!("invalid syntax: {line}"),
                ));
            }
            if !table.insert(parts[1].to_string(), parts[2].to_string()) {
                return Err(StemmaError::parse(
                    *line_number,
                    format!("duplicate mapping specified for: {}", parts[1]),
                ));
            }
        }
        Ok(table)
    }

    pub(crate) fn clean_input(&self, input: &str) -> String {
        clean_input(
            input,
            &self.ignore,
            self.ignore_case,
            &self.iconv,
            self.alternate_casing,
        )
    }

    fn finish(self, encoding: String, words: WordIndex) -> Dictionary {
        Dictionary {
            flag_sets: self.flag_sets,
            strips: self.strips,
            conditions: self.conditions,
            affixes: self.affixes,
            prefixes: self.prefixes,
            suffixes: self.suffixes,
            words,
            encoding,
            complex_prefixes: self.complex_prefixes,
            two_stage_affix: self.two_stage_affix,
            circumfix: self.circumfix,
            full_strip: self.full_strip,
            language: self.language,
            alternate_casing: self.alternate_casing,
            ignore: self.ignore,
            iconv: self.iconv,
            oconv: self.oconv,
            ignore_case: self.ignore_case,
            needs_input_cleaning: self.needs_input_cleaning,
            needs_output_cleaning: self.needs_output_cleaning,
        }
    }
}

/// A directive's single argument; any other field count is malformed.
fn second_field<'a>(line: &'a str, line_number: usize, message: &str) -> Result<&'a str> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 2 {
        return Err(StemmaError::parse(line_number, message));
    }
    Ok(parts[1])
}

/// Find the encoding name on the first `SET` line of the affix file.
///
/// Blank lines and `#` comments are skipped, a BOM before `SET` is
/// tolerated, and other directives may precede the `SET` line. Running out
/// of input without seeing one is a parse error.
fn read_encoding_name(text: &str) -> Result<String> {
    for line in text.lines() {
        let line = line.trim_start_matches('\u{feff}');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("SET") {
            if rest.starts_with(char::is_whitespace) {
                return Ok(rest.trim().to_string());
            }
        }
    }
    Err(StemmaError::parse(0, "unexpected end of affix file"))
}

/// Escape every unescaped `-` so it reads as a literal in a pattern.
fn escape_dash(pattern: &str) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut escaped = String::with_capacity(pattern.len() + 1);
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '-' {
            escaped.push_str("\\-");
        } else {
            escaped.push(c);
            if c == '\\' && i + 1 < chars.len() {
                escaped.push(chars[i + 1]);
                i += 1;
            }
        }
        i += 1;
    }
    escaped
}

/// Lowercase one codepoint, honoring the Turkic dotted/dotless i rule when
/// the alternate casing is active.
pub(crate) fn case_fold(c: char, alternate_casing: bool) -> char {
    if alternate_casing {
        if c == 'I' {
            return 'ı';
        }
        if c == 'İ' {
            return 'i';
        }
    }
    c.to_lowercase().next().unwrap_or(c)
}

/// The shared input-cleaning pipeline: drop ignored characters, case fold
/// when requested, then run the `ICONV` table (folding again afterwards so
/// conversion outputs also end up lowercased).
pub(crate) fn clean_input(
    input: &str,
    ignore: &[char],
    ignore_case: bool,
    iconv: &ConversionTable,
    alternate_casing: bool,
) -> String {
    let mut cleaned = String::with_capacity(input.len());
    for ch in input.chars() {
        if ignore.binary_search(&ch).is_ok() {
            continue;
        }
        if ignore_case && iconv.is_empty() {
            cleaned.push(case_fold(ch, alternate_casing));
        } else {
            cleaned.push(ch);
        }
    }
    if !iconv.is_empty() {
        cleaned = iconv.apply(&cleaned);
        if ignore_case {
            cleaned = cleaned
                .chars()
                .map(|c| case_fold(c, alternate_casing))
                .collect();
        }
    }
    cleaned
}
