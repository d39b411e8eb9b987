//! # Label Post-Processor
//!
//! Two passes over the indexed assembly listing:
//!
//! 1. Record every `<index> - <label>:` definition in a [`LabelMap`].
//! 2. Strip the index from every line, drop label definitions (keeping any
//!    instruction text that follows them) and turn `#` comments into `//`.
//!
//! The output has exactly one line per input line, so the instruction a label
//! points at sits at the label's recorded index plus one.

use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

lazy_static! {
    static ref LABEL_LINE: Regex = Regex::new(r"^(\d+) - ([A-Za-z_][A-Za-z0-9_]*):\s*(.*)$").unwrap();
    static ref INDEXED_LINE: Regex = Regex::new(r"^(\d+) - (.*)$").unwrap();
}

/// Mnemonics whose last operand is a label
const JUMP_MNEMONICS: &[&str] = &["j", "jal", "beq", "bne"];

/// Ordered `(label, index)` pairs; redefinitions are appended
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelMap {
    entries: Vec<(String, usize)>,
}

impl LabelMap {
    fn record(&mut self, label: &str, index: usize) {
        self.entries.push((label.to_string(), index));
    }

    /// Index of the first definition of `label`
    pub fn get(&self, label: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(name, _)| name == label)
            .map(|&(_, index)| index)
    }

    /// Line a jump to `label` lands on
    pub fn target(&self, label: &str) -> Option<usize> {
        self.get(label).map(|index| index + 1)
    }

    /// True if `label` was defined
    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    /// All pairs in definition order
    pub fn entries(&self) -> &[(String, usize)] {
        &self.entries
    }

    /// Number of recorded definitions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no label was defined
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of post-processing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostProcessed {
    /// Labels found in pass 1
    pub label_map: LabelMap,
    /// Index-free lines from pass 2
    pub lines: Vec<String>,
}

impl PostProcessed {
    /// Jump-family operands with no recorded label, in order of appearance
    pub fn unresolved_references(&self) -> Vec<String> {
        self.lines
            .iter()
            .filter_map(|line| jump_target(line))
            .filter(|target| !self.label_map.contains(target))
            .map(str::to_string)
            .collect()
    }
}

impl fmt::Display for PostProcessed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Label target of a jump-family instruction
pub fn jump_target(text: &str) -> Option<&str> {
    let code = text.split(|c: char| c == '#' || c == '/').next()?.trim();
    let (mnemonic, operands) = code.split_once(char::is_whitespace)?;
    if !JUMP_MNEMONICS.contains(&mnemonic) {
        return None;
    }
    operands
        .rsplit(',')
        .next()
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Two-pass label resolver
#[derive(Debug, Default)]
pub struct PostProcessor;

impl PostProcessor {
    /// Create a post-processor
    pub fn new() -> Self {
        Self
    }

    /// Run both passes over an indexed assembly listing
    pub fn run(&self, listing: &str) -> PostProcessed {
        let label_map = self.collect_labels(listing);
        let lines = listing.lines().map(strip_line).collect::<Vec<_>>();
        tracing::debug!(labels = label_map.len(), lines = lines.len(), "post-processed assembly");
        PostProcessed { label_map, lines }
    }

    /// Pass 1
    pub fn collect_labels(&self, listing: &str) -> LabelMap {
        let mut map = LabelMap::default();
        for line in listing.lines() {
            if let Some(cap) = LABEL_LINE.captures(line) {
                let index = cap.get(1).and_then(|m| m.as_str().parse().ok());
                if let (Some(index), Some(label)) = (index, cap.get(2)) {
                    map.record(label.as_str(), index);
                }
            }
        }
        map
    }
}

/// Pass 2 for one line
fn strip_line(line: &str) -> String {
    let body = if let Some(cap) = LABEL_LINE.captures(line) {
        cap.get(3).map(|m| m.as_str()).unwrap_or_default()
    } else if let Some(cap) = INDEXED_LINE.captures(line) {
        cap.get(2).map(|m| m.as_str()).unwrap_or_default()
    } else {
        line
    };
    body.replacen('#', "//", 1)
}
