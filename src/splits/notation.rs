//! Human-readable split notation
//!
//! Split trees are written as whitespace-separated tokens in prefix order:
//! `V 1680 H 525 N N N` splits an output into a left column cut in two
//! and a right half. Printing indents each nesting level by one space:
//!
//! ```text
//! V 1680
//!  H 525
//!   N
//!   N
//!  N
//! ```
//!
//! Whole records travel as shell-style variable blocks separated by blank
//! lines, which is what `dump-config` prints and `set-config` reads.

use std::fmt;
use std::str::FromStr;

use super::store::SplitConfiguration;
use super::tree::{SplitTree, MAX_SPLITS};
use super::NotationError;
use crate::topology::ids::MAX_SPLIT_INDEX;

impl fmt::Display for SplitTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (kind, cut, first, second) = match self {
            Self::Leaf => return f.write_str("N"),
            Self::Horizontal { cut, top, bottom } => ('H', cut, top, bottom),
            Self::Vertical { cut, left, right } => ('V', cut, left, right),
        };
        write!(f, "{} {}", kind, cut)?;
        for child in [first, second] {
            for line in child.to_string().lines() {
                write!(f, "\n {}", line)?;
            }
        }
        Ok(())
    }
}

impl FromStr for SplitTree {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = s.split_whitespace();
        let mut splits = 0;
        let tree = parse_node(&mut tokens, &mut splits)?;
        match tokens.next() {
            Some(extra) => Err(NotationError::TrailingToken(extra.to_string())),
            None => Ok(tree),
        }
    }
}

fn parse_node<'a>(
    tokens: &mut impl Iterator<Item = &'a str>,
    splits: &mut u32,
) -> Result<SplitTree, NotationError> {
    let kind = tokens.next().ok_or(NotationError::UnexpectedEnd)?;
    match kind {
        "N" => Ok(SplitTree::Leaf),
        "H" | "V" => {
            *splits += 1;
            if *splits > MAX_SPLITS {
                return Err(NotationError::TooManyOutputs {
                    max: MAX_SPLIT_INDEX,
                });
            }
            let cut = tokens.next().ok_or(NotationError::UnexpectedEnd)?;
            let cut: u32 = cut
                .parse()
                .map_err(|_| NotationError::InvalidCut(cut.to_string()))?;
            let first = parse_node(tokens, splits)?;
            let second = parse_node(tokens, splits)?;
            Ok(if kind == "H" {
                SplitTree::horizontal(cut, first, second)
            } else {
                SplitTree::vertical(cut, first, second)
            })
        }
        other => Err(NotationError::UnknownSplit(other.to_string())),
    }
}

/// One shell-style configuration block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBlock {
    /// `NAME`
    pub name: String,
    /// `EDID`
    pub edid: String,
    /// `WIDTH`
    pub width: u32,
    /// `HEIGHT`
    pub height: u32,
    /// `SPLITS`
    pub splits: SplitTree,
}

impl RecordBlock {
    /// Block describing an existing record
    pub fn from_configuration(record: &SplitConfiguration) -> Result<Self, NotationError> {
        Ok(Self {
            name: record.name.clone(),
            edid: record.edid.clone(),
            width: record.width,
            height: record.height,
            splits: record.tree()?,
        })
    }

    /// Record for this block
    pub fn to_configuration(&self) -> SplitConfiguration {
        SplitConfiguration::new(
            self.name.clone(),
            self.edid.clone(),
            self.width,
            self.height,
            &self.splits,
        )
    }
}

impl fmt::Display for RecordBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "NAME={}", quote(&self.name))?;
        writeln!(f, "EDID={}", self.edid)?;
        writeln!(f, "WIDTH={}", self.width)?;
        writeln!(f, "HEIGHT={}", self.height)?;
        writeln!(f, "SPLITS={}", quote(&self.splits.to_string()))
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Parse blank-line separated blocks of `KEY=value` assignments
///
/// Values may be quoted with `"` or `'` and span several lines.
pub fn parse_blocks(text: &str) -> Result<Vec<RecordBlock>, NotationError> {
    let mut blocks = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for word in shell_words(text)? {
        match word {
            Word::BlankLine => {
                if !current.is_empty() {
                    blocks.push(block_from_words(&current)?);
                    current.clear();
                }
            }
            Word::Text(w) => current.push(w),
        }
    }
    if !current.is_empty() {
        blocks.push(block_from_words(&current)?);
    }

    Ok(blocks)
}

fn block_from_words(words: &[String]) -> Result<RecordBlock, NotationError> {
    let mut name = None;
    let mut edid = None;
    let mut width = None;
    let mut height = None;
    let mut splits = None;

    for word in words {
        let (key, value) = word
            .split_once('=')
            .ok_or_else(|| NotationError::NotAnAssignment(word.clone()))?;
        match key {
            "NAME" => name = Some(value.to_string()),
            "EDID" => edid = Some(value.to_string()),
            "WIDTH" => width = Some(parse_dimension(key, value)?),
            "HEIGHT" => height = Some(parse_dimension(key, value)?),
            "SPLITS" => splits = Some(value.parse::<SplitTree>()?),
            _ => return Err(NotationError::UnknownKey(key.to_string())),
        }
    }

    Ok(RecordBlock {
        name: name.ok_or(NotationError::MissingKey("NAME"))?,
        edid: edid.ok_or(NotationError::MissingKey("EDID"))?,
        width: width.ok_or(NotationError::MissingKey("WIDTH"))?,
        height: height.ok_or(NotationError::MissingKey("HEIGHT"))?,
        splits: splits.ok_or(NotationError::MissingKey("SPLITS"))?,
    })
}

fn parse_dimension(key: &str, value: &str) -> Result<u32, NotationError> {
    // dump output of older tooling printed dimensions as floats
    let integral = value.strip_suffix(".0").unwrap_or(value);
    integral.parse().map_err(|_| NotationError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, PartialEq, Eq)]
enum Word {
    Text(String),
    BlankLine,
}

/// Minimal POSIX-shell word splitting: quotes, backslash escapes, and
/// blank lines reported as separators
fn shell_words(text: &str) -> Result<Vec<Word>, NotationError> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut newlines = 0;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\n' => {
                if in_word {
                    words.push(Word::Text(std::mem::take(&mut word)));
                    in_word = false;
                }
                newlines += 1;
                if newlines == 2 {
                    words.push(Word::BlankLine);
                }
                continue;
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(Word::Text(std::mem::take(&mut word)));
                    in_word = false;
                }
                continue;
            }
            '\'' => {
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(q) => word.push(q),
                        None => return Err(NotationError::UnterminatedQuote),
                    }
                }
            }
            '"' => loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(e @ ('"' | '\\' | '$' | '`')) => word.push(e),
                        Some('\n') => {}
                        Some(other) => {
                            word.push('\\');
                            word.push(other);
                        }
                        None => return Err(NotationError::UnterminatedQuote),
                    },
                    Some(q) => word.push(q),
                    None => return Err(NotationError::UnterminatedQuote),
                }
            },
            '\\' => match chars.next() {
                Some('\n') => {}
                Some(e) => word.push(e),
                None => word.push('\\'),
            },
            c => word.push(c),
        }
        in_word = true;
        newlines = 0;
    }

    if in_word {
        words.push(Word::Text(word));
    }
    Ok(words)
}
