/// Parser for Go's `-coverprofile` format.
///
/// Reference: https://go.dev/blog/cover
///
/// Format:
///   mode: set|count|atomic
///   <file>:<startLine>.<startCol>,<endLine>.<endCol> <numStatements> <count>
///
/// Each record describes a basic block with the number of statements in it and
/// how many times it was executed. Blocks are grouped per source file in the
/// order files first appear, and sorted by start position within a file.
use std::collections::HashMap;
use std::io::BufRead;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{ConvertError, Result};

static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+):([0-9]+)\.([0-9]+),([0-9]+)\.([0-9]+) ([0-9]+) ([0-9]+)$").unwrap()
});

const MODE_PREFIX: &str = "mode: ";

/// Instrumentation mode declared on the first line of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Set,
    Count,
    Atomic,
}

impl FromStr for Mode {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "set" => Ok(Mode::Set),
            "count" => Ok(Mode::Count),
            "atomic" => Ok(Mode::Atomic),
            _ => Err(()),
        }
    }
}

/// A parsed block from a single record of the coverage profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub num_stmt: u32,
    pub count: u64,
}

impl Block {
    fn same_range(&self, other: &Block) -> bool {
        (self.start_line, self.start_col, self.end_line, self.end_col)
            == (other.start_line, other.start_col, other.end_line, other.end_col)
    }
}

/// All blocks recorded for one source file.
#[derive(Debug, Clone)]
pub struct Profile {
    /// Import-path qualified file name, e.g. `example.com/mod/pkg/file.go`.
    pub file_name: String,
    pub mode: Mode,
    pub blocks: Vec<Block>,
}

impl Profile {
    /// The package import path owning this file: the file name's directory,
    /// without trailing separators.
    #[must_use]
    pub fn package_path(&self) -> &str {
        package_path(&self.file_name)
    }
}

pub(crate) fn package_path(file_name: &str) -> &str {
    let dir = match file_name.rfind(['/', '\\']) {
        Some(idx) => &file_name[..idx],
        None => "",
    };
    dir.trim_end_matches(['/', '\\'])
}

/// Parse a coverage profile from raw bytes.
pub fn parse(input: &[u8]) -> Result<Vec<Profile>> {
    parse_profiles(&mut &*input)
}

/// Parse a single record, returning (file_name, Block). Records whose range
/// ends before it starts are rejected.
fn parse_block_line(line: &str) -> Option<(&str, Block)> {
    let caps = BLOCK_RE.captures(line)?;
    let file = caps.get(1)?.as_str();
    let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());

    let block = Block {
        start_line: num(2)?,
        start_col: num(3)?,
        end_line: num(4)?,
        end_col: num(5)?,
        num_stmt: num(6)?,
        count: caps.get(7)?.as_str().parse().ok()?,
    };
    if (block.end_line, block.end_col) < (block.start_line, block.start_col) {
        return None;
    }
    Some((file, block))
}

/// Single linear scan over the profile. The first line must declare the mode;
/// every following non-blank line must be a block record.
pub fn parse_profiles(reader: &mut dyn BufRead) -> Result<Vec<Profile>> {
    let mut mode: Option<Mode> = None;

    // Blocks grouped by file path, preserving first-appearance order.
    let mut file_order: Vec<String> = Vec::new();
    let mut file_blocks: HashMap<String, Vec<Block>> = HashMap::new();

    let mut raw_line = String::new();
    loop {
        raw_line.clear();
        let n = reader
            .read_line(&mut raw_line)
            .map_err(ConvertError::Input)?;
        if n == 0 {
            break;
        }
        let line = raw_line.trim_end_matches(['\n', '\r']);

        if mode.is_none() {
            mode = Some(parse_mode_line(line)?);
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        let (file, block) =
            parse_block_line(line).ok_or_else(|| ConvertError::BadRecord(line.to_string()))?;
        if !file_blocks.contains_key(file) {
            file_order.push(file.to_string());
        }
        file_blocks.entry(file.to_string()).or_default().push(block);
    }

    let mode = mode.ok_or_else(|| ConvertError::BadModeLine(String::new()))?;

    let mut profiles = Vec::with_capacity(file_order.len());
    for file_name in file_order {
        if let Some(blocks) = file_blocks.remove(&file_name) {
            profiles.push(Profile {
                file_name,
                mode,
                blocks: merge_duplicates(mode, blocks)?,
            });
        }
    }

    Ok(profiles)
}

fn parse_mode_line(line: &str) -> Result<Mode> {
    line.strip_prefix(MODE_PREFIX)
        .and_then(|m| m.trim().parse().ok())
        .ok_or_else(|| ConvertError::BadModeLine(line.to_string()))
}

/// Sort blocks by start position and fold records that describe the same
/// range. Concatenated profiles repeat blocks for packages covered by several
/// test binaries.
fn merge_duplicates(mode: Mode, mut blocks: Vec<Block>) -> Result<Vec<Block>> {
    blocks.sort_by_key(|b| (b.start_line, b.start_col));

    let mut merged: Vec<Block> = Vec::with_capacity(blocks.len());
    for block in blocks {
        match merged.last_mut() {
            Some(last) if last.same_range(&block) => {
                if last.num_stmt != block.num_stmt {
                    return Err(ConvertError::InconsistentStatements {
                        previous: last.num_stmt,
                        current: block.num_stmt,
                    });
                }
                last.count = match mode {
                    Mode::Set => last.count.max(block.count).min(1),
                    Mode::Count | Mode::Atomic => last.count.saturating_add(block.count),
                };
            }
            _ => merged.push(block),
        }
    }
    Ok(merged)
}
