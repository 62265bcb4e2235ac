//! Builds the Cobertura document from parsed profiles.
//!
//! Each profile (one source file) becomes one class. Lines come from merging
//! the file's blocks; a line spanned by several blocks takes the highest hit
//! count among them. Methods take the lines of the blocks overlapping their
//! declaration, so lines outside every declaration only count for the class.
use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use crate::error::{ConvertError, Result};
use crate::ignore::Ignore;
use crate::model::{Class, Coverage, Line, Method, Package};
use crate::profile::{Block, Profile};
use crate::resolve::GoPackage;
use crate::scan::{FuncDecl, Position, SourceScanner};

/// Class name used when a file has no single receiver type.
pub const NO_CLASS: &str = "-";

/// Reads source files so declarations can be recovered.
pub trait SourceReader {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads from the local file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl SourceReader for FsReader {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

pub struct DocumentBuilder<'a> {
    ignore: &'a Ignore,
    scanner: &'a dyn SourceScanner,
    reader: &'a dyn SourceReader,
    sources: Vec<String>,
    packages: Vec<(String, Vec<Class>)>,
}

impl<'a> DocumentBuilder<'a> {
    pub fn new(
        ignore: &'a Ignore,
        scanner: &'a dyn SourceScanner,
        reader: &'a dyn SourceReader,
    ) -> Self {
        Self {
            ignore,
            scanner,
            reader,
            sources: Vec::new(),
            packages: Vec::new(),
        }
    }

    /// Add one file's coverage. `package` is the resolver's answer for the
    /// file's import path; without module information the file cannot be
    /// placed and the whole conversion fails.
    pub fn add_profile(&mut self, profile: &Profile, package: Option<&GoPackage>) -> Result<()> {
        let (package, module) = match package {
            Some(pkg) => match &pkg.module {
                Some(module) => (pkg, module),
                None => return Err(ConvertError::PackageRequired),
            },
            None => return Err(ConvertError::PackageRequired),
        };

        let relative = relative_name(&profile.file_name, &module.path);
        if self.ignore.matches_path(relative) {
            log::debug!("ignoring {relative}: file name matches ignore pattern");
            return Ok(());
        }

        let path = package.source_path(module, &profile.file_name, relative);
        let data = self
            .reader
            .read(&path)
            .map_err(ConvertError::SourceRead)?;
        if self.ignore.matches_content(&data) {
            log::debug!("ignoring {relative}: generated file");
            return Ok(());
        }

        let decls = self.scanner.scan(&data)?;
        let blocks = clamp_to_source(&profile.blocks, line_count(&data));
        let class = build_class(relative, &blocks, &decls);

        let source = module.dir.display().to_string();
        if !self.sources.contains(&source) {
            self.sources.push(source);
        }
        self.push_class(package.import_path.trim_end_matches(['/', '\\']), class);
        Ok(())
    }

    fn push_class(&mut self, package_name: &str, class: Class) {
        match self.packages.iter_mut().find(|(name, _)| name == package_name) {
            Some((_, classes)) => classes.push(class),
            None => self.packages.push((package_name.to_string(), vec![class])),
        }
    }

    pub fn finish(self, timestamp: u64) -> Coverage {
        let packages = self
            .packages
            .into_iter()
            .map(|(name, classes)| Package::new(name, classes))
            .collect();
        Coverage::new(self.sources, packages, timestamp)
    }
}

/// Strip the module path so class file names are module-relative.
fn relative_name<'p>(file_name: &'p str, module_path: &str) -> &'p str {
    file_name
        .strip_prefix(module_path)
        .and_then(|rest| rest.strip_prefix(['/', '\\']))
        .unwrap_or(file_name)
}

fn line_count(data: &[u8]) -> u32 {
    let lines = data.iter().filter(|&&b| b == b'\n').count() + 1;
    u32::try_from(lines).unwrap_or(u32::MAX)
}

/// Drop blocks starting past the last line of the source and cut the rest
/// off there, so a line number can never name a line the file lacks.
fn clamp_to_source(blocks: &[Block], last_line: u32) -> Vec<Block> {
    blocks
        .iter()
        .filter(|b| b.start_line <= last_line)
        .map(|b| {
            if b.end_line > last_line {
                log::debug!(
                    "block {}.{},{}.{} runs past line {last_line}",
                    b.start_line,
                    b.start_col,
                    b.end_line,
                    b.end_col
                );
            }
            Block {
                end_line: b.end_line.min(last_line),
                ..*b
            }
        })
        .collect()
}

fn build_class(filename: &str, blocks: &[Block], decls: &[FuncDecl]) -> Class {
    let methods = decls
        .iter()
        .map(|decl| {
            let lines = merge_lines(blocks.iter().filter(|b| overlaps(b, decl)));
            Method::new(decl.name.clone(), lines)
        })
        .collect();

    Class::new(
        class_name(decls),
        filename.to_string(),
        methods,
        merge_lines(blocks),
    )
}

/// Expand blocks into per-line hit counts, keeping the maximum count for
/// lines spanned by more than one block. Output is ascending and unique.
fn merge_lines<'b>(blocks: impl IntoIterator<Item = &'b Block>) -> Vec<Line> {
    let mut hits: BTreeMap<u32, u64> = BTreeMap::new();
    for block in blocks {
        for number in block.start_line..=block.end_line {
            let entry = hits.entry(number).or_insert(0);
            *entry = (*entry).max(block.count);
        }
    }
    hits.into_iter()
        .map(|(number, hits)| Line { number, hits })
        .collect()
}

/// A block belongs to a declaration unless it ends at or before the
/// declaration's start, or starts at or after its end.
fn overlaps(block: &Block, decl: &FuncDecl) -> bool {
    let start = Position {
        line: block.start_line,
        col: block.start_col,
    };
    let end = Position {
        line: block.end_line,
        col: block.end_col,
    };
    start < decl.end && end > decl.start
}

/// The receiver type shared by every method in the file, or [`NO_CLASS`].
fn class_name(decls: &[FuncDecl]) -> String {
    let mut receivers = decls.iter().filter_map(|d| d.receiver.as_deref());
    match receivers.next() {
        Some(first) if receivers.all(|r| r == first) => first.to_string(),
        _ => NO_CLASS.to_string(),
    }
}
