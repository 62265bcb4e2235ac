//! Policy deciding which source files are dropped from the report.
//!
//! Name-based checks run against the module-relative file name before the
//! source is read; the generated-file check inspects the file content.
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;

/// Go's convention for machine-generated sources (see `go help generate`).
pub const DEFAULT_GENERATED_MARKER: &str = r"^// Code generated .* DO NOT EDIT\.$";

static GENERATED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_GENERATED_MARKER).unwrap());

/// An `Ignore` with no configuration ignores nothing. It only holds read-only
/// configuration, so one value can be shared across conversions.
#[derive(Debug, Clone, Default)]
pub struct Ignore {
    /// Matched against the directory part of the module-relative file name.
    pub dirs: Option<Regex>,
    /// Matched against the module-relative file name.
    pub files: Option<Regex>,
    /// Drop files carrying a generated-code marker line.
    pub generated_files: bool,
    /// Overrides [`DEFAULT_GENERATED_MARKER`].
    pub generated_marker: Option<Regex>,
}

impl Ignore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(mut self, pattern: &str) -> Result<Self> {
        self.files = Some(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn dirs(mut self, pattern: &str) -> Result<Self> {
        self.dirs = Some(Regex::new(pattern)?);
        Ok(self)
    }

    pub fn generated_files(mut self, enabled: bool) -> Self {
        self.generated_files = enabled;
        self
    }

    pub fn generated_marker(mut self, pattern: &str) -> Result<Self> {
        self.generated_marker = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Decide from the file name alone.
    #[must_use]
    pub fn matches_path(&self, file_name: &str) -> bool {
        if self.files.as_ref().is_some_and(|re| re.is_match(file_name)) {
            return true;
        }
        self.dirs
            .as_ref()
            .is_some_and(|re| re.is_match(crate::profile::package_path(file_name)))
    }

    /// Decide from the file content. Only consulted when `generated_files` is set.
    #[must_use]
    pub fn matches_content(&self, data: &[u8]) -> bool {
        if !self.generated_files {
            return false;
        }
        let marker = self.generated_marker.as_ref().unwrap_or(&*GENERATED_RE);
        String::from_utf8_lossy(data)
            .lines()
            .any(|line| marker.is_match(line.trim_end_matches('\r')))
    }
}
