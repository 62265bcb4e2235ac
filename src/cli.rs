//! Glue between the command line and the converter: opening the input and
//! output, and building the ignore policy from flags.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};

use crate::{Converter, Ignore};

/// Build the ignore policy from the `--ignore-*` and `--gen-marker` flags.
pub fn build_ignore(
    dirs: Option<&str>,
    files: Option<&str>,
    generated_files: bool,
    generated_marker: Option<&str>,
) -> Result<Ignore> {
    let mut ignore = Ignore::new().generated_files(generated_files);
    if let Some(pattern) = dirs {
        ignore = ignore
            .dirs(pattern)
            .with_context(|| format!("Bad --ignore-dirs pattern '{pattern}'"))?;
    }
    if let Some(pattern) = files {
        ignore = ignore
            .files(pattern)
            .with_context(|| format!("Bad --ignore-files pattern '{pattern}'"))?;
    }
    if let Some(pattern) = generated_marker {
        ignore = ignore
            .generated_marker(pattern)
            .with_context(|| format!("Bad --gen-marker pattern '{pattern}'"))?;
    }
    Ok(ignore)
}

/// Current time in milliseconds since the Unix epoch, for the report timestamp.
#[must_use]
pub fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Convert the profile at `input` (stdin when absent or `-`) into `output`
/// (stdout when absent). A partially written output file is removed on error.
pub fn cmd_convert(converter: &Converter, input: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let reader: Box<dyn BufRead> = match input {
        Some(path) if path != Path::new("-") => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        )),
        _ => Box::new(io::stdin().lock()),
    };

    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            if let Err(e) = converter.convert(reader, BufWriter::new(file)) {
                if let Err(rm) = fs::remove_file(path) {
                    log::warn!("could not remove partial output {}: {rm}", path.display());
                }
                return Err(e.into());
            }
        }
        None => converter.convert(reader, BufWriter::new(io::stdout().lock()))?,
    }
    Ok(())
}
