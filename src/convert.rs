use std::collections::HashMap;
use std::io::{BufRead, Write};

use crate::aggregate::{DocumentBuilder, FsReader, SourceReader};
use crate::emit;
use crate::error::Result;
use crate::ignore::Ignore;
use crate::model::Coverage;
use crate::profile::{self, Profile};
use crate::resolve::{GoPackage, PackageResolver};
use crate::scan::{GoScanner, SourceScanner};

/// Turns a Go coverage profile into a Cobertura document.
///
/// A converter only holds read-only collaborators and configuration; every
/// call to [`Converter::convert`] is an independent pass over its own input
/// and output.
pub struct Converter {
    resolver: Box<dyn PackageResolver + Send + Sync>,
    scanner: Box<dyn SourceScanner + Send + Sync>,
    reader: Box<dyn SourceReader + Send + Sync>,
    ignore: Ignore,
    timestamp: u64,
}

impl Converter {
    /// A converter reading sources from disk and scanning them as Go, with an
    /// empty ignore policy and a zero timestamp.
    pub fn new(resolver: impl PackageResolver + Send + Sync + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            scanner: Box::new(GoScanner),
            reader: Box::new(FsReader),
            ignore: Ignore::default(),
            timestamp: 0,
        }
    }

    pub fn with_ignore(mut self, ignore: Ignore) -> Self {
        self.ignore = ignore;
        self
    }

    /// Milliseconds since the Unix epoch, written to the document root.
    pub fn with_timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_scanner(mut self, scanner: impl SourceScanner + Send + Sync + 'static) -> Self {
        self.scanner = Box::new(scanner);
        self
    }

    pub fn with_reader(mut self, reader: impl SourceReader + Send + Sync + 'static) -> Self {
        self.reader = Box::new(reader);
        self
    }

    /// Parse, resolve and aggregate without serializing.
    pub fn build(&self, input: &mut dyn BufRead) -> Result<Coverage> {
        let profiles = profile::parse_profiles(input)?;
        let packages = self.load_packages(&profiles)?;

        let mut builder = DocumentBuilder::new(&self.ignore, &*self.scanner, &*self.reader);
        for profile in &profiles {
            builder.add_profile(profile, packages.get(profile.package_path()))?;
        }
        Ok(builder.finish(self.timestamp))
    }

    /// Convert `input` and stream the XML to `output`. On error, anything
    /// already written to `output` is incomplete and must be discarded.
    pub fn convert<R: BufRead, W: Write>(&self, mut input: R, output: W) -> Result<()> {
        let doc = self.build(&mut input)?;
        emit::write_document(&doc, output)
    }

    /// Resolve every package named by the profile in one request.
    fn load_packages(&self, profiles: &[Profile]) -> Result<HashMap<String, GoPackage>> {
        if profiles.is_empty() {
            return Ok(HashMap::new());
        }

        let mut import_paths: Vec<String> = Vec::new();
        for profile in profiles {
            let path = profile.package_path();
            if !import_paths.iter().any(|p| p == path) {
                import_paths.push(path.to_string());
            }
        }

        let packages = self.resolver.resolve(&import_paths)?;
        Ok(packages
            .into_iter()
            .map(|p| (p.import_path.clone(), p))
            .collect())
    }
}
