//! Package resolution: mapping the import paths found in a profile to their
//! module and declared source files.
use std::path::PathBuf;
use std::process::Command;

use serde::Deserialize;

use crate::error::{ConvertError, Result};

/// The module a package belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoModule {
    /// Module import path, e.g. `github.com/user/project`.
    pub path: String,
    /// Directory holding the module's `go.mod`.
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoPackage {
    pub import_path: String,
    /// `None` outside module mode; files of such packages cannot be reported.
    pub module: Option<GoModule>,
    /// Absolute paths of the package's Go source files.
    pub go_files: Vec<PathBuf>,
}

impl GoPackage {
    /// Locate the on-disk source for a profile file name: the declared file
    /// with the same base name, else the module-relative path under the
    /// module directory.
    #[must_use]
    pub fn source_path(&self, module: &GoModule, file_name: &str, relative: &str) -> PathBuf {
        let base = file_name.rsplit(['/', '\\']).next();
        self.go_files
            .iter()
            .find(|f| f.file_name().and_then(|n| n.to_str()) == base)
            .cloned()
            .unwrap_or_else(|| module.dir.join(relative))
    }
}

/// Resolves package import paths to package metadata.
///
/// Import paths that cannot be resolved are simply absent from the result;
/// the converter reports them. An `Err` aborts the whole conversion.
pub trait PackageResolver {
    fn resolve(&self, import_paths: &[String]) -> Result<Vec<GoPackage>>;
}

/// Resolver answering from a fixed set of packages.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    packages: Vec<GoPackage>,
}

impl StaticResolver {
    pub fn new(packages: Vec<GoPackage>) -> Self {
        Self { packages }
    }
}

impl PackageResolver for StaticResolver {
    fn resolve(&self, import_paths: &[String]) -> Result<Vec<GoPackage>> {
        Ok(self
            .packages
            .iter()
            .filter(|p| import_paths.contains(&p.import_path))
            .cloned()
            .collect())
    }
}

/// Resolver backed by `go list`.
#[derive(Debug, Clone, Default)]
pub struct GoListResolver {
    dir: Option<PathBuf>,
}

impl GoListResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `go list` from `dir` instead of the current directory.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
        }
    }
}

impl PackageResolver for GoListResolver {
    fn resolve(&self, import_paths: &[String]) -> Result<Vec<GoPackage>> {
        if import_paths.is_empty() {
            return Ok(Vec::new());
        }

        let mut cmd = Command::new("go");
        cmd.args(["list", "-e", "-json"]).args(import_paths);
        if let Some(dir) = &self.dir {
            cmd.current_dir(dir);
        }
        log::debug!("running go list for {} packages", import_paths.len());

        let output = cmd
            .output()
            .map_err(|e| ConvertError::Resolve(format!("failed to run go list: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ConvertError::Resolve(format!(
                "go list failed: {}",
                stderr.trim()
            )));
        }

        parse_go_list(&output.stdout)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedPackage {
    import_path: String,
    #[serde(default)]
    dir: PathBuf,
    #[serde(default)]
    go_files: Vec<String>,
    module: Option<ListedModule>,
    error: Option<ListedError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedModule {
    path: String,
    #[serde(default)]
    dir: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedError {
    err: String,
}

/// Decode `go list -json` output, a stream of concatenated JSON objects.
pub fn parse_go_list(stdout: &[u8]) -> Result<Vec<GoPackage>> {
    let mut packages = Vec::new();
    for listed in serde_json::Deserializer::from_slice(stdout).into_iter::<ListedPackage>() {
        let listed =
            listed.map_err(|e| ConvertError::Resolve(format!("invalid go list output: {e}")))?;

        if let Some(error) = &listed.error {
            log::warn!("package {}: {}", listed.import_path, error.err);
            if listed.module.is_none() {
                continue;
            }
        }

        let go_files = listed
            .go_files
            .iter()
            .map(|f| listed.dir.join(f))
            .collect();
        packages.push(GoPackage {
            import_path: listed.import_path,
            module: listed.module.map(|m| GoModule {
                path: m.path,
                dir: m.dir,
            }),
            go_files,
        });
    }
    Ok(packages)
}
