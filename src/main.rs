use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use gocov_cobertura::cli;
use gocov_cobertura::resolve::GoListResolver;
use gocov_cobertura::Converter;

/// Convert a Go coverage profile into a Cobertura XML report.
#[derive(Parser)]
#[command(name = "gocov-cobertura", version, about)]
struct Cli {
    /// Coverage profile from `go test -coverprofile` (default: stdin).
    input: Option<PathBuf>,

    /// Where to write the report (default: stdout).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Ignore files whose directory matches this regular expression.
    #[arg(long, value_name = "REGEX")]
    ignore_dirs: Option<String>,

    /// Ignore files whose module-relative path matches this regular expression.
    #[arg(long, value_name = "REGEX")]
    ignore_files: Option<String>,

    /// Ignore generated files.
    #[arg(long)]
    ignore_gen_files: bool,

    /// Line pattern marking a generated file (default: Go's "Code generated ... DO NOT EDIT.").
    #[arg(long, value_name = "REGEX")]
    gen_marker: Option<String>,

    /// Resolve packages from this directory instead of the current one.
    #[arg(short = 'C', long)]
    dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let ignore = cli::build_ignore(
        cli.ignore_dirs.as_deref(),
        cli.ignore_files.as_deref(),
        cli.ignore_gen_files,
        cli.gen_marker.as_deref(),
    )?;
    let resolver = match cli.dir {
        Some(dir) => GoListResolver::in_dir(dir),
        None => GoListResolver::new(),
    };
    let converter = Converter::new(resolver)
        .with_ignore(ignore)
        .with_timestamp(cli::now_millis());

    cli::cmd_convert(&converter, cli.input.as_deref(), cli.output.as_deref())
}
