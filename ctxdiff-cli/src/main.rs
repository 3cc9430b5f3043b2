//! Command-line front-end for the ctxdiff engine.
//!
//! Computes context-aware structural patches between two documents of the
//! same family (XML or JsonML, detected by MIME type), and applies such
//! patches to possibly diverged documents.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context as _, Result};
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ctxdiff::{
    apply, decode_delta, diff, encode_delta, parse_document, serialize_document, ApplyMode,
    Family, PatchFormat, ResolverConfig, DEFAULT_RADIUS,
};

/// Context-aware structural diff and patch for XML and JsonML documents.
#[derive(Parser)]
#[command(name = "cdiff")]
#[command(version)]
#[command(about = "Context-aware structural diff and patch tool", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a patch that turns the original document into the changed one
    #[command(visible_alias = "d")]
    Diff {
        /// Original file
        original: PathBuf,
        /// Changed file
        changed: PathBuf,
        /// Output file (default: stdout)
        output: Option<PathBuf>,

        /// Emit the patch as XML (default)
        #[arg(short = 'x', long = "xml", conflicts_with = "json")]
        xml: bool,
        /// Emit the patch as JsonML
        #[arg(short = 'j', long = "json")]
        json: bool,
    },

    /// Apply a patch file to a document
    #[command(visible_alias = "p")]
    Patch {
        /// Original file
        original: PathBuf,
        /// Patch file
        patchfile: PathBuf,
        /// Output file (default: stdout)
        output: Option<PathBuf>,

        /// Read the patch as XML regardless of its extension
        #[arg(short = 'x', long = "xml", conflicts_with = "json")]
        xml: bool,
        /// Read the patch as JsonML regardless of its extension
        #[arg(short = 'j', long = "json")]
        json: bool,
        /// Skip operations that cannot be located instead of aborting
        #[arg(long)]
        lenient: bool,
    },
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version are not failures.
            let code = match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
            let _ = e.print();
            return code;
        }
    };

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Diff {
            original,
            changed,
            output,
            xml,
            json,
        } => run_diff(
            &original,
            &changed,
            output.as_deref(),
            patch_format(xml, json, None),
        ),
        Commands::Patch {
            original,
            patchfile,
            output,
            xml,
            json,
            lenient,
        } => {
            let format = patch_format(xml, json, PatchFormat::from_path(&patchfile));
            run_patch(&original, &patchfile, output.as_deref(), format, lenient)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Picks the patch encoding: explicit flag first, file extension second,
/// XML as the default.
fn patch_format(xml: bool, json: bool, detected: Option<PatchFormat>) -> PatchFormat {
    if json {
        PatchFormat::Json
    } else if xml {
        PatchFormat::Xml
    } else {
        detected.unwrap_or(PatchFormat::Xml)
    }
}

/// Detects the document family shared by the input files.
fn document_family(original: &Path, other: &Path) -> Result<Family> {
    let family = Family::from_path(original)
        .with_context(|| format!("cannot handle {}", original.display()))?;
    if let Ok(other_family) = Family::from_path(other) {
        if other_family != family {
            bail!(
                "{} and {} belong to different document families",
                original.display(),
                other.display()
            );
        }
    }
    Ok(family)
}

fn run_diff(
    original: &Path,
    changed: &Path,
    output: Option<&Path>,
    format: PatchFormat,
) -> Result<()> {
    let family = document_family(original, changed)?;

    let original_text = fs::read_to_string(original)
        .with_context(|| format!("cannot read {}", original.display()))?;
    let changed_text = fs::read_to_string(changed)
        .with_context(|| format!("cannot read {}", changed.display()))?;

    let a = parse_document(family, &original_text)
        .with_context(|| format!("cannot parse {}", original.display()))?;
    let b = parse_document(family, &changed_text)
        .with_context(|| format!("cannot parse {}", changed.display()))?;

    let delta = diff(&a, &b, DEFAULT_RADIUS)?;
    tracing::debug!(operations = delta.len(), "delta computed");

    let text = encode_delta(&delta, format, family)?;
    write_output(output, &text)
}

fn run_patch(
    original: &Path,
    patchfile: &Path,
    output: Option<&Path>,
    format: PatchFormat,
    lenient: bool,
) -> Result<()> {
    let family = Family::from_path(original)
        .with_context(|| format!("cannot handle {}", original.display()))?;

    let original_text = fs::read_to_string(original)
        .with_context(|| format!("cannot read {}", original.display()))?;
    let patch_text = fs::read_to_string(patchfile)
        .with_context(|| format!("cannot read {}", patchfile.display()))?;

    let mut tree = parse_document(family, &original_text)
        .with_context(|| format!("cannot parse {}", original.display()))?;
    let delta = decode_delta(&patch_text, format, family)
        .with_context(|| format!("cannot parse {}", patchfile.display()))?;

    let mode = if lenient {
        ApplyMode::BestEffort
    } else {
        ApplyMode::Strict
    };
    let report = apply(&mut tree, &delta, mode, &ResolverConfig::default())?;
    if !report.skipped.is_empty() {
        eprintln!(
            "Applied {} of {} operations.",
            report.applied,
            report.applied + report.skipped.len()
        );
        for (index, reason) in &report.skipped {
            eprintln!("  skipped operation {}: {}", index, reason);
        }
    }

    let text = serialize_document(family, &tree)?;
    write_output(output, &text)
}

fn write_output(output: Option<&Path>, text: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("cannot write {}", path.display()))?
        }
        None => print!("{}", text),
    }
    Ok(())
}
