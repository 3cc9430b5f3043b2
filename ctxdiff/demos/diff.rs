//! Example: compute a context-aware delta between two documents
//!
//! Usage: cargo run --example diff <original.xml|json> <changed.xml|json>

use std::env;
use std::fs;
use std::path::Path;

use ctxdiff::{diff, encode_delta, parse_document, Family, PatchFormat, DEFAULT_RADIUS};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() != 3 {
        eprintln!("Usage: {} <original> <changed>", args[0]);
        std::process::exit(1);
    }

    let original = Path::new(&args[1]);
    let changed = Path::new(&args[2]);
    let family = Family::from_path(original)?;

    eprintln!("Parsing original: {}", original.display());
    let a = parse_document(family, &fs::read_to_string(original)?)?;

    eprintln!("Parsing changed: {}", changed.display());
    let b = parse_document(family, &fs::read_to_string(changed)?)?;

    eprintln!("Computing delta...");
    let delta = diff(&a, &b, DEFAULT_RADIUS)?;
    eprintln!("{} operation(s).", delta.len());

    print!("{}", encode_delta(&delta, PatchFormat::Xml, family)?);
    Ok(())
}
