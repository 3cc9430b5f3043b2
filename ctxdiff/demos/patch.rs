//! Example: apply a delta to a (possibly diverged) document
//!
//! Usage: cargo run --example patch <original.xml|json> <patch.xml>

use std::env;
use std::fs;
use std::path::Path;

use ctxdiff::{
    apply, decode_delta, parse_document, serialize_document, ApplyMode, Family, PatchFormat,
    ResolverConfig,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() != 3 {
        eprintln!("Usage: {} <original> <patchfile>", args[0]);
        std::process::exit(1);
    }

    let original = Path::new(&args[1]);
    let patchfile = Path::new(&args[2]);
    let family = Family::from_path(original)?;
    let format = PatchFormat::from_path(patchfile).unwrap_or(PatchFormat::Xml);

    eprintln!("Parsing original: {}", original.display());
    let mut tree = parse_document(family, &fs::read_to_string(original)?)?;

    eprintln!("Parsing patch: {}", patchfile.display());
    let delta = decode_delta(&fs::read_to_string(patchfile)?, format, family)?;

    eprintln!("Applying {} operation(s)...", delta.len());
    apply(&mut tree, &delta, ApplyMode::Strict, &ResolverConfig::default())?;

    print!("{}", serialize_document(family, &tree)?);
    Ok(())
}
