//! Command: print or verify a file digest.
use anyhow::Result;

use crate::cli::HashOpts;
use crate::hash::{self, HashAlgorithm};

/// Print `<digest>  <file>`, or verify against `--expect`.
///
/// # Errors
///
/// Returns `UnknownAlgorithm`, an I/O error, or `ChecksumMismatch`.
#[allow(clippy::print_stdout)]
pub fn run(opts: &HashOpts) -> Result<()> {
    let algorithm: HashAlgorithm = opts.algorithm.parse()?;
    if let Some(expected) = &opts.expect {
        hash::verify_file(&opts.file, expected, algorithm)?;
        println!("{}: OK", opts.file.display());
    } else {
        let digest = hash::hash_file(&opts.file, algorithm)?;
        println!("{digest}  {}", opts.file.display());
    }
    Ok(())
}
