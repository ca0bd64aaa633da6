//! Safety checks for files the CLI writes.
//!
//! A session file is the only output. It must look like one, and it must
//! never overwrite the track list or a catalog it was built from.

use anyhow::{bail, Result};
use std::path::Path;

/// Validates that a session output path is safe to overwrite.
///
/// Checks:
/// - Output must have a `.json` extension
/// - Output cannot be the same as any of the provided source paths
pub fn validate_output_path(output: &Path, source_paths: &[&Path]) -> Result<()> {
    let is_json = output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        bail!(
            "Safety check failed: output file '{}' must have a .json extension",
            output.display()
        );
    }

    for source in source_paths {
        let same = match (output.canonicalize(), source.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => output == *source,
        };
        if same {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}
