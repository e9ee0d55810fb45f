//! Guards against clobbering import files with reconciled output.

use std::path::Path;

use crate::error::{ReconcileError, Result};

/// Validates that an output path is safe to write.
///
/// Checks:
/// - Output name must contain `required_pattern` (e.g. "reconciled")
/// - Output cannot be any of the input paths
pub fn validate_output_path(output: &Path, required_pattern: &str, inputs: &[&Path]) -> Result<()> {
    let output_name = output.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if !output_name.contains(required_pattern) {
        return Err(ReconcileError::UnsafeOutput(format!(
            "output '{}' must contain '{}' in the name",
            output.display(),
            required_pattern
        )));
    }

    for input in inputs {
        if output == *input {
            return Err(ReconcileError::UnsafeOutput(format!(
                "output '{}' cannot be the same as input '{}'",
                output.display(),
                input.display()
            )));
        }
    }

    Ok(())
}

/// Output file name for one import inside a batch output directory.
pub fn reconciled_file_name(input: &Path) -> String {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("import");
    format!("{}.reconciled.json", stem)
}
