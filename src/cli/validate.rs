use std::path::Path;

use anyhow::{bail, Result};
use tracing::info;

use crate::cli::{emit, Workspace};
use crate::validate::{validation_report, ContentValidator, FileValidation};

/// Validate one file, a directory, or the whole corpus when neither is given.
pub fn collect(
    workspace: &Workspace,
    file: Option<&str>,
    directory: Option<&str>,
) -> Result<Vec<FileValidation>> {
    let validator = ContentValidator::new(workspace.config.validate.clone());
    let results = match (file, directory) {
        (Some(path), _) => {
            let path = Path::new(path);
            if !path.is_file() {
                bail!("File not found: {}", path.display());
            }
            info!("Validating {}", path.display());
            vec![validator.validate_file(path)]
        }
        (None, Some(dir)) => {
            info!("Validating directory: {}", dir);
            validator.validate_directory(Path::new(dir))?
        }
        (None, None) => {
            let root = workspace.corpus.root();
            info!("Validating corpus: {}", root.display());
            validator.validate_directory(root)?
        }
    };
    Ok(results)
}

pub fn run(
    workspace: &Workspace,
    file: Option<String>,
    directory: Option<String>,
    output: Option<String>,
) -> Result<()> {
    let results = collect(workspace, file.as_deref(), directory.as_deref())?;
    emit(output.as_deref(), &validation_report(&results))?;

    let invalid = results.iter().filter(|r| !r.is_valid()).count();
    if invalid > 0 {
        bail!("{} file(s) failed validation", invalid);
    }
    Ok(())
}
