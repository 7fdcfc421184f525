//! Mark a job complete once its rendered output has been uploaded.

use anyhow::{Context, Result, bail};
use renderq_core::JobId;
use std::path::Path;

/// Derive the job id from an output file name such as `frames/123.png`.
pub fn job_id_from_path(path: &Path) -> Result<JobId> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .with_context(|| format!("No file name in {}", path.display()))?;
    let id: JobId = stem
        .parse()
        .with_context(|| format!("File name {:?} is not a job id", stem))?;
    if id.get() < 1 {
        bail!("Job ids start at 1, got {}", id);
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_file_name() {
        assert_eq!(
            job_id_from_path(Path::new("123.png")).unwrap(),
            JobId::new(123)
        );
    }

    #[test]
    fn test_nested_path() {
        assert_eq!(
            job_id_from_path(Path::new("/srv/out/frames/0042.exr")).unwrap(),
            JobId::new(42)
        );
    }

    #[test]
    fn test_rejects_non_numeric_names() {
        assert!(job_id_from_path(Path::new("thumbnail.png")).is_err());
        assert!(job_id_from_path(Path::new("")).is_err());
    }

    #[test]
    fn test_rejects_zero() {
        assert!(job_id_from_path(Path::new("0.png")).is_err());
    }
}
