use crate::error::{AnalysisError, Result};
use crate::types::Artifact;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Moves generated files next to the input dataset.
pub struct ReportAssembler;

impl ReportAssembler {
    /// Files to move for a run: the README and every image artifact.
    pub fn outputs(artifacts: &[Artifact]) -> Vec<PathBuf> {
        artifacts
            .iter()
            .filter(|a| {
                a.path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("png") || ext.eq_ignore_ascii_case("md"))
            })
            .map(|a| a.path.clone())
            .collect()
    }

    /// Move `files` into `destination`, keeping their file names.
    ///
    /// Sources that no longer exist are skipped. Files already inside the
    /// destination stay where they are. Returns the final paths.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::PermissionDenied`] if the destination cannot be
    ///   created or a file cannot be moved for lack of permission
    /// - [`AnalysisError::RelocationFailed`] for any other move failure
    pub fn relocate(files: &[PathBuf], destination: &Path) -> Result<Vec<PathBuf>> {
        let present: Vec<&PathBuf> = files.iter().filter(|f| f.exists()).collect();
        if present.is_empty() {
            warn!("No generated files to move into {}", destination.display());
            return Ok(Vec::new());
        }

        fs::create_dir_all(destination).map_err(|e| AnalysisError::from_io(destination, e))?;
        let destination_real = fs::canonicalize(destination)
            .map_err(|e| AnalysisError::from_io(destination, e))?;

        let mut moved = Vec::with_capacity(present.len());
        for source in present {
            let Some(name) = source.file_name() else {
                debug!("Skipping {}: no file name", source.display());
                continue;
            };

            let same_dir = source
                .parent()
                .map(|p| if p.as_os_str().is_empty() { Path::new(".") } else { p })
                .and_then(|p| fs::canonicalize(p).ok())
                .is_some_and(|p| p == destination_real);
            if same_dir {
                debug!("{} already in place", source.display());
                moved.push(source.clone());
                continue;
            }

            let target = destination.join(name);
            Self::move_file(source, &target)?;
            info!("Moved {} -> {}", source.display(), target.display());
            moved.push(target);
        }

        Ok(moved)
    }

    /// Rename, falling back to copy and remove when the rename crosses
    /// filesystems.
    fn move_file(source: &Path, target: &Path) -> Result<()> {
        let rename_err = match fs::rename(source, target) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        if rename_err.kind() == ErrorKind::PermissionDenied {
            return Err(AnalysisError::from_io(source, rename_err));
        }

        debug!(
            "rename {} failed ({}), copying instead",
            source.display(),
            rename_err
        );
        fs::copy(source, target)
            .and_then(|_| fs::remove_file(source))
            .map_err(|e| match e.kind() {
                ErrorKind::PermissionDenied => AnalysisError::from_io(source, e),
                _ => AnalysisError::RelocationFailed {
                    path: source.to_path_buf(),
                    reason: e.to_string(),
                },
            })
    }

    /// Write a pretty-printed JSON summary of a run.
    pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AnalysisError::from_io(parent, e))?;
        }
        let mut file = File::create(path).map_err(|e| AnalysisError::from_io(path, e))?;
        file.write_all(serde_json::to_string_pretty(value)?.as_bytes())?;

        info!("Report saved: {}", path.display());
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArtifactKind;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, name).unwrap();
        path
    }

    #[test]
    fn test_relocate_moves_files() {
        let work = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let files = vec![touch(work.path(), "README.md"), touch(work.path(), "a.png")];

        let moved = ReportAssembler::relocate(&files, dest.path()).unwrap();
        assert_eq!(moved, vec![dest.path().join("README.md"), dest.path().join("a.png")]);
        assert!(!files[0].exists());
        assert_eq!(fs::read_to_string(dest.path().join("a.png")).unwrap(), "a.png");
    }

    #[test]
    fn test_relocate_creates_destination() {
        let work = tempfile::tempdir().unwrap();
        let dest = work.path().join("nested").join("out");
        let files = vec![touch(work.path(), "README.md")];

        ReportAssembler::relocate(&files, &dest).unwrap();
        assert!(dest.join("README.md").exists());
    }

    #[test]
    fn test_relocate_skips_missing_sources() {
        let work = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let files = vec![work.path().join("gone.png"), touch(work.path(), "b.png")];

        let moved = ReportAssembler::relocate(&files, dest.path()).unwrap();
        assert_eq!(moved, vec![dest.path().join("b.png")]);
    }

    #[test]
    fn test_relocate_nothing_to_move() {
        let dest = tempfile::tempdir().unwrap();
        let moved =
            ReportAssembler::relocate(&[dest.path().join("none.png")], dest.path()).unwrap();
        assert!(moved.is_empty());
    }

    #[test]
    fn test_relocate_same_directory_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let file = touch(dir.path(), "README.md");

        let moved = ReportAssembler::relocate(std::slice::from_ref(&file), dir.path()).unwrap();
        assert_eq!(moved, vec![file.clone()]);
        assert!(file.exists());
    }

    #[test]
    fn test_outputs_selects_images_and_readme() {
        let artifacts = vec![
            Artifact::image("a.png", PathBuf::from("/w/a.png"), 1),
            Artifact::document("README.md", PathBuf::from("/w/README.md")),
            Artifact {
                name: "data.json".to_string(),
                path: PathBuf::from("/w/data.json"),
                kind: ArtifactKind::Document,
                panels: 1,
            },
        ];
        assert_eq!(
            ReportAssembler::outputs(&artifacts),
            vec![PathBuf::from("/w/a.png"), PathBuf::from("/w/README.md")]
        );
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        ReportAssembler::write_json(&serde_json::json!({"rows": 3}), &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"rows\": 3"));
    }
}
