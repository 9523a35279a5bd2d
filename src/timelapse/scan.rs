// Artifact discovery
//
// Walks an input tree and collects every file whose name follows the
// artifact naming convention. Files that do not match are skipped.

use std::path::Path;

use walkdir::WalkDir;

use super::error::{ScheduleError, ScheduleResult};
use super::naming::ArtifactName;
use super::types::TimestampedArtifact;

/// Recursively collect timestamped artifacts under `root`.
///
/// Entries are visited in file name order so the discovery index, and with
/// it the tie order of equal timestamps, is reproducible.
pub fn scan_artifacts(root: &Path, naming: &ArtifactName) -> ScheduleResult<Vec<TimestampedArtifact>> {
    let metadata = std::fs::metadata(root)
        .map_err(|e| ScheduleError::input_directory(root, e.to_string()))?;
    if !metadata.is_dir() {
        return Err(ScheduleError::input_directory(root, "not a directory"));
    }

    let mut artifacts = Vec::new();
    let mut skipped = 0usize;

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.map_err(|e| ScheduleError::ScanFailed(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        match naming.parse(entry.path()) {
            Some(captured_at) => {
                let index = artifacts.len();
                artifacts.push(TimestampedArtifact::new(entry.into_path(), captured_at, index));
            }
            None => {
                log::debug!("Skipping file without capture timestamp: {}", entry.path().display());
                skipped += 1;
            }
        }
    }

    log::info!(
        "Found {} artifacts under {} ({} other files skipped)",
        artifacts.len(),
        root.display(),
        skipped
    );
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing");
        let err = scan_artifacts(&missing, &ArtifactName::default()).unwrap_err();
        assert!(matches!(err, ScheduleError::InputDirectory { .. }));
    }

    #[test]
    fn test_root_is_file() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("file.txt");
        fs::write(&file, b"x").unwrap();
        let err = scan_artifacts(&file, &ArtifactName::default()).unwrap_err();
        assert!(matches!(err, ScheduleError::InputDirectory { .. }));
    }

    #[test]
    fn test_discovery_index_follows_scan_order() {
        let temp_dir = TempDir::new().unwrap();
        let day = temp_dir.path().join("2024").join("03").join("20");
        fs::create_dir_all(&day).unwrap();
        fs::write(day.join("nest_camera_frame_20240320_100000.jpg"), b"a").unwrap();
        fs::write(day.join("nest_camera_frame_20240320_090000.jpg"), b"b").unwrap();
        fs::write(day.join("notes.txt"), b"c").unwrap();

        let artifacts = scan_artifacts(temp_dir.path(), &ArtifactName::default()).unwrap();
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].discovery_index, 0);
        assert!(artifacts[0].path.ends_with("nest_camera_frame_20240320_090000.jpg"));
        assert_eq!(artifacts[1].discovery_index, 1);
    }
}
