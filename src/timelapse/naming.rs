// Artifact naming convention
//
// Stills are named `<prefix><YYYYMMDD>_<HHMMSS>.<ext>` in local time and
// stored under `<root>/YYYY/MM/DD/`. The scan step recovers capture times
// from the same pattern.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Default file name prefix for captured stills
pub const DEFAULT_PREFIX: &str = "nest_camera_frame_";
/// Default file extension for captured stills
pub const DEFAULT_EXTENSION: &str = "jpg";

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
// 8 date digits, '_', 6 time digits
const STAMP_LEN: usize = 15;

/// File naming scheme shared by the capture and timelapse stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    prefix: String,
    extension: String,
}

impl ArtifactName {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// File name for a still captured at `captured_at`
    pub fn file_name(&self, captured_at: DateTime<Utc>) -> String {
        let local = captured_at.with_timezone(&Local);
        format!(
            "{}{}.{}",
            self.prefix,
            local.format(STAMP_FORMAT),
            self.extension
        )
    }

    /// `root/YYYY/MM/DD` for the local date of `captured_at`
    pub fn dated_dir(&self, root: &Path, captured_at: DateTime<Utc>) -> PathBuf {
        let local = captured_at.with_timezone(&Local);
        root.join(local.format("%Y").to_string())
            .join(local.format("%m").to_string())
            .join(local.format("%d").to_string())
    }

    /// Full path of a still captured at `captured_at` under `root`
    pub fn path_for(&self, root: &Path, captured_at: DateTime<Utc>) -> PathBuf {
        self.dated_dir(root, captured_at)
            .join(self.file_name(captured_at))
    }

    /// Recover the capture time from a path's file name.
    ///
    /// Returns `None` for names that do not follow the convention.
    pub fn parse(&self, path: &Path) -> Option<DateTime<Utc>> {
        let name = path.file_name()?.to_str()?;
        let rest = name.strip_prefix(self.prefix.as_str())?;
        let (stamp, extension) = rest.rsplit_once('.')?;
        if !extension.eq_ignore_ascii_case(&self.extension) {
            return None;
        }
        if stamp.len() != STAMP_LEN
            || !stamp
                .chars()
                .enumerate()
                .all(|(i, c)| if i == 8 { c == '_' } else { c.is_ascii_digit() })
        {
            return None;
        }

        let naive = NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
    }
}

impl Default for ArtifactName {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX, DEFAULT_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_time() -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(2024, 3, 20, 14, 30, 5)
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_file_name_format() {
        let naming = ArtifactName::default();
        assert_eq!(
            naming.file_name(sample_time()),
            "nest_camera_frame_20240320_143005.jpg"
        );
    }

    #[test]
    fn test_parse_recovers_time() {
        let naming = ArtifactName::default();
        let path = naming.path_for(Path::new("/frames"), sample_time());
        assert_eq!(
            path,
            PathBuf::from("/frames/2024/03/20/nest_camera_frame_20240320_143005.jpg")
        );
        assert_eq!(naming.parse(&path), Some(sample_time()));
    }

    #[test]
    fn test_parse_accepts_upper_case_extension() {
        let naming = ArtifactName::default();
        assert_eq!(
            naming.parse(Path::new("nest_camera_frame_20240320_143005.JPG")),
            Some(sample_time())
        );
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        let naming = ArtifactName::default();
        for name in [
            "holiday.jpg",
            "nest_camera_frame_20240320.jpg",
            "nest_camera_frame_20240320_143005.png",
            "nest_camera_frame_2024032x_143005.jpg",
            "nest_camera_frame_20241320_143005.jpg",
            "other_prefix_20240320_143005.jpg",
        ] {
            assert_eq!(naming.parse(Path::new(name)), None, "{name}");
        }
    }
}
