//! Timestamped markdown copies written before delivery.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::macros::format_description;
use time::OffsetDateTime;

pub const ARTIFACT_PREFIX: &str = "MoM_";
pub const RAW_SUFFIX: &str = "_raw";

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("I/O error while {operation} at {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArtifactError {
    fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

/// `YYYYmmdd_HHMMSS` stamp shared by every artifact of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp(String);

impl RunStamp {
    /// Local wall-clock time, or UTC when the local offset is unknown.
    pub fn now() -> Self {
        let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
        Self::at(now)
    }

    pub fn at(moment: OffsetDateTime) -> Self {
        let stamp = moment
            .format(format_description!(
                "[year][month][day]_[hour][minute][second]"
            ))
            .unwrap_or_else(|_| moment.unix_timestamp().to_string());
        Self(stamp)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Writes `MoM_<stamp>.md` files into one directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves the rewritten document.
    pub fn write_rewritten(&self, stamp: &RunStamp, markdown: &str) -> Result<PathBuf, ArtifactError> {
        self.write(stamp, "", markdown)
    }

    /// Saves the flattened source when the rewrite failed.
    pub fn write_raw(&self, stamp: &RunStamp, markdown: &str) -> Result<PathBuf, ArtifactError> {
        self.write(stamp, RAW_SUFFIX, markdown)
    }

    fn write(&self, stamp: &RunStamp, suffix: &str, contents: &str) -> Result<PathBuf, ArtifactError> {
        fs::create_dir_all(&self.dir)
            .map_err(|source| ArtifactError::io("creating output directory", &self.dir, source))?;

        let path = self.free_path(stamp, suffix);
        let tmp_path = path.with_extension("md.tmp");
        {
            let mut file = fs::File::create(&tmp_path)
                .map_err(|source| ArtifactError::io("creating artifact", &tmp_path, source))?;
            file.write_all(contents.as_bytes())
                .map_err(|source| ArtifactError::io("writing artifact", &tmp_path, source))?;
            if !contents.ends_with('\n') {
                file.write_all(b"\n")
                    .map_err(|source| ArtifactError::io("writing artifact", &tmp_path, source))?;
            }
            file.sync_all()
                .map_err(|source| ArtifactError::io("syncing artifact", &tmp_path, source))?;
        }
        fs::rename(&tmp_path, &path)
            .map_err(|source| ArtifactError::io("renaming artifact", &path, source))?;
        Ok(path)
    }

    /// First of `MoM_<stamp><suffix>.md`, `..._1.md`, `..._2.md` that does not exist yet.
    fn free_path(&self, stamp: &RunStamp, suffix: &str) -> PathBuf {
        let base = format!("{ARTIFACT_PREFIX}{}{suffix}", stamp.as_str());
        let mut candidate = self.dir.join(format!("{base}.md"));
        let mut counter = 1;
        while candidate.exists() {
            candidate = self.dir.join(format!("{base}_{counter}.md"));
            counter += 1;
        }
        candidate
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use time::macros::datetime;

    use super::*;

    #[test]
    fn stamp_uses_compact_date_and_time() {
        let stamp = RunStamp::at(datetime!(2024-03-07 09:05:01 UTC));
        assert_eq!(stamp.as_str(), "20240307_090501");
    }

    #[test]
    fn rewritten_and_raw_artifacts_share_the_stamp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = ArtifactWriter::new(dir.path().join("out"));
        let stamp = RunStamp::at(datetime!(2024-03-07 09:05:01 UTC));

        let rewritten = writer.write_rewritten(&stamp, "# Title").expect("rewritten");
        let raw = writer.write_raw(&stamp, "raw notes\n").expect("raw");

        assert_eq!(
            rewritten.file_name().and_then(|name| name.to_str()),
            Some("MoM_20240307_090501.md")
        );
        assert_eq!(
            raw.file_name().and_then(|name| name.to_str()),
            Some("MoM_20240307_090501_raw.md")
        );
        assert_eq!(fs::read_to_string(&rewritten).expect("read"), "# Title\n");
        assert_eq!(fs::read_to_string(&raw).expect("read"), "raw notes\n");
    }

    #[test]
    fn same_second_runs_do_not_overwrite() {
        let dir = tempfile::tempdir().expect("tempdir");
        let writer = ArtifactWriter::new(dir.path());
        let stamp = RunStamp::at(datetime!(2024-03-07 09:05:01 UTC));

        let first = writer.write_rewritten(&stamp, "one").expect("first");
        let second = writer.write_rewritten(&stamp, "two").expect("second");

        assert_ne!(first, second);
        assert_eq!(
            second.file_name().and_then(|name| name.to_str()),
            Some("MoM_20240307_090501_1.md")
        );
        assert_eq!(fs::read_to_string(&first).expect("read"), "one\n");
    }
}
