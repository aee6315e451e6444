use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use serde_json::Value;
use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};
use tracing::debug;

use super::{ReportError, ReportSink};
use crate::config::ReportConfig;

const STAMP: &[FormatItem<'static>] =
    format_description!("[day]-[month]-[year]_[hour]:[minute]:[second]");

/// Writes every report of one run under `<base>/report_<stamp>/`.
///
/// Named reports are appended as `---`-separated YAML documents; detail logs live in
/// `<stage>/<uid>.txt`, one timestamped line per raw frame.
#[derive(Debug)]
pub struct FsReportSink {
    dir: PathBuf,
}

impl FsReportSink {
    /// Creates the run directory under the configured base.
    pub fn create(cfg: &ReportConfig) -> Result<Self, ReportError> {
        let base = cfg.base_dir()?;
        Self::at(base.join(format!("report_{}", stamp())))
    }

    /// Uses `dir` as the run directory, creating it if needed.
    pub fn at(dir: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(target: "ota.core.report", dir = %dir.display(), "report directory ready");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn append(&self, dir: &Path, file: &str) -> Result<File, ReportError> {
        fs::create_dir_all(dir)?;
        Ok(OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(file))?)
    }
}

impl ReportSink for FsReportSink {
    fn persist(&self, name: &str, record: &Value) -> Result<(), ReportError> {
        if !name.ends_with(".yaml") || name.contains(['/', '\\']) {
            return Err(ReportError::InvalidName(name.to_string()));
        }
        let mut file = self.append(&self.dir, name)?;
        file.write_all(b"---\n")?;
        serde_yaml::to_writer(&mut file, record)?;
        Ok(())
    }

    fn append_detail(&self, stage: &str, uid: &str, line: &str) -> Result<(), ReportError> {
        plain_component(stage)?;
        plain_component(uid)?;
        let mut file = self.append(&self.dir.join(stage), &format!("{uid}.txt"))?;
        writeln!(file, "{} | {line}", stamp())?;
        Ok(())
    }
}

/// Uids come from the relay; neither they nor stage names may leave the run directory.
fn plain_component(part: &str) -> Result<(), ReportError> {
    if part.is_empty() || part == "." || part == ".." || part.contains(['/', '\\', '\0']) {
        return Err(ReportError::InvalidComponent(part.to_string()));
    }
    Ok(())
}

/// Local wall clock plus unix seconds, e.g. `18-10-2026_14:03:07.1792245787`.
fn stamp() -> String {
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    let human = now
        .format(STAMP)
        .unwrap_or_else(|_| now.unix_timestamp().to_string());
    format!("{human}.{}", now.unix_timestamp())
}
