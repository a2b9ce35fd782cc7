use std::{
    fs::{self, File, OpenOptions},
    io::{BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use chrono::NaiveDateTime;

use crate::constants::TIMESTAMP_FORMAT;
use crate::error::{Error, Result};
use crate::platform::Platform;

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub timestamp: NaiveDateTime,
    pub views: u64,
    /// Views per minute since the previous sample, if there was one.
    pub rate: Option<f64>,
}

impl Sample {
    pub fn to_line(&self) -> String {
        let rate = self.rate.map(|r| r.to_string()).unwrap_or_default();
        format!(
            "{},{},{}\n",
            self.timestamp.format(TIMESTAMP_FORMAT),
            self.views,
            rate
        )
    }

    // an unparseable rate cell reads as None
    pub fn parse_line(line: &str) -> std::result::Result<Self, String> {
        let mut cells = line.trim_end_matches(['\r', '\n']).split(',');
        let (Some(ts), Some(views), Some(rate), None) =
            (cells.next(), cells.next(), cells.next(), cells.next())
        else {
            return Err(format!("expected 3 columns, got {line:?}"));
        };

        let timestamp = NaiveDateTime::parse_from_str(ts.trim(), TIMESTAMP_FORMAT)
            .map_err(|e| format!("bad timestamp {ts:?}: {e}"))?;
        let views = views
            .trim()
            .parse::<u64>()
            .map_err(|_| format!("bad view count {views:?}"))?;
        let rate = rate.trim().parse::<f64>().ok().filter(|r| r.is_finite());

        Ok(Self {
            timestamp,
            views,
            rate,
        })
    }
}

pub fn log_path(data_dir: &Path, platform: Platform, id: &str) -> PathBuf {
    data_dir.join(format!("{}_{}_views_data.csv", platform.name(), id))
}

#[derive(Debug, Clone)]
pub struct LogStore {
    data_dir: PathBuf,
    platform: Platform,
}

impl LogStore {
    pub fn open(data_dir: impl Into<PathBuf>, platform: Platform) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir).map_err(|e| Error::io(&data_dir, e))?;
        Ok(Self { data_dir, platform })
    }

    pub fn path(&self, id: &str) -> PathBuf {
        log_path(&self.data_dir, self.platform, id)
    }

    // one write per sample, so a line is never half-written by us
    pub fn append(&self, id: &str, sample: &Sample) -> Result<()> {
        let path = self.path(id);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| Error::io(&path, e))?;
        file.write_all(sample.to_line().as_bytes())
            .map_err(|e| Error::io(&path, e))
    }
}

/// Reads a whole log back in file order. Blank lines are skipped; an empty
/// log or any malformed row is a format error.
pub fn read_log(path: &Path) -> Result<Vec<Sample>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut samples = Vec::new();

    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| Error::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let sample = Sample::parse_line(&line).map_err(|reason| Error::Format {
            path: path.to_path_buf(),
            line: idx + 1,
            reason,
        })?;
        samples.push(sample);
    }

    if samples.is_empty() {
        return Err(Error::Format {
            path: path.to_path_buf(),
            line: 0,
            reason: "no samples".into(),
        });
    }
    Ok(samples)
}
