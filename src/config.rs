use std::{path::PathBuf, time::Duration};

use crate::cli::Cli;
use crate::constants::{INSTAGRAM_TOKEN_ENV, YOUTUBE_KEY_ENV};
use crate::error::{Error, Result};
use crate::platform::Platform;

#[derive(Clone, Default)]
pub struct Credentials {
    instagram_access_token: Option<String>,
    youtube_api_key: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    // blank values count as missing
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            instagram_access_token: read(INSTAGRAM_TOKEN_ENV),
            youtube_api_key: read(YOUTUBE_KEY_ENV),
        }
    }

    pub fn secret(&self, platform: Platform) -> Result<&str> {
        let (value, var) = match platform {
            Platform::TikTok => return Ok(""),
            Platform::Instagram => (&self.instagram_access_token, INSTAGRAM_TOKEN_ENV),
            Platform::YouTube => (&self.youtube_api_key, YOUTUBE_KEY_ENV),
        };
        value
            .as_deref()
            .ok_or_else(|| Error::Config(format!("{var} must be set to track {platform}")))
    }

    pub fn check(&self, platform: Platform) -> Result<()> {
        self.secret(platform).map(drop)
    }
}

// Secrets never show up in debug output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("Credentials")
            .field("instagram_access_token", &mask(&self.instagram_access_token))
            .field("youtube_api_key", &mask(&self.youtube_api_key))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub platform: Platform,
    pub ids: Vec<String>,
    pub interval: Duration,
    pub timeout: Duration,
    pub data_dir: PathBuf,
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.interval == 0 {
            return Err(Error::Config("--interval must be at least 1 second".into()));
        }
        if cli.timeout == 0 {
            return Err(Error::Config("--timeout must be at least 1 second".into()));
        }

        // keep the first occurrence of each identifier, in the order given
        let mut ids: Vec<String> = Vec::with_capacity(cli.ids.len());
        for id in &cli.ids {
            let id = id.trim();
            if id.is_empty() {
                return Err(Error::Config("identifiers must not be empty".into()));
            }
            // ids become part of a log file name
            if id.contains(['/', '\\']) {
                return Err(Error::Config(format!(
                    "identifier {id:?} must not contain a path separator"
                )));
            }
            if !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }

        Ok(Self {
            platform: cli.platform,
            ids,
            interval: Duration::from_secs(cli.interval),
            timeout: Duration::from_secs(cli.timeout),
            data_dir: cli.data_dir.clone(),
        })
    }
}
