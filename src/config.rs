use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, VideoError};

pub(crate) const TOGETHER_KEY_VAR: &str = "TOGETHER_AI_API_KEY";
pub(crate) const PEXELS_KEY_VAR: &str = "PEXELS_API_KEY";

const DEFAULT_TOGETHER_API_BASE: &str = "https://api.together.xyz/v1";
const DEFAULT_TOGETHER_MODEL: &str = "meta-llama/Llama-3.3-70B-Instruct-Turbo-Free";
const DEFAULT_PEXELS_API_BASE: &str = "https://api.pexels.com/v1";

/// Runtime settings. Credentials are mandatory; everything else has a default.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub together_api_key: String,
    pub together_api_base: String,
    pub together_model: String,
    pub pexels_api_key: String,
    pub pexels_api_base: String,
    pub output_dir: PathBuf,
    pub font_path: Option<PathBuf>,
    pub timeout: Duration,
}

impl Config {
    pub(crate) fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| -> Result<String> {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(VideoError::CredentialMissing(key))
        };
        let optional = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| default.to_owned())
        };

        Ok(Self {
            together_api_key: required(TOGETHER_KEY_VAR)?,
            together_api_base: optional("TOGETHER_API_BASE", DEFAULT_TOGETHER_API_BASE),
            together_model: optional("TOGETHER_MODEL", DEFAULT_TOGETHER_MODEL),
            pexels_api_key: required(PEXELS_KEY_VAR)?,
            pexels_api_base: optional("PEXELS_API_BASE", DEFAULT_PEXELS_API_BASE),
            output_dir: PathBuf::from("outputs"),
            font_path: None,
            timeout: Duration::from_secs(300),
        })
    }

    pub(crate) fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub(crate) fn with_font_path(mut self, font_path: Option<PathBuf>) -> Self {
        self.font_path = font_path;
        self
    }

    pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn script_path(&self) -> PathBuf {
        self.output_dir.join("script.txt")
    }

    pub(crate) fn video_path(&self) -> PathBuf {
        self.output_dir.join("final_video.avi")
    }

    pub(crate) fn scratch_dir(&self) -> &Path {
        &self.output_dir
    }
}
