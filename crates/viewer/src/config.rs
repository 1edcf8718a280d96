use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use dronewatch_link::LinkConfig;

/// What to do with a frame that does not decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParsePolicy {
    /// Stop the view and report the error.
    #[default]
    Fail,
    /// Log the frame and keep going.
    Drop,
}

impl FromStr for ParsePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(ParsePolicy::Fail),
            "drop" => Ok(ParsePolicy::Drop),
            other => Err(anyhow!("unknown parse policy `{}` (expected `fail` or `drop`)", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub link: LinkConfig,
    pub on_parse_error: ParsePolicy,
    pub log_file: PathBuf,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            link: LinkConfig::default(),
            on_parse_error: ParsePolicy::default(),
            log_file: PathBuf::from("dronewatch.log"),
        }
    }
}

impl ViewerConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = ViewerConfig { link: LinkConfig::from_env(), ..ViewerConfig::default() };

        if let Ok(v) = env::var("DRONEWATCH_ON_PARSE_ERROR") {
            if !v.is_empty() {
                cfg.on_parse_error = v.parse()?;
            }
        }
        if let Ok(v) = env::var("DRONEWATCH_LOG_FILE") {
            if !v.is_empty() {
                cfg.log_file = PathBuf::from(v);
            }
        }

        Ok(cfg)
    }
}
