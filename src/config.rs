use std::time::Duration;

use serde::Deserialize;

use crate::browser::LaunchOptions;
use crate::error::ConfigError;
use crate::pipeline::RunOptions;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_viewport_width() -> u32 {
    1920
}

fn default_viewport_height() -> u32 {
    1080
}

fn default_concurrency() -> usize {
    2
}

/// Read from `BETPOLL_*` environment variables (and `.env`).
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_true")]
    pub headless: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    // Run selection
    #[serde(default)]
    pub bookmaker: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_true")]
    pub notify: bool,

    // Outputs
    #[serde(default)]
    pub readings_jsonl_path: Option<String>,
    #[serde(default)]
    pub stats_jsonl_path: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let c = config::Config::builder()
            .add_source(config::Environment::with_prefix("BETPOLL").try_parsing(true))
            .build()?;
        Self::from_config(c)
    }

    pub fn from_config(c: config::Config) -> Result<Self, ConfigError> {
        let s: Settings = c.try_deserialize()?;
        s.validate()?;
        Ok(s)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms",
                reason: "must be positive".to_string(),
            });
        }
        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err(ConfigError::Invalid {
                field: "viewport",
                reason: format!("{}x{} is empty", self.viewport_width, self.viewport_height),
            });
        }
        Ok(())
    }

    pub fn launch_options(&self) -> LaunchOptions {
        LaunchOptions {
            headless: self.headless,
            user_agent: self.user_agent.clone(),
            viewport: (self.viewport_width, self.viewport_height),
            timeout: Duration::from_millis(self.timeout_ms),
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            bookmaker: non_empty(&self.bookmaker),
            dry_run: self.dry_run,
            notify: self.notify,
        }
    }
}

pub fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_ref().map(|x| x.trim().to_string()).filter(|x| !x.is_empty())
}
