use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default backend base URL used when `BASE_URL` is not set.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError(String);

impl fmt::Display for RustEnvParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "unknown runtime environment '{}' (expected development, staging or production)",
            self.0
        )
    }
}

impl StdError for RustEnvParseError {}

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError(level.to_string())),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Base URL of the print shop backend (e.g. https://shop.example.com)
    #[arg(short, long, env, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Path of the realtime (Server-Sent Events) endpoint, relative to the base URL
    #[arg(long, env, default_value = "api/realtime.php")]
    realtime_path: String,

    /// Path of the endpoint handing out CSRF tokens
    #[arg(long, env, default_value = "api/csrf_token.php")]
    csrf_path: String,

    /// Path of the session login endpoint
    #[arg(long, env, default_value = "api/login.php")]
    login_path: String,

    /// Staff credentials used to open a session (format: email:password)
    #[arg(long, env)]
    credentials: Option<String>,

    /// Consecutive stream failures tolerated before falling back to polling
    #[arg(long, env, default_value_t = 5)]
    pub max_reconnect_attempts: u32,

    /// Initial reconnect delay in milliseconds
    #[arg(long, env, default_value_t = 1000)]
    pub reconnect_delay_ms: u64,

    /// Ceiling for the reconnect delay in milliseconds
    #[arg(long, env, default_value_t = 30_000)]
    pub max_reconnect_delay_ms: u64,

    /// Seconds between refreshes once the stream has given up
    #[arg(long, env, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval_secs: u64,

    /// Timeout in seconds for a single REST request
    #[arg(long, env, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Directory that receives one rendered HTML file per panel
    #[arg(short, long, env, default_value = "panels")]
    output_dir: PathBuf,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(short, long, env, default_value_t = LevelFilter::Info)]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(short, long, env, default_value_t = RustEnv::Development)]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a backend-relative path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub fn realtime_url(&self) -> String {
        self.endpoint(&self.realtime_path)
    }

    pub fn csrf_path(&self) -> &str {
        &self.csrf_path
    }

    pub fn login_path(&self) -> &str {
        &self.login_path
    }

    pub fn credentials(&self) -> Option<String> {
        self.credentials.clone()
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn max_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.max_reconnect_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
