use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use semver::Version;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use utoipa::IntoParams;

type APiVersionList = [&'static str; 1];

const DEFAULT_API_VERSION: &str = "1.0.0-beta1";
// Expand this array to include all valid API versions. Versions that have been
// completely removed should be removed from this list - they're no longer valid.
const API_VERSIONS: APiVersionList = [DEFAULT_API_VERSION];

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Header)]
pub struct ApiVersion {
    /// The version of the API to use for a request.
    #[param(rename = "x-version", style = Simple, required, example = "1.0.0-beta1", value_type = String)]
    pub version: Version,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
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
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// Set the current semantic version of the endpoint API to expose to clients. All
    /// endpoints not contained in the specified version will not be exposed by the router.
    #[arg(short, long, env, default_value = DEFAULT_API_VERSION,
        value_parser = clap::builder::PossibleValuesParser::new(API_VERSIONS)
            .map(|s| s.parse::<String>().unwrap()),
        )]
    pub api_version: Option<String>,

    /// The key used to sign and verify stream tickets and bearer tokens.
    #[arg(long, env, default_value = "insecure-dev-signing-key")]
    ticket_signing_key: String,

    /// Ticket lifetime in seconds used when a request does not ask for one
    #[arg(long, env, default_value_t = 300)]
    pub ticket_default_ttl_secs: i64,

    /// Lower clamp bound for requested ticket lifetimes
    #[arg(long, env, default_value_t = 60)]
    pub ticket_min_ttl_secs: i64,

    /// Upper clamp bound for requested ticket lifetimes
    #[arg(long, env, default_value_t = 3600)]
    pub ticket_max_ttl_secs: i64,

    /// Maximum simultaneously open stream connections per remote IP
    #[arg(long, env, default_value_t = 5)]
    pub ip_connection_limit: usize,

    /// Maximum distinct devices one data stream connection may subscribe to
    #[arg(long, env, default_value_t = 10)]
    pub max_devices_per_connection: usize,

    /// Seconds between heartbeat frames on every open connection
    #[arg(long, env, default_value_t = 25)]
    pub heartbeat_interval_secs: u64,

    /// Per-subscriber event buffer size for the broadcast router
    #[arg(long, env, default_value_t = 256)]
    pub event_buffer_size: usize,

    /// Base URL of the device registry service
    #[arg(long, env, default_value = "http://localhost:8081")]
    device_registry_base_url: String,

    /// API key sent to the device registry service, if it requires one
    #[arg(long, env)]
    device_registry_api_key: Option<String>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        // Parse with no CLI arguments so tests are not affected by the test
        // binary's own argv; env vars still apply.
        Config::parse_from([env!("CARGO_PKG_NAME")])
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn api_version(&self) -> &str {
        self.api_version
            .as_ref()
            .expect("No API version string provided")
    }

    pub fn ticket_signing_key(&self) -> &str {
        &self.ticket_signing_key
    }

    pub fn set_ticket_signing_key(mut self, key: String) -> Self {
        self.ticket_signing_key = key;
        self
    }

    pub fn device_registry_base_url(&self) -> &str {
        &self.device_registry_base_url
    }

    pub fn device_registry_api_key(&self) -> Option<String> {
        self.device_registry_api_key.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_limits() {
        let config = Config::default();
        assert_eq!(config.ticket_default_ttl_secs, 300);
        assert_eq!(config.ticket_min_ttl_secs, 60);
        assert_eq!(config.ticket_max_ttl_secs, 3600);
        assert_eq!(config.ip_connection_limit, 5);
        assert_eq!(config.max_devices_per_connection, 10);
        assert_eq!(config.heartbeat_interval_secs, 25);
    }

    #[test]
    fn test_runtime_env_parses_case_insensitively() {
        assert_eq!("PRODUCTION".parse::<RustEnv>(), Ok(RustEnv::Production));
        assert_eq!("staging".parse::<RustEnv>(), Ok(RustEnv::Staging));
        assert!("qa".parse::<RustEnv>().is_err());
    }
}
