use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub approval: ApprovalConfig,
    pub sales: SalesConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

/// Budget-rule configuration. The ratios are explicit, named parameters
/// rather than constants baked into the decision paths.
#[derive(Clone, Debug)]
pub struct ApprovalConfig {
    pub submission_mode: SubmissionMode,
    /// Ceiling fraction applied when a request is decided at submission time.
    pub submission_ratio: Decimal,
    /// Ceiling fraction re-checked when an operator manually approves.
    pub manual_approval_ratio: Decimal,
}

#[derive(Clone, Debug)]
pub struct SalesConfig {
    /// Remote sales report endpoint merged into the finance report. Absent
    /// means the collaborator is disabled, not unavailable.
    pub report_url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Whether submission decides the budget rule synchronously or leaves the
/// request pending for the manual endpoints.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionMode {
    AutoDecide,
    Deferred,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub submission_mode: Option<SubmissionMode>,
    pub sales_report_url: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://indago.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 5003 },
            approval: ApprovalConfig {
                submission_mode: SubmissionMode::AutoDecide,
                submission_ratio: Decimal::new(60, 2),
                manual_approval_ratio: Decimal::new(50, 2),
            },
            sales: SalesConfig { report_url: None, timeout_secs: 5 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for SubmissionMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto_decide" => Ok(Self::AutoDecide),
            "deferred" => Ok(Self::Deferred),
            other => Err(ConfigError::Validation(format!(
                "unsupported submission mode `{other}` (expected auto_decide|deferred)"
            ))),
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Precedence: defaults, then the config file, then `INDAGO_*` environment
    /// variables, then programmatic overrides. Validation runs last and fails
    /// fast.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("indago.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(approval) = patch.approval {
            if let Some(mode) = approval.submission_mode {
                self.approval.submission_mode = mode;
            }
            if let Some(ratio) = approval.submission_ratio {
                self.approval.submission_ratio = ratio;
            }
            if let Some(ratio) = approval.manual_approval_ratio {
                self.approval.manual_approval_ratio = ratio;
            }
        }

        if let Some(sales) = patch.sales {
            if let Some(report_url) = sales.report_url {
                self.sales.report_url = Some(report_url);
            }
            if let Some(timeout_secs) = sales.timeout_secs {
                self.sales.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("INDAGO_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("INDAGO_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("INDAGO_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("INDAGO_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("INDAGO_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("INDAGO_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("INDAGO_SERVER_PORT") {
            self.server.port = parse_u16("INDAGO_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("INDAGO_APPROVAL_SUBMISSION_MODE") {
            self.approval.submission_mode = value.parse()?;
        }
        if let Some(value) = read_env("INDAGO_APPROVAL_SUBMISSION_RATIO") {
            self.approval.submission_ratio = parse_ratio("INDAGO_APPROVAL_SUBMISSION_RATIO", &value)?;
        }
        if let Some(value) = read_env("INDAGO_APPROVAL_MANUAL_RATIO") {
            self.approval.manual_approval_ratio =
                parse_ratio("INDAGO_APPROVAL_MANUAL_RATIO", &value)?;
        }

        if let Some(value) = read_env("INDAGO_SALES_REPORT_URL") {
            self.sales.report_url = Some(value);
        }
        if let Some(value) = read_env("INDAGO_SALES_TIMEOUT_SECS") {
            self.sales.timeout_secs = parse_u64("INDAGO_SALES_TIMEOUT_SECS", &value)?;
        }

        let log_level = read_env("INDAGO_LOGGING_LEVEL").or_else(|| read_env("INDAGO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("INDAGO_LOGGING_FORMAT").or_else(|| read_env("INDAGO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(mode) = overrides.submission_mode {
            self.approval.submission_mode = mode;
        }
        if let Some(report_url) = overrides.sales_report_url {
            self.sales.report_url = Some(report_url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_server(&self.server)?;
        validate_approval(&self.approval)?;
        validate_sales(&self.sales)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("indago.toml"), PathBuf::from("config/indago.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&raw)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_approval(approval: &ApprovalConfig) -> Result<(), ConfigError> {
    for (name, ratio) in [
        ("approval.submission_ratio", approval.submission_ratio),
        ("approval.manual_approval_ratio", approval.manual_approval_ratio),
    ] {
        if ratio <= Decimal::ZERO || ratio > Decimal::ONE {
            return Err(ConfigError::Validation(format!(
                "{name} must be greater than 0 and at most 1"
            )));
        }
    }
    Ok(())
}

fn validate_sales(sales: &SalesConfig) -> Result<(), ConfigError> {
    if let Some(url) = &sales.report_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "sales.report_url must start with http:// or https://".to_string(),
            ));
        }
    }
    if sales.timeout_secs == 0 || sales.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "sales.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_ratio(key: &str, value: &str) -> Result<Decimal, ConfigError> {
    value.parse::<Decimal>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    server: Option<ServerPatch>,
    approval: Option<ApprovalPatch>,
    sales: Option<SalesPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct ApprovalPatch {
    submission_mode: Option<SubmissionMode>,
    submission_ratio: Option<Decimal>,
    manual_approval_ratio: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct SalesPatch {
    report_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
