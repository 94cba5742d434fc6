use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::approvals::ApprovalPolicy;
use crate::commission::spiff::{CampaignSpiffPolicy, SpiffCampaign};
use crate::domain::actor::ActorRole;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub commissions: CommissionsConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommissionsConfig {
    /// ISO 4217 code amounts are reported in. Informational only; no conversion happens.
    pub currency: String,
    pub reviewer_roles: Vec<ActorRole>,
    pub payout_roles: Vec<ActorRole>,
    pub spiff_enabled: bool,
    pub spiff_campaigns: Vec<SpiffCampaign>,
}

impl CommissionsConfig {
    pub fn approval_policy(&self) -> ApprovalPolicy {
        ApprovalPolicy {
            reviewer_roles: self.reviewer_roles.clone(),
            payout_roles: self.payout_roles.clone(),
        }
    }

    /// Campaigns to apply, or `None` when spiffs are switched off.
    pub fn spiff_policy(&self) -> Option<CampaignSpiffPolicy> {
        self.spiff_enabled.then(|| CampaignSpiffPolicy::new(self.spiff_campaigns.clone()))
    }
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
    pub log_format: Option<LogFormat>,
    pub spiff_enabled: Option<bool>,
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
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        let approval = ApprovalPolicy::default();
        Self {
            database: DatabaseConfig {
                url: "sqlite://commissions.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            commissions: CommissionsConfig {
                currency: "USD".to_string(),
                reviewer_roles: approval.reviewer_roles,
                payout_roles: approval.payout_roles,
                spiff_enabled: false,
                spiff_campaigns: Vec::new(),
            },
        }
    }
}

impl std::str::FromStr for LogFormat {
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
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("commissions.toml"));
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

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        if let Some(commissions) = patch.commissions {
            if let Some(currency) = commissions.currency {
                self.commissions.currency = currency;
            }
            if let Some(reviewer_roles) = commissions.reviewer_roles {
                self.commissions.reviewer_roles = reviewer_roles;
            }
            if let Some(payout_roles) = commissions.payout_roles {
                self.commissions.payout_roles = payout_roles;
            }
            if let Some(spiff_enabled) = commissions.spiff_enabled {
                self.commissions.spiff_enabled = spiff_enabled;
            }
            if let Some(spiff_campaigns) = commissions.spiff_campaigns {
                self.commissions.spiff_campaigns = spiff_campaigns;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COMMISSIONS_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("COMMISSIONS_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("COMMISSIONS_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("COMMISSIONS_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("COMMISSIONS_DATABASE_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("COMMISSIONS_LOGGING_LEVEL").or_else(|| read_env("COMMISSIONS_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COMMISSIONS_LOGGING_FORMAT").or_else(|| read_env("COMMISSIONS_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        if let Some(value) = read_env("COMMISSIONS_CURRENCY") {
            self.commissions.currency = value;
        }
        if let Some(value) = read_env("COMMISSIONS_REVIEWER_ROLES") {
            self.commissions.reviewer_roles = parse_roles("COMMISSIONS_REVIEWER_ROLES", &value)?;
        }
        if let Some(value) = read_env("COMMISSIONS_PAYOUT_ROLES") {
            self.commissions.payout_roles = parse_roles("COMMISSIONS_PAYOUT_ROLES", &value)?;
        }
        if let Some(value) = read_env("COMMISSIONS_SPIFF_ENABLED") {
            self.commissions.spiff_enabled = parse_bool("COMMISSIONS_SPIFF_ENABLED", &value)?;
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
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(spiff_enabled) = overrides.spiff_enabled {
            self.commissions.spiff_enabled = spiff_enabled;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_logging(&self.logging)?;
        validate_commissions(&self.commissions)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("commissions.toml"), PathBuf::from("config/commissions.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
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

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_commissions(commissions: &CommissionsConfig) -> Result<(), ConfigError> {
    let currency = commissions.currency.trim();
    if currency.len() != 3 || !currency.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ConfigError::Validation(
            "commissions.currency must be a three-letter uppercase ISO 4217 code".to_string(),
        ));
    }

    if commissions.reviewer_roles.is_empty() {
        return Err(ConfigError::Validation(
            "commissions.reviewer_roles must name at least one role".to_string(),
        ));
    }
    if commissions.reviewer_roles.contains(&ActorRole::Partner) {
        return Err(ConfigError::Validation(
            "commissions.reviewer_roles must not include `partner`".to_string(),
        ));
    }
    if commissions.payout_roles.is_empty() {
        return Err(ConfigError::Validation(
            "commissions.payout_roles must name at least one role".to_string(),
        ));
    }

    for campaign in &commissions.spiff_campaigns {
        if campaign.ends_at < campaign.starts_at {
            return Err(ConfigError::Validation(format!(
                "commissions.spiff_campaigns `{}` ends before it starts",
                campaign.id
            )));
        }
    }

    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
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

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Comma-separated role list, e.g. `admin,finance`.
fn parse_roles(key: &str, value: &str) -> Result<Vec<ActorRole>, ConfigError> {
    value
        .split(',')
        .filter(|role| !role.trim().is_empty())
        .map(|role| {
            role.parse::<ActorRole>().map_err(|_| ConfigError::InvalidEnvOverride {
                key: key.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    logging: Option<LoggingPatch>,
    commissions: Option<CommissionsPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct CommissionsPatch {
    currency: Option<String>,
    reviewer_roles: Option<Vec<ActorRole>>,
    payout_roles: Option<Vec<ActorRole>>,
    spiff_enabled: Option<bool>,
    spiff_campaigns: Option<Vec<SpiffCampaign>>,
}
