use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use commissions_core::config::{AppConfig, LoadOptions};
use commissions_core::domain::actor::ActorRole;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let fields = vec![
        field("database.url", config.database.url.clone(), &["COMMISSIONS_DATABASE_URL"]),
        field(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["COMMISSIONS_DATABASE_MAX_CONNECTIONS"],
        ),
        field(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["COMMISSIONS_DATABASE_TIMEOUT_SECS"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["COMMISSIONS_LOGGING_LEVEL", "COMMISSIONS_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            format!("{:?}", config.logging.format).to_ascii_lowercase(),
            &["COMMISSIONS_LOGGING_FORMAT", "COMMISSIONS_LOG_FORMAT"],
        ),
        field("commissions.currency", config.commissions.currency.clone(), &["COMMISSIONS_CURRENCY"]),
        field(
            "commissions.reviewer_roles",
            render_roles(&config.commissions.reviewer_roles),
            &["COMMISSIONS_REVIEWER_ROLES"],
        ),
        field(
            "commissions.payout_roles",
            render_roles(&config.commissions.payout_roles),
            &["COMMISSIONS_PAYOUT_ROLES"],
        ),
        field(
            "commissions.spiff_enabled",
            config.commissions.spiff_enabled.to_string(),
            &["COMMISSIONS_SPIFF_ENABLED"],
        ),
        field(
            "commissions.spiff_campaigns",
            config.commissions.spiff_campaigns.len().to_string(),
            &[],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(
        fields
            .into_iter()
            .map(|(key, value, env_keys)| render_line(key, &value, source(key, env_keys))),
    );
    lines.join("\n")
}

type Field = (&'static str, String, &'static [&'static str]);

fn field(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Field {
    (key, value, env_keys)
}

fn render_roles(roles: &[ActorRole]) -> String {
    roles.iter().map(|role| role.as_str()).collect::<Vec<_>>().join(",")
}

fn detect_config_path() -> Option<PathBuf> {
    ["commissions.toml", "config/commissions.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if config_file_doc.is_some_and(|doc| contains_path(doc, key_path)) {
        let file_path = config_file_path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    key_path
        .split('.')
        .try_fold(root, |current, key| current.get(key))
        .is_some()
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use commissions_core::domain::actor::ActorRole;
    use toml::Value;

    use super::{contains_path, field_source, render_roles};

    #[test]
    fn nested_keys_are_found_in_file_document() {
        let doc: Value = "[commissions]\ncurrency = \"EUR\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "commissions.currency"));
        assert!(!contains_path(&doc, "commissions.reviewer_roles"));
        assert_eq!(field_source("commissions.currency", &[], Some(&doc), None), "file (config file)");
        assert_eq!(field_source("database.url", &[], Some(&doc), None), "default");
    }

    #[test]
    fn roles_render_as_comma_list() {
        assert_eq!(render_roles(&[ActorRole::Admin, ActorRole::Finance]), "admin,finance");
    }
}
