use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use hcplog_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{CommandResult, EXIT_CONFIG};

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "config",
                "config_validation",
                format!("config validation failed: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let output = render(&config, config_file_doc.as_ref(), config_file_path.as_deref());
    CommandResult { exit_code: 0, output }
}

fn render(config: &AppConfig, file_doc: Option<&Value>, file_path: Option<&Path>) -> String {
    let llm_api_key = redact_secret(config.llm.api_key.as_ref().map(|key| key.expose_secret()));
    let fields: [(&str, String, &[&str]); 14] = [
        ("database.url", config.database.url.clone(), &["HCPLOG_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["HCPLOG_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["HCPLOG_DATABASE_TIMEOUT_SECS"],
        ),
        ("llm.provider", format!("{:?}", config.llm.provider), &["HCPLOG_LLM_PROVIDER"]),
        ("llm.model", config.llm.model.clone(), &["HCPLOG_LLM_MODEL", "GROQ_MODEL"]),
        ("llm.base_url", config.llm.resolved_base_url(), &["HCPLOG_LLM_BASE_URL"]),
        ("llm.api_key", llm_api_key, &["HCPLOG_LLM_API_KEY", "GROQ_API_KEY"]),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), &["HCPLOG_LLM_TIMEOUT_SECS"]),
        ("server.bind_address", config.server.bind_address.clone(), &["HCPLOG_SERVER_BIND_ADDRESS"]),
        ("server.port", config.server.port.to_string(), &["HCPLOG_SERVER_PORT"]),
        (
            "server.cors_origins",
            config.server.cors_origins.join(","),
            &["HCPLOG_SERVER_CORS_ORIGINS"],
        ),
        (
            "agent.strict_patch_fields",
            config.agent.strict_patch_fields.to_string(),
            &["HCPLOG_AGENT_STRICT_PATCH_FIELDS"],
        ),
        ("logging.level", config.logging.level.clone(), &["HCPLOG_LOGGING_LEVEL", "HCPLOG_LOG_LEVEL"]),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["HCPLOG_LOGGING_FORMAT", "HCPLOG_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in fields {
        lines.push(render_line(key, &value, field_source(key, env_keys, file_doc, file_path)));
    }
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("hcplog.toml"), PathBuf::from("config/hcplog.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
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

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a short vendor prefix such as `gsk_` so operators can tell keys apart.
fn redact_secret(secret: Option<&str>) -> String {
    let Some(secret) = secret.map(str::trim) else {
        return "<unset>".to_string();
    };
    if secret.is_empty() {
        return "<empty>".to_string();
    }

    match secret.split_once(['_', '-']) {
        Some((prefix, _)) if prefix.len() <= 4 => format!("{prefix}_***"),
        _ => "<redacted>".to_string(),
    }
}
