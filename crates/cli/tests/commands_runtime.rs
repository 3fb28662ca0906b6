use std::env;
use std::sync::{Mutex, OnceLock};

use hcplog_cli::commands::{config, doctor, migrate, seed};
use serde_json::Value;

const OLLAMA: &[(&str, &str)] =
    &[("HCPLOG_LLM_PROVIDER", "ollama"), ("HCPLOG_DATABASE_URL", "sqlite::memory:")];

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(OLLAMA, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_without_llm_key() {
    with_env(&[("HCPLOG_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn migrate_returns_db_failure_for_unreachable_database() {
    with_env(
        &[
            ("HCPLOG_LLM_PROVIDER", "ollama"),
            ("HCPLOG_DATABASE_URL", "sqlite:///nonexistent-dir/hcplog/none.db"),
            ("HCPLOG_DATABASE_TIMEOUT_SECS", "1"),
        ],
        || {
            let result = migrate::run();
            assert_eq!(result.exit_code, 4, "expected db connectivity failure code");
            assert_eq!(parse_payload(&result.output)["error_class"], "db_connectivity");
        },
    );
}

#[test]
fn seed_lists_demo_contacts() {
    with_env(OLLAMA, || {
        let result = seed::run();
        assert_eq!(result.exit_code, 0, "expected seed success");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "seed");
        assert_eq!(payload["status"], "ok");

        let message = payload["message"].as_str().unwrap_or("");
        assert!(message.contains("  - 1: Dr. Maya Lee (Cardiology)"));
        assert!(message.contains("  - 5: Dr. Hannah Kim (General Practice)"));
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("seed.db").display());

    with_env(&[("HCPLOG_LLM_PROVIDER", "ollama"), ("HCPLOG_DATABASE_URL", &url)], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);

        assert_eq!(first_payload["message"], second_payload["message"]);
    });
}

#[test]
fn doctor_passes_once_file_database_is_migrated() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("doctor.db").display());

    with_env(&[("HCPLOG_LLM_PROVIDER", "ollama"), ("HCPLOG_DATABASE_URL", &url)], || {
        let before = doctor::run(true);
        assert_eq!(before.exit_code, 1);
        let report = parse_payload(&before.output);
        assert_eq!(report["overall_status"], "fail");
        assert_eq!(check_status(&report, "database_connectivity"), "pass");
        assert_eq!(check_status(&report, "schema_migrations"), "fail");

        assert_eq!(migrate::run().exit_code, 0);

        let after = doctor::run(true);
        assert_eq!(after.exit_code, 0, "doctor output: {}", after.output);
        assert_eq!(parse_payload(&after.output)["overall_status"], "pass");
    });
}

#[test]
fn doctor_skips_dependent_checks_when_config_is_invalid() {
    with_env(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 1);

        let report = parse_payload(&result.output);
        assert_eq!(check_status(&report, "config_validation"), "fail");
        assert_eq!(check_status(&report, "llm_settings"), "skipped");
        assert_eq!(check_status(&report, "database_connectivity"), "skipped");
    });
}

#[test]
fn config_redacts_api_key_and_attributes_env_sources() {
    with_env(
        &[
            ("HCPLOG_LLM_API_KEY", "gsk_live_secret_value"),
            ("HCPLOG_SERVER_PORT", "9100"),
            ("HCPLOG_DATABASE_URL", "sqlite::memory:"),
        ],
        || {
            let result = config::run();
            assert_eq!(result.exit_code, 0, "config output: {}", result.output);

            assert!(result.output.contains("- server.port = 9100 (source: env (HCPLOG_SERVER_PORT))"));
            assert!(result.output.contains("- llm.api_key = gsk_*** (source: env (HCPLOG_LLM_API_KEY))"));
            assert!(!result.output.contains("secret_value"));
            assert!(result.output.contains("- llm.model = gemma2-9b-it (source: default)"));
        },
    );
}

fn check_status<'a>(report: &'a Value, name: &str) -> &'a str {
    report["checks"]
        .as_array()
        .expect("checks")
        .iter()
        .find(|check| check["name"] == name)
        .and_then(|check| check["status"].as_str())
        .expect("check present")
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "HCPLOG_DATABASE_URL",
        "HCPLOG_DATABASE_MAX_CONNECTIONS",
        "HCPLOG_DATABASE_TIMEOUT_SECS",
        "HCPLOG_LLM_PROVIDER",
        "HCPLOG_LLM_API_KEY",
        "HCPLOG_LLM_BASE_URL",
        "HCPLOG_LLM_MODEL",
        "HCPLOG_LLM_TIMEOUT_SECS",
        "GROQ_API_KEY",
        "GROQ_MODEL",
        "HCPLOG_SERVER_BIND_ADDRESS",
        "HCPLOG_SERVER_PORT",
        "HCPLOG_SERVER_CORS_ORIGINS",
        "HCPLOG_AGENT_STRICT_PATCH_FIELDS",
        "HCPLOG_LOGGING_LEVEL",
        "HCPLOG_LOGGING_FORMAT",
        "HCPLOG_LOG_LEVEL",
        "HCPLOG_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
