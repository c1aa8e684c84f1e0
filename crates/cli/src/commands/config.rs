use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use toml::Value;
use triad_core::config::{AppConfig, LoadOptions};

struct Field {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", field.key_path, field.value));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<Field> {
    let providers = &config.providers;
    vec![
        Field {
            key_path: "database.url",
            env_keys: &["TRIAD_DATABASE_URL"],
            value: config.database.url.clone(),
        },
        Field {
            key_path: "database.max_connections",
            env_keys: &["TRIAD_DATABASE_MAX_CONNECTIONS"],
            value: config.database.max_connections.to_string(),
        },
        Field {
            key_path: "database.timeout_secs",
            env_keys: &["TRIAD_DATABASE_TIMEOUT_SECS"],
            value: config.database.timeout_secs.to_string(),
        },
        Field {
            key_path: "providers.timeout_secs",
            env_keys: &["TRIAD_PROVIDER_TIMEOUT_SECS"],
            value: providers.timeout_secs.to_string(),
        },
        Field {
            key_path: "providers.openai.api_key",
            env_keys: &["TRIAD_OPENAI_API_KEY", "OPENAI_API_KEY"],
            value: secret_state(providers.openai.api_key.is_some()),
        },
        Field {
            key_path: "providers.openai.model",
            env_keys: &["TRIAD_OPENAI_MODEL", "OPENAI_MODEL"],
            value: providers.openai.model.clone(),
        },
        Field {
            key_path: "providers.openai.base_url",
            env_keys: &["TRIAD_OPENAI_BASE_URL"],
            value: providers.openai.base_url.clone(),
        },
        Field {
            key_path: "providers.vertex.project",
            env_keys: &["TRIAD_VERTEX_PROJECT", "VERTEX_PROJECT"],
            value: providers.vertex.project.clone().unwrap_or_else(|| "<unset>".to_string()),
        },
        Field {
            key_path: "providers.vertex.location",
            env_keys: &["TRIAD_VERTEX_LOCATION", "VERTEX_LOCATION"],
            value: providers.vertex.location.clone(),
        },
        Field {
            key_path: "providers.vertex.model",
            env_keys: &["TRIAD_VERTEX_MODEL", "VERTEX_MODEL"],
            value: providers.vertex.model.clone(),
        },
        Field {
            key_path: "providers.vertex.access_token",
            env_keys: &["TRIAD_VERTEX_ACCESS_TOKEN"],
            value: secret_state(providers.vertex.access_token.is_some()),
        },
        Field {
            key_path: "providers.vertex.base_url",
            env_keys: &["TRIAD_VERTEX_BASE_URL"],
            value: providers.vertex.base_url.clone().unwrap_or_else(|| "<regional>".to_string()),
        },
        Field {
            key_path: "providers.anthropic.api_key",
            env_keys: &["TRIAD_ANTHROPIC_API_KEY", "ANTHROPIC_API_KEY"],
            value: secret_state(providers.anthropic.api_key.is_some()),
        },
        Field {
            key_path: "providers.anthropic.model",
            env_keys: &["TRIAD_ANTHROPIC_MODEL", "ANTHROPIC_MODEL"],
            value: providers.anthropic.model.clone(),
        },
        Field {
            key_path: "providers.anthropic.base_url",
            env_keys: &["TRIAD_ANTHROPIC_BASE_URL"],
            value: providers.anthropic.base_url.clone(),
        },
        Field {
            key_path: "providers.anthropic.max_tokens",
            env_keys: &["TRIAD_ANTHROPIC_MAX_TOKENS", "ANTHROPIC_MAX_TOKENS"],
            value: providers.anthropic.max_tokens.to_string(),
        },
        Field {
            key_path: "orchestrator.default_module_id",
            env_keys: &["TRIAD_ORCHESTRATOR_DEFAULT_MODULE_ID"],
            value: config.orchestrator.default_module_id.clone(),
        },
        Field {
            key_path: "orchestrator.round_timeout_secs",
            env_keys: &["TRIAD_ORCHESTRATOR_ROUND_TIMEOUT_SECS"],
            value: config.orchestrator.round_timeout_secs.to_string(),
        },
        Field {
            key_path: "orchestrator.plan_version",
            env_keys: &[],
            value: config.orchestrator.plan_version.clone(),
        },
        Field {
            key_path: "logging.level",
            env_keys: &["TRIAD_LOGGING_LEVEL", "TRIAD_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Field {
            key_path: "logging.format",
            env_keys: &["TRIAD_LOGGING_FORMAT", "TRIAD_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format),
        },
    ]
}

fn secret_state(present: bool) -> String {
    let state = if present { "<redacted>" } else { "<unset>" };
    state.to_string()
}

fn detect_config_path() -> Option<PathBuf> {
    ["triad.toml", "config/triad.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
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
