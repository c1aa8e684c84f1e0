use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::module::DEFAULT_MODULE_ID;
use crate::domain::plan::PLAN_CONTRACT_VERSION;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub providers: ProvidersConfig,
    pub orchestrator: OrchestratorConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ProvidersConfig {
    pub openai: OpenAiConfig,
    pub vertex: VertexConfig,
    pub anthropic: AnthropicConfig,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
}

#[derive(Clone, Debug)]
pub struct VertexConfig {
    pub project: Option<String>,
    pub location: String,
    pub model: String,
    pub access_token: Option<SecretString>,
    /// Overrides the regional `https://{location}-aiplatform.googleapis.com` host.
    pub base_url: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AnthropicConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
    pub max_tokens: u32,
}

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    pub default_module_id: String,
    pub round_timeout_secs: u64,
    pub plan_version: String,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
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
    pub default_module_id: Option<String>,
    pub round_timeout_secs: Option<u64>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub vertex_project: Option<String>,
    pub vertex_access_token: Option<String>,
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
        Self {
            database: DatabaseConfig {
                url: "sqlite://triad.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            providers: ProvidersConfig {
                openai: OpenAiConfig {
                    api_key: None,
                    model: "gpt-4.1-mini".to_string(),
                    base_url: "https://api.openai.com/v1".to_string(),
                },
                vertex: VertexConfig {
                    project: None,
                    location: "asia-southeast1".to_string(),
                    model: "gemini-1.5-pro".to_string(),
                    access_token: None,
                    base_url: None,
                },
                anthropic: AnthropicConfig {
                    api_key: None,
                    model: "claude-3-5-sonnet-20240620".to_string(),
                    base_url: "https://api.anthropic.com/v1".to_string(),
                    max_tokens: 4096,
                },
                timeout_secs: 60,
            },
            orchestrator: OrchestratorConfig {
                default_module_id: DEFAULT_MODULE_ID.to_string(),
                round_timeout_secs: 120,
                plan_version: PLAN_CONTRACT_VERSION.to_string(),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("triad.toml"));
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

        if let Some(providers) = patch.providers {
            if let Some(timeout_secs) = providers.timeout_secs {
                self.providers.timeout_secs = timeout_secs;
            }
            if let Some(openai) = providers.openai {
                let target = &mut self.providers.openai;
                if let Some(openai_api_key_value) = openai.api_key {
                    target.api_key = Some(secret_value(openai_api_key_value));
                }
                if let Some(model) = openai.model {
                    target.model = model;
                }
                if let Some(base_url) = openai.base_url {
                    target.base_url = base_url;
                }
            }
            if let Some(vertex) = providers.vertex {
                let target = &mut self.providers.vertex;
                if let Some(project) = vertex.project {
                    target.project = Some(project);
                }
                if let Some(location) = vertex.location {
                    target.location = location;
                }
                if let Some(model) = vertex.model {
                    target.model = model;
                }
                if let Some(vertex_access_token_value) = vertex.access_token {
                    target.access_token = Some(secret_value(vertex_access_token_value));
                }
                if let Some(base_url) = vertex.base_url {
                    target.base_url = Some(base_url);
                }
            }
            if let Some(anthropic) = providers.anthropic {
                let target = &mut self.providers.anthropic;
                if let Some(anthropic_api_key_value) = anthropic.api_key {
                    target.api_key = Some(secret_value(anthropic_api_key_value));
                }
                if let Some(model) = anthropic.model {
                    target.model = model;
                }
                if let Some(base_url) = anthropic.base_url {
                    target.base_url = base_url;
                }
                if let Some(max_tokens) = anthropic.max_tokens {
                    target.max_tokens = max_tokens;
                }
            }
        }

        if let Some(orchestrator) = patch.orchestrator {
            if let Some(default_module_id) = orchestrator.default_module_id {
                self.orchestrator.default_module_id = default_module_id;
            }
            if let Some(round_timeout_secs) = orchestrator.round_timeout_secs {
                self.orchestrator.round_timeout_secs = round_timeout_secs;
            }
            if let Some(plan_version) = orchestrator.plan_version {
                self.orchestrator.plan_version = plan_version;
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
        if let Some(value) = read_env("TRIAD_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("TRIAD_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("TRIAD_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("TRIAD_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("TRIAD_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("TRIAD_PROVIDER_TIMEOUT_SECS") {
            self.providers.timeout_secs = parse_u64("TRIAD_PROVIDER_TIMEOUT_SECS", &value)?;
        }

        let openai_key = read_env("TRIAD_OPENAI_API_KEY").or_else(|| read_env("OPENAI_API_KEY"));
        if let Some(value) = openai_key {
            self.providers.openai.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("TRIAD_OPENAI_MODEL").or_else(|| read_env("OPENAI_MODEL")) {
            self.providers.openai.model = value;
        }
        if let Some(value) = read_env("TRIAD_OPENAI_BASE_URL") {
            self.providers.openai.base_url = value;
        }

        if let Some(value) = read_env("TRIAD_VERTEX_PROJECT").or_else(|| read_env("VERTEX_PROJECT"))
        {
            self.providers.vertex.project = Some(value);
        }
        let vertex_location =
            read_env("TRIAD_VERTEX_LOCATION").or_else(|| read_env("VERTEX_LOCATION"));
        if let Some(value) = vertex_location {
            self.providers.vertex.location = value;
        }
        if let Some(value) = read_env("TRIAD_VERTEX_MODEL").or_else(|| read_env("VERTEX_MODEL")) {
            self.providers.vertex.model = value;
        }
        if let Some(value) = read_env("TRIAD_VERTEX_ACCESS_TOKEN") {
            self.providers.vertex.access_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("TRIAD_VERTEX_BASE_URL") {
            self.providers.vertex.base_url = Some(value);
        }

        let anthropic_key =
            read_env("TRIAD_ANTHROPIC_API_KEY").or_else(|| read_env("ANTHROPIC_API_KEY"));
        if let Some(value) = anthropic_key {
            self.providers.anthropic.api_key = Some(secret_value(value));
        }
        let anthropic_model =
            read_env("TRIAD_ANTHROPIC_MODEL").or_else(|| read_env("ANTHROPIC_MODEL"));
        if let Some(value) = anthropic_model {
            self.providers.anthropic.model = value;
        }
        if let Some(value) = read_env("TRIAD_ANTHROPIC_BASE_URL") {
            self.providers.anthropic.base_url = value;
        }
        let anthropic_max_tokens =
            read_env("TRIAD_ANTHROPIC_MAX_TOKENS").or_else(|| read_env("ANTHROPIC_MAX_TOKENS"));
        if let Some(value) = anthropic_max_tokens {
            self.providers.anthropic.max_tokens = parse_u32("TRIAD_ANTHROPIC_MAX_TOKENS", &value)?;
        }

        if let Some(value) = read_env("TRIAD_ORCHESTRATOR_DEFAULT_MODULE_ID") {
            self.orchestrator.default_module_id = value;
        }
        if let Some(value) = read_env("TRIAD_ORCHESTRATOR_ROUND_TIMEOUT_SECS") {
            self.orchestrator.round_timeout_secs =
                parse_u64("TRIAD_ORCHESTRATOR_ROUND_TIMEOUT_SECS", &value)?;
        }

        let log_level = read_env("TRIAD_LOGGING_LEVEL").or_else(|| read_env("TRIAD_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("TRIAD_LOGGING_FORMAT").or_else(|| read_env("TRIAD_LOG_FORMAT"));
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
        if let Some(default_module_id) = overrides.default_module_id {
            self.orchestrator.default_module_id = default_module_id;
        }
        if let Some(round_timeout_secs) = overrides.round_timeout_secs {
            self.orchestrator.round_timeout_secs = round_timeout_secs;
        }
        if let Some(openai_api_key) = overrides.openai_api_key {
            self.providers.openai.api_key = Some(secret_value(openai_api_key));
        }
        if let Some(anthropic_api_key) = overrides.anthropic_api_key {
            self.providers.anthropic.api_key = Some(secret_value(anthropic_api_key));
        }
        if let Some(vertex_project) = overrides.vertex_project {
            self.providers.vertex.project = Some(vertex_project);
        }
        if let Some(vertex_access_token) = overrides.vertex_access_token {
            self.providers.vertex.access_token = Some(secret_value(vertex_access_token));
        }
    }

    /// Structural validation. Provider credentials are checked separately by
    /// [`ProvidersConfig::require_credentials`] so that operator commands that
    /// never call a provider still work without them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_providers(&self.providers)?;
        validate_orchestrator(&self.orchestrator)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

impl ProvidersConfig {
    pub fn require_credentials(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if is_blank_secret(self.openai.api_key.as_ref()) {
            missing.push("providers.openai.api_key (TRIAD_OPENAI_API_KEY)");
        }
        if is_blank_secret(self.anthropic.api_key.as_ref()) {
            missing.push("providers.anthropic.api_key (TRIAD_ANTHROPIC_API_KEY)");
        }
        if self.vertex.project.as_deref().map(str::trim).unwrap_or_default().is_empty() {
            missing.push("providers.vertex.project (TRIAD_VERTEX_PROJECT)");
        }
        if is_blank_secret(self.vertex.access_token.as_ref()) {
            missing.push("providers.vertex.access_token (TRIAD_VERTEX_ACCESS_TOKEN)");
        }

        if missing.is_empty() {
            return Ok(());
        }
        Err(ConfigError::Validation(format!(
            "all three providers must be configured; missing: {}",
            missing.join(", ")
        )))
    }
}

fn is_blank_secret(secret: Option<&SecretString>) -> bool {
    secret.map(|value| value.expose_secret().trim().is_empty()).unwrap_or(true)
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("triad.toml"), PathBuf::from("config/triad.toml")]
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

fn validate_providers(providers: &ProvidersConfig) -> Result<(), ConfigError> {
    if providers.timeout_secs == 0 || providers.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "providers.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    let urls = [
        ("providers.openai.base_url", Some(providers.openai.base_url.as_str())),
        ("providers.anthropic.base_url", Some(providers.anthropic.base_url.as_str())),
        ("providers.vertex.base_url", providers.vertex.base_url.as_deref()),
    ];
    for (key, url) in urls {
        if let Some(url) = url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Validation(format!(
                    "{key} must start with http:// or https://"
                )));
            }
        }
    }

    if providers.vertex.location.trim().is_empty() {
        return Err(ConfigError::Validation(
            "providers.vertex.location must not be empty".to_string(),
        ));
    }

    if providers.anthropic.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "providers.anthropic.max_tokens must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_orchestrator(orchestrator: &OrchestratorConfig) -> Result<(), ConfigError> {
    if orchestrator.default_module_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "orchestrator.default_module_id must not be empty".to_string(),
        ));
    }

    if orchestrator.round_timeout_secs == 0 || orchestrator.round_timeout_secs > 900 {
        return Err(ConfigError::Validation(
            "orchestrator.round_timeout_secs must be in range 1..=900".to_string(),
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

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    providers: Option<ProvidersPatch>,
    orchestrator: Option<OrchestratorPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ProvidersPatch {
    timeout_secs: Option<u64>,
    openai: Option<OpenAiPatch>,
    vertex: Option<VertexPatch>,
    anthropic: Option<AnthropicPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiPatch {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VertexPatch {
    project: Option<String>,
    location: Option<String>,
    model: Option<String>,
    access_token: Option<String>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicPatch {
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct OrchestratorPatch {
    default_module_id: Option<String>,
    round_timeout_secs: Option<u64>,
    plan_version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const PROVIDER_VARS: &[&str] = &[
        "TRIAD_OPENAI_API_KEY",
        "OPENAI_API_KEY",
        "TRIAD_ANTHROPIC_API_KEY",
        "ANTHROPIC_API_KEY",
        "TRIAD_VERTEX_PROJECT",
        "VERTEX_PROJECT",
        "TRIAD_VERTEX_ACCESS_TOKEN",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_load_without_file_or_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(PROVIDER_VARS);

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.orchestrator.default_module_id == "admin-ai-module", "default module id")?;
        ensure(config.orchestrator.round_timeout_secs == 120, "default round timeout")?;
        ensure(config.providers.openai.model == "gpt-4.1-mini", "default openai model")?;
        ensure(config.providers.vertex.location == "asia-southeast1", "default vertex location")?;
        ensure(config.providers.anthropic.max_tokens == 4096, "default anthropic max tokens")?;
        ensure(
            config.providers.require_credentials().is_err(),
            "credentials should be reported missing",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_TRIAD_OPENAI_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("triad.toml");
            fs::write(
                &path,
                r#"
[providers.openai]
api_key = "${TEST_TRIAD_OPENAI_KEY}"
model = "gpt-4.1"

[providers.anthropic]
max_tokens = 2048
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config
                    .providers
                    .openai
                    .api_key
                    .as_ref()
                    .map(|key| key.expose_secret() == "sk-from-env")
                    .unwrap_or(false),
                "openai key should be interpolated from environment",
            )?;
            ensure(config.providers.openai.model == "gpt-4.1", "model should come from file")?;
            ensure(config.providers.anthropic.max_tokens == 2048, "max tokens from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_TRIAD_OPENAI_KEY"]);
        result
    }

    #[test]
    fn unprefixed_provider_env_names_are_accepted() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(PROVIDER_VARS);

        env::set_var("OPENAI_API_KEY", "sk-plain");
        env::set_var("ANTHROPIC_API_KEY", "sk-ant-plain");
        env::set_var("VERTEX_PROJECT", "boots-pos");
        env::set_var("TRIAD_VERTEX_ACCESS_TOKEN", "ya29.token");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(
                config.providers.require_credentials().is_ok(),
                "credentials should be complete",
            )?;
            ensure(
                config.providers.vertex.project.as_deref() == Some("boots-pos"),
                "vertex project from unprefixed env",
            )
        })();

        clear_vars(PROVIDER_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TRIAD_DATABASE_URL", "sqlite://from-env.db");
        env::set_var("TRIAD_ORCHESTRATOR_ROUND_TIMEOUT_SECS", "45");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("triad.toml");
            fs::write(
                &path,
                r#"
[database]
url = "sqlite://from-file.db"

[orchestrator]
round_timeout_secs = 30
default_module_id = "pos-dashboard"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    database_url: Some("sqlite://from-override.db".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.database.url == "sqlite://from-override.db",
                "override database url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.orchestrator.round_timeout_secs == 45, "env should win over file")?;
            ensure(
                config.orchestrator.default_module_id == "pos-dashboard",
                "file should win over defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["TRIAD_DATABASE_URL", "TRIAD_ORCHESTRATOR_ROUND_TIMEOUT_SECS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TRIAD_OPENAI_BASE_URL", "api.openai.com");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("providers.openai.base_url")
            );
            ensure(has_message, "validation failure should mention providers.openai.base_url")
        })();

        clear_vars(&["TRIAD_OPENAI_BASE_URL"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TRIAD_ANTHROPIC_API_KEY", "sk-ant-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("sk-ant-secret-value"),
                "debug output should not contain the anthropic key",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["TRIAD_ANTHROPIC_API_KEY"]);
        result
    }
}
