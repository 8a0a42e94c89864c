use secrecy::Secret;
use service_core::config::{self as core_config, Environment, get_env, get_optional_env, parse_env};
use service_core::error::AppError;
use service_core::observability::LogFormat;

/// Port the chat endpoint has always been served on.
const DEFAULT_PORT: u16 = 5000;

/// Upper bound on sampled rows, to keep prompts a sane size.
const MAX_SAMPLE_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub log_format: LogFormat,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub gemini: GeminiSettings,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Secret<String>,
    pub name: String,
    /// Table described and sampled for every question.
    pub table: String,
    pub sample_limit: u32,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    /// Absent key leaves the service running without a model.
    pub api_key: Option<Secret<String>>,
    pub model: String,
    pub api_base: String,
}

#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl ChatConfig {
    pub fn load() -> Result<Self, AppError> {
        let common = core_config::Config::load(DEFAULT_PORT)?;

        let environment = Environment::from_env()?;
        let is_prod = environment.is_prod();

        let log_format = get_env("LOG_FORMAT", Some("json"), false)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let database = DatabaseConfig {
            host: get_env("DB_HOST", Some("localhost"), is_prod)?,
            port: parse_env("DB_PORT", Some("3306"), false)?,
            user: get_env("DB_USER", Some("root"), is_prod)?,
            password: Secret::new(get_env("DB_PASSWORD", Some(""), is_prod)?),
            name: get_env("DB_NAME", None, is_prod)?,
            table: validate_table_name(get_env("DB_TABLE", Some("users"), false)?)?,
            sample_limit: validate_sample_limit(parse_env("DB_SAMPLE_LIMIT", Some("5"), false)?)?,
        };

        // The model key is optional in every environment: without it the
        // service answers with the unavailable message instead of refusing
        // to start.
        let gemini = GeminiSettings {
            api_key: get_optional_env("GEMINI_API_KEY").map(Secret::new),
            model: get_env("GEMINI_MODEL", Some("gemini-1.5-pro-latest"), false)?,
            api_base: get_env(
                "GEMINI_API_BASE",
                Some(crate::services::providers::gemini::GEMINI_API_BASE),
                false,
            )?,
        };

        let cors = CorsConfig {
            allowed_origins: get_optional_env("CORS_ALLOWED_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
        };

        Ok(ChatConfig {
            common,
            environment,
            service_name: get_env("SERVICE_NAME", Some("chat-service"), false)?,
            log_level: get_env("LOG_LEVEL", Some("info"), false)?,
            log_format,
            otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
            database,
            gemini,
            cors,
        })
    }
}

/// The table name is spliced into SQL, so only plain identifiers pass.
pub fn validate_table_name(name: String) -> Result<String, AppError> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(name)
    } else {
        Err(AppError::ConfigError(anyhow::anyhow!(
            "DB_TABLE '{}' is not a plain table identifier",
            name
        )))
    }
}

pub fn validate_sample_limit(limit: u32) -> Result<u32, AppError> {
    if (1..=MAX_SAMPLE_LIMIT).contains(&limit) {
        Ok(limit)
    } else {
        Err(AppError::ConfigError(anyhow::anyhow!(
            "DB_SAMPLE_LIMIT must be between 1 and {}, got {}",
            MAX_SAMPLE_LIMIT,
            limit
        )))
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_identifiers() {
        assert_eq!(validate_table_name("users".to_string()).unwrap(), "users");
        assert_eq!(
            validate_table_name("user_accounts_2024".to_string()).unwrap(),
            "user_accounts_2024"
        );
    }

    #[test]
    fn rejects_identifiers_that_could_escape_quoting() {
        for name in ["", "users; DROP TABLE users", "users`", "db.users", "us ers"] {
            assert!(
                validate_table_name(name.to_string()).is_err(),
                "{:?} should be rejected",
                name
            );
        }
    }

    #[test]
    fn sample_limit_bounds() {
        assert!(validate_sample_limit(0).is_err());
        assert_eq!(validate_sample_limit(5).unwrap(), 5);
        assert_eq!(validate_sample_limit(100).unwrap(), 100);
        assert!(validate_sample_limit(101).is_err());
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        assert_eq!(
            parse_origins("http://localhost:5173, https://example.com ,,"),
            vec!["http://localhost:5173", "https://example.com"]
        );
    }
}
