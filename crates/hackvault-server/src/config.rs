use std::env;
use std::path::PathBuf;

use thiserror::Error;

use hackvault_api::auth::AdminCredential;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("HACKVAULT_JWT_SECRET is unset or still a placeholder")]
    MissingSecret,

    #[error("{name} is invalid: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub admin_credentials: Vec<AdminCredential>,
}

impl Config {
    const DEFAULT_PORT: u16 = 3000;
    const DEFAULT_TOKEN_TTL_DAYS: i64 = 30;

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("HACKVAULT_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::MissingSecret);
        }

        let host = lookup("HACKVAULT_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = parse_or(&lookup, "HACKVAULT_PORT", Self::DEFAULT_PORT)?;
        let db_path = lookup("HACKVAULT_DB_PATH")
            .unwrap_or_else(|| "hackvault.db".into())
            .into();
        let token_ttl_days = parse_or(&lookup, "HACKVAULT_TOKEN_TTL_DAYS", Self::DEFAULT_TOKEN_TTL_DAYS)?;
        if token_ttl_days <= 0 {
            return Err(ConfigError::Invalid {
                name: "HACKVAULT_TOKEN_TTL_DAYS",
                value: token_ttl_days.to_string(),
            });
        }

        let admin_credentials = lookup("HACKVAULT_ADMIN_CREDENTIALS")
            .map(|raw| AdminCredential::parse_list(&raw))
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            db_path,
            jwt_secret,
            token_ttl_days,
            admin_credentials,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn refuses_placeholder_secret() {
        assert_eq!(config(&[]).unwrap_err(), ConfigError::MissingSecret);
        assert_eq!(
            config(&[("HACKVAULT_JWT_SECRET", "dev-secret-change-me")]).unwrap_err(),
            ConfigError::MissingSecret
        );
    }

    #[test]
    fn defaults_apply() {
        let cfg = config(&[("HACKVAULT_JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(cfg.server_address(), "0.0.0.0:3000");
        assert_eq!(cfg.db_path, PathBuf::from("hackvault.db"));
        assert_eq!(cfg.token_ttl_days, 30);
        assert!(cfg.admin_credentials.is_empty());
    }

    #[test]
    fn reads_admin_credentials_and_rejects_bad_port() {
        let cfg = config(&[
            ("HACKVAULT_JWT_SECRET", "s3cret"),
            ("HACKVAULT_ADMIN_CREDENTIALS", "root@example.com:pw"),
        ])
        .unwrap();
        assert_eq!(cfg.admin_credentials.len(), 1);

        let err = config(&[("HACKVAULT_JWT_SECRET", "s3cret"), ("HACKVAULT_PORT", "http")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "HACKVAULT_PORT", .. }));
    }
}
