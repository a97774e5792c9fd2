use anyhow::{Context, Result, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

/// Accepted range for FEEDWATCH_SESSION_TTL_DAYS.
const SESSION_TTL_DAYS: std::ops::RangeInclusive<i64> = 1..=3650;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub jwt_secret: String,
    pub identity_url: String,
    pub identity_api_key: Option<String>,
    pub landing_path: String,
    pub session_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = get("FEEDWATCH_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("FEEDWATCH_JWT_SECRET is unset or still a placeholder");
        }

        let identity_url = get("FEEDWATCH_IDENTITY_URL")
            .filter(|v| !v.is_empty())
            .context("FEEDWATCH_IDENTITY_URL must point at the identity provider")?;

        let port: u16 = get("FEEDWATCH_PORT")
            .unwrap_or_else(|| "3000".into())
            .parse()
            .context("FEEDWATCH_PORT is not a valid port")?;

        let session_ttl_days: i64 = get("FEEDWATCH_SESSION_TTL_DAYS")
            .unwrap_or_else(|| "30".into())
            .parse()
            .context("FEEDWATCH_SESSION_TTL_DAYS is not a whole number of days")?;
        if !SESSION_TTL_DAYS.contains(&session_ttl_days) {
            bail!(
                "FEEDWATCH_SESSION_TTL_DAYS must be between {} and {}, got {}",
                SESSION_TTL_DAYS.start(),
                SESSION_TTL_DAYS.end(),
                session_ttl_days
            );
        }

        let landing_path = get("FEEDWATCH_LANDING_PATH").unwrap_or_else(|| "/protected".into());
        if !landing_path.starts_with('/') {
            bail!("FEEDWATCH_LANDING_PATH must be an absolute path, got {:?}", landing_path);
        }

        Ok(Self {
            host: get("FEEDWATCH_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: get("FEEDWATCH_DB_PATH").unwrap_or_else(|| "feedwatch.db".into()),
            jwt_secret,
            identity_url,
            identity_api_key: get("FEEDWATCH_IDENTITY_API_KEY").filter(|v| !v.is_empty()),
            landing_path,
            session_ttl_days,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_fill_in_optional_values() {
        let config = Config::from_lookup(lookup(&[
            ("FEEDWATCH_JWT_SECRET", "s3cret"),
            ("FEEDWATCH_IDENTITY_URL", "https://id.example/auth/v1"),
        ]))
        .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.db_path, "feedwatch.db");
        assert_eq!(config.landing_path, "/protected");
        assert_eq!(config.session_ttl_days, 30);
        assert!(config.identity_api_key.is_none());
    }

    #[test]
    fn placeholder_secret_is_refused() {
        let err = Config::from_lookup(lookup(&[
            ("FEEDWATCH_JWT_SECRET", "dev-secret-change-me"),
            ("FEEDWATCH_IDENTITY_URL", "https://id.example"),
        ]));
        assert!(err.is_err());
    }

    #[test]
    fn identity_url_is_required() {
        let err = Config::from_lookup(lookup(&[("FEEDWATCH_JWT_SECRET", "s3cret")]));
        assert!(err.is_err());
    }

    #[test]
    fn session_ttl_must_parse_and_be_in_range() {
        for bad in ["thirty", "0", "-5", "3651", "100000000"] {
            let err = Config::from_lookup(lookup(&[
                ("FEEDWATCH_JWT_SECRET", "s3cret"),
                ("FEEDWATCH_IDENTITY_URL", "https://id.example"),
                ("FEEDWATCH_SESSION_TTL_DAYS", bad),
            ]));
            assert!(err.is_err(), "{bad:?}");
        }

        let config = Config::from_lookup(lookup(&[
            ("FEEDWATCH_JWT_SECRET", "s3cret"),
            ("FEEDWATCH_IDENTITY_URL", "https://id.example"),
            ("FEEDWATCH_SESSION_TTL_DAYS", "7"),
        ]))
        .unwrap();
        assert_eq!(config.session_ttl_days, 7);
    }

    #[test]
    fn relative_landing_path_is_refused() {
        let err = Config::from_lookup(lookup(&[
            ("FEEDWATCH_JWT_SECRET", "s3cret"),
            ("FEEDWATCH_IDENTITY_URL", "https://id.example"),
            ("FEEDWATCH_LANDING_PATH", "protected"),
        ]));
        assert!(err.is_err());
    }
}
