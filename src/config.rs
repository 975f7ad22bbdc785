use chrono::Duration;
use std::env;
use std::fmt;

const DEFAULT_JWT_EXPIRE: &str = "7d";
const DEFAULT_RESET_TOKEN_MINUTES: i64 = 10;
// Upper bound for configured lifetimes; keeps `now + ttl` far from chrono's range limit.
const MAX_TTL_DAYS: i64 = 365 * 100;

/// Deployment flavour. Outside production the forgot-password response echoes the reset token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A mandatory variable is absent or empty.
    Missing(&'static str),
    /// A variable is present but cannot be parsed.
    Invalid { var: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(var) => write!(f, "{} must be set", var),
            ConfigError::Invalid { var, value } => write!(f, "{} has invalid value {:?}", var, value),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub reset_token_ttl: Duration,
    pub environment: Environment,
    pub client_url: String,
    pub bcrypt_cost: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// `JWT_SECRET` is mandatory: the server must not start without a signing key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let jwt_expire = get("JWT_EXPIRE").unwrap_or_else(|| DEFAULT_JWT_EXPIRE.to_string());
        let jwt_ttl = parse_duration(&jwt_expire).ok_or(ConfigError::Invalid {
            var: "JWT_EXPIRE",
            value: jwt_expire.clone(),
        })?;

        let reset_token_ttl = match get("RESET_TOKEN_EXPIRE_MINUTES") {
            Some(raw) => match raw.trim().parse::<i64>().ok().and_then(checked_minutes) {
                Some(ttl) => ttl,
                None => {
                    return Err(ConfigError::Invalid {
                        var: "RESET_TOKEN_EXPIRE_MINUTES",
                        value: raw,
                    })
                }
            },
            None => Duration::minutes(DEFAULT_RESET_TOKEN_MINUTES),
        };

        let server_port: u16 = match get("SERVER_PORT") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "SERVER_PORT",
                value: raw,
            })?,
            None => 8080,
        };

        let environment = match get("APP_ENV").as_deref().map(str::to_ascii_lowercase) {
            Some(ref env) if env == "production" => Environment::Production,
            _ => Environment::Development,
        };

        let bcrypt_cost = match get("BCRYPT_COST") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(cost) if (4..=31).contains(&cost) => cost,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "BCRYPT_COST",
                        value: raw,
                    })
                }
            },
            None => bcrypt::DEFAULT_COST,
        };

        Ok(Self {
            database_url: get("DATABASE_URL"),
            server_port,
            server_host: get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            jwt_secret,
            jwt_ttl,
            reset_token_ttl,
            environment,
            client_url: get("CLIENT_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            bcrypt_cost,
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

/// Parses lifetimes such as `7d`, `12h`, `30m`, `45s` or a bare number of seconds.
fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last()? {
        (idx, c) if c.is_ascii_alphabetic() => (&raw[..idx], Some(c.to_ascii_lowercase())),
        _ => (raw, None),
    };
    let amount: i64 = digits.parse().ok().filter(|n| *n > 0)?;

    let ttl = match unit {
        None | Some('s') => Duration::try_seconds(amount),
        Some('m') => Duration::try_minutes(amount),
        Some('h') => Duration::try_hours(amount),
        Some('d') => Duration::try_days(amount),
        Some(_) => None,
    }?;
    within_bounds(ttl)
}

fn checked_minutes(minutes: i64) -> Option<Duration> {
    Duration::try_minutes(minutes).and_then(within_bounds)
}

fn within_bounds(ttl: Duration) -> Option<Duration> {
    (ttl > Duration::zero() && ttl <= Duration::days(MAX_TTL_DAYS)).then_some(ttl)
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
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();

        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.jwt_ttl, Duration::days(7));
        assert_eq!(config.reset_token_ttl, Duration::minutes(10));
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.server_host, "127.0.0.1");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert!(config.database_url.is_none());
        assert_eq!(config.server_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_config_custom_values() {
        let config = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRE", "12h"),
            ("RESET_TOKEN_EXPIRE_MINUTES", "30"),
            ("SERVER_PORT", "3000"),
            ("SERVER_HOST", "0.0.0.0"),
            ("APP_ENV", "Production"),
            ("CLIENT_URL", "https://todo.example.com/"),
            ("DATABASE_URL", "postgres://test"),
            ("BCRYPT_COST", "4"),
        ]))
        .unwrap();

        assert_eq!(config.jwt_ttl, Duration::hours(12));
        assert_eq!(config.reset_token_ttl, Duration::minutes(30));
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.server_host, "0.0.0.0");
        assert!(config.environment.is_production());
        assert_eq!(config.client_url, "https://todo.example.com");
        assert_eq!(config.database_url.as_deref(), Some("postgres://test"));
        assert_eq!(config.bcrypt_cost, 4);
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        assert_eq!(
            Config::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
        assert_eq!(
            Config::from_lookup(lookup(&[("JWT_SECRET", "  ")])).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("JWT_EXPIRE", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "JWT_EXPIRE", .. }));

        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("SERVER_PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "SERVER_PORT", .. }));

        let err = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s"),
            ("JWT_EXPIRE", "99999999999999d"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "JWT_EXPIRE", .. }));

        for minutes in ["0", "-5", "9223372036854775807"] {
            let err = Config::from_lookup(lookup(&[
                ("JWT_SECRET", "s"),
                ("RESET_TOKEN_EXPIRE_MINUTES", minutes),
            ]))
            .unwrap_err();
            assert!(matches!(
                err,
                ConfigError::Invalid { var: "RESET_TOKEN_EXPIRE_MINUTES", .. }
            ));
        }

        let err = Config::from_lookup(lookup(&[("JWT_SECRET", "s"), ("BCRYPT_COST", "2")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { var: "BCRYPT_COST", .. }));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("7d"), Some(Duration::days(7)));
        assert_eq!(parse_duration("90m"), Some(Duration::minutes(90)));
        assert_eq!(parse_duration("3600"), Some(Duration::seconds(3600)));
        assert_eq!(parse_duration("15S"), Some(Duration::seconds(15)));
        assert_eq!(parse_duration("0d"), None);
        assert_eq!(parse_duration("2w"), None);
        assert_eq!(parse_duration("99999999999999d"), None);
        assert_eq!(parse_duration("36500d"), Some(Duration::days(36500)));
        assert_eq!(parse_duration("36501d"), None);
        assert_eq!(parse_duration(""), None);
    }
}
