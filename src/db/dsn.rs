//! Key=value DSN parsing.
//!
//! A DSN here is a flat, space-separated list of `key=value` tokens such as
//! `host=localhost user=u password=p dbname=d sslmode=disable timezone=UTC`.

use crate::error::{DbError, DbResult};
use crate::models::DialectConfig;
use std::collections::HashMap;

/// Keys that must be present with a non-empty value, in reporting order.
const REQUIRED_KEYS: [&str; 4] = ["host", "user", "password", "dbname"];

/// Parse a key=value DSN into a validated [`DialectConfig`].
///
/// Tokens that do not split into exactly one key and one value are ignored,
/// which also drops any token whose value contains `=`. A key given with an
/// empty value counts as missing. `sslmode` and `timezone` fall back to
/// `disable` and `UTC`.
pub fn parse_dsn(raw: &str) -> DbResult<DialectConfig> {
    if raw.is_empty() {
        return Err(DbError::EmptyDsn);
    }

    let params = tokenize(raw);

    for key in REQUIRED_KEYS {
        if params.get(key).is_none_or(|v| v.is_empty()) {
            return Err(DbError::missing_field(key));
        }
    }

    let get = |key: &str| params.get(key).copied().unwrap_or_default();

    let mut config = DialectConfig::new(
        get("dbname"),
        get("user"),
        get("password"),
        get("host"),
        get("sslmode"),
        get("timezone"),
    );

    if let Some(port) = params.get("port").filter(|p| !p.is_empty()) {
        let port = port
            .parse::<u16>()
            .map_err(|_| DbError::invalid_input(format!("invalid port in DSN: {}", port)))?;
        config = config.with_port(port);
    }

    config.validate()?;
    Ok(config)
}

fn tokenize(raw: &str) -> HashMap<&str, &str> {
    raw.split(' ')
        .filter_map(|token| {
            let mut parts = token.split('=');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => Some((key, value)),
                _ => None,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_dsn() {
        let config = parse_dsn(
            "host=localhost user=realorm password=password dbname=realorm sslmode=require timezone=Africa/Kampala",
        )
        .unwrap();
        assert_eq!(config.host(), "localhost");
        assert_eq!(config.user(), "realorm");
        assert_eq!(config.password(), "password");
        assert_eq!(config.database(), "realorm");
        assert_eq!(config.sslmode(), "require");
        assert_eq!(config.timezone(), "Africa/Kampala");
        assert_eq!(config.port(), None);
    }

    #[test]
    fn test_parse_applies_defaults() {
        let config = parse_dsn("host=h user=u password=p dbname=d").unwrap();
        assert_eq!(config.sslmode(), "disable");
        assert_eq!(config.timezone(), "UTC");
    }

    #[test]
    fn test_parse_empty_dsn() {
        assert!(matches!(parse_dsn(""), Err(DbError::EmptyDsn)));
    }

    #[test]
    fn test_parse_reports_each_missing_key() {
        let full = [
            ("host", "h"),
            ("user", "u"),
            ("password", "p"),
            ("dbname", "d"),
        ];
        for missing in REQUIRED_KEYS {
            let dsn = full
                .iter()
                .filter(|(k, _)| *k != missing)
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            match parse_dsn(&dsn) {
                Err(DbError::MissingField { field }) => assert_eq!(field, missing),
                other => panic!("expected MissingField({missing}), got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_first_missing_key_wins() {
        match parse_dsn("sslmode=disable") {
            Err(DbError::MissingField { field }) => assert_eq!(field, "host"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        match parse_dsn("host= user=u password=p dbname=d") {
            Err(DbError::MissingField { field }) => assert_eq!(field, "host"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_token_with_extra_equals_is_dropped() {
        // The password token splits into three parts and is ignored.
        match parse_dsn("host=h user=u password=a=b dbname=d") {
            Err(DbError::MissingField { field }) => assert_eq!(field, "password"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_garbage_tokens_are_ignored() {
        let config = parse_dsn("host=h  junk user=u password=p dbname=d extra").unwrap();
        assert_eq!(config.host(), "h");
        assert_eq!(config.database(), "d");
    }

    #[test]
    fn test_parse_port() {
        let config = parse_dsn("host=h port=5433 user=u password=p dbname=d").unwrap();
        assert_eq!(config.port(), Some(5433));

        assert!(matches!(
            parse_dsn("host=h port=abc user=u password=p dbname=d"),
            Err(DbError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_round_trip_through_config() {
        let original = DialectConfig::new("shop", "admin", "s3cret", "db.internal", "", "");
        let parsed = parse_dsn(&original.to_dsn()).unwrap();
        assert_eq!(parsed, original);
    }
}
