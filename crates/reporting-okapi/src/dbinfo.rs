use crate::SETTINGS_SCOPE;
use crate::client::OkapiClient;
use crate::error::OkapiError;
use serde::Deserialize;
use serde_json::Value;
use std::env;

/// Connection details for the reporting database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbInfo {
    pub url: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawDbInfo {
    #[serde(default)]
    url: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    pass: String,
}

impl DbInfo {
    /// Read the `REPORTING_DB_*` environment triple. Only a complete
    /// triple overrides the stored setting.
    pub fn from_env() -> Option<DbInfo> {
        let url = env::var("REPORTING_DB_URL").unwrap_or_default();
        let user = env::var("REPORTING_DB_USER").unwrap_or_default();
        let password = env::var("REPORTING_DB_PASS").unwrap_or_default();
        if url.is_empty() || user.is_empty() || password.is_empty() {
            return None;
        }
        Some(DbInfo {
            url,
            user,
            password,
        })
    }

    /// Decode the `dbinfo` settings value. The current format is an
    /// object `{url, user, pass}`; older installations stored the same
    /// object JSON-encoded as a string, and both are accepted.
    pub fn from_settings_value(value: &Value) -> Result<DbInfo, OkapiError> {
        let raw: RawDbInfo = match value {
            Value::String(encoded) => {
                serde_json::from_str(encoded).map_err(OkapiError::OldDbInfo)?
            }
            other => serde_json::from_value(other.clone())?,
        };
        Ok(DbInfo {
            url: raw.url,
            user: raw.user,
            password: raw.pass,
        })
    }

    /// The URL handed to the connection pool. Settings frequently hold a
    /// JDBC-style URL; strip any such prefix and reassemble with the
    /// credentials inline.
    pub fn connection_string(&self) -> String {
        let rest = self
            .url
            .strip_prefix("jdbc:postgresql://")
            .or_else(|| self.url.strip_prefix("postgresql://"))
            .or_else(|| self.url.strip_prefix("postgres://"))
            .unwrap_or(&self.url);
        format!("postgres://{}:{}@{}", self.user, self.password, rest)
    }
}

/// Resolve the reporting-database connection details: a complete
/// `REPORTING_DB_*` environment triple wins; otherwise the single
/// `dbinfo` entry under the admin scope is fetched and decoded.
pub async fn fetch_db_info(
    client: &OkapiClient,
    token: Option<&str>,
) -> Result<DbInfo, OkapiError> {
    if let Some(info) = DbInfo::from_env() {
        return Ok(info);
    }

    let page = client
        .fetch_entries(SETTINGS_SCOPE, Some("dbinfo"), token)
        .await?;
    if page.result_info.total_records < 1 || page.items.is_empty() {
        return Err(OkapiError::MissingDbInfo);
    }

    DbInfo::from_settings_value(&page.items[0].value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_structured_value() {
        let info = DbInfo::from_settings_value(&json!({
            "url": "postgres://db.example.com/ldp",
            "user": "ldp",
            "pass": "half-m00n",
        }))
        .unwrap();
        assert_eq!(info.user, "ldp");
        assert_eq!(info.password, "half-m00n");
    }

    #[test]
    fn test_decode_old_style_string_value() {
        let encoded = r#"{"url":"postgres://db.example.com/ldp","user":"ldp","pass":"p"}"#;
        let info = DbInfo::from_settings_value(&json!(encoded)).unwrap();
        assert_eq!(info.url, "postgres://db.example.com/ldp");
        assert_eq!(info.password, "p");
    }

    #[test]
    fn test_decode_old_style_garbage_fails() {
        let err = DbInfo::from_settings_value(&json!("not json")).unwrap_err();
        assert!(err.to_string().contains("old-style"));
    }

    #[test]
    fn test_connection_string_strips_jdbc_prefix() {
        let info = DbInfo {
            url: "jdbc:postgresql://db.example.com:5432/ldp".to_string(),
            user: "fiona".to_string(),
            password: "pw".to_string(),
        };
        assert_eq!(
            info.connection_string(),
            "postgres://fiona:pw@db.example.com:5432/ldp"
        );
    }

    #[test]
    fn test_connection_string_strips_postgres_prefix() {
        let info = DbInfo {
            url: "postgres://db.example.com/ldp".to_string(),
            user: "u".to_string(),
            password: "p".to_string(),
        };
        assert_eq!(info.connection_string(), "postgres://u:p@db.example.com/ldp");
    }

    #[test]
    fn test_connection_string_bare_host() {
        let info = DbInfo {
            url: "db.example.com/ldp".to_string(),
            user: "u".to_string(),
            password: "p".to_string(),
        };
        assert_eq!(info.connection_string(), "postgres://u:p@db.example.com/ldp");
    }
}
