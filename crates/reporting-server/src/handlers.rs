use crate::error::HandlerError;
use crate::server::AppState;
use crate::session::Session;
use anyhow::{Context, anyhow, bail};
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::Html;
use axum::Json;
use reporting_db::{ColumnEntry, ReportRequest, ReportResponse, TableEntry};
use reporting_okapi::{SETTINGS_SCOPE, SettingsEntry, value_as_string};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// The session for this request, resolved from the gateway headers, plus
/// the pass-through authentication token if one was sent.
pub struct SessionHandle {
    pub session: Arc<Session>,
    pub token: Option<String>,
}

impl SessionHandle {
    fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

impl FromRequestParts<Arc<AppState>> for SessionHandle {
    type Rejection = HandlerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        tracing::info!(target: "path", "{}", parts.uri.path());

        let url = header_value(parts, "x-okapi-url");
        let tenant = header_value(parts, "x-okapi-tenant");
        let session = state
            .registry
            .find(&url, &tenant)
            .context("could not make session")?;

        let token = match header_value(parts, "x-okapi-token") {
            t if t.is_empty() => None,
            t => Some(t),
        };

        Ok(Self { session, token })
    }
}

fn header_value(parts: &Parts, name: &str) -> String {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

pub async fn index() -> Html<&'static str> {
    Html(
        r#"
This is <a href="https://github.com/folio-org/mod-reporting">mod-reporting</a>. Try:
<ul>
  <li><a href="/admin/health">Health check</a></li>
  <li><a href="/htdocs/">Static area</a></li>
  <li><a href="/ldp/config">Legacy configuration WSAPI</a></li>
  <li><a href="/ldp/db/tables">List tables from reporting database</a></li>
  <li><a href="/ldp/db/columns?schema=folio_users&table=users">List columns for "users" table</a></li>
</ul>
"#,
    )
}

pub async fn health() -> &'static str {
    "Behold! I live!!\n"
}

pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found\n")
}

// ---------------------------------------------------------------------------
// Config surface: CRUD over the ui-ldp.admin settings scope
// ---------------------------------------------------------------------------

/// The shape config entries take on the wire: the value is always a
/// string, whatever type the settings store holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigItem {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub tenant: String,
    #[serde(default)]
    pub value: String,
}

fn to_config_item(entry: &SettingsEntry, tenant: &str) -> anyhow::Result<ConfigItem> {
    let value = value_as_string(&entry.value)
        .context("could not serialize value from mod-settings")?;
    Ok(ConfigItem {
        key: entry.key.clone(),
        tenant: tenant.to_string(),
        value,
    })
}

pub async fn list_config(handle: SessionHandle) -> Result<Json<Vec<ConfigItem>>, HandlerError> {
    let page = handle
        .session
        .okapi()
        .fetch_entries(SETTINGS_SCOPE, None, handle.token())
        .await
        .context("could not fetch from mod-settings")?;

    let tenant = handle.session.tenant();
    let items = page
        .items
        .iter()
        .map(|entry| to_config_item(entry, tenant))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(items))
}

pub async fn get_config_key(
    Path(key): Path<String>,
    handle: SessionHandle,
) -> Result<Json<ConfigItem>, HandlerError> {
    let page = handle
        .session
        .okapi()
        .fetch_entries(SETTINGS_SCOPE, Some(&key), handle.token())
        .await
        .context("could not read from mod-settings")?;

    if page.result_info.total_records < 1 || page.items.is_empty() {
        return Err(anyhow!("no config item with key '{key}'").into());
    }

    let item = to_config_item(&page.items[0], handle.session.tenant())?;
    Ok(Json(item))
}

pub async fn put_config_key(
    Path(key): Path<String>,
    handle: SessionHandle,
    body: String,
) -> Result<Json<SettingsEntry>, HandlerError> {
    let item: ConfigItem =
        serde_json::from_str(&body).context("could not deserialize JSON from body")?;

    // The settings WSAPI creates with POST but replaces with PUT, so an
    // existing record has to be looked up first.
    let page = handle
        .session
        .okapi()
        .fetch_entries(SETTINGS_SCOPE, Some(&key), handle.token())
        .await
        .context("could not read from mod-settings")?;

    let existing_id = if page.result_info.total_records > 0 && !page.items.is_empty() {
        Some(page.items[0].id.clone())
    } else {
        None
    };

    let entry = SettingsEntry {
        id: existing_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        scope: SETTINGS_SCOPE.to_string(),
        key,
        value: Value::String(item.value),
    };
    tracing::debug!(target: "config", "writing settings entry {:?}", entry);

    handle
        .session
        .okapi()
        .write_entry(existing_id.as_deref(), &entry, handle.token())
        .await
        .context("could not write to mod-settings")?;

    Ok(Json(entry))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub async fn get_tables(handle: SessionHandle) -> Result<Json<Vec<TableEntry>>, HandlerError> {
    let (pool, flavor) = handle
        .session
        .db(handle.token())
        .await
        .context("could not find reporting DB")?;
    let tables = reporting_db::list_tables(pool, flavor)
        .await
        .context("could not fetch tables from reporting DB")?;
    Ok(Json(tables))
}

#[derive(Debug, Default, Deserialize)]
pub struct ColumnsParams {
    #[serde(default)]
    schema: String,
    #[serde(default)]
    table: String,
}

pub async fn get_columns(
    Query(params): Query<ColumnsParams>,
    handle: SessionHandle,
) -> Result<Json<Vec<ColumnEntry>>, HandlerError> {
    if params.schema.is_empty() || params.table.is_empty() {
        return Err(anyhow!("must specify both schema and table").into());
    }

    let (pool, _) = handle
        .session
        .db(handle.token())
        .await
        .context("could not find reporting DB")?;
    let columns = reporting_db::list_columns(pool, &params.schema, &params.table)
        .await
        .context("could not fetch columns from reporting DB")?;
    Ok(Json(columns))
}

// ---------------------------------------------------------------------------
// Structured queries and reports
// ---------------------------------------------------------------------------

pub async fn post_query(
    handle: SessionHandle,
    body: String,
) -> Result<Json<Vec<Map<String, Value>>>, HandlerError> {
    let query: reporting_db::JsonQuery =
        serde_json::from_str(&body).context("could not deserialize JSON from body")?;
    let (sql, args) =
        reporting_db::build_sql(&query).context("could not generate SQL from JSON query")?;
    tracing::info!(target: "sql", "{sql} {args:?}");

    let (pool, _) = handle
        .session
        .db(handle.token())
        .await
        .context("could not find reporting DB")?;

    let mut db_query = sqlx::query(&sql);
    for arg in &args {
        db_query = db_query.bind(arg);
    }
    let rows = db_query
        .fetch_all(pool)
        .await
        .context("could not execute SQL from JSON query")?;

    let records =
        reporting_db::rows_to_maps(&rows).context("could not collect query result data")?;
    Ok(Json(records))
}

#[axum::debug_handler]
pub async fn post_report(
    State(state): State<Arc<AppState>>,
    handle: SessionHandle,
    body: String,
) -> Result<Json<ReportResponse>, HandlerError> {
    let request: ReportRequest =
        serde_json::from_str(&body).context("could not deserialize JSON from body")?;

    validate_report_url(&request.url)
        .with_context(|| format!("query may not be loaded from {}", request.url))?;

    let response = state
        .http
        .get(&request.url)
        .send()
        .await
        .with_context(|| format!("could not fetch report from {}", request.url))?;
    if !response.status().is_success() {
        return Err(anyhow!(
            "could not fetch report from {}: {}",
            request.url,
            response.status()
        )
        .into());
    }
    let source = response.text().await.context("could not read report")?;

    let (pool, flavor) = handle
        .session
        .db(handle.token())
        .await
        .context("could not find reporting DB")?;

    let report =
        reporting_db::run_report(pool, flavor, &source, &request.params, request.limit).await?;
    Ok(Json(report))
}

async fn _probe_run_report(
    pool: &sqlx::PgPool,
    flavor: reporting_db::DbFlavor,
    source: &str,
    params: &std::collections::BTreeMap<String, String>,
    limit: u64,
) -> Result<ReportResponse, HandlerError> {
    let report = reporting_db::run_report(pool, flavor, source, params, limit).await?;
    Ok(report)
}

fn _assert_post_report_send() {
    fn assert_send<T: Send>(_: T) {}
    assert_send(post_report(
        State(std::sync::Arc::new(AppState::new())),
        SessionHandle { session: std::sync::Arc::new(Session::new("", "").unwrap()), token: None },
        String::new(),
    ));
}

/// Report sources may only come from plain web URLs.
fn validate_report_url(url: &str) -> anyhow::Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        bail!("URL scheme must be http or https")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_config_item_passes_strings_through() {
        let entry = SettingsEntry {
            id: "1".to_string(),
            scope: SETTINGS_SCOPE.to_string(),
            key: "config".to_string(),
            value: json!("v1"),
        };
        let item = to_config_item(&entry, "t1").unwrap();
        assert_eq!(
            serde_json::to_string(&item).unwrap(),
            r#"{"key":"config","tenant":"t1","value":"v1"}"#
        );
    }

    #[test]
    fn test_to_config_item_serialises_structured_values() {
        let entry = SettingsEntry {
            id: "1".to_string(),
            scope: SETTINGS_SCOPE.to_string(),
            key: "dbinfo".to_string(),
            value: json!({"url": "u", "user": "f", "pass": "p"}),
        };
        let item = to_config_item(&entry, "t1").unwrap();
        assert_eq!(item.value, r#"{"pass":"p","url":"u","user":"f"}"#);
    }

    #[test]
    fn test_validate_report_url() {
        assert!(validate_report_url("https://example.com/loans.sql").is_ok());
        assert!(validate_report_url("http://example.com/loans.sql").is_ok());
        assert!(validate_report_url("ftp://example.com/loans.sql").is_err());
        assert!(validate_report_url("file:///etc/passwd").is_err());
        assert!(validate_report_url("").is_err());
    }
}
