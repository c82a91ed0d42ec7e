use crate::error::DbError;
use crate::flavor::DbFlavor;
use crate::rows::rows_to_maps;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// The request body for `/ldp/db/reports`: where to fetch the SQL
/// function from, the named arguments to call it with, and an optional
/// row limit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub limit: u64,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    #[serde(rename = "totalRecords")]
    pub total_records: usize,
    pub records: Vec<Map<String, Value>>,
}

/// Check the report's flavor marker against the connected database. A
/// report written for the other flavor is refused before any SQL runs.
pub fn check_flavor(source: &str, flavor: DbFlavor) -> Result<(), DbError> {
    if flavor.is_metadb() && source.starts_with("--ldp:function") {
        return Err(DbError::FlavorMismatch {
            report: DbFlavor::LdpClassic.name(),
            database: DbFlavor::MetaDb.name(),
        });
    }
    if !flavor.is_metadb() && source.starts_with("--metadb:function") {
        return Err(DbError::FlavorMismatch {
            report: DbFlavor::MetaDb.name(),
            database: DbFlavor::LdpClassic.name(),
        });
    }
    Ok(())
}

static FUNCTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"--.+:function\s+(.+)").expect("function-name regex"));

/// Build the `SELECT * FROM name(k => 'v', ...)` invocation from the
/// report source's marker line and the request's named parameters.
/// Single quotes in values are doubled.
pub fn make_function_call(
    source: &str,
    params: &BTreeMap<String, String>,
    limit: u64,
) -> Result<String, DbError> {
    let name = FUNCTION_NAME
        .captures(source)
        .and_then(|c| c.get(1))
        .ok_or(DbError::FunctionName)?
        .as_str();

    let args: Vec<String> = params
        .iter()
        .map(|(key, value)| format!("{} => '{}'", key, value.replace('\'', "''")))
        .collect();

    let mut call = format!("SELECT * FROM {}({})", name, args.join(", "));
    if limit != 0 {
        call.push_str(&format!(" LIMIT {limit}"));
    }
    Ok(call)
}

/// Register the report's function and invoke it, inside a transaction
/// that is always rolled back: the function definition is deliberately
/// request-local and never persists.
pub async fn run_report(
    pool: &PgPool,
    flavor: DbFlavor,
    source: &str,
    params: &BTreeMap<String, String>,
    limit: u64,
) -> Result<ReportResponse, DbError> {
    check_flavor(source, flavor)?;

    let sql = if flavor.is_metadb() {
        source.to_string()
    } else {
        // LDP Classic functions resolve their tables via the search path
        format!("SET search_path = local, public;\n{source}")
    };

    let call = make_function_call(&sql, params, limit)?;

    let mut tx = pool.begin().await.map_err(DbError::Begin)?;

    sqlx::raw_sql(&sql)
        .execute(&mut *tx)
        .await
        .map_err(DbError::Register)?;

    let rows = sqlx::query(&call)
        .fetch_all(&mut *tx)
        .await
        .map_err(|source| DbError::Query {
            query: call.clone(),
            source,
        })?;

    let records = rows_to_maps(&rows)?;

    // Rolled back even on success; dropping the transaction would do the
    // same for the error paths above.
    let _ = tx.rollback().await;

    Ok(ReportResponse {
        total_records: records.len(),
        records,
    })
}
