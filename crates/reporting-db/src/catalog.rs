use crate::error::DbError;
use crate::flavor::DbFlavor;
use serde::Serialize;
use sqlx::{PgPool, Row};

/// One base or derived table visible to reporting users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableEntry {
    #[serde(rename = "tableSchema")]
    pub table_schema: String,
    #[serde(rename = "tableName")]
    pub table_name: String,
}

/// One column of a reporting table. `ordinal_position` is carried as text
/// to match the legacy WSAPI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnEntry {
    #[serde(rename = "columnName")]
    pub column_name: String,
    pub data_type: String,
    #[serde(rename = "tableSchema")]
    pub table_schema: String,
    #[serde(rename = "tableName")]
    pub table_name: String,
    #[serde(rename = "ordinalPosition")]
    pub ordinal_position: String,
}

const METADB_TABLES: &str = "SELECT schema_name, table_name FROM metadb.base_table \
     UNION \
     SELECT 'folio_derived', table_name \
         FROM metadb.table_update t \
             JOIN pg_class c ON c.relname=t.table_name \
             JOIN pg_namespace n ON n.oid=c.relnamespace AND n.nspname=t.schema_name \
         WHERE schema_name='folio_derived'";

const CLASSIC_TABLES: &str = "SELECT table_schema AS schema_name, table_name \
     FROM information_schema.tables \
     WHERE table_schema IN ('local', 'public', 'folio_reporting')";

/// List the tables available for querying, using flavor-specific SQL:
/// MetaDB unions its registry with derived tables that actually exist,
/// LDP Classic reads information_schema for its fixed schema set.
pub async fn list_tables(pool: &PgPool, flavor: DbFlavor) -> Result<Vec<TableEntry>, DbError> {
    let sql = if flavor.is_metadb() {
        METADB_TABLES
    } else {
        CLASSIC_TABLES
    };

    let rows = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .map_err(|source| DbError::Query {
            query: sql.to_string(),
            source,
        })?;

    rows.iter()
        .map(|row| {
            Ok(TableEntry {
                table_schema: row.try_get("schema_name").map_err(|source| DbError::Decode {
                    column: "schema_name".to_string(),
                    source,
                })?,
                table_name: row.try_get("table_name").map_err(|source| DbError::Decode {
                    column: "table_name".to_string(),
                    source,
                })?,
            })
        })
        .collect()
}

// Works for both MetaDB and LDP Classic. The "data" column of Classic
// tables holds the full source record and is excluded.
const COLUMNS_SQL: &str = "SELECT column_name, data_type, ordinal_position::text AS ordinal_position, \
         table_schema, table_name \
     FROM information_schema.columns \
     WHERE table_schema = $1 AND table_name = $2 AND column_name != $3";

/// List the columns of one table.
pub async fn list_columns(
    pool: &PgPool,
    schema: &str,
    table: &str,
) -> Result<Vec<ColumnEntry>, DbError> {
    let rows = sqlx::query(COLUMNS_SQL)
        .bind(schema)
        .bind(table)
        .bind("data")
        .fetch_all(pool)
        .await
        .map_err(|source| DbError::Query {
            query: COLUMNS_SQL.to_string(),
            source,
        })?;

    rows.iter()
        .map(|row| {
            let get = |column: &str| -> Result<String, DbError> {
                row.try_get(column).map_err(|source| DbError::Decode {
                    column: column.to_string(),
                    source,
                })
            };
            Ok(ColumnEntry {
                column_name: get("column_name")?,
                data_type: get("data_type")?,
                table_schema: get("table_schema")?,
                table_name: get("table_name")?,
                ordinal_position: get("ordinal_position")?,
            })
        })
        .collect()
}
