use crate::error::DbError;
use serde::Deserialize;
use std::fmt::Write;

/// One `key op value` filter. The value is always carried as a string and
/// bound as a parameter; key and op are spliced into the SQL.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnFilter {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub op: String,
    #[serde(default)]
    pub value: String,
}

/// One ORDER BY term. `nulls` takes `"first"`/`"start"` for NULLS FIRST;
/// anything else (including empty) means NULLS LAST.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderSpec {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub direction: String,
    #[serde(default)]
    pub nulls: String,
}

/// The selector for a single table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableQuery {
    #[serde(default)]
    pub schema: String,
    #[serde(rename = "tableName", default)]
    pub table_name: String,
    #[serde(rename = "columnFilters", default)]
    pub column_filters: Vec<ColumnFilter>,
    #[serde(rename = "showColumns", default)]
    pub show_columns: Vec<String>,
    #[serde(rename = "orderBy", default)]
    pub order_by: Vec<OrderSpec>,
    #[serde(default)]
    pub limit: u64,
}

/// The structured query as POSTed to `/ldp/db/query`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonQuery {
    #[serde(default)]
    pub tables: Vec<TableQuery>,
}

/// Compile a structured query to a parameterised SQL statement and its
/// argument vector. Placeholders are numbered by their position in the
/// argument vector, so skipped filters leave no gaps.
pub fn build_sql(query: &JsonQuery) -> Result<(String, Vec<String>), DbError> {
    let [table] = query.tables.as_slice() else {
        return Err(DbError::TableCount);
    };

    let mut sql = format!(
        "SELECT {} FROM \"{}\".\"{}\"",
        column_list(&table.show_columns),
        table.schema,
        table.table_name,
    );

    let (condition, args) = filter_clause(&table.column_filters);
    if !condition.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&condition);
    }
    if !table.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&order_clause(&table.order_by));
    }
    if table.limit != 0 {
        let _ = write!(sql, " LIMIT {}", table.limit);
    }

    Ok((sql, args))
}

fn column_list(columns: &[String]) -> String {
    if columns.is_empty() {
        "*".to_string()
    } else {
        columns.join(", ")
    }
}

fn filter_clause(filters: &[ColumnFilter]) -> (String, Vec<String>) {
    let mut clause = String::new();
    let mut args = Vec::new();

    for filter in filters {
        if filter.key.is_empty() {
            continue;
        }
        if !clause.is_empty() {
            clause.push_str(" AND ");
        }
        let op = if filter.op.is_empty() { "=" } else { &filter.op };
        args.push(filter.value.clone());
        let _ = write!(clause, "{} {} ${}", filter.key, op, args.len());
    }

    (clause, args)
}

fn order_clause(orders: &[OrderSpec]) -> String {
    let terms: Vec<String> = orders
        .iter()
        .map(|order| {
            let nulls = if order.nulls.eq_ignore_ascii_case("first")
                || order.nulls.eq_ignore_ascii_case("start")
            {
                "NULLS FIRST"
            } else {
                "NULLS LAST"
            };
            format!("{} {} {}", order.key, order.direction, nulls)
        })
        .collect();
    terms.join(", ")
}
