use thiserror::Error;

/// Errors from compiling or running work against the reporting database.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("could not run query '{query}': {source}")]
    Query {
        query: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("could not run database flavor probe: {0}")]
    FlavorProbe(#[source] sqlx::Error),

    #[error("query must have exactly one table")]
    TableCount,

    #[error("cannot run {report} report in {database}")]
    FlavorMismatch {
        report: &'static str,
        database: &'static str,
    },

    #[error("could not extract SQL function name")]
    FunctionName,

    #[error("could not open transaction: {0}")]
    Begin(#[source] sqlx::Error),

    #[error("could not register SQL function: {0}")]
    Register(#[source] sqlx::Error),

    #[error("could not decode column '{column}': {source}")]
    Decode {
        column: String,
        #[source]
        source: sqlx::Error,
    },
}
