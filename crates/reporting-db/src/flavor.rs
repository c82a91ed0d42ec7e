use crate::error::DbError;
use sqlx::PgPool;

/// The two variants of reporting database this service fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbFlavor {
    MetaDb,
    LdpClassic,
}

impl DbFlavor {
    pub fn name(self) -> &'static str {
        match self {
            DbFlavor::MetaDb => "MetaDB",
            DbFlavor::LdpClassic => "LDP Classic",
        }
    }

    pub fn is_metadb(self) -> bool {
        self == DbFlavor::MetaDb
    }
}

impl std::fmt::Display for DbFlavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// LDP Classic has a dbsystem.main table; MetaDB, oddly, does not expose
// metadb.base_table through this check.
const FLAVOR_PROBE: &str = "SELECT 1 FROM pg_class c JOIN pg_namespace n ON c.relnamespace=n.oid \
     WHERE n.nspname='dbsystem' AND c.relname='main'";

/// Decide which flavor the connected database is: a row from the probe
/// means LDP Classic, no row means MetaDB, anything else propagates.
pub async fn probe_flavor(pool: &PgPool) -> Result<DbFlavor, DbError> {
    let row = sqlx::query(FLAVOR_PROBE)
        .fetch_optional(pool)
        .await
        .map_err(DbError::FlavorProbe)?;
    Ok(match row {
        Some(_) => DbFlavor::LdpClassic,
        None => DbFlavor::MetaDb,
    })
}
