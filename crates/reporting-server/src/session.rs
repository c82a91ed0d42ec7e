use anyhow::{Context, bail};
use reporting_db::{DbFlavor, probe_flavor};
use reporting_okapi::{OkapiClient, fetch_db_info};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// A cached per-(tenant, upstream-URL) handle: the upstream settings
/// client plus a lazily established reporting-database pool. Once the
/// pool exists its flavor is final for the life of the session.
pub struct Session {
    url: String,
    okapi: OkapiClient,
    db: OnceCell<(PgPool, DbFlavor)>,
}

impl Session {
    /// There are two valid cases: a request arriving through the gateway
    /// carries an upstream URL (and usually a tenant), and a direct
    /// request carries neither and gets the environment-configured
    /// default. A tenant with no URL means someone replayed a gateway
    /// request without its headers, and is rejected outright.
    pub fn new(url: &str, tenant: &str) -> anyhow::Result<Self> {
        if url.is_empty() && !tenant.is_empty() {
            bail!(
                "no URL provided with tenant: responding to a request with no X-Okapi-Url header?"
            );
        }

        let okapi = if url.is_empty() {
            OkapiClient::from_env().context("could not create default session")?
        } else {
            OkapiClient::resume(url, tenant)
        };

        Ok(Self {
            url: url.to_string(),
            okapi,
            db: OnceCell::new(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn tenant(&self) -> &str {
        self.okapi.tenant()
    }

    pub fn okapi(&self) -> &OkapiClient {
        &self.okapi
    }

    /// The reporting-database pool and flavor, established on first use:
    /// resolve `dbinfo`, connect, probe the flavor, and cache the pair
    /// atomically. A failure at any step leaves the session unchanged, so
    /// a later request retries from scratch.
    pub async fn db(&self, token: Option<&str>) -> anyhow::Result<(&PgPool, DbFlavor)> {
        let (pool, flavor) = self
            .db
            .get_or_try_init(|| async {
                let info = fetch_db_info(&self.okapi, token)
                    .await
                    .context("cannot fetch 'dbinfo' from config")?;
                tracing::info!(target: "db", "url={}, user={}", info.url, info.user);

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect(&info.connection_string())
                    .await
                    .context("could not connect to reporting database")?;
                let flavor = probe_flavor(&pool).await?;
                tracing::info!(target: "db", "flavor={}", flavor);

                Ok::<_, anyhow::Error>((pool, flavor))
            })
            .await?;
        Ok((pool, *flavor))
    }
}

/// The (tenant, upstream-URL) → session map. Creation happens inside the
/// critical section, so concurrent first requests for a key observe a
/// single session; creation does no I/O, so the lock is never held across
/// an await.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<(String, String), Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, url: &str, tenant: &str) -> anyhow::Result<Arc<Session>> {
        let key = (tenant.to_string(), url.to_string());
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = sessions.get(&key) {
            return Ok(session.clone());
        }

        let session = Session::new(url, tenant)
            .with_context(|| format!("could not create session for key '{tenant}:{url}'"))?;
        let session = Arc::new(session);
        sessions.insert(key, session.clone());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_without_url_is_rejected() {
        let err = Session::new("", "diku").unwrap_err();
        assert!(err.to_string().contains("no URL provided with tenant"));
    }

    #[test]
    fn test_find_returns_the_same_session_for_a_key() {
        let registry = SessionRegistry::new();
        let a = registry.find("http://folio.example.com", "diku").unwrap();
        let b = registry.find("http://folio.example.com", "diku").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_find_separates_tenants() {
        let registry = SessionRegistry::new();
        let a = registry.find("http://folio.example.com", "diku").unwrap();
        let b = registry.find("http://folio.example.com", "other").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_concurrent_find_yields_one_session() {
        let registry = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    registry.find("http://folio.example.com", "diku").unwrap()
                })
            })
            .collect();
        let sessions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for session in &sessions[1..] {
            assert!(Arc::ptr_eq(&sessions[0], session));
        }
    }
}
