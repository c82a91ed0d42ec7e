use crate::error::OkapiError;
use crate::settings::{SettingsEntry, SettingsPage};
use reqwest::Method;
use serde_json::{Value, json};
use std::env;
use std::sync::RwLock;

const TENANT_HEADER: &str = "X-Okapi-Tenant";
const TOKEN_HEADER: &str = "X-Okapi-Token";

struct Credentials {
    username: String,
    password: String,
}

/// Tenant-scoped client for the settings WSAPI behind Okapi.
///
/// A client either *resumes* a session (base URL and tenant taken from the
/// incoming request, tokens supplied per call) or is built from the
/// process environment, in which case it logs in with `OKAPI_USER` /
/// `OKAPI_PW` the first time a call has no token to send.
pub struct OkapiClient {
    http: reqwest::Client,
    base_url: String,
    tenant: String,
    credentials: Option<Credentials>,
    login_token: RwLock<Option<String>>,
}

impl OkapiClient {
    /// Resume a session against the given Okapi URL and tenant. No
    /// credentials are held; calls rely on per-request tokens.
    pub fn resume(url: &str, tenant: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: url.trim_end_matches('/').to_string(),
            tenant: tenant.to_string(),
            credentials: None,
            login_token: RwLock::new(None),
        }
    }

    /// Build the default client from `OKAPI_URL`, `OKAPI_TENANT`,
    /// `OKAPI_USER` and `OKAPI_PW`.
    pub fn from_env() -> Result<Self, OkapiError> {
        let url = require_env("OKAPI_URL")?;
        let tenant = require_env("OKAPI_TENANT")?;
        let username = require_env("OKAPI_USER")?;
        let password = require_env("OKAPI_PW")?;
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: url.trim_end_matches('/').to_string(),
            tenant,
            credentials: Some(Credentials { username, password }),
            login_token: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    /// Fetch the settings entries in `scope`, optionally restricted to a
    /// single key. Only the first page is read.
    pub async fn fetch_entries(
        &self,
        scope: &str,
        key: Option<&str>,
        token: Option<&str>,
    ) -> Result<SettingsPage, OkapiError> {
        let mut query = format!("scope==\"{scope}\"");
        if let Some(key) = key {
            query.push_str(&format!("+and+key==\"{key}\""));
        }
        let path = format!("settings/entries?query={query}");
        let body = self.send(Method::GET, &path, None, token).await?;
        let page: SettingsPage = serde_json::from_str(&body)?;
        Ok(page)
    }

    /// Write a settings entry. When `existing_id` names a record already
    /// stored under this (scope, key) the entry replaces it with PUT;
    /// otherwise it is created with POST.
    pub async fn write_entry(
        &self,
        existing_id: Option<&str>,
        entry: &SettingsEntry,
        token: Option<&str>,
    ) -> Result<(), OkapiError> {
        let body = serde_json::to_value(entry)?;
        match existing_id {
            Some(id) => {
                let path = format!("settings/entries/{id}");
                self.send(Method::PUT, &path, Some(&body), token).await?;
            }
            None => {
                self.send(Method::POST, "settings/entries", Some(&body), token)
                    .await?;
            }
        }
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<String, OkapiError> {
        let url = format!("{}/{}", self.base_url, path);
        let method_name = method_name(&method);

        let token = match token {
            Some(t) => Some(t.to_string()),
            None => self.login_token().await?,
        };

        let mut request = self
            .http
            .request(method, &url)
            .header(TENANT_HEADER, self.tenant.as_str());
        if let Some(token) = &token {
            request = request.header(TOKEN_HEADER, token.as_str());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(OkapiError::Status {
                method: method_name,
                url,
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// The cached login token, logging in first if we hold credentials
    /// and have not logged in yet. Clients without credentials return
    /// None and send unauthenticated requests.
    async fn login_token(&self) -> Result<Option<String>, OkapiError> {
        let Some(credentials) = &self.credentials else {
            return Ok(None);
        };

        if let Some(token) = self.login_token.read().unwrap_or_else(|e| e.into_inner()).clone() {
            return Ok(Some(token));
        }

        let url = format!("{}/authn/login", self.base_url);
        let response = self
            .http
            .post(&url)
            .header(TENANT_HEADER, self.tenant.as_str())
            .json(&json!({
                "username": credentials.username,
                "password": credentials.password,
            }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(OkapiError::Status {
                method: "POST",
                url,
                status: status.as_u16(),
                body,
            });
        }

        let token = response
            .headers()
            .get("x-okapi-token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(OkapiError::NoToken { url })?;

        tracing::info!(target: "session", "logged in to {} as {}", self.base_url, credentials.username);
        *self.login_token.write().unwrap_or_else(|e| e.into_inner()) = Some(token.clone());
        Ok(Some(token))
    }
}

fn method_name(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::PUT => "PUT",
        Method::POST => "POST",
        _ => "HTTP",
    }
}

fn require_env(name: &'static str) -> Result<String, OkapiError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(OkapiError::MissingEnv(name)),
    }
}
