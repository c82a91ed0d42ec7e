use thiserror::Error;

/// Errors from talking to the upstream settings service.
#[derive(Debug, Error)]
pub enum OkapiError {
    #[error("could not reach settings service: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{method} {url} returned status {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    #[error("could not decode settings response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("decode 'dbinfo' old-style value failed: {0}")]
    OldDbInfo(#[source] serde_json::Error),

    #[error("no 'dbinfo' setting in FOLIO database")]
    MissingDbInfo,

    #[error("login to {url} did not yield a token")]
    NoToken { url: String },

    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
}
