//! Client for the Okapi-fronted settings service (mod-settings).
//!
//! All reporting configuration lives in tenant-scoped settings entries
//! under the `ui-ldp.admin` scope. This crate knows how to read and write
//! those entries, how to log in when running from environment credentials,
//! and how to dig the reporting-database connection details out of the
//! `dbinfo` entry.

pub mod client;
pub mod dbinfo;
pub mod error;
pub mod settings;

pub use client::OkapiClient;
pub use dbinfo::{DbInfo, fetch_db_info};
pub use error::OkapiError;
pub use settings::{SettingsEntry, SettingsPage, value_as_string};

/// The settings scope every entry this service touches lives under.
pub const SETTINGS_SCOPE: &str = "ui-ldp.admin";
