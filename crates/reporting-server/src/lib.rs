//! The HTTP face of the reporting service: per-tenant sessions, the
//! router, and the handlers behind each path.

pub mod error;
pub mod handlers;
pub mod server;
pub mod session;

pub use error::HandlerError;
pub use server::{AppState, build_router, launch};
pub use session::{Session, SessionRegistry};
