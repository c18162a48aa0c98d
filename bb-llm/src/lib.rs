//! Provider abstraction for BizBot.
//!
//! One `Dispatcher` is bound to one text-generation backend for its whole
//! lifetime. It builds the backend's wire request, sends it over a shared
//! pooled client and normalizes the reply into plain text or a
//! `GenerationError`.

mod config;
mod connection;
mod dialect;
mod dispatcher;
mod error;
mod provider;
mod types;

pub use config::{DEFAULT_TIMEOUT_SECS, ProviderConfig};
pub use connection::ConnectionManager;
pub use dispatcher::{Dispatcher, TextGenerator};
pub use error::{ConfigError, GenerationError, GenerationErrorKind, Result};
pub use provider::ProviderKind;
pub use types::{
    CONTEXT_MAX_TOKENS, DEFAULT_MAX_TOKENS, DEFAULT_SYSTEM_MESSAGE, DEFAULT_TEMPERATURE,
    GenerationRequest, with_context,
};
