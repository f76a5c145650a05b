//! Self-healing element lookup.
//!
//! When an element id expected by automation code no longer exists in the
//! current document, [`Resolver`] asks an [`Oracle`] for the id that replaced
//! it, caches the answer for the rest of the run, and coalesces concurrent
//! lookups of the same stale id into one oracle call. At the end of a run
//! [`Resolver::persist`] writes the discovered mapping back into the
//! caller's source so later runs find the element directly.

mod cache;
mod client;
mod config;
mod document;
mod error;
mod locator;
mod oracle;
pub mod patch;

pub use cache::IdentifierCache;
pub use client::ChatOracle;
pub use config::OPENAI_API_KEY_ENV_VAR;
pub use config::OracleConfig;
pub use document::Document;
pub use document::Element;
pub use document::HtmlDocument;
pub use error::ConfigError;
pub use error::LocateError;
pub use error::OracleError;
pub use error::PatchError;
pub use error::Result;
pub use locator::Resolver;
pub use oracle::Oracle;
pub use oracle::SYSTEM_PROMPT;
pub use oracle::parse_answer;
pub use oracle::user_prompt;
pub use patch::IdentifierMapping;
pub use patch::PatchOutcome;
pub use selfheal_async_utils::OrTimeoutExt;
pub use selfheal_async_utils::TimedOut;
