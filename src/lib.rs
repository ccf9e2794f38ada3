//! # sdfetch
//!
//! ScienceDirect search form - paginated article lookup over the Elsevier search API
//!
//! ## Modules
//!
//! - [`query`] - Search form fields and input checks
//! - [`sciencedirect`] - Search API client and response parsing
//! - [`models`] - Parsed result entries
//! - [`pagination`] - Page bounds from total count and page size
//! - [`session`] - Form view model, request sequencing and the action controller
//! - [`render`] - HTML form, pagination bar and results table
//! - [`server`] - axum routes for the browser form
//! - [`export`] - CSV export
//! - [`config`] - Environment configuration
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sdfetch::config::FetcherConfig;
//! use sdfetch::query::{FormField, QueryForm};
//! use sdfetch::sciencedirect::{ScienceDirectClient, SearchBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ScienceDirectClient::new(FetcherConfig::from_env()?)?;
//!     let mut form = QueryForm::default();
//!     form.update(FormField::Query("graphene oxide".to_string()));
//!     let page = client.search(&form).await?;
//!     println!("{} of {} results", page.entries.len(), page.total);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod pagination;
pub mod query;
pub mod render;
pub mod sciencedirect;
pub mod server;
pub mod session;

pub use error::{FetcherError, Result};
