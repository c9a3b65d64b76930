//! Utility modules supporting data acquisition.
//!
//! - [`HttpClient`]: shared reqwest client with NIST-friendly defaults
//! - [`RetryConfig`] and [`with_retry`]: exponential backoff on transient
//!   transport errors
//! - [`run_group`]: concurrent task groups preserving submission order
//! - [`date`]: loose date parsing and year-window checks
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use nist_resolver::utils::{with_retry, HttpClient, RetryConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let url = "https://csrc.nist.gov/CSRC/media/feeds/metanorma/pubs-export.meta";
//! let modified = with_retry(RetryConfig::default(), || client.last_modified(url)).await?;
//! # Ok(())
//! # }
//! ```

pub mod date;
mod http;
pub mod pool;
mod retry;

pub use http::{HttpClient, DEFAULT_USER_AGENT};
pub use pool::run_group;
pub use retry::{with_retry, RetryConfig, TransientError};
