//! Failover generation of product-photography prompts
//!
//! Sends one prompt (plus optional product images) to a prioritised list of
//! generative AI backends, moving down the list when a backend is rate
//! limited or failing server-side and stopping on any other error.

pub mod ai;
pub mod app;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod report;

pub use error::{BackendError, BackendErrorKind, Error, Result};
