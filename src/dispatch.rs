//! Ordered failover across interchangeable generation backends
//!
//! A dispatch walks the backend list front to back, stops at the first
//! success, moves on after a retryable failure and gives up on the first
//! non-retryable one. Nothing is remembered between dispatches.

use crate::error::{BackendError, BackendResult};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// A named backend and its rank in the failover order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub identifier: String,
    /// Lower is tried earlier.
    pub priority: u32,
}

impl BackendDescriptor {
    pub fn new(identifier: impl Into<String>, priority: u32) -> Self {
        Self {
            identifier: identifier.into(),
            priority,
        }
    }
}

/// Order descriptors by priority, keeping list position for equal ranks.
pub fn rank(mut backends: Vec<BackendDescriptor>) -> Vec<BackendDescriptor> {
    backends.sort_by_key(|backend| backend.priority);
    backends
}

/// Payload forwarded unchanged to every backend attempted.
#[derive(Debug, Clone)]
pub struct DispatchRequest<P> {
    payload: P,
}

impl<P> DispatchRequest<P> {
    pub fn new(payload: P) -> Self {
        Self { payload }
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome<R> {
    /// A backend produced a result.
    Success { backend_identifier: String, result: R },
    /// Every backend failed with a retryable error.
    Exhausted { last_error: BackendError },
    /// A backend failed with a non-retryable error; later backends were skipped.
    Fatal { error: BackendError },
}

impl<R> DispatchOutcome<R> {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Performs one call against one backend and classifies the outcome.
///
/// Implementations own timeouts and must map every failure to a
/// [`BackendError`] of the right kind.
#[async_trait]
pub trait Invoke<P, R>: Send + Sync
where
    P: Send + Sync,
    R: Send,
{
    async fn invoke(
        &self,
        backend: &BackendDescriptor,
        request: &DispatchRequest<P>,
    ) -> BackendResult<R>;
}

/// Try `backends` in list order until one succeeds or fails fatally.
///
/// Returns [`Error::Configuration`] without calling `invoker` when the list
/// is empty. Every other result is a [`DispatchOutcome`].
pub async fn dispatch<P, R, I>(
    backends: &[BackendDescriptor],
    request: &DispatchRequest<P>,
    invoker: &I,
) -> Result<DispatchOutcome<R>>
where
    P: Send + Sync,
    R: Send,
    I: Invoke<P, R> + ?Sized,
{
    if backends.is_empty() {
        return Err(Error::Configuration(
            "at least one backend is required to dispatch".to_string(),
        ));
    }

    let mut last_error = None;

    for (index, backend) in backends.iter().enumerate() {
        info!(
            "Trying backend {} ({}/{})",
            backend.identifier,
            index + 1,
            backends.len()
        );

        match invoker.invoke(backend, request).await {
            Ok(result) => {
                info!("Backend {} succeeded", backend.identifier);
                return Ok(DispatchOutcome::Success {
                    backend_identifier: backend.identifier.clone(),
                    result,
                });
            }
            Err(e) if e.is_retryable() => {
                warn!(
                    "Backend {} unavailable ({}), failing over: {}",
                    backend.identifier, e.kind, e.message
                );
                last_error = Some(e);
            }
            Err(e) => {
                error!("Backend {} failed fatally: {}", backend.identifier, e);
                return Ok(DispatchOutcome::Fatal { error: e });
            }
        }
    }

    let last_error = last_error.ok_or_else(|| {
        Error::Invariant("dispatch loop finished without recording an error".to_string())
    })?;
    error!(
        "All {} backends exhausted, last error: {}",
        backends.len(),
        last_error
    );
    Ok(DispatchOutcome::Exhausted { last_error })
}
