//! Binds the configured backend roster to provider clients.

use super::GenerationService;
use crate::dispatch::{rank, BackendDescriptor, DispatchRequest, Invoke};
use crate::error::{BackendError, BackendResult};
use crate::models::{GenerationRequest, GenerationResponse};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;

/// Ordered set of backends with the client that serves each one.
#[derive(Default)]
pub struct ProviderPool {
    descriptors: Vec<BackendDescriptor>,
    services: HashMap<String, Box<dyn GenerationService>>,
}

impl ProviderPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend. Identifiers must be unique within the pool.
    pub fn register(
        &mut self,
        descriptor: BackendDescriptor,
        service: Box<dyn GenerationService>,
    ) -> Result<()> {
        if self.services.contains_key(&descriptor.identifier) {
            return Err(Error::Configuration(format!(
                "Backend '{}' is registered more than once",
                descriptor.identifier
            )));
        }

        self.services.insert(descriptor.identifier.clone(), service);
        self.descriptors.push(descriptor);
        Ok(())
    }

    pub fn with_backend(
        mut self,
        descriptor: BackendDescriptor,
        service: Box<dyn GenerationService>,
    ) -> Result<Self> {
        self.register(descriptor, service)?;
        Ok(self)
    }

    /// Registered backends in failover order.
    pub fn descriptors(&self) -> Vec<BackendDescriptor> {
        rank(self.descriptors.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[async_trait]
impl Invoke<GenerationRequest, GenerationResponse> for ProviderPool {
    async fn invoke(
        &self,
        backend: &BackendDescriptor,
        request: &DispatchRequest<GenerationRequest>,
    ) -> BackendResult<GenerationResponse> {
        let service = self.services.get(&backend.identifier).ok_or_else(|| {
            BackendError::rejected(
                backend.identifier.clone(),
                "No client registered for this backend",
            )
        })?;

        // Errors name the backend as the dispatcher knows it.
        service.generate(request.payload()).await.map_err(|mut e| {
            e.backend = backend.identifier.clone();
            e
        })
    }
}
