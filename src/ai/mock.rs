use super::GenerationService;
use crate::error::{BackendError, BackendErrorKind, BackendResult};
use crate::models::{GenerationRequest, GenerationResponse};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Scripted stand-in for a provider client.
///
/// Queued answers are replayed in order; once the queue is down to one
/// answer that answer repeats. With nothing queued it echoes the prompt.
#[derive(Clone)]
pub struct MockGenerationClient {
    backend: String,
    responses: Arc<Mutex<VecDeque<BackendResult<String>>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl MockGenerationClient {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
            responses: Arc::new(Mutex::new(VecDeque::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn with_error(self, kind: BackendErrorKind, message: impl Into<String>) -> Self {
        let error = BackendError::new(self.backend.clone(), kind, message);
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    pub fn get_call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn get_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationService for MockGenerationClient {
    async fn generate(&self, request: &GenerationRequest) -> BackendResult<GenerationResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let next = {
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                responses.pop_front()
            } else {
                responses.front().cloned()
            }
        };

        let text = match next {
            Some(answer) => answer?,
            None => format!("[{}] {}", self.backend, request.prompt),
        };

        Ok(GenerationResponse {
            model: self.backend.clone(),
            text,
        })
    }
}
