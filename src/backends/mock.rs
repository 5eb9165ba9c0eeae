//! Mock backend implementation for testing and dry runs without network access

use crate::error::{GenerationError, Result};
use crate::generation::{GeneratedImage, GenerationRequest, ImageBackend};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Mutex;

/// PNG signature used as the prefix of every mock payload
pub const PNG_SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Mock backend returning deterministic inline images
///
/// Every request is recorded so tests can inspect what was asked for.
#[derive(Debug, Default)]
pub struct MockBackend {
    requests: Mutex<Vec<GenerationRequest>>,
    fail_on_call: Option<(usize, u16)>,
    max_images_per_call: Option<u32>,
}

impl MockBackend {
    /// Create a new mock backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the given 1-based call with an API error of `status`
    #[must_use]
    pub fn with_failure_on_call(mut self, call: usize, status: u16) -> Self {
        self.fail_on_call = Some((call, status));
        self
    }

    /// Return at most `limit` images per call regardless of the requested count
    #[must_use]
    pub fn with_max_images_per_call(mut self, limit: u32) -> Self {
        self.max_images_per_call = Some(limit);
        self
    }

    /// Requests received so far
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Number of calls received so far
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|requests| requests.len()).unwrap_or(0)
    }

    /// Raw bytes of the `index`th image of the `call`th request
    #[must_use]
    pub fn payload(call: usize, index: u32) -> Vec<u8> {
        let mut bytes = PNG_SIGNATURE.to_vec();
        bytes.extend_from_slice(format!("mock:{}:{}", call, index).as_bytes());
        bytes
    }
}

#[async_trait]
impl ImageBackend for MockBackend {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<GeneratedImage>> {
        let call = {
            let mut requests = self
                .requests
                .lock()
                .map_err(|_| GenerationError::config("mock backend state poisoned"))?;
            requests.push(request.clone());
            requests.len()
        };

        if let Some((failing_call, status)) = self.fail_on_call {
            if call == failing_call {
                return Err(GenerationError::api(status, format!("mock failure on call {}", call)));
            }
        }

        let count = self
            .max_images_per_call
            .map_or(request.n, |limit| request.n.min(limit));

        Ok((0..count)
            .map(|index| GeneratedImage::Base64(STANDARD.encode(Self::payload(call, index))))
            .collect())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
