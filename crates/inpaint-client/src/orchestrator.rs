use std::sync::Arc;

use crate::response::interpret;
use crate::{
    EditError, EditRequest, EditResult, ResourceStore, Result, Transport, TRANSPORT_FAILURE,
};

/// Runs a single edit round trip: one request, no retries.
#[derive(Clone)]
pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    store: Arc<dyn ResourceStore>,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn ResourceStore>) -> Self {
        Self { transport, store }
    }

    pub fn store(&self) -> Arc<dyn ResourceStore> {
        self.store.clone()
    }

    /// Send `request` and publish the returned image as an owned result.
    pub async fn submit_edit(&self, request: &EditRequest) -> Result<EditResult> {
        tracing::info!(
            image = %request.image.file_name,
            image_bytes = request.image.bytes.len(),
            mask_bytes = request.mask.bytes.len(),
            "sending edit request"
        );

        let response = match self.transport.send(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!("edit request failed: {err}");
                return Err(EditError::Network {
                    status: None,
                    message: TRANSPORT_FAILURE.to_string(),
                });
            }
        };

        tracing::debug!(status = response.status, bytes = response.body.len(), "edit response");
        let image = interpret(response)?;
        let resource = self.store.publish(image.bytes, &image.mime)?;
        tracing::info!(id = resource.id.0, mime = %resource.mime, "edit result ready");

        Ok(EditResult::new(resource, self.store.clone()))
    }
}
