//! Credential-rotating generation loop.

use crate::openrouter::{ChatRequest, ImageApi, ResponseInterpreter, chat_completions_url};
use drawplus_core::{GenerationOutcome, GenerationRequest, StoredImage};
use drawplus_error::{GenerationError, GenerationErrorKind};
use drawplus_rate_limit::CredentialRotator;
use drawplus_storage::ImageStore;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Drives one generation request across the credential pool.
///
/// Each attempt uses the rotator's current credential. Only quota exhaustion
/// and transport failures move on to the next credential; every other
/// outcome ends the request on the spot. At most one attempt is made per
/// credential in the pool.
#[derive(Debug)]
pub struct GenerationOrchestrator<A: ImageApi> {
    api: A,
    store: Arc<ImageStore>,
    interpreter: ResponseInterpreter,
}

impl<A: ImageApi> GenerationOrchestrator<A> {
    /// Combine a transport with the store that receives successful images.
    pub fn new(api: A, store: Arc<ImageStore>) -> Self {
        Self {
            api,
            store,
            interpreter: ResponseInterpreter::new(),
        }
    }

    /// The underlying transport.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// The image store.
    pub fn store(&self) -> &Arc<ImageStore> {
        &self.store
    }

    /// Generate an image, rotating credentials on quota and network failures.
    ///
    /// # Errors
    ///
    /// - `ContentFiltered` as soon as the provider refuses the prompt
    /// - `NoImageFound` / `MalformedResponse` when the provider answered
    ///   without a usable image
    /// - `QuotaExceeded` / `TransientNetwork` when the last credential fails
    /// - `Decode` / `Storage` if the image cannot be persisted
    #[instrument(
        skip(self, request, rotator),
        fields(
            model = %request.model(),
            reference_images = request.reference_images().len(),
            pool_size = rotator.pool_size()
        )
    )]
    pub async fn generate(
        &self,
        request: &GenerationRequest,
        rotator: &CredentialRotator,
    ) -> Result<StoredImage, GenerationError> {
        let endpoint = chat_completions_url(request.api_base().as_deref());
        let body = ChatRequest::for_generation(request);
        let attempts = rotator.pool_size();

        for attempt in 0..attempts {
            let credential = rotator.next();
            debug!(attempt, credential_index = credential.index(), "Attempting generation");

            let outcome = match self.api.send(&endpoint, &credential, &body).await {
                Ok(response) => self.interpreter.interpret(&response),
                Err(e) => GenerationOutcome::TransientNetworkError { message: e.message },
            };

            let last_attempt = attempt + 1 == attempts;
            match outcome {
                GenerationOutcome::Success { image_bytes, format } => {
                    let stored = self.store.save(&image_bytes, format).await?;
                    info!(
                        attempt,
                        credential_index = credential.index(),
                        path = %stored.path().display(),
                        "Image generated"
                    );
                    return Ok(stored);
                }
                failure if failure.should_rotate() && !last_attempt => {
                    warn!(
                        attempt,
                        credential_index = credential.index(),
                        outcome = %failure,
                        "Credential failed, rotating"
                    );
                    rotator.rotate();
                }
                failure => {
                    warn!(
                        attempt,
                        credential_index = credential.index(),
                        outcome = %failure,
                        "Generation failed"
                    );
                    if let Some(error) = failure.into_error() {
                        return Err(error);
                    }
                }
            }
        }

        Err(GenerationError::new(GenerationErrorKind::QuotaExceeded(
            "credential pool exhausted".to_string(),
        )))
    }
}
