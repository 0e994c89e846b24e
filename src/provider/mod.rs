use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::Config;
use crate::errors::Result;
use crate::wire::{ChatRequest, ImageRequest};

pub mod mock;
pub mod openai;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[value(name = "openai", alias = "open-ai")]
    OpenAI,
    Mock,
}

/// Chat-completion collaborator: messages in, free-form text out.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, req: &ChatRequest) -> Result<String>;
}

/// Image-generation collaborator: one URL per requested image.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate(&self, req: &ImageRequest) -> Result<Vec<String>>;
}

#[derive(Clone)]
pub struct Providers {
    pub chat: Arc<dyn ChatProvider>,
    pub image: Arc<dyn ImageProvider>,
}

impl Providers {
    pub fn new<P>(p: P) -> Self
    where
        P: ChatProvider + ImageProvider + 'static,
    {
        let shared = Arc::new(p);
        Self { chat: shared.clone(), image: shared }
    }
}

/// Build the collaborators for `kind`. OpenAI refuses to start without a key,
/// so no request is ever attempted without a credential.
pub fn make_providers(kind: ProviderKind, cfg: &Config) -> Result<Providers> {
    match kind {
        ProviderKind::OpenAI => {
            let key = cfg.require_api_key()?;
            Ok(Providers::new(openai::OpenAiClient::new(
                key,
                &cfg.api_base,
                cfg.timeout_secs,
            )?))
        }
        ProviderKind::Mock => Ok(Providers::new(mock::MockProvider::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ArtefactError;

    #[test]
    fn openai_without_key_is_blocked() {
        let cfg = Config { api_key: None, ..Default::default() };
        let err = make_providers(ProviderKind::OpenAI, &cfg).err().unwrap();
        assert!(matches!(err, ArtefactError::MissingCredential));
    }

    #[test]
    fn mock_needs_no_key() {
        let cfg = Config { api_key: None, ..Default::default() };
        assert!(make_providers(ProviderKind::Mock, &cfg).is_ok());
    }
}
