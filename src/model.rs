//! The model-call collaborator
//!
//! Provider HTTP calls, proxies and key storage live outside this crate. The engine
//! only ever sees one uniform operation: give a model a prompt, get text or an error.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Which AI backend a node is executed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    #[default]
    Gemini,
    Chatgpt,
    Claude,
}

impl Model {
    pub const ALL: [Model; 3] = [Model::Gemini, Model::Chatgpt, Model::Claude];

    pub fn id(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Chatgpt => "chatgpt",
            Self::Claude => "claude",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Gemini => "Gemini (recommended)",
            Self::Chatgpt => "ChatGPT",
            Self::Claude => "Claude (server)",
        }
    }

    /// Unknown ids fall back to the default backend
    pub fn from_id(id: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|m| m.id() == id)
            .unwrap_or_default()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Calls a language model. Futures are not required to be `Send` so browser
/// fetch-based implementations fit.
#[async_trait(?Send)]
pub trait ModelClient {
    async fn call(&self, model: Model, prompt: &str) -> Result<String, ModelError>;
}

/// Client used when no provider has been wired in; every call is rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredClient;

#[async_trait(?Send)]
impl ModelClient for UnconfiguredClient {
    async fn call(&self, model: Model, _prompt: &str) -> Result<String, ModelError> {
        Err(ModelError::new(format!(
            "No API key or proxy configured for {}",
            model.label()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_ids_fall_back_to_gemini() {
        assert_eq!(Model::from_id("claude"), Model::Claude);
        assert_eq!(Model::from_id("llama"), Model::Gemini);
        assert_eq!(serde_json::to_string(&Model::Chatgpt).unwrap(), "\"chatgpt\"");
    }

    #[test]
    fn unconfigured_client_rejects_with_message() {
        let err = tokio_test::block_on(UnconfiguredClient.call(Model::Gemini, "hi")).unwrap_err();
        assert!(err.to_string().contains("Gemini"));
    }
}
