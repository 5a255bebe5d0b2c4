//! Shared test helpers: scripted model providers
//!
//! The workflow and HTTP tests drive the orchestrator with providers
//! that replay canned chunk sequences instead of talking to a real
//! model API.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use weft_gen::providers::{
    CompletionRequest, ModelFamily, ModelProvider, ProviderError, ProviderFactory,
};

/// One scripted attempt: either a chunk sequence or a provider error
pub type Script = Result<Vec<&'static str>, ProviderError>;

/// Replays scripted attempts in order and records every request
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    /// Requests received, in call order
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    pub fn new(scripts: Vec<Script>) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(scripts.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Number of completion calls received so far
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The last user message sent to the model on call `index`
    pub fn instruction(&self, index: usize) -> String {
        let requests = self.requests.lock().unwrap();
        requests[index]
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn stream_completion(
        &self,
        request: &CompletionRequest,
        chunk_tx: mpsc::Sender<String>,
    ) -> Result<(), ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .expect("scripted provider ran out of scripts");

        match script {
            Ok(chunks) => {
                for chunk in chunks {
                    if chunk_tx.send(chunk.to_string()).await.is_err() {
                        return Ok(());
                    }
                }
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Factory handing out one shared scripted provider for every family
pub struct ScriptedFactory {
    provider: Arc<ScriptedProvider>,
}

impl ScriptedFactory {
    pub fn new(provider: Arc<ScriptedProvider>) -> Arc<Self> {
        Arc::new(Self { provider })
    }
}

impl ProviderFactory for ScriptedFactory {
    fn provider(&self, _family: ModelFamily, _api_key: &str) -> Arc<dyn ModelProvider> {
        self.provider.clone()
    }
}
