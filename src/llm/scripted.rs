//! An in-memory completion provider for deterministic tests and offline
//! replay: returns a pre-programmed sequence of completion sets, one per
//! call, in call order.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::CompletionProvider;
use crate::error::LlmError;

pub struct ScriptedProvider {
    script: Mutex<VecDeque<HashSet<String>>>,
}

impl ScriptedProvider {
    /// Program a fixed sequence of completion sets, consumed one per call
    /// to [`CompletionProvider::completions`] regardless of `prompt` or
    /// `temperature`.
    pub fn new(script: Vec<Vec<String>>) -> Self {
        Self {
            script: Mutex::new(
                script
                    .into_iter()
                    .map(|set| set.into_iter().collect())
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn completions(&self, _prompt: &str, _temperature: f64) -> Result<HashSet<String>, LlmError> {
        let mut script = self.script.lock().expect("scripted provider mutex poisoned");
        Ok(script.pop_front().unwrap_or_default())
    }
}
