//! In-memory `ContentStore` for tests and the command-line runner.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    ContentGenerationRequest, ContentStore, Error, GeneratedContent, ProcessingStatus, Result,
};

#[derive(Debug, Default)]
struct StoreState {
    requests: HashMap<String, ContentGenerationRequest>,
    generated: HashMap<String, GeneratedContent>,
    status: HashMap<String, (ProcessingStatus, Option<String>)>,
    history: HashMap<String, Vec<ProcessingStatus>>,
}

/// Thread-safe, clonable content store held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryContentStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with requests.
    pub fn with_requests(requests: impl IntoIterator<Item = ContentGenerationRequest>) -> Self {
        let state = StoreState {
            requests: requests
                .into_iter()
                .map(|r| (r.content_id.clone(), r))
                .collect(),
            ..Default::default()
        };
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    /// Register (or replace) a content item.
    pub async fn insert(&self, request: ContentGenerationRequest) {
        let mut state = self.state.write().await;
        state.requests.insert(request.content_id.clone(), request);
    }

    /// Generated content saved for an item, if any.
    pub async fn generated(&self, content_id: &str) -> Option<GeneratedContent> {
        self.state.read().await.generated.get(content_id).cloned()
    }

    /// Latest status and error message recorded for an item.
    pub async fn status(&self, content_id: &str) -> Option<(ProcessingStatus, Option<String>)> {
        self.state.read().await.status.get(content_id).cloned()
    }

    /// Every status recorded for an item, oldest first.
    pub async fn status_history(&self, content_id: &str) -> Vec<ProcessingStatus> {
        self.state
            .read()
            .await
            .history
            .get(content_id)
            .cloned()
            .unwrap_or_default()
    }
}

fn record(state: &mut StoreState, content_id: &str, status: ProcessingStatus, error: Option<&str>) {
    state
        .status
        .insert(content_id.to_string(), (status, error.map(String::from)));
    state
        .history
        .entry(content_id.to_string())
        .or_default()
        .push(status);
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn fetch_request(&self, content_id: &str) -> Result<ContentGenerationRequest> {
        self.state
            .read()
            .await
            .requests
            .get(content_id)
            .cloned()
            .ok_or_else(|| Error::ContentNotFound(content_id.to_string()))
    }

    async fn save_generated(&self, content_id: &str, content: &GeneratedContent) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.requests.contains_key(content_id) {
            return Err(Error::ContentNotFound(content_id.to_string()));
        }
        state
            .generated
            .insert(content_id.to_string(), content.clone());
        record(&mut state, content_id, ProcessingStatus::Completed, None);
        debug!(
            content_id,
            questions = content.questions.len(),
            "Stored generated content"
        );
        Ok(())
    }

    async fn update_status(
        &self,
        content_id: &str,
        status: ProcessingStatus,
        error: Option<&str>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        record(&mut state, content_id, status, error);
        Ok(())
    }
}
