// SPDX-License-Identifier: MIT

//! Conversation registry: one [`Conversation`] per correlation id, isolated
//! from every other conversation but serialized within itself (spec §3:
//! "concurrent conversations... never interleave turns within the same
//! correlation id").

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;

use oa_core::conversation::{Conversation, CorrelationId};

/// A conversation guarded by an async mutex, so one correlation id's
/// reasoning-loop iterations run strictly one after another while unrelated
/// correlation ids proceed concurrently.
pub type SharedConversation = Arc<AsyncMutex<Conversation>>;

#[derive(Default)]
pub struct ConversationManager {
    conversations: RwLock<HashMap<CorrelationId, SharedConversation>>,
}

impl ConversationManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the conversation for `cid`, creating an empty one on first use.
    pub fn get_or_create(&self, cid: CorrelationId) -> SharedConversation {
        if let Some(convo) = self.conversations.read().get(&cid) {
            return Arc::clone(convo);
        }
        let mut guard = self.conversations.write();
        Arc::clone(guard.entry(cid).or_insert_with(|| Arc::new(AsyncMutex::new(Conversation::new()))))
    }

    pub fn count(&self) -> usize {
        self.conversations.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_correlation_id_returns_the_same_conversation() {
        let mgr = ConversationManager::new();
        let cid = CorrelationId::new();
        let a = mgr.get_or_create(cid);
        let b = mgr.get_or_create(cid);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(mgr.count(), 1);
    }

    #[tokio::test]
    async fn distinct_correlation_ids_get_distinct_conversations() {
        let mgr = ConversationManager::new();
        mgr.get_or_create(CorrelationId::new());
        mgr.get_or_create(CorrelationId::new());
        assert_eq!(mgr.count(), 2);
    }
}
