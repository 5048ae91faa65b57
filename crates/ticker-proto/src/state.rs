use crate::protocol::TickerSnapshot;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Holds the most recently published snapshot for readers outside the core.
///
/// The core is the only writer and always replaces the whole snapshot, so a
/// reader never observes a half-applied update.
pub struct StateManager {
    state: Arc<RwLock<TickerSnapshot>>,
}

impl StateManager {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(TickerSnapshot::default())),
        }
    }

    pub fn arc(&self) -> Arc<RwLock<TickerSnapshot>> {
        Arc::clone(&self.state)
    }

    pub async fn get_state(&self) -> TickerSnapshot {
        self.state.read().await.clone()
    }

    pub async fn rev(&self) -> u64 {
        self.state.read().await.rev
    }

    /// Replace the snapshot, stamping it with the next revision.
    pub async fn publish(&self, mut snapshot: TickerSnapshot) -> u64 {
        let mut state = self.state.write().await;
        snapshot.rev = state.rev + 1;
        *state = snapshot;
        state.rev
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_bumps_rev_and_replaces() {
        let sm = StateManager::new();
        assert_eq!(sm.rev().await, 0);

        let snapshot = TickerSnapshot {
            news_items: vec!["a".to_string()],
            rev: 99,
            ..Default::default()
        };
        assert_eq!(sm.publish(snapshot).await, 1);

        let snapshot = TickerSnapshot {
            is_breaking_mode: true,
            ..Default::default()
        };
        assert_eq!(sm.publish(snapshot).await, 2);

        let state = sm.get_state().await;
        assert_eq!(state.rev, 2);
        assert!(state.is_breaking_mode);
        assert!(state.news_items.is_empty());
    }
}
