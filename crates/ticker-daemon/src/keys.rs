//! Round-robin API key pool shared by every upstream AI call.

use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;
use tracing::debug;

/// One key handed out by the pool, with its position for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub index: usize,
    pub key: String,
}

pub struct KeyRotationPool {
    keys: Vec<String>,
    cursor: AtomicUsize,
}

impl KeyRotationPool {
    pub fn new(keys: Vec<String>) -> Self {
        Self::with_cursor(keys, 0)
    }

    /// Start at `seed` (taken modulo the pool size).
    pub fn with_cursor(keys: Vec<String>, seed: usize) -> Self {
        let start = if keys.is_empty() { 0 } else { seed % keys.len() };
        Self {
            keys,
            cursor: AtomicUsize::new(start),
        }
    }

    /// Start at a random position so restarts do not always hit key 0 first.
    pub fn seeded(keys: Vec<String>) -> Self {
        let seed = if keys.is_empty() {
            0
        } else {
            rand::thread_rng().gen_range(0..keys.len())
        };
        Self::with_cursor(keys, seed)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The key at the cursor, advancing it. `None` when no keys are configured.
    pub fn next(&self) -> Option<Credential> {
        if self.keys.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len();
        debug!("[keys] using key #{} of {}", index, self.keys.len());
        Some(Credential {
            index,
            key: self.keys[index].clone(),
        })
    }
}

impl std::fmt::Debug for KeyRotationPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print the keys themselves
        f.debug_struct("KeyRotationPool")
            .field("len", &self.keys.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(n: usize) -> KeyRotationPool {
        KeyRotationPool::new((0..n).map(|i| format!("key-{i}")).collect())
    }

    #[test]
    fn test_round_robin_sequence() {
        let p = pool(3);
        let seq: Vec<usize> = (0..7).map(|_| p.next().unwrap().index).collect();
        assert_eq!(seq, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_key_matches_index() {
        let p = pool(2);
        let c = p.next().unwrap();
        assert_eq!(c.key, "key-0");
        assert_eq!(p.next().unwrap().key, "key-1");
    }

    #[test]
    fn test_empty_pool_yields_nothing() {
        let p = KeyRotationPool::new(vec![]);
        assert!(p.is_empty());
        assert!(p.next().is_none());
        assert!(KeyRotationPool::seeded(vec![]).next().is_none());
    }

    #[test]
    fn test_cursor_seed_wraps() {
        let p = KeyRotationPool::with_cursor(vec!["a".into(), "b".into(), "c".into()], 4);
        let seq: Vec<usize> = (0..4).map(|_| p.next().unwrap().index).collect();
        assert_eq!(seq, vec![1, 2, 0, 1]);
    }

    #[test]
    fn test_seeded_stays_in_range() {
        let p = KeyRotationPool::seeded(vec!["a".into(), "b".into()]);
        for _ in 0..5 {
            assert!(p.next().unwrap().index < 2);
        }
    }

    #[test]
    fn test_debug_hides_keys() {
        let p = KeyRotationPool::new(vec!["secret".into()]);
        assert!(!format!("{p:?}").contains("secret"));
    }
}
