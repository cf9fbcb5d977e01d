//! Bounded cache of prompt encodings.
//!
//! Keyed by the `"prompt||negative"` composite string. Bounded to the
//! 10 most-recently-inserted distinct keys; when an 11th distinct key
//! arrives, the oldest-inserted entry is evicted. Eviction is by
//! insertion order, not access order — a hit does not refresh an
//! entry's position. Owned exclusively by the generation worker, so no
//! synchronization is needed.

use std::collections::{HashMap, VecDeque};

use super::traits::PromptEmbedding;

/// Default number of distinct prompt pairs retained.
pub const PROMPT_CACHE_CAPACITY: usize = 10;

/// Insertion-order bounded prompt-encoding cache.
#[derive(Debug, Default)]
pub struct PromptCache {
    entries: HashMap<String, PromptEmbedding>,
    insertion_order: VecDeque<String>,
    capacity: usize,
}

impl PromptCache {
    /// Create a cache with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(PROMPT_CACHE_CAPACITY)
    }

    /// Create a cache with an explicit capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity + 1),
            insertion_order: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Composite cache key for a prompt pair.
    pub fn key(prompt: &str, negative_prompt: &str) -> String {
        format!("{prompt}||{negative_prompt}")
    }

    /// Look up the encoding for a prompt pair.
    pub fn get(&self, prompt: &str, negative_prompt: &str) -> Option<&PromptEmbedding> {
        self.entries.get(&Self::key(prompt, negative_prompt))
    }

    /// Insert an encoding, evicting the oldest-inserted entry when the
    /// capacity is exceeded.
    ///
    /// Re-inserting an existing key replaces its value without
    /// changing its position in the eviction order.
    pub fn insert(&mut self, prompt: &str, negative_prompt: &str, embedding: PromptEmbedding) {
        let key = Self::key(prompt, negative_prompt);
        if self.entries.insert(key.clone(), embedding).is_none() {
            self.insertion_order.push_back(key);
        }
        while self.entries.len() > self.capacity {
            if let Some(oldest) = self.insertion_order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    /// Whether the pair is cached.
    pub fn contains(&self, prompt: &str, negative_prompt: &str) -> bool {
        self.entries.contains_key(&Self::key(prompt, negative_prompt))
    }

    /// Number of cached pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
