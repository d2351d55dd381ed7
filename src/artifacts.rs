//! Ephemeral, single-read artifact store
//!
//! Produced exports are parked here between the moment a download link is
//! issued and the moment the caller fetches it. Every artifact is readable at
//! most once and for at most [`ArtifactConfig::ttl`](crate::config::ArtifactConfig)
//! after insertion, whichever comes first.
//!
//! The map is a [`DashMap`]: `take` is a single `remove`, so two concurrent
//! reads of the same key can never both observe the artifact. The eviction
//! timer armed by `put` deletes through `remove_if` and only touches the exact
//! entry it was armed for.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;

/// URL-safe alphabet used for artifact keys
const KEY_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Opaque, unguessable lookup handle for one artifact
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ArtifactKey(String);

impl ArtifactKey {
    fn generate(length: usize) -> Self {
        let mut rng = rand::thread_rng();
        let key = (0..length)
            .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
            .collect();
        Self(key)
    }

    /// The key as it appears in download URLs
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ArtifactKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A produced file held for one-time download
#[derive(Clone, Debug)]
pub struct Artifact {
    /// Key the artifact was issued under
    pub key: ArtifactKey,
    /// Insertion time
    pub created_at: DateTime<Utc>,
    /// Content subtype, served as `application/<format>`
    pub format: String,
    /// Name offered in the content disposition
    pub file_name: String,
    /// The payload
    pub bytes: Bytes,
}

/// Result of [`ArtifactStore::put`]
#[derive(Debug)]
pub struct IssuedArtifact {
    /// Freshly generated key
    pub key: ArtifactKey,
    /// Timer that purges the key after the TTL
    pub eviction: EvictionHandle,
}

/// Handle on the one-shot eviction timer of an artifact
#[derive(Debug)]
pub struct EvictionHandle {
    task: JoinHandle<()>,
}

impl EvictionHandle {
    /// Whether the timer has fired or was cancelled by a read
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the timer has fired or was cancelled
    pub async fn settled(self) {
        // A read aborts the timer; that is a normal way for it to end.
        let _ = self.task.await;
    }
}

struct Slot {
    artifact: Artifact,
    id: u64,
    inserted_at: Instant,
    eviction: Option<AbortHandle>,
}

struct Inner {
    entries: DashMap<String, Slot>,
    ttl: Duration,
    key_length: usize,
    next_id: AtomicU64,
}

impl Inner {
    /// Compare-and-delete: only removes the slot the timer was armed for
    fn evict(&self, key: &str, id: u64) -> bool {
        self.entries.remove_if(key, |_, slot| slot.id == id).is_some()
    }
}

/// Process-local, keyed, self-expiring artifact store
///
/// Cloning is cheap and every clone shares the same map.
#[derive(Clone)]
pub struct ArtifactStore {
    inner: Arc<Inner>,
}

impl ArtifactStore {
    /// Create a store whose artifacts live for at most `ttl`
    pub fn new(ttl: Duration, key_length: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                ttl,
                key_length,
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Time-to-live applied to every artifact
    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Insert an artifact under a fresh key and arm its eviction timer.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn put(
        &self,
        format: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> IssuedArtifact {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let format = format.into();
        let file_name = file_name.into();
        let bytes = bytes.into();

        let key = loop {
            let candidate = ArtifactKey::generate(self.inner.key_length);
            match self.inner.entries.entry(candidate.0.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(vacant) => {
                    vacant.insert(Slot {
                        artifact: Artifact {
                            key: candidate.clone(),
                            created_at: Utc::now(),
                            format,
                            file_name,
                            bytes,
                        },
                        id,
                        inserted_at: Instant::now(),
                        eviction: None,
                    });
                    break candidate;
                }
            }
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let ttl = self.inner.ttl;
        let timer_key = key.0.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(inner) = weak.upgrade() {
                if inner.evict(&timer_key, id) {
                    tracing::debug!(key = %timer_key, "Artifact expired unread");
                }
            }
        });

        if let Some(mut slot) = self.inner.entries.get_mut(key.as_str()) {
            if slot.id == id {
                slot.eviction = Some(task.abort_handle());
            }
        }

        tracing::debug!(key = %key, ttl_ms = ttl.as_millis() as u64, "Artifact stored");

        IssuedArtifact {
            key,
            eviction: EvictionHandle { task },
        }
    }

    /// Remove and return the artifact for `key`.
    ///
    /// Returns `None` when the key never existed, has expired, or was already
    /// read; the three cases are indistinguishable by design.
    pub fn take(&self, key: &str) -> Option<Artifact> {
        let (_, slot) = self.inner.entries.remove(key)?;

        if let Some(eviction) = slot.eviction {
            eviction.abort();
        }

        if slot.inserted_at.elapsed() >= self.inner.ttl {
            return None;
        }

        Some(slot.artifact)
    }

    /// Copy of the artifact for `key` without consuming it
    ///
    /// Expired entries whose timer has not fired yet are reported as missing.
    pub fn peek(&self, key: &str) -> Option<Artifact> {
        let slot = self.inner.entries.get(key)?;
        if slot.inserted_at.elapsed() >= self.inner.ttl {
            return None;
        }
        Some(slot.artifact.clone())
    }

    /// Whether `key` is currently held (does not consume it)
    pub fn contains(&self, key: &str) -> bool {
        self.inner.entries.contains_key(key)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Whether the store holds no artifacts
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }
}

impl fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("ttl", &self.inner.ttl)
            .field("entries", &self.inner.entries.len())
            .finish()
    }
}
