//! API key pool with a shared rotation cursor.
//!
//! The cursor only moves when a credential-specific failure (quota exhaustion,
//! transport error) is observed. Reading the current key never advances it, so
//! every concurrent request keeps using the same key until one of them reports
//! that it stopped working.

use drawplus_error::{GenerationError, GenerationErrorKind};
use parking_lot::Mutex;
use tracing::{debug, info, instrument};

/// Ordered, non-empty list of API keys.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialPool {
    keys: Vec<String>,
}

impl CredentialPool {
    /// Build a pool from configured keys.
    ///
    /// Keys are trimmed; surrounding whitespace is a common copy-paste artifact.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPool` when the list is empty or any key is blank.
    pub fn new<I, S>(keys: I) -> Result<Self, GenerationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.into().trim().to_string())
            .collect();

        if keys.is_empty() {
            return Err(GenerationError::new(GenerationErrorKind::InvalidPool(
                "no API keys configured".to_string(),
            )));
        }
        if let Some(position) = keys.iter().position(|k| k.is_empty()) {
            return Err(GenerationError::new(GenerationErrorKind::InvalidPool(
                format!("API key #{} is blank", position + 1),
            )));
        }

        Ok(Self { keys })
    }

    /// Number of keys in the pool.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false; pools are validated non-empty at construction.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn get(&self, index: usize) -> &str {
        &self.keys[index % self.keys.len()]
    }
}

impl std::fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPool")
            .field("len", &self.keys.len())
            .finish_non_exhaustive()
    }
}

/// A key handed out by the rotator, tagged with its pool position.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    index: usize,
    key: String,
}

impl Credential {
    /// Zero-based position in the pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The secret itself. Never log this.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("index", &self.index)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[derive(Debug)]
struct RotationState {
    pool: CredentialPool,
    cursor: usize,
    rotations: u64,
}

/// Owns a credential pool and the cursor marking the key to try next.
///
/// Cursor reads and writes share one critical section, so concurrent
/// generation attempts never see a torn cursor.
///
/// # Example
///
/// ```
/// use drawplus_rate_limit::{CredentialPool, CredentialRotator};
///
/// let pool = CredentialPool::new(["key-a", "key-b", "key-c"]).unwrap();
/// let rotator = CredentialRotator::new(pool);
///
/// assert_eq!(rotator.next().key(), "key-a");
/// assert_eq!(rotator.next().key(), "key-a");
///
/// rotator.rotate();
/// assert_eq!(rotator.next().key(), "key-b");
/// ```
#[derive(Debug)]
pub struct CredentialRotator {
    state: Mutex<RotationState>,
}

impl CredentialRotator {
    /// Take ownership of a validated pool, starting at its first key.
    pub fn new(pool: CredentialPool) -> Self {
        debug!(pool_size = pool.len(), "Creating credential rotator");
        Self {
            state: Mutex::new(RotationState {
                pool,
                cursor: 0,
                rotations: 0,
            }),
        }
    }

    /// Build a rotator straight from configured keys.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPool` when the key list is empty or contains blanks.
    pub fn from_keys<I, S>(keys: I) -> Result<Self, GenerationError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::new(CredentialPool::new(keys)?))
    }

    /// The credential at the cursor. Does not advance.
    pub fn next(&self) -> Credential {
        let state = self.state.lock();
        Credential {
            index: state.cursor,
            key: state.pool.get(state.cursor).to_string(),
        }
    }

    /// Advance the cursor by one, wrapping at the end of the pool.
    ///
    /// A single-key pool has nowhere to go, so this is a no-op there.
    #[instrument(skip(self))]
    pub fn rotate(&self) {
        let mut state = self.state.lock();
        let len = state.pool.len();
        if len <= 1 {
            return;
        }
        state.cursor = (state.cursor + 1) % len;
        state.rotations += 1;
        info!(credential_index = state.cursor, "Rotated to next API key");
    }

    /// Replace the pool, e.g. after a configuration reload.
    ///
    /// The cursor is clamped into the new pool rather than reset, so a reload
    /// that keeps the same keys does not send traffic back to an exhausted key.
    pub fn replace_pool(&self, pool: CredentialPool) {
        let mut state = self.state.lock();
        state.cursor %= pool.len().max(1);
        state.pool = pool;
    }

    /// Number of keys in the pool.
    pub fn pool_size(&self) -> usize {
        self.state.lock().pool.len()
    }

    /// Current cursor position.
    pub fn current_index(&self) -> usize {
        self.state.lock().cursor
    }

    /// Total rotations since construction.
    pub fn rotations(&self) -> u64 {
        self.state.lock().rotations
    }
}
