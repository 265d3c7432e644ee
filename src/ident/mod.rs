//! Content-derived identifiers using blake3.
//!
//! Anki recognizes a deck by its numeric id, so the deck id is derived from
//! what the deck is about (source fingerprint + filter): re-running the same
//! query updates the existing deck instead of duplicating it. A session id,
//! salted with the run timestamp, names per-run media files.
//!
//! ```text
//! derive_id(query, filter)                -> deck id (stable)
//! derive_id(query, filter, variant)       -> model id (stable)
//! derive_digest(query, filter; timestamp) -> session digest/id
//! ```

use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier width accepted by Anki (ids are stored as signed 64-bit).
pub const ANKI_ID_BITS: u32 = 63;

/// A 256-bit content hash (blake3 output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    #[inline]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }

    /// The digest as a big-endian unsigned integer, reduced modulo `2^bit_width`.
    ///
    /// Only the low 64 bits can survive the reduction, so `bit_width` is
    /// clamped to 64.
    pub fn reduce(&self, bit_width: u32) -> u64 {
        let mut tail = [0u8; 8];
        tail.copy_from_slice(&self.0[24..]);
        let value = u64::from_be_bytes(tail);
        match bit_width {
            0 => 0,
            64.. => value,
            w => value & ((1u64 << w) - 1),
        }
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First 16 hex chars for brevity
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Incremental fingerprint over ordered byte components.
///
/// Each component is framed by its length, so `["ab", "c"]` and
/// `["a", "bc"]` differ. `fork()` snapshots the state so a derived id can be
/// extended without disturbing the base.
#[derive(Debug, Clone, Default)]
pub struct Fingerprint {
    hasher: blake3::Hasher,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a list of components.
    pub fn of<T: AsRef<[u8]>>(components: &[T]) -> Self {
        let mut fp = Self::new();
        for component in components {
            fp.update(component.as_ref());
        }
        fp
    }

    /// Append one component.
    pub fn update(&mut self, component: &[u8]) -> &mut Self {
        self.hasher.update(&(component.len() as u64).to_le_bytes());
        self.hasher.update(component);
        self
    }

    /// Independent copy of the current state.
    pub fn fork(&self) -> Self {
        self.clone()
    }

    pub fn digest(&self) -> ContentHash {
        ContentHash::new(*self.hasher.finalize().as_bytes())
    }

    /// Identifier in `[0, 2^bit_width)`.
    pub fn id(&self, bit_width: u32) -> u64 {
        self.digest().reduce(bit_width)
    }
}

/// Digest of ordered components and an optional run salt.
///
/// Without a salt the result only depends on `components`; with one, the salt
/// is hashed into a fork of the component state.
pub fn derive_digest(components: &[&[u8]], run_salt: Option<&[u8]>) -> ContentHash {
    let base = Fingerprint::of(components);
    match run_salt {
        Some(salt) => base.fork().update(salt).digest(),
        None => base.digest(),
    }
}

/// Identifier in `[0, 2^bit_width)`: the low bits of `derive_digest`.
pub fn derive_id(components: &[&[u8]], run_salt: Option<&[u8]>, bit_width: u32) -> u64 {
    let base = Fingerprint::of(components);
    match run_salt {
        Some(salt) => base.fork().update(salt).id(bit_width),
        None => base.id(bit_width),
    }
}

/// Salt unique to this run: wall-clock nanoseconds since the epoch.
pub fn session_salt() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
        .to_string()
}

/// Identifiers for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckIds {
    /// Same for every run over the same input and filter.
    pub deck: u64,
    /// Stable per input, filter and model variant.
    pub model: u64,
    /// Unique per run.
    pub session: u64,
    /// Session digest as hex, used to name media files.
    pub session_hex: String,
}

impl DeckIds {
    /// Derive all identifiers from the source fingerprint and filter bytes.
    pub fn derive(source: &str, filter: &[u8], variant: &str, salt: &str) -> Self {
        let content = [source.as_bytes(), filter];
        let session = derive_digest(&content, Some(salt.as_bytes()));

        Self {
            deck: derive_id(&content, None, ANKI_ID_BITS),
            model: derive_id(&[source.as_bytes(), filter, variant.as_bytes()], None, ANKI_ID_BITS),
            session: session.reduce(ANKI_ID_BITS),
            session_hex: session.to_hex(),
        }
    }
}
