use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;

/// SHA-256 digest of the exact TeX source of an equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(content: &str) -> Self {
        let digest = Sha256::digest(content.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Identifies the artifact rendered for one distinct equation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactId(pub String);

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// How artifact identifiers are chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingPolicy {
    /// `1`, `2`, `3`, ... in order of first sighting.
    #[default]
    Serial,
    /// The hex fingerprint, stable across runs.
    Hash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub id: ArtifactId,
    /// Where the artifact lives, relative to the artifact store root.
    pub path: PathBuf,
}

/// The result of [`RenderCache::lookup_or_assign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// The equation was seen before in this run.
    Cached(CacheEntry),
    /// First sighting; the equation still has to be rendered.
    Assigned(CacheEntry),
}

impl Lookup {
    pub fn entry(&self) -> &CacheEntry {
        match self {
            Lookup::Cached(entry) | Lookup::Assigned(entry) => entry,
        }
    }

    pub fn into_entry(self) -> CacheEntry {
        match self {
            Lookup::Cached(entry) | Lookup::Assigned(entry) => entry,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Lookup::Assigned(_))
    }
}

/// Content-addressed bookkeeping of the equations rendered in one run.
///
/// The cache maps the fingerprint of an equation's TeX source to a stable
/// artifact identifier. Only the content is hashed: the same TeX used inline
/// and as display math shares one artifact. Entries are never evicted, and the
/// cache performs no I/O; writing artifacts is up to the caller.
///
/// # Examples
///
/// ```
/// use m2svg_render::cache::{NamingPolicy, RenderCache};
///
/// let mut cache = RenderCache::new(NamingPolicy::Serial, "images", "svg");
/// let first = cache.lookup_or_assign("x");
/// let again = cache.lookup_or_assign("x");
/// let other = cache.lookup_or_assign("y");
///
/// assert!(first.is_fresh());
/// assert!(!again.is_fresh());
/// assert_eq!(first.entry(), again.entry());
/// assert_eq!(other.entry().id.0, "2");
/// assert_eq!(other.entry().path, std::path::Path::new("images/2.svg"));
/// ```
#[derive(Debug)]
pub struct RenderCache {
    policy: NamingPolicy,
    dir: PathBuf,
    extension: String,
    serial: u64,
    entries: HashMap<Fingerprint, CacheEntry>,
}

impl RenderCache {
    pub fn new(policy: NamingPolicy, dir: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            policy,
            dir: dir.into(),
            extension: extension.to_string(),
            serial: 0,
            entries: HashMap::new(),
        }
    }

    pub fn lookup_or_assign(&mut self, content: &str) -> Lookup {
        let fingerprint = Fingerprint::of(content);
        if let Some(entry) = self.entries.get(&fingerprint) {
            return Lookup::Cached(entry.clone());
        }

        let id = match self.policy {
            NamingPolicy::Serial => {
                self.serial += 1;
                ArtifactId(self.serial.to_string())
            }
            NamingPolicy::Hash => ArtifactId(fingerprint.to_hex()),
        };
        let path = self.dir.join(format!("{}.{}", id, self.extension));
        let entry = CacheEntry { id, path };
        self.entries.insert(fingerprint, entry.clone());
        Lookup::Assigned(entry)
    }

    pub fn get(&self, content: &str) -> Option<&CacheEntry> {
        self.entries.get(&Fingerprint::of(content))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
