use std::{
    collections::BTreeMap,
    fmt,
    hash::{BuildHasher, Hash, Hasher},
    sync::Arc,
};

use smallvec::SmallVec;
use twox_hash::XxHash64;

const ID_SEED: u64 = 0xdeadbeef;

pub(crate) type TagVec = SmallVec<[(String, String); 8]>;

/// Tags must already be sorted by key, otherwise two equal identities would
/// hash differently.
fn identity_hash(name: &str, tags: &[(String, String)]) -> u64 {
    debug_assert!(tags.windows(2).all(|w| w[0].0 < w[1].0));
    let mut hasher = XxHash64::with_seed(ID_SEED);
    name.hash(&mut hasher);
    tags.hash(&mut hasher);
    hasher.finish()
}

struct IdInner {
    name: String,
    /// Sorted by key, keys unique.
    tags: TagVec,
    hash: u64,
}

/// The identity of a meter: a metric name plus a set of tags. Ids are
/// immutable and cheap to clone. Equality and hashing only look at the tag
/// content, never at the order the tags were supplied in.
#[derive(Clone)]
pub struct Id {
    inner: Arc<IdInner>,
}

impl Id {
    /// Build an id from a name and a list of tags. If a key is given more than
    /// once the last value wins.
    pub fn new(name: &str, tags: &[(&str, &str)]) -> Self {
        let tags: BTreeMap<&str, &str> = tags.iter().copied().collect();
        Self::from_sorted(
            name.to_string(),
            tags.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn from_sorted(name: String, tags: TagVec) -> Self {
        let hash = identity_hash(&name, &tags);
        Self {
            inner: Arc::new(IdInner { name, tags, hash }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The tags of this id, ordered by key.
    pub fn tags(&self) -> &[(String, String)] {
        &self.inner.tags
    }

    /// Look up the value of a single tag.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.inner
            .tags
            .binary_search_by(|(k, _)| k.as_str().cmp(key))
            .ok()
            .map(|idx| self.inner.tags[idx].1.as_str())
    }

    /// Derive a new id with `key` set to `value`, overriding any existing
    /// value for `key`. `self` is left untouched.
    pub fn with_tag(&self, key: &str, value: &str) -> Self {
        let mut tags = self.inner.tags.clone();
        match tags.binary_search_by(|(k, _)| k.as_str().cmp(key)) {
            Ok(idx) => tags[idx].1 = value.to_string(),
            Err(idx) => tags.insert(idx, (key.to_string(), value.to_string())),
        }
        Self::from_sorted(self.inner.name.clone(), tags)
    }

    /// Derive a new id with every tag in `extra` applied in order.
    pub fn with_tags(&self, extra: &[(&str, &str)]) -> Self {
        let mut tags: BTreeMap<&str, &str> = self
            .inner
            .tags
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        tags.extend(extra.iter().copied());
        Self::from_sorted(
            self.inner.name.clone(),
            tags.into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

impl PartialEq for Id {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.hash == other.inner.hash
                && self.inner.name == other.inner.name
                && self.inner.tags == other.inner.tags)
    }
}

impl Eq for Id {}

impl Hash for Id {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.inner.hash);
    }
}

/// Hands the hash an [`Id`] carries straight to the map. Anything that hashes
/// with more than the single `write_u64` of `Id::hash` is unsupported.
#[derive(Default)]
pub(crate) struct IdHasher(u64);

impl Hasher for IdHasher {
    fn finish(&self) -> u64 {
        self.0
    }

    fn write(&mut self, _bytes: &[u8]) {
        debug_assert!(false, "IdHasher only accepts a pre-computed Id hash")
    }

    fn write_u64(&mut self, hash: u64) {
        self.0 = hash;
    }
}

#[derive(Default, Debug, Clone, Copy)]
pub(crate) struct BuildIdHasher;

impl BuildHasher for BuildIdHasher {
    type Hasher = IdHasher;

    fn build_hasher(&self) -> IdHasher {
        IdHasher::default()
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Id")
            .field("name", &self.inner.name)
            .field("tags", &self.inner.tags)
            .finish()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.name)?;
        if self.inner.tags.is_empty() {
            return Ok(());
        }
        f.write_str("{")?;
        for (idx, (k, v)) in self.inner.tags.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{k}={v}")?;
        }
        f.write_str("}")
    }
}
