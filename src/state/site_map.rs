use std::collections::{HashMap, HashSet};

/// Mapping from original references to local save paths
///
/// Keys are reference strings exactly as they appeared in the source markup
/// (or the seed URL). Values are paths relative to the mirror destination,
/// or a [`CheckStatus`](crate::state::CheckStatus) sentinel in check-only mode.
///
/// The map also remembers every absolute target the crawler scheduled, so a
/// target reached through a different reference string is not fetched twice.
/// Entries keep their insertion order.
#[derive(Debug, Clone, Default)]
pub struct SiteMap {
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
    targets: HashSet<String>,
}

impl SiteMap {
    /// Creates an empty site map
    pub fn new() -> Self {
        Self::default()
    }

    /// Records where a reference was saved
    ///
    /// A reference that is already present keeps its position and gets the
    /// new value.
    pub fn insert(&mut self, reference: &str, local: &str) {
        match self.index.get(reference) {
            Some(&i) => self.entries[i].1 = local.to_string(),
            None => {
                self.index.insert(reference.to_string(), self.entries.len());
                self.entries
                    .push((reference.to_string(), local.to_string()));
            }
        }
    }

    /// Marks an absolute target as scheduled
    ///
    /// # Returns
    ///
    /// * `true` - The target was not scheduled before
    /// * `false` - The target was already scheduled
    pub fn schedule(&mut self, target: &str) -> bool {
        self.targets.insert(target.to_string())
    }

    /// Returns true if the reference is already a key
    pub fn contains_reference(&self, reference: &str) -> bool {
        self.index.contains_key(reference)
    }

    /// Returns true if the absolute target was scheduled or is itself a key
    pub fn contains_target(&self, target: &str) -> bool {
        self.targets.contains(target) || self.index.contains_key(target)
    }

    /// Local path (or sentinel) recorded for a reference
    pub fn get(&self, reference: &str) -> Option<&str> {
        self.index
            .get(reference)
            .map(|&i| self.entries[i].1.as_str())
    }

    /// Number of references in the map
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no reference was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over (reference, local path) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Distinct local paths, in insertion order
    pub fn local_paths(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|(_, local)| seen.insert(local.as_str()))
            .map(|(_, local)| local.clone())
            .collect()
    }
}
