use std::collections::{HashMap, HashSet};

/// Pending writes for a single key-prefix. A later put supersedes an
/// earlier delete on the same key, and vice versa — at most one of the two
/// is ever present for a given key (§3 "OperateCacher" invariant).
#[derive(Debug, Default, Clone)]
struct PendingOps {
    puts: HashMap<String, String>,
    deletes: HashSet<String>,
}

impl PendingOps {
    fn is_clear(&self) -> bool {
        self.puts.is_empty() && self.deletes.is_empty()
    }
}

/// Buffers metadata-store writes that couldn't be applied immediately so
/// they can be replayed once the connection (or the reconciliation sweep)
/// catches up (§4.B).
#[derive(Debug, Default)]
pub struct MetaStoreOperateCacher {
    prefixes: HashMap<String, PendingOps>,
}

impl MetaStoreOperateCacher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_put_event(&mut self, prefix: &str, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let entry = self.prefixes.entry(prefix.to_string()).or_default();
        entry.deletes.remove(&key);
        entry.puts.insert(key, value.into());
    }

    pub fn add_delete_event(&mut self, prefix: &str, key: impl Into<String>) {
        let key = key.into();
        let entry = self.prefixes.entry(prefix.to_string()).or_default();
        entry.puts.remove(&key);
        entry.deletes.insert(key);
    }

    pub fn is_cache_clear(&self, prefix: &str) -> bool {
        self.prefixes.get(prefix).map(PendingOps::is_clear).unwrap_or(true)
    }

    /// Returns and clears the buffered puts/deletes for `prefix`, ready for
    /// replay against the metadata store.
    pub fn drain(&mut self, prefix: &str) -> (Vec<(String, String)>, Vec<String>) {
        let Some(ops) = self.prefixes.remove(prefix) else {
            return (Vec::new(), Vec::new());
        };
        let puts: Vec<(String, String)> = ops.puts.into_iter().collect();
        let deletes: Vec<String> = ops.deletes.into_iter().collect();
        (puts, deletes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_supersedes_pending_delete() {
        let mut cacher = MetaStoreOperateCacher::new();
        cacher.add_delete_event("/group", "g1");
        cacher.add_put_event("/group", "g1", "payload");

        assert!(!cacher.is_cache_clear("/group"));
        let (puts, deletes) = cacher.drain("/group");
        assert_eq!(puts, vec![("g1".to_string(), "payload".to_string())]);
        assert!(deletes.is_empty());
    }

    #[test]
    fn delete_supersedes_pending_put() {
        let mut cacher = MetaStoreOperateCacher::new();
        cacher.add_put_event("/group", "g1", "payload");
        cacher.add_delete_event("/group", "g1");

        let (puts, deletes) = cacher.drain("/group");
        assert!(puts.is_empty());
        assert_eq!(deletes, vec!["g1".to_string()]);
    }

    #[test]
    fn drain_clears_the_buffer() {
        let mut cacher = MetaStoreOperateCacher::new();
        cacher.add_put_event("/group", "g1", "payload");
        cacher.drain("/group");
        assert!(cacher.is_cache_clear("/group"));
    }

    #[test]
    fn unknown_prefix_is_clear() {
        let cacher = MetaStoreOperateCacher::new();
        assert!(cacher.is_cache_clear("/never-touched"));
    }
}
