//! Value provider boundary
//!
//! The host resolves keys the context has not seen yet. Providers answer
//! with the JSON encoding of the persisted value, or `None` when the key has
//! never been committed.
//!
//! Providers are `Sync`, so a context borrowing one can move to another
//! thread.

/// Host collaborator that resolves a local storage miss
pub trait ValueProvider: Sync {
    /// JSON-encoded value for `key`, or `None` if not found
    fn resolve(&self, key: &str) -> Option<String>;
}

/// Provider with no persisted state; every key is "not found"
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

impl ValueProvider for NotFound {
    fn resolve(&self, _key: &str) -> Option<String> {
        None
    }
}

impl<F> ValueProvider for F
where
    F: Fn(&str) -> Option<String> + Sync,
{
    fn resolve(&self, key: &str) -> Option<String> {
        self(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_provider() {
        assert_eq!(NotFound.resolve("anything"), None);
    }

    #[test]
    fn test_closure_provider() {
        let provider = |key: &str| (key == "counter").then(|| "7".to_string());
        assert_eq!(provider.resolve("counter"), Some("7".into()));
        assert_eq!(provider.resolve("other"), None);
    }
}
