//! Pending request store tests

#[cfg(test)]
mod tests {
    use crate::sso::common::{registry, SP1};
    use chrono::{Duration, Utc};
    use std::collections::HashSet;
    use std::sync::Arc;
    use testidp_saml::session::{generate_token, TOKEN_BYTES};
    use testidp_saml::{InMemoryPendingStore, PendingEntry, PendingRequestStore};

    fn store() -> InMemoryPendingStore<String> {
        InMemoryPendingStore::new()
    }

    // ============================================================
    // Token Tests
    // ============================================================

    #[test]
    fn test_tokens_are_unique_hex() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_token()).collect();
        assert_eq!(tokens.len(), 1000);
        for token in &tokens {
            assert_eq!(token.len(), TOKEN_BYTES * 2);
            assert!(token.bytes().all(|b| b.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn test_create_returns_distinct_tokens() {
        let store = store();
        let descriptor = registry().resolve(SP1).unwrap();
        let a = store.create(Arc::clone(&descriptor), Arc::new("a".to_string()));
        let b = store.create(descriptor, Arc::new("b".to_string()));
        assert_ne!(a, b);
        assert_eq!(*store.get(&a).unwrap().request, "a");
        assert_eq!(*store.get(&b).unwrap().request, "b");
    }

    // ============================================================
    // Expiry Tests
    // ============================================================

    #[test]
    fn test_default_ttl_is_ten_minutes() {
        let store = store();
        assert_eq!(store.ttl(), Duration::minutes(10));
        let token = store.create(registry().resolve(SP1).unwrap(), Arc::new(String::new()));
        let entry = store.get(&token).unwrap();
        assert_eq!(entry.expires_at - entry.created_at, Duration::minutes(10));
    }

    #[test]
    fn test_entry_at_expiry_instant_is_gone() {
        let store = store();
        let mut entry = PendingEntry::new(registry().resolve(SP1).unwrap(), Arc::new(String::new()));
        entry.expires_at = Utc::now();
        store.insert("t", entry);
        assert!(store.get("t").is_none());
    }

    #[test]
    fn test_sweep_only_removes_expired() {
        let store = store();
        let descriptor = registry().resolve(SP1).unwrap();
        for i in 0..5 {
            let mut entry = PendingEntry::new(Arc::clone(&descriptor), Arc::new(i.to_string()));
            entry.expires_at = Utc::now() - Duration::seconds(1);
            store.insert(format!("old-{i}"), entry);
        }
        let live = store.create(descriptor, Arc::new("live".to_string()));

        assert_eq!(store.len(), 6);
        assert_eq!(store.cleanup_expired(), 5);
        assert_eq!(store.len(), 1);
        assert!(store.get(&live).is_some());
    }

    // ============================================================
    // Consumption Tests
    // ============================================================

    #[test]
    fn test_consume_then_get() {
        let store = store();
        let token = store.create(registry().resolve(SP1).unwrap(), Arc::new(String::new()));
        store.consume(&token);
        assert!(store.get(&token).is_none());
        store.consume(&token);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_create_and_take() {
        let store: Arc<InMemoryPendingStore<String>> = Arc::new(InMemoryPendingStore::new());
        let descriptor = registry().resolve(SP1).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                let descriptor = Arc::clone(&descriptor);
                std::thread::spawn(move || {
                    let token = store.create(descriptor, Arc::new(i.to_string()));
                    let entry = store.take(&token).unwrap();
                    assert_eq!(*entry.request, i.to_string());
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_readers_see_consistent_entries() {
        let store: InMemoryPendingStore<String> = InMemoryPendingStore::new();
        let descriptor = registry().resolve(SP1).unwrap();
        let live: Vec<(String, String)> = (0..8)
            .map(|i| {
                let handle = format!("live-{i}");
                let token = store.create(Arc::clone(&descriptor), Arc::new(handle.clone()));
                (token, handle)
            })
            .collect();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        for (token, handle) in &live {
                            let entry = store.get(token).expect("live token must stay visible");
                            assert_eq!(*entry.request, *handle);
                            assert_eq!(entry.descriptor.entity_id, SP1);
                        }
                    }
                });
            }
            for w in 0..4 {
                let store = &store;
                let descriptor = &descriptor;
                scope.spawn(move || {
                    for i in 0..200 {
                        let token =
                            store.create(Arc::clone(descriptor), Arc::new(format!("churn-{w}-{i}")));
                        store.consume(&token);
                    }
                });
            }
        });

        assert_eq!(store.len(), live.len());
        for (token, handle) in &live {
            assert_eq!(*store.get(token).unwrap().request, *handle);
        }
    }
}
