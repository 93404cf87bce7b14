//! Orchestrated flow tests: request in, claims out

#[cfg(test)]
mod tests {
    use crate::sso::common::{registry, SP1, SP2};
    use chrono::{Duration, Utc};
    use std::sync::Arc;
    use testidp_saml::saml::{NAMEID_FORMAT_EMAIL, NAMEID_FORMAT_PERSISTENT};
    use testidp_saml::{
        InMemoryPendingStore, PendingEntry, PendingRequestStore, SamlError, SsoOrchestrator,
    };

    /// Request handle standing in for a validated `AuthnRequest`
    #[derive(Debug, PartialEq)]
    struct Handle(&'static str);

    fn orchestrator() -> (SsoOrchestrator<Handle>, Arc<InMemoryPendingStore<Handle>>) {
        let store = Arc::new(InMemoryPendingStore::new());
        let orchestrator = SsoOrchestrator::new(
            registry(),
            Arc::clone(&store) as Arc<dyn PendingRequestStore<Handle>>,
        );
        (orchestrator, store)
    }

    #[test]
    fn test_begin_then_complete() {
        let (orchestrator, store) = orchestrator();

        let flow = orchestrator.begin_flow(SP1, Handle("r1")).unwrap();
        let names: Vec<_> = flow.identities().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Ann", "Bob"]);
        assert_eq!(store.len(), 1);

        let completed = orchestrator.complete_flow(&flow.token, "Ann").unwrap();
        assert_eq!(*completed.request, Handle("r1"));
        assert_eq!(completed.claims.name_id, "ann@example.com");
        assert_eq!(completed.claims.name_id_format, NAMEID_FORMAT_EMAIL);

        let attrs: Vec<_> = completed
            .claims
            .attributes
            .iter()
            .map(|a| (a.name.as_str(), a.values.clone()))
            .collect();
        assert_eq!(
            attrs,
            vec![
                ("email", vec!["ann@example.com".to_string()]),
                ("groups", vec!["a".to_string(), "b".to_string()]),
            ]
        );
        assert!(store.is_empty());
    }

    #[test]
    fn test_second_completion_rejected() {
        let (orchestrator, _) = orchestrator();
        let flow = orchestrator.begin_flow(SP1, Handle("r1")).unwrap();
        orchestrator.complete_flow(&flow.token, "Ann").unwrap();

        let err = orchestrator.complete_flow(&flow.token, "Ann").unwrap_err();
        assert!(matches!(err, SamlError::InvalidOrExpiredToken));
        assert!(matches!(
            orchestrator.pending(&flow.token),
            Err(SamlError::InvalidOrExpiredToken)
        ));
    }

    #[test]
    fn test_boolean_attribute_and_persistent_format() {
        let (orchestrator, _) = orchestrator();

        let flow = orchestrator.begin_flow(SP1, Handle("r1")).unwrap();
        let bob = orchestrator.complete_flow(&flow.token, "Bob").unwrap();
        assert_eq!(bob.claims.attribute("active").unwrap().values, vec!["true"]);

        let flow = orchestrator.begin_flow(SP2, Handle("r2")).unwrap();
        let carol = orchestrator.complete_flow(&flow.token, "Carol").unwrap();
        assert_eq!(carol.claims.name_id, "carol-0001");
        assert_eq!(carol.claims.name_id_format, NAMEID_FORMAT_PERSISTENT);
        assert!(carol.claims.attributes.is_empty());
    }

    #[test]
    fn test_identity_from_other_sp_rejected() {
        let (orchestrator, _) = orchestrator();
        let flow = orchestrator.begin_flow(SP2, Handle("r1")).unwrap();

        let err = orchestrator.complete_flow(&flow.token, "Ann").unwrap_err();
        match err {
            SamlError::UnknownIdentity { entity_id, name } => {
                assert_eq!(entity_id, SP2);
                assert_eq!(name, "Ann");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Token survives a bad choice
        assert!(orchestrator.pending(&flow.token).is_ok());
    }

    #[test]
    fn test_unknown_requester() {
        let (orchestrator, store) = orchestrator();
        let err = orchestrator
            .begin_flow("https://unknown.example.com", Handle("r1"))
            .unwrap_err();
        assert!(matches!(err, SamlError::UnknownRequester(_)));
        assert!(err.is_client_error());
        assert!(store.is_empty());
    }

    #[test]
    fn test_expired_token() {
        let (orchestrator, store) = orchestrator();
        let mut entry = PendingEntry::new(registry().resolve(SP1).unwrap(), Arc::new(Handle("old")));
        entry.created_at = Utc::now() - Duration::minutes(11);
        entry.expires_at = entry.created_at + Duration::minutes(10);
        store.insert("expired", entry);

        assert!(matches!(
            orchestrator.complete_flow("expired", "Ann"),
            Err(SamlError::InvalidOrExpiredToken)
        ));
    }

    #[test]
    fn test_concurrent_completions_single_winner() {
        let (orchestrator, _) = orchestrator();
        let flow = orchestrator.begin_flow(SP1, Handle("r1")).unwrap();

        let results: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = ["Ann", "Bob", "Ann", "Bob", "Ann", "Bob"]
                .into_iter()
                .map(|name| {
                    let orchestrator = orchestrator.clone();
                    let token = flow.token.clone();
                    scope.spawn(move || orchestrator.complete_flow(&token, name).is_ok())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.iter().filter(|ok| **ok).count(), 1);
    }
}
