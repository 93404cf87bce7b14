//! HTTP tests through the full router

#[cfg(test)]
mod tests {
    use crate::sso::common::{
        authn_request_xml, extract_saml_response, post_param, redirect_param, test_state, SP1,
        SP1_ACS, SP2, SP2_ACS,
    };
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
        Router,
    };
    use serde_json::Value;
    use testidp_saml::saml::NAMEID_FORMAT_PERSISTENT;
    use testidp_saml::{saml_router, PendingRequestStore};
    use tower::ServiceExt;

    fn app() -> Router {
        saml_router(test_state().0)
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> Value {
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    /// Start a redirect-binding flow and return the chooser path
    async fn start_flow(app: &Router, issuer: &str, relay_state: Option<&str>) -> String {
        let mut uri = format!(
            "/sso?SAMLRequest={}",
            redirect_param(&authn_request_xml(issuer, None))
        );
        if let Some(rs) = relay_state {
            uri.push_str("&RelayState=");
            uri.push_str(&urlencoding::encode(rs));
        }
        let response = send(app, get(&uri)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    // ============================================================
    // Metadata
    // ============================================================

    #[tokio::test]
    async fn test_metadata() {
        let response = send(&app(), get("/metadata")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/samlmetadata+xml"
        );

        let xml = body_string(response).await;
        assert!(xml.contains("entityID=\"http://localhost:8080/metadata\""));
        assert!(xml.contains("Location=\"http://localhost:8080/sso\""));
        for format in [
            "urn:oasis:names:tc:SAML:1.1:nameid-format:emailAddress",
            "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent",
            "urn:oasis:names:tc:SAML:2.0:nameid-format:transient",
            "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified",
        ] {
            assert!(xml.contains(format), "missing {format}");
        }
    }

    // ============================================================
    // Full flow
    // ============================================================

    #[tokio::test]
    async fn test_redirect_binding_full_flow() {
        let app = app();
        let login_path = start_flow(&app, SP1, Some("state-42")).await;
        assert!(login_path.starts_with("/login?request_id="));

        let page = send(&app, get(&login_path)).await;
        assert_eq!(page.status(), StatusCode::OK);
        let html = body_string(page).await;
        assert!(html.contains("Sign in to sp-1"));
        assert!(html.contains(r#"<option value="Ann">Ann (ann@example.com)</option>"#));
        assert!(html.contains(r#"<option value="Bob">Bob (bob@example.com)</option>"#));

        let response = send(&app, post_form(&login_path, "user=Ann".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains(&format!(r#"action="{SP1_ACS}""#)));
        assert!(html.contains(r#"name="RelayState" value="state-42""#));

        let saml_response = extract_saml_response(&html);
        assert!(saml_response.contains(&format!("Destination=\"{SP1_ACS}\"")));
        assert!(saml_response.contains(">ann@example.com</saml:NameID>"));
        assert!(saml_response.contains("<saml:Audience>sp-1</saml:Audience>"));
        assert!(saml_response.contains("<ds:Signature"));
        let a = saml_response.find(">a</saml:AttributeValue>").unwrap();
        let b = saml_response.find(">b</saml:AttributeValue>").unwrap();
        assert!(a < b);

        // The token is single use
        let replay = send(&app, post_form(&login_path, "user=Ann".to_string())).await;
        assert_eq!(replay.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(replay).await["error"], "invalid_request_id");

        let page = send(&app, get(&login_path)).await;
        assert_eq!(page.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_binding_with_acs_url() {
        let app = app();
        let xml = authn_request_xml(SP2, Some(SP2_ACS));
        let response = send(&app, post_form("/sso", format!("SAMLRequest={}", post_param(&xml)))).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        let login_path = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let response = send(&app, post_form(&login_path, "user=Carol".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(!html.contains("RelayState"));
        let saml_response = extract_saml_response(&html);
        assert!(saml_response.contains(NAMEID_FORMAT_PERSISTENT));
        assert!(saml_response.contains(">carol-0001</saml:NameID>"));
    }

    // ============================================================
    // Error paths
    // ============================================================

    #[tokio::test]
    async fn test_unknown_service_provider() {
        let (state, store) = test_state();
        let app = saml_router(state);
        let uri = format!(
            "/sso?SAMLRequest={}",
            redirect_param(&authn_request_xml("https://stranger.example.com", None))
        );
        let response = send(&app, get(&uri)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "unknown_sp");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_acs_url_mismatch() {
        let xml = authn_request_xml(SP1, Some("https://evil.example.com/acs"));
        let response = send(&app(), get(&format!("/sso?SAMLRequest={}", redirect_param(&xml)))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "acs_url_mismatch");
        assert_eq!(
            body["saml_status"],
            "urn:oasis:names:tc:SAML:2.0:status:Requester"
        );
    }

    #[tokio::test]
    async fn test_missing_saml_request() {
        let response = send(&app(), get("/sso")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "missing_parameter");
    }

    #[tokio::test]
    async fn test_garbage_saml_request() {
        let response = send(&app(), get("/sso?SAMLRequest=%21%21%21")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_missing_request_id() {
        let app = app();
        let response = send(&app, get("/login")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&app, post_form("/login", "user=Ann".to_string())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Missing request_id");
    }

    #[tokio::test]
    async fn test_unknown_request_id() {
        let response = send(&app(), get("/login?request_id=deadbeef")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["message"],
            "Invalid or expired request"
        );
    }

    #[tokio::test]
    async fn test_bad_choice_keeps_request_pending() {
        let app = app();
        let login_path = start_flow(&app, SP1, None).await;

        let response = send(&app, post_form(&login_path, String::new())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "Missing user");

        let response = send(&app, post_form(&login_path, "user=Mallory".to_string())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "unknown_user");

        let response = send(&app, post_form(&login_path, "user=Bob".to_string())).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // ============================================================
    // Service provider listing
    // ============================================================

    #[tokio::test]
    async fn test_list_service_providers() {
        let response = send(&app(), get("/service-providers")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["total"], 2);
        assert_eq!(body["items"][0]["entity_id"], SP1);
        assert_eq!(body["items"][0]["acs_urls"][0], SP1_ACS);
        assert_eq!(body["items"][0]["users"], serde_json::json!(["Ann", "Bob"]));
        assert_eq!(body["items"][1]["name_id_format"], "persistent");
    }
}
