//! Shared fixtures: signing credentials, relying parties and encoded requests

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::hash::MessageDigest;
use openssl::pkey::PKey;
use openssl::rsa::Rsa;
use openssl::x509::{X509NameBuilder, X509};
use std::io::Write;
use std::sync::Arc;
use testidp_saml::{
    create_saml_state, AttributeValue, IdentityRecord, IdentityRegistry, InMemoryPendingStore,
    PendingRequestStore, RelyingPartyConfig, SamlState, SigningCredentials, ValidatedRequest,
};

pub const SP1: &str = "sp-1";
pub const SP1_ACS: &str = "https://sp1.example.com/acs";
pub const SP2: &str = "https://sp2.example.com/metadata";
pub const SP2_ACS: &str = "https://sp2.example.com/saml/acs";
pub const BASE_URL: &str = "http://localhost:8080";

/// Self-signed RSA credentials
pub fn credentials() -> SigningCredentials {
    let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "saml-test-idp").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(7).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(30).unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    let cert = builder.build();

    SigningCredentials::from_pem(
        std::str::from_utf8(&cert.to_pem().unwrap()).unwrap(),
        std::str::from_utf8(&key.private_key_to_pem_pkcs8().unwrap()).unwrap(),
    )
    .unwrap()
}

pub fn relying_parties() -> Vec<RelyingPartyConfig> {
    vec![
        RelyingPartyConfig {
            entity_id: SP1.to_string(),
            acs_url: Some(SP1_ACS.to_string()),
            metadata: None,
            name_id_format: None,
            identities: vec![
                IdentityRecord::new("Ann", "ann@example.com")
                    .with_attribute("email", "ann@example.com")
                    .with_attribute("groups", AttributeValue::list(["a", "b"])),
                IdentityRecord::new("Bob", "bob@example.com").with_attribute("active", true),
            ],
        },
        RelyingPartyConfig {
            entity_id: SP2.to_string(),
            acs_url: Some(SP2_ACS.to_string()),
            metadata: None,
            name_id_format: Some("persistent".to_string()),
            identities: vec![IdentityRecord::new("Carol", "carol-0001")],
        },
    ]
}

pub fn registry() -> Arc<IdentityRegistry> {
    Arc::new(IdentityRegistry::new(relying_parties()).unwrap())
}

/// Router state backed by a fresh in-memory store
pub fn test_state() -> (SamlState, Arc<InMemoryPendingStore<ValidatedRequest>>) {
    let store = Arc::new(InMemoryPendingStore::new());
    let state = create_saml_state(
        BASE_URL.to_string(),
        format!("{BASE_URL}/metadata"),
        registry(),
        Arc::clone(&store) as Arc<dyn PendingRequestStore<ValidatedRequest>>,
        credentials(),
        chrono::Duration::minutes(5),
    );
    (state, store)
}

pub fn authn_request_xml(issuer: &str, acs_url: Option<&str>) -> String {
    let acs_attr = acs_url
        .map(|url| format!(" AssertionConsumerServiceURL=\"{url}\""))
        .unwrap_or_default();
    format!(
        r#"<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_req-{id}" Version="2.0" IssueInstant="{now}"{acs_attr}><saml:Issuer>{issuer}</saml:Issuer><samlp:NameIDPolicy AllowCreate="true"/></samlp:AuthnRequest>"#,
        id = uuid::Uuid::new_v4(),
        now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
    )
}

/// HTTP-Redirect encoding: raw deflate, base64, then URL encoding
pub fn redirect_param(xml: &str) -> String {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(xml.as_bytes()).unwrap();
    let deflated = encoder.finish().unwrap();
    urlencoding::encode(&STANDARD.encode(deflated)).into_owned()
}

/// HTTP-POST encoding: base64, URL encoded for a form body
pub fn post_param(xml: &str) -> String {
    urlencoding::encode(&STANDARD.encode(xml)).into_owned()
}

/// Value of the hidden `SAMLResponse` input, base64 decoded
pub fn extract_saml_response(html: &str) -> String {
    let marker = r#"name="SAMLResponse" value=""#;
    let start = html.find(marker).unwrap() + marker.len();
    let end = start + html[start..].find('"').unwrap();
    String::from_utf8(STANDARD.decode(&html[start..end]).unwrap()).unwrap()
}
