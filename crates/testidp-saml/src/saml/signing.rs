//! IdP signing credentials

use crate::error::{SamlError, SamlResult};
use base64::{engine::general_purpose::STANDARD, Engine};
use openssl::hash::MessageDigest;
use openssl::pkey::{Id, PKey, Private};
use openssl::sign::Signer;
use openssl::x509::X509;
use std::fmt;

/// Certificate and private key the IdP signs assertions with
#[derive(Clone)]
pub struct SigningCredentials {
    certificate: X509,
    private_key: PKey<Private>,
}

impl fmt::Debug for SigningCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredentials")
            .field("private_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl SigningCredentials {
    /// Load credentials from PEM text.
    ///
    /// The key may be PKCS#1 (`RSA PRIVATE KEY`) or PKCS#8 (`PRIVATE KEY`) and
    /// must be the RSA key matching the certificate.
    pub fn from_pem(certificate_pem: &str, private_key_pem: &str) -> SamlResult<Self> {
        let certificate = X509::from_pem(certificate_pem.as_bytes())
            .map_err(|e| SamlError::CertificateParseError(e.to_string()))?;
        let private_key = PKey::private_key_from_pem(private_key_pem.as_bytes())
            .map_err(|e| SamlError::PrivateKeyError(e.to_string()))?;

        if private_key.id() != Id::RSA {
            return Err(SamlError::PrivateKeyError(
                "Only RSA private keys are supported".to_string(),
            ));
        }

        let public_key = certificate
            .public_key()
            .map_err(|e| SamlError::CertificateParseError(e.to_string()))?;
        if !public_key.public_eq(&private_key) {
            return Err(SamlError::PrivateKeyError(
                "Private key does not match certificate".to_string(),
            ));
        }

        Ok(Self {
            certificate,
            private_key,
        })
    }

    #[must_use]
    pub fn certificate(&self) -> &X509 {
        &self.certificate
    }

    /// DER certificate, base64 encoded, as embedded in `ds:X509Certificate`.
    pub fn certificate_base64_der(&self) -> SamlResult<String> {
        let der = self
            .certificate
            .to_der()
            .map_err(|e| SamlError::CertificateParseError(e.to_string()))?;
        Ok(STANDARD.encode(der))
    }

    /// RSA-SHA256 signature over `data`.
    pub fn sign_sha256(&self, data: &[u8]) -> SamlResult<Vec<u8>> {
        let mut signer = Signer::new(MessageDigest::sha256(), &self.private_key)
            .map_err(|e| SamlError::PrivateKeyError(e.to_string()))?;
        signer
            .update(data)
            .map_err(|e| SamlError::AssertionGenerationFailed(format!("Signing failed: {e}")))?;
        signer
            .sign_to_vec()
            .map_err(|e| SamlError::AssertionGenerationFailed(format!("Signing failed: {e}")))
    }
}

/// Self-signed certificate and PKCS#8 key for tests, as PEM strings.
#[cfg(test)]
pub(crate) fn test_pem_pair() -> (String, String) {
    use openssl::asn1::Asn1Time;
    use openssl::bn::BigNum;
    use openssl::rsa::Rsa;
    use openssl::x509::X509NameBuilder;

    let rsa = Rsa::generate(2048).unwrap();
    let key = PKey::from_rsa(rsa).unwrap();

    let mut name = X509NameBuilder::new().unwrap();
    name.append_entry_by_text("CN", "test-idp").unwrap();
    let name = name.build();

    let mut builder = X509::builder().unwrap();
    builder.set_version(2).unwrap();
    let serial = BigNum::from_u32(1).unwrap().to_asn1_integer().unwrap();
    builder.set_serial_number(&serial).unwrap();
    builder.set_subject_name(&name).unwrap();
    builder.set_issuer_name(&name).unwrap();
    builder.set_pubkey(&key).unwrap();
    builder
        .set_not_before(&Asn1Time::days_from_now(0).unwrap())
        .unwrap();
    builder
        .set_not_after(&Asn1Time::days_from_now(365).unwrap())
        .unwrap();
    builder.sign(&key, MessageDigest::sha256()).unwrap();
    let cert = builder.build();

    (
        String::from_utf8(cert.to_pem().unwrap()).unwrap(),
        String::from_utf8(key.private_key_to_pem_pkcs8().unwrap()).unwrap(),
    )
}

#[cfg(test)]
pub(crate) fn test_credentials() -> SigningCredentials {
    let (cert, key) = test_pem_pair();
    SigningCredentials::from_pem(&cert, &key).unwrap()
}
