use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::DecodePrivateKey;
use p256::SecretKey;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::Serialize;

use common::{Error, Result, SignedCredential};

/// Lifetime of every bearer token.
pub const TOKEN_TTL_SECS: i64 = 120;

const ISSUER: &str = "cdp";

/// Builds one ES256 JWT per outbound request.
///
/// The key is parsed once at construction so a bad key fails at startup;
/// `sign` still returns `Result` because the nonce source and the signature
/// primitive can fail per call. Nothing is retried here.
pub struct RequestSigner {
    key_name: String,
    signing_key: SigningKey,
}

#[derive(Serialize)]
struct JwtHeader<'a> {
    alg: &'static str,
    typ: &'static str,
    kid: &'a str,
    nonce: String,
}

#[derive(Serialize)]
struct JwtClaims<'a> {
    sub: &'a str,
    iss: &'static str,
    nbf: i64,
    exp: i64,
    uri: String,
}

impl RequestSigner {
    /// Accepts a SEC1 (`EC PRIVATE KEY`) or PKCS#8 (`PRIVATE KEY`) PEM.
    pub fn new(key_name: impl Into<String>, private_key_pem: &str) -> Result<Self> {
        let pem = private_key_pem.trim();
        let secret = match SecretKey::from_sec1_pem(pem) {
            Ok(key) => key,
            Err(_) => SecretKey::from_pkcs8_pem(pem)
                .map_err(|e| Error::Signing(format!("unreadable EC private key: {e}")))?,
        };

        Ok(Self {
            key_name: key_name.into(),
            signing_key: SigningKey::from(secret),
        })
    }

    /// Credential for `<METHOD> <host><path>`, valid for the next 120 s.
    pub fn sign(&self, method: &str, host: &str, path: &str) -> Result<SignedCredential> {
        self.sign_at(method, host, path, Utc::now())
    }

    pub fn sign_at(
        &self,
        method: &str,
        host: &str,
        path: &str,
        now: DateTime<Utc>,
    ) -> Result<SignedCredential> {
        let mut nonce = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut nonce)
            .map_err(|e| Error::Signing(format!("nonce generation failed: {e}")))?;

        // The signed URI never includes the query string.
        let path = path.split('?').next().unwrap_or_default();
        let expires_at = now + Duration::seconds(TOKEN_TTL_SECS);

        let header = JwtHeader {
            alg: "ES256",
            typ: "JWT",
            kid: &self.key_name,
            nonce: hex::encode(nonce),
        };
        let claims = JwtClaims {
            sub: &self.key_name,
            iss: ISSUER,
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
            uri: format!("{} {host}{path}", method.to_uppercase()),
        };

        let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(&claims)?);
        let signature: Signature = self
            .signing_key
            .try_sign(signing_input.as_bytes())
            .map_err(|e| Error::Signing(e.to_string()))?;

        Ok(SignedCredential {
            token: format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature.to_bytes())),
            expires_at,
        })
    }
}

fn encode_segment<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value).map_err(|e| Error::Signing(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}
