// ABOUTME: Per-issuer RSA key management, JWKS publication, and RS256 JWT signing
// ABOUTME: Keys are generated lazily per issuer and live for the process lifetime
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 mock-oauth2-server contributors

//! The token provider collaborator.
//!
//! Each issuer gets its own RSA key pair, generated on first use and cached
//! for the process lifetime. The public parameters are published via the
//! `jwks` endpoint; the full set (private parameters included) is exposed
//! only through the test utilities.

use anyhow::anyhow;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use rsa::pkcs8::EncodePrivateKey;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use crate::errors::HandlerError;

/// RSA key size in bits. 2048 keeps issuer bootstrap fast, which matters for
/// a server that mints a key pair per test issuer.
const RSA_KEY_SIZE: usize = 2048;

/// JWK representation published by the JWKS endpoints.
///
/// Private parameters are populated only for the full (test-utility) set and
/// are omitted from serialization otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKey {
    /// Key type (always "RSA")
    pub kty: String,
    /// Public key use (always "sig")
    #[serde(rename = "use")]
    pub key_use: String,
    /// Key ID
    pub kid: String,
    /// Algorithm (RS256)
    pub alg: String,
    /// RSA modulus (base64url)
    pub n: String,
    /// RSA public exponent (base64url)
    pub e: String,
    /// RSA private exponent (base64url)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    /// First prime factor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    /// Second prime factor
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// First CRT exponent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    /// Second CRT exponent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    /// CRT coefficient
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
}

/// JWKS container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonWebKeySet {
    /// Published keys
    pub keys: Vec<JsonWebKey>,
}

/// One issuer's signing key material.
struct IssuerKeys {
    kid: String,
    private_pem: String,
    private_key: RsaPrivateKey,
    public_key: RsaPublicKey,
}

fn encode_uint(value: &BigUint) -> String {
    URL_SAFE_NO_PAD.encode(value.to_bytes_be())
}

impl IssuerKeys {
    fn generate(issuer_id: &str, key_size_bits: usize) -> Result<Self, HandlerError> {
        let mut rng = rand::rngs::OsRng;
        let mut private_key = RsaPrivateKey::new(&mut rng, key_size_bits)
            .map_err(|e| anyhow!("failed to generate RSA key for issuer {issuer_id:?}: {e}"))?;
        private_key
            .precompute()
            .map_err(|e| anyhow!("failed to precompute RSA CRT values: {e}"))?;

        let private_pem = private_key
            .to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|e| anyhow!("failed to export private key as PEM: {e}"))?
            .to_string();

        let public_key = RsaPublicKey::from(&private_key);
        Ok(Self {
            kid: kid_for(issuer_id),
            private_pem,
            private_key,
            public_key,
        })
    }

    fn public_jwk(&self) -> JsonWebKey {
        JsonWebKey {
            kty: "RSA".to_owned(),
            key_use: "sig".to_owned(),
            kid: self.kid.clone(),
            alg: "RS256".to_owned(),
            n: encode_uint(self.public_key.n()),
            e: encode_uint(self.public_key.e()),
            d: None,
            p: None,
            q: None,
            dp: None,
            dq: None,
            qi: None,
        }
    }

    fn full_jwk(&self) -> JsonWebKey {
        let primes = self.private_key.primes();
        JsonWebKey {
            d: Some(encode_uint(self.private_key.d())),
            p: primes.first().map(encode_uint),
            q: primes.get(1).map(encode_uint),
            dp: self.private_key.dp().map(encode_uint),
            dq: self.private_key.dq().map(encode_uint),
            qi: self.private_key.crt_coefficient().map(|qi| encode_uint(&qi)),
            ..self.public_jwk()
        }
    }
}

fn kid_for(issuer_id: &str) -> String {
    if issuer_id.is_empty() {
        "root-signing-key".to_owned()
    } else {
        format!("{}-signing-key", issuer_id.replace('/', "-"))
    }
}

/// Issuer id derived from an issuer URL: the path with slashes trimmed.
pub(crate) fn issuer_id_of(issuer_url: &Url) -> String {
    issuer_url.path().trim_matches('/').to_owned()
}

/// Signs JWTs and publishes JWK sets, one RSA key pair per issuer.
pub struct TokenProvider {
    keys: DashMap<String, Arc<IssuerKeys>>,
    key_size: usize,
}

impl Default for TokenProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenProvider {
    /// Provider with the default key size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            keys: DashMap::new(),
            key_size: RSA_KEY_SIZE,
        }
    }

    fn issuer_keys(&self, issuer_id: &str) -> Result<Arc<IssuerKeys>, HandlerError> {
        if let Some(existing) = self.keys.get(issuer_id) {
            return Ok(Arc::clone(&existing));
        }
        let generated = Arc::new(IssuerKeys::generate(issuer_id, self.key_size)?);
        // A concurrent generation race keeps the first inserted key pair.
        let entry = self
            .keys
            .entry(issuer_id.to_owned())
            .or_insert(generated);
        Ok(Arc::clone(&entry))
    }

    /// Public JWK set for `issuer_id`.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn public_jwk_set(&self, issuer_id: &str) -> Result<JsonWebKeySet, HandlerError> {
        let keys = self.issuer_keys(issuer_id)?;
        Ok(JsonWebKeySet {
            keys: vec![keys.public_jwk()],
        })
    }

    /// Full JWK set (private and public material) for `issuer_id`.
    ///
    /// # Errors
    /// Returns an error if key generation fails.
    pub fn full_jwk_set(&self, issuer_id: &str) -> Result<JsonWebKeySet, HandlerError> {
        let keys = self.issuer_keys(issuer_id)?;
        Ok(JsonWebKeySet {
            keys: vec![keys.full_jwk()],
        })
    }

    /// Sign `claims` as an RS256 compact JWT for the given issuer.
    ///
    /// `iss`, `iat`, `exp`, and `jti` are filled in when the claim set does
    /// not already carry them; supplied values always win.
    ///
    /// # Errors
    /// Returns an error if key generation or signing fails.
    pub fn jwt(
        &self,
        claims: Map<String, Value>,
        expiry: Duration,
        issuer_url: &Url,
    ) -> Result<String, HandlerError> {
        let issuer_id = issuer_id_of(issuer_url);
        let keys = self.issuer_keys(&issuer_id)?;

        let now = Utc::now();
        let mut payload = claims;
        if !payload.contains_key("iss") {
            payload.insert("iss".to_owned(), Value::String(issuer_url.as_str().to_owned()));
        }
        if !payload.contains_key("iat") {
            payload.insert("iat".to_owned(), Value::from(now.timestamp()));
        }
        if !payload.contains_key("exp") {
            payload.insert("exp".to_owned(), Value::from((now + expiry).timestamp()));
        }
        if !payload.contains_key("jti") {
            payload.insert("jti".to_owned(), Value::String(Uuid::new_v4().to_string()));
        }

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(keys.kid.clone());

        let encoding_key = EncodingKey::from_rsa_pem(keys.private_pem.as_bytes())
            .map_err(|e| anyhow!("failed to build RS256 encoding key: {e}"))?;
        jsonwebtoken::encode(&header, &payload, &encoding_key)
            .map_err(|e| anyhow!("failed to sign RS256 JWT: {e}").into())
    }
}
