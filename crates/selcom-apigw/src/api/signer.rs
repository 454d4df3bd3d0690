//! Selcom request signing
//!
//! Every request to the gateway carries a header set derived from the
//! credential and the exact payload being sent:
//!
//! | Header | Value |
//! |--------|-------|
//! | `Authorization` | `SELCOM ` + base64(api key) |
//! | `Timestamp` | RFC 3339 instant with `+00:00` offset |
//! | `Digest-Method` | `HS256` |
//! | `Digest` | base64(HMAC-SHA256(secret, canonical message)) |
//! | `Signed-Fields` | comma-joined, sorted payload keys |
//! | `Content-Type` | `application/json` |
//!
//! The canonical message is
//! `timestamp=<ts>&<k1>=<v1>&<k2>=<v2>...` over the sorted keys.
//!
//! # Value stringification
//!
//! - strings are used verbatim
//! - numbers use their JSON text (`1000`, `12.5`)
//! - booleans are `true` / `false`
//! - null is the empty string
//! - arrays and objects are compact JSON with object keys sorted at every
//!   level
//!
//! Query strings for GET/DELETE use the same stringification so the
//! verifier sees the signed values.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use ring::hmac;
use serde_json::Value;

use super::error::Error;
use super::types::Payload;
use crate::config::Credential;

/// Authorization scheme prefix
pub const AUTHORIZATION_SCHEME: &str = "SELCOM";
/// Digest algorithm identifier
pub const DIGEST_METHOD: &str = "HS256";
/// Content type sent with every request
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// `Timestamp` header name
pub const TIMESTAMP_HEADER: &str = "Timestamp";
/// `Digest-Method` header name
pub const DIGEST_METHOD_HEADER: &str = "Digest-Method";
/// `Digest` header name
pub const DIGEST_HEADER: &str = "Digest";
/// `Signed-Fields` header name
pub const SIGNED_FIELDS_HEADER: &str = "Signed-Fields";

/// Headers authenticating a single request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// `SELCOM <base64 api key>`
    pub authorization: String,
    /// Signing instant
    pub timestamp: String,
    /// Always [`DIGEST_METHOD`]
    pub digest_method: String,
    /// Base64 HMAC-SHA256 digest
    pub digest: String,
    /// Comma-joined sorted field names
    pub signed_fields: String,
    /// Always [`CONTENT_TYPE_JSON`]
    pub content_type: String,
}

impl SignedHeaders {
    /// Header name/value pairs in wire casing
    pub fn pairs(&self) -> [(&'static str, &str); 6] {
        [
            ("Authorization", &self.authorization),
            (TIMESTAMP_HEADER, &self.timestamp),
            (DIGEST_METHOD_HEADER, &self.digest_method),
            (DIGEST_HEADER, &self.digest),
            (SIGNED_FIELDS_HEADER, &self.signed_fields),
            ("Content-Type", &self.content_type),
        ]
    }

    /// Convert into a header map for `reqwest`
    pub fn to_header_map(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::with_capacity(6);
        headers.insert(AUTHORIZATION, header_value(&self.authorization)?);
        headers.insert(CONTENT_TYPE, header_value(&self.content_type)?);

        for (name, value) in [
            (TIMESTAMP_HEADER, &self.timestamp),
            (DIGEST_METHOD_HEADER, &self.digest_method),
            (DIGEST_HEADER, &self.digest),
            (SIGNED_FIELDS_HEADER, &self.signed_fields),
        ] {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidHeader(e.to_string()))?;
            headers.insert(name, header_value(value)?);
        }

        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(value).map_err(|e| Error::InvalidHeader(e.to_string()))
}

/// Derives [`SignedHeaders`] from a credential
#[derive(Debug, Clone)]
pub struct Signer {
    credential: Credential,
    authorization: String,
}

impl Signer {
    /// Create a signer for the given credential
    pub fn new(credential: Credential) -> Self {
        let authorization = format!(
            "{} {}",
            AUTHORIZATION_SCHEME,
            STANDARD.encode(credential.api_key.as_bytes())
        );

        Self {
            credential,
            authorization,
        }
    }

    /// Sign a payload with the current time
    pub fn sign(&self, payload: &Payload) -> SignedHeaders {
        self.sign_at(payload, &current_timestamp())
    }

    /// Sign a payload with an explicit timestamp
    ///
    /// Used to reproduce digests for verification and fixed test vectors.
    pub fn sign_at(&self, payload: &Payload, timestamp: &str) -> SignedHeaders {
        let fields = sorted_fields(payload);

        SignedHeaders {
            authorization: self.authorization.clone(),
            timestamp: timestamp.to_string(),
            digest_method: DIGEST_METHOD.to_string(),
            digest: self.digest(&canonical_message(timestamp, &fields, payload)),
            signed_fields: fields.join(","),
            content_type: CONTENT_TYPE_JSON.to_string(),
        }
    }

    /// Verify a digest over `signed_fields` (comma-separated) of `payload`
    ///
    /// Fields are taken in the order listed. Returns `false` when a listed
    /// field is absent from the payload or the digest is not valid base64.
    pub fn verify(
        &self,
        timestamp: &str,
        signed_fields: &str,
        payload: &Payload,
        digest: &str,
    ) -> bool {
        let fields: Vec<&str> = signed_fields
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect();

        if fields.iter().any(|f| !payload.contains_key(*f)) {
            return false;
        }

        let Ok(expected) = STANDARD.decode(digest.trim()) else {
            return false;
        };

        let message = canonical_message(timestamp, &fields, payload);
        let key = hmac::Key::new(hmac::HMAC_SHA256, self.credential.api_secret.as_bytes());
        hmac::verify(&key, message.as_bytes(), &expected).is_ok()
    }

    fn digest(&self, message: &str) -> String {
        let key = hmac::Key::new(hmac::HMAC_SHA256, self.credential.api_secret.as_bytes());
        let tag = hmac::sign(&key, message.as_bytes());
        STANDARD.encode(tag.as_ref())
    }
}

/// Current UTC instant in the gateway's timestamp format
pub fn current_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Largest accepted distance, in seconds, between a signed `Timestamp`
/// and the receiver's clock
pub const MAX_TIMESTAMP_SKEW_SECS: i64 = 300;

/// Whether `timestamp` is RFC 3339 and within [`MAX_TIMESTAMP_SKEW_SECS`]
/// of `now`, in either direction
pub fn timestamp_is_fresh(timestamp: &str, now: DateTime<Utc>) -> bool {
    match DateTime::parse_from_rfc3339(timestamp.trim()) {
        Ok(signed_at) => {
            let skew = now.signed_duration_since(signed_at.with_timezone(&Utc));
            skew.num_seconds().abs() <= MAX_TIMESTAMP_SKEW_SECS
        }
        Err(_) => false,
    }
}

/// Payload keys in ascending byte order
pub fn sorted_fields(payload: &Payload) -> Vec<&str> {
    let mut fields: Vec<&str> = payload.keys().map(String::as_str).collect();
    fields.sort_unstable();
    fields
}

/// Build the message that gets signed
pub fn canonical_message<S: AsRef<str>>(timestamp: &str, fields: &[S], payload: &Payload) -> String {
    let mut message = format!("timestamp={}", timestamp);
    for field in fields {
        let field = field.as_ref();
        message.push('&');
        message.push_str(field);
        message.push('=');
        if let Some(value) = payload.get(field) {
            message.push_str(&canonical_value(value));
        }
    }
    message
}

/// Stringify a payload value for signing and query strings
pub fn canonical_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            let mut out = String::new();
            write_sorted_json(value, &mut out);
            out
        }
    }
}

fn write_sorted_json(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_sorted_json(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_sorted_json(&map[key.as_str()], out);
            }
            out.push('}');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}
