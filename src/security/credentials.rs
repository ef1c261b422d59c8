//! Shared-secret credential gate.
//!
//! A caller proves itself with a single shared token, sent either as
//! `Authorization: Basic <token>` or as a `token` query parameter. The header
//! wins when both are present.
//!
//! A Basic value may be the raw token, its base64 form, or a base64
//! `user:token` pair. The username of a pair is ignored; only the password
//! part is compared against the token.

use axum::body::Body;
use axum::http::{header, HeaderMap, Request};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use subtle::ConstantTimeEq;

use crate::error::CheckError;
use crate::security::pipeline::RequestFilter;

/// Where a credential was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentedCredential {
    /// Value of a `Basic` authorization header, as sent.
    Basic(String),
    /// Percent-decoded `token` query parameter.
    Query(String),
}

/// Extract the caller's credential, preferring the `Basic` header.
pub fn extract_credential(headers: &HeaderMap, query: Option<&str>) -> Option<PresentedCredential> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.split_once(' ')?;
            let token = token.trim();
            (scheme.eq_ignore_ascii_case("basic") && !token.is_empty()).then(|| token.to_string())
        });

    if let Some(token) = from_header {
        return Some(PresentedCredential::Basic(token));
    }

    query.and_then(|q| {
        url::form_urlencoded::parse(q.as_bytes())
            .find(|(key, _)| key == "token")
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
            .map(PresentedCredential::Query)
    })
}

/// Compares presented credentials against the configured secret.
#[derive(Clone)]
pub struct CredentialGate {
    secret: String,
}

impl std::fmt::Debug for CredentialGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialGate").finish_non_exhaustive()
    }
}

impl CredentialGate {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Decide whether `presented` grants access.
    pub fn verify(&self, presented: Option<&PresentedCredential>) -> Result<(), CheckError> {
        let accepted = match presented {
            None => return Err(CheckError::MissingCredential),
            Some(PresentedCredential::Query(token)) => self.matches(token.as_bytes()),
            Some(PresentedCredential::Basic(token)) => self.matches_basic(token),
        };

        if accepted {
            Ok(())
        } else {
            Err(CheckError::InvalidCredential)
        }
    }

    // Basic values are normally base64; older clients send the raw secret.
    fn matches_basic(&self, token: &str) -> bool {
        if self.matches(token.as_bytes()) {
            return true;
        }

        let Ok(decoded) = STANDARD.decode(token) else {
            return false;
        };
        if self.matches(&decoded) {
            return true;
        }

        match decoded.iter().position(|b| *b == b':') {
            Some(idx) => self.matches(&decoded[idx + 1..]),
            None => false,
        }
    }

    fn matches(&self, candidate: &[u8]) -> bool {
        self.secret.as_bytes().ct_eq(candidate).into()
    }
}

impl RequestFilter for CredentialGate {
    fn name(&self) -> &'static str {
        "credential_gate"
    }

    fn apply(&self, request: &mut Request<Body>) -> Result<(), CheckError> {
        let presented = extract_credential(request.headers(), request.uri().query());
        self.verify(presented.as_ref())
    }
}
