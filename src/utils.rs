use base64::{engine::general_purpose, Engine};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::CoffeeShopError;

/// The `aud` claim may be a single string or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

impl Audience {
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Self::Single(aud) => aud == audience,
            Self::Many(auds) => auds.iter().any(|aud| aud == audience),
        }
    }
}

/// The subset of an Auth0 access token payload the front-end reads.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Claims {
    pub exp: i64,
    pub aud: Option<Audience>,
    pub iss: Option<String>,
    pub sub: Option<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Claims {
    pub fn expires_at(&self) -> Result<DateTime<Utc>, CoffeeShopError> {
        DateTime::from_timestamp(self.exp, 0).ok_or_else(|| {
            CoffeeShopError::InvalidJwt(format!("invalid exp timestamp {}", self.exp))
        })
    }
}

/// Decode the payload of a JWT. The signature is not checked; the API does that.
pub fn decode_claims(jwt: &str) -> Result<Claims, CoffeeShopError> {
    let mut segments = jwt.split('.');
    let body = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(body), Some(_), None) if !body.is_empty() => body,
        _ => return Err(CoffeeShopError::InvalidJwt("expected three segments".into())),
    };

    let decoded = general_purpose::URL_SAFE_NO_PAD.decode(body)?;
    let claims = serde_json::from_slice(&decoded)?;

    Ok(claims)
}

/// Join `base` and `path` with exactly one `/` between them.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{path}")
    }
}
