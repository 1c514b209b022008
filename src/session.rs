//! Signed cookie sessions.
//!
//! The whole session lives in the cookie: a JSON payload, base64url encoded and
//! authenticated with HMAC-SHA256. A cookie that fails verification, cannot be
//! decoded or is older than the configured lifetime is treated as an empty session.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{
        header::{COOKIE, SET_COOKIE},
        request::Parts,
        HeaderValue,
    },
    response::{IntoResponseParts, ResponseParts},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::{convert::Infallible, sync::Arc};

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "ward_session";
const MAX_FLASH_CHARS: usize = 300;

/// Signing key plus cookie lifetime, shared by every request.
#[derive(Clone)]
pub struct SessionKey {
    secret: Arc<Vec<u8>>,
    max_age_secs: i64,
}

impl SessionKey {
    pub fn new(secret: impl Into<Vec<u8>>, max_age_secs: i64) -> Self {
        Self {
            secret: Arc::new(secret.into()),
            max_age_secs,
        }
    }

    /// Random per-process key: every restart invalidates existing sessions.
    pub fn random(max_age_secs: i64) -> Self {
        let mut secret = vec![0u8; 32];
        OsRng.fill_bytes(&mut secret);
        Self::new(secret, max_age_secs)
    }

    fn mac(&self) -> HmacSha256 {
        // HMAC accepts keys of any length
        match HmacSha256::new_from_slice(&self.secret) {
            Ok(mac) => mac,
            Err(_) => unreachable!("hmac key length is unrestricted"),
        }
    }

    fn sign(&self, payload: &[u8]) -> String {
        let mut mac = self.mac();
        mac.update(payload);
        URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }

    fn verify(&self, payload: &[u8], tag: &str) -> bool {
        let Ok(tag) = URL_SAFE_NO_PAD.decode(tag) else {
            return false;
        };
        let mut mac = self.mac();
        mac.update(payload);
        mac.verify_slice(&tag).is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: FlashLevel,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nurse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    access_patient_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    flashes: Vec<Flash>,
    issued_at: i64,
}

/// Per-request session. Return it as a response part to persist changes.
#[derive(Clone)]
pub struct Session {
    data: SessionData,
    key: SessionKey,
}

impl Session {
    pub fn new(key: SessionKey) -> Self {
        Self {
            data: SessionData {
                issued_at: chrono::Utc::now().timestamp(),
                ..SessionData::default()
            },
            key,
        }
    }

    pub fn nurse(&self) -> Option<&str> {
        self.data.nurse.as_deref()
    }

    pub fn access_patient_id(&self) -> Option<i64> {
        self.data.access_patient_id
    }

    /// Marks the caller as an authenticated nurse and restarts the session clock.
    pub fn login_nurse(&mut self, username: &str) {
        self.data.nurse = Some(username.to_string());
        self.data.issued_at = chrono::Utc::now().timestamp();
    }

    pub fn grant_patient(&mut self, patient_id: i64) {
        self.data.access_patient_id = Some(patient_id);
        self.data.issued_at = chrono::Utc::now().timestamp();
    }

    pub fn logout(&mut self) {
        self.data.nurse = None;
        self.data.access_patient_id = None;
    }

    /// Messages are cut to `MAX_FLASH_CHARS` so echoed input cannot outgrow the cookie.
    pub fn flash(&mut self, category: FlashLevel, message: impl Into<String>) {
        let mut message = message.into();
        if let Some((cut, _)) = message.char_indices().nth(MAX_FLASH_CHARS) {
            message.truncate(cut);
            message.push('…');
        }
        self.data.flashes.push(Flash { category, message });
    }

    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.data.flashes)
    }

    pub fn encode(&self) -> String {
        let payload = serde_json::to_vec(&self.data).unwrap_or_default();
        let body = URL_SAFE_NO_PAD.encode(&payload);
        let tag = self.key.sign(body.as_bytes());
        format!("{body}.{tag}")
    }

    pub fn decode(key: &SessionKey, value: &str, now: i64) -> Option<Self> {
        let (body, tag) = value.split_once('.')?;
        if !key.verify(body.as_bytes(), tag) {
            return None;
        }
        let payload = URL_SAFE_NO_PAD.decode(body).ok()?;
        let data: SessionData = serde_json::from_slice(&payload).ok()?;
        if now - data.issued_at > key.max_age_secs {
            return None;
        }
        Some(Self {
            data,
            key: key.clone(),
        })
    }

    fn set_cookie_header(&self) -> String {
        format!(
            "{COOKIE_NAME}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.encode(),
            self.key.max_age_secs
        )
    }
}

fn cookie_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    SessionKey: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let key = SessionKey::from_ref(state);
        let now = chrono::Utc::now().timestamp();
        let session = cookie_value(parts, COOKIE_NAME)
            .and_then(|value| Session::decode(&key, value, now))
            .unwrap_or_else(|| Session::new(key));
        Ok(session)
    }
}

impl IntoResponseParts for Session {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        match HeaderValue::from_str(&self.set_cookie_header()) {
            Ok(value) => {
                res.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => tracing::warn!("session cookie not encodable: {e}"),
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SessionKey {
        SessionKey::new(b"test-secret".to_vec(), 3600)
    }

    #[test]
    fn encode_decode_keeps_identity_and_flashes() {
        let mut session = Session::new(key());
        session.login_nurse("nurse1");
        session.grant_patient(7);
        session.flash(FlashLevel::Success, "Login berhasil!");

        let now = chrono::Utc::now().timestamp();
        let mut decoded = Session::decode(&key(), &session.encode(), now).unwrap();
        assert_eq!(decoded.nurse(), Some("nurse1"));
        assert_eq!(decoded.access_patient_id(), Some(7));
        let flashes = decoded.take_flashes();
        assert_eq!(flashes.len(), 1);
        assert_eq!(flashes[0].category, FlashLevel::Success);
        assert!(decoded.take_flashes().is_empty());
    }

    #[test]
    fn tampered_cookie_is_rejected() {
        let mut session = Session::new(key());
        session.login_nurse("nurse1");
        let encoded = session.encode();
        let (body, tag) = encoded.split_once('.').unwrap();

        let forged_body = URL_SAFE_NO_PAD.encode(br#"{"nurse":"admin","issued_at":0}"#);
        let now = chrono::Utc::now().timestamp();
        assert!(Session::decode(&key(), &format!("{forged_body}.{tag}"), now).is_none());
        assert!(Session::decode(&key(), body, now).is_none());

        let other = SessionKey::new(b"other".to_vec(), 3600);
        assert!(Session::decode(&other, &encoded, now).is_none());
    }

    #[test]
    fn expired_cookie_is_rejected() {
        let session = Session::new(key());
        let later = chrono::Utc::now().timestamp() + 3601;
        assert!(Session::decode(&key(), &session.encode(), later).is_none());
    }

    #[test]
    fn long_flashes_are_cut_to_fit_the_cookie() {
        let mut session = Session::new(key());
        session.flash(FlashLevel::Success, "é".repeat(5000));
        session.flash(FlashLevel::Info, "pendek");
        assert!(session.encode().len() < 4000);

        let flashes = session.take_flashes();
        assert_eq!(flashes[0].message.chars().count(), MAX_FLASH_CHARS + 1);
        assert!(flashes[0].message.ends_with('…'));
        assert_eq!(flashes[1].message, "pendek");
    }

    #[test]
    fn logout_clears_both_identities() {
        let mut session = Session::new(key());
        session.login_nurse("nurse1");
        session.grant_patient(3);
        session.logout();
        assert!(session.nurse().is_none());
        assert!(session.access_patient_id().is_none());
    }
}
