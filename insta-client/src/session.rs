//! Session state carried between requests.
//!
//! The caller owns the settings map and hands it back verbatim on every
//! request. The client only reads the handful of keys it needs and writes
//! them back on export; every other key survives untouched.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use instagate_core::{PlatformError, SessionSettings};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

const AUTHORIZATION_PREFIX: &str = "Bearer IGT:2:";

const KEY_UUIDS: &str = "uuids";
const KEY_AUTHORIZATION: &str = "authorization_data";
const KEY_USER_AGENT: &str = "user_agent";
const KEY_MID: &str = "mid";
const KEY_LAST_LOGIN: &str = "last_login";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIds {
    pub phone_id: String,
    pub uuid: String,
    pub client_session_id: String,
    pub advertising_id: String,
    pub android_device_id: String,
}

impl DeviceIds {
    pub fn generate() -> Self {
        let device = uuid::Uuid::new_v4().simple().to_string();
        Self {
            phone_id: uuid::Uuid::new_v4().to_string(),
            uuid: uuid::Uuid::new_v4().to_string(),
            client_session_id: uuid::Uuid::new_v4().to_string(),
            advertising_id: uuid::Uuid::new_v4().to_string(),
            android_device_id: format!("android-{}", &device[..16]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionState {
    settings: SessionSettings,
    uuids: DeviceIds,
    authorization_data: Map<String, Value>,
    user_agent: String,
    mid: Option<String>,
}

impl SessionState {
    pub fn new(user_agent: String) -> Self {
        Self {
            settings: SessionSettings::new(),
            uuids: DeviceIds::generate(),
            authorization_data: Map::new(),
            user_agent,
            mid: None,
        }
    }

    /// Restores a previously exported session.
    pub fn apply(&mut self, settings: SessionSettings) {
        if let Some(uuids) = settings.get(KEY_UUIDS) {
            match serde_json::from_value::<DeviceIds>(uuids.clone()) {
                Ok(ids) => self.uuids = ids,
                Err(e) => warn!("Ignoring malformed device ids in session settings: {}", e),
            }
        }
        if let Some(Value::Object(auth)) = settings.get(KEY_AUTHORIZATION) {
            self.authorization_data = auth.clone();
        }
        if let Some(Value::String(agent)) = settings.get(KEY_USER_AGENT) {
            self.user_agent = agent.clone();
        }
        if let Some(Value::String(mid)) = settings.get(KEY_MID) {
            self.mid = Some(mid.clone());
        }

        debug!(
            "Applied session settings ({} keys, authenticated: {})",
            settings.len(),
            self.is_authenticated()
        );
        self.settings = settings;
    }

    pub fn export(&self) -> SessionSettings {
        let mut settings = self.settings.clone();
        if let Ok(uuids) = serde_json::to_value(&self.uuids) {
            settings.insert(KEY_UUIDS.to_string(), uuids);
        }
        settings.insert(
            KEY_AUTHORIZATION.to_string(),
            Value::Object(self.authorization_data.clone()),
        );
        settings.insert(
            KEY_USER_AGENT.to_string(),
            Value::String(self.user_agent.clone()),
        );
        if let Some(mid) = &self.mid {
            settings.insert(KEY_MID.to_string(), Value::String(mid.clone()));
        }
        settings
    }

    pub fn uuids(&self) -> &DeviceIds {
        &self.uuids
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn mid(&self) -> Option<&str> {
        self.mid.as_deref()
    }

    pub fn set_mid(&mut self, mid: String) {
        self.mid = Some(mid);
    }

    pub fn user_id(&self) -> Option<String> {
        match self.authorization_data.get("ds_user_id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id().is_some()
    }

    pub fn authorization_header(&self) -> Option<String> {
        if self.authorization_data.is_empty() {
            return None;
        }
        let json = serde_json::to_string(&self.authorization_data).ok()?;
        Some(format!("{}{}", AUTHORIZATION_PREFIX, STANDARD.encode(json)))
    }

    /// Stores the authorization handed out in an `ig-set-authorization` header.
    pub fn set_authorization_from_header(&mut self, header: &str) -> Result<(), PlatformError> {
        let invalid = |details: &str| PlatformError::InvalidResponse {
            details: format!("Malformed authorization header: {}", details),
        };

        let encoded = header
            .trim()
            .strip_prefix(AUTHORIZATION_PREFIX)
            .ok_or_else(|| invalid("unexpected prefix"))?;
        let decoded = STANDARD
            .decode(encoded)
            .map_err(|_| invalid("not base64"))?;
        let data: Map<String, Value> =
            serde_json::from_slice(&decoded).map_err(|_| invalid("not a JSON object"))?;

        self.authorization_data = data;
        Ok(())
    }

    pub fn mark_logged_in(&mut self) {
        self.settings.insert(
            KEY_LAST_LOGIN.to_string(),
            Value::from(Utc::now().timestamp()),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn header_for(data: Value) -> String {
        format!(
            "{}{}",
            AUTHORIZATION_PREFIX,
            STANDARD.encode(data.to_string())
        )
    }

    #[test]
    fn test_fresh_session_is_anonymous() {
        let session = SessionState::new("agent/1.0".to_string());
        assert!(!session.is_authenticated());
        assert_eq!(session.authorization_header(), None);
        assert!(session.uuids().android_device_id.starts_with("android-"));
        assert_eq!(session.uuids().android_device_id.len(), "android-".len() + 16);
    }

    #[test]
    fn test_apply_and_export_preserve_unknown_keys() {
        let mut session = SessionState::new("agent/1.0".to_string());
        let settings = json!({
            "authorization_data": {"ds_user_id": "42", "sessionid": "s"},
            "user_agent": "agent/2.0",
            "mid": "mid-1",
            "country": "US",
            "cookies": {}
        });
        session.apply(settings.as_object().unwrap().clone());

        assert!(session.is_authenticated());
        assert_eq!(session.user_id().as_deref(), Some("42"));
        assert_eq!(session.user_agent(), "agent/2.0");
        assert_eq!(session.mid(), Some("mid-1"));

        let exported = session.export();
        assert_eq!(exported["country"], "US");
        assert_eq!(exported["authorization_data"]["sessionid"], "s");
        assert!(exported.contains_key("uuids"));
    }

    #[test]
    fn test_device_ids_survive_round_trip() {
        let mut first = SessionState::new("agent".to_string());
        first.apply(SessionSettings::new());
        let exported = first.export();

        let mut second = SessionState::new("agent".to_string());
        second.apply(exported);
        assert_eq!(first.uuids(), second.uuids());
    }

    #[test]
    fn test_malformed_uuids_are_ignored() {
        let mut session = SessionState::new("agent".to_string());
        let before = session.uuids().clone();
        session.apply(json!({"uuids": "nope"}).as_object().unwrap().clone());
        assert_eq!(session.uuids(), &before);
    }

    #[test]
    fn test_authorization_header_round_trip() {
        let mut session = SessionState::new("agent".to_string());
        session
            .set_authorization_from_header(&header_for(json!({"ds_user_id": 7, "sessionid": "x"})))
            .unwrap();
        assert_eq!(session.user_id().as_deref(), Some("7"));

        let header = session.authorization_header().unwrap();
        let mut other = SessionState::new("agent".to_string());
        other.set_authorization_from_header(&header).unwrap();
        assert_eq!(other.user_id().as_deref(), Some("7"));
    }

    #[test]
    fn test_rejects_malformed_authorization_header() {
        let mut session = SessionState::new("agent".to_string());
        assert!(session.set_authorization_from_header("Token abc").is_err());
        assert!(session
            .set_authorization_from_header("Bearer IGT:2:!!!")
            .is_err());
        assert!(!session.is_authenticated());
    }
}
