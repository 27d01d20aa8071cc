use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Serialized session state handed back by a login and replayed on later
/// requests. Passed through verbatim; nothing here inspects its structure.
pub type SessionSettings = serde_json::Map<String, serde_json::Value>;

/// Outbound proxy requested by a caller.
///
/// Deserialization never fails for a JSON object: a text field of the wrong
/// type becomes `None`, and a port that is not a plain unsigned integer is
/// kept as text so the client rejects it later.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(default, deserialize_with = "lenient_text")]
    pub host: Option<String>,
    #[serde(default, deserialize_with = "lenient_port")]
    pub port: Option<ProxyPort>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub username: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub password: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub protocol: Option<String>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        _ => None,
    })
}

fn lenient_port<'de, D>(deserializer: D) -> Result<Option<ProxyPort>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => Some(match n.as_u64() {
            Some(port) => ProxyPort::Number(port),
            None => ProxyPort::Text(n.to_string()),
        }),
        Value::String(text) => Some(ProxyPort::Text(text)),
        _ => None,
    })
}

/// Callers send the port either as a number or as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProxyPort {
    Number(u64),
    Text(String),
}

impl ProxyPort {
    fn is_blank(&self) -> bool {
        match self {
            ProxyPort::Number(n) => *n == 0,
            ProxyPort::Text(s) => s.trim().is_empty(),
        }
    }
}

impl fmt::Display for ProxyPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyPort::Number(n) => write!(f, "{}", n),
            ProxyPort::Text(s) => write!(f, "{}", s.trim()),
        }
    }
}

impl ProxyConfig {
    pub const DEFAULT_PROTOCOL: &'static str = "http";

    /// Reads a caller-supplied proxy config. Anything but a JSON object is
    /// malformed and yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    pub fn protocol(&self) -> &str {
        self.protocol
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(Self::DEFAULT_PROTOCOL)
    }

    /// Builds `protocol://[username:password@]host:port`.
    ///
    /// Returns `None` when host or port is missing. The credentials segment is
    /// only written when both username and password are present.
    pub fn proxy_url(&self) -> Option<String> {
        let host = self.host.as_deref().map(str::trim).filter(|h| !h.is_empty())?;
        let port = self.port.as_ref().filter(|p| !p.is_blank())?;

        let username = self.username.as_deref().filter(|u| !u.is_empty());
        let password = self.password.as_deref().filter(|p| !p.is_empty());

        let credentials = match (username, password) {
            (Some(user), Some(pass)) => format!("{}:{}@", user, pass),
            _ => String::new(),
        };

        Some(format!(
            "{}://{}{}:{}",
            self.protocol(),
            credentials,
            host,
            port
        ))
    }
}

/// A recent post as far as engagement statistics are concerned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub pk: String,
    pub id: String,
    pub taken_at: DateTime<Utc>,
    pub like_count: Option<u64>,
    pub comment_count: Option<u64>,
}

impl Post {
    pub fn engagement(&self) -> u64 {
        self.like_count.unwrap_or(0) + self.comment_count.unwrap_or(0)
    }
}

/// Identifiers of a freshly published media item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub pk: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub pk: String,
    pub username: String,
    pub follower_count: u64,
}
