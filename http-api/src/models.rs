//! Request and response bodies of the HTTP surface.
//!
//! `proxy_config` stays raw JSON here so a malformed one never rejects the
//! request; it is interpreted when the client is built.

use instagate_core::{EngagementStats, SessionSettings, UserInfo};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub verification_code: Option<String>,
    #[serde(default)]
    pub proxy_config: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadPhotoRequest {
    pub settings_json: SessionSettings,
    #[serde(default)]
    pub caption: Option<String>,
    pub photo_path: String,
    #[serde(default)]
    pub proxy_config: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadVideoRequest {
    pub settings_json: SessionSettings,
    #[serde(default)]
    pub caption: Option<String>,
    pub video_path: String,
    #[serde(default)]
    pub proxy_config: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatsRequest {
    pub settings_json: SessionSettings,
    pub username: String,
    #[serde(default)]
    pub proxy_config: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub settings: SessionSettings,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub media_pk: String,
    pub media_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub username: String,
    pub followers: u64,
    pub engagement_7d: u64,
    pub engagement_30d: u64,
    pub posts_7d: u32,
    pub posts_30d: u32,
}

impl StatsResponse {
    pub fn new(user: UserInfo, stats: EngagementStats) -> Self {
        Self {
            success: true,
            username: user.username,
            followers: user.follower_count,
            engagement_7d: stats.engagement_7d,
            engagement_30d: stats.engagement_30d,
            posts_7d: stats.posts_7d,
            posts_30d: stats.posts_30d,
        }
    }
}
