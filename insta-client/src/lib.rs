pub mod api;
pub mod proxy;
pub mod session;


pub use api::{InstagramClient, InstagramClientFactory};
pub use proxy::{configure_proxy, configure_proxy_from_json, ProxyOutcome};

use async_trait::async_trait;
use instagate_core::{CoreError, Media, Post, SessionSettings, UserInfo};
use std::path::Path;

/// Operations the HTTP layer needs from the social platform.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Routes every subsequent call through `proxy_url`.
    fn set_proxy(&mut self, proxy_url: &str) -> Result<(), CoreError>;

    fn proxy(&self) -> Option<&str>;

    fn set_settings(&mut self, settings: SessionSettings);

    fn get_settings(&self) -> SessionSettings;

    async fn login(
        &mut self,
        username: &str,
        password: &str,
        verification_code: Option<&str>,
    ) -> Result<(), CoreError>;

    /// Lightweight call confirming a restored session is still accepted.
    async fn get_timeline_feed(&self) -> Result<(), CoreError>;

    async fn photo_upload(&self, path: &Path, caption: &str) -> Result<Media, CoreError>;

    async fn video_upload(&self, path: &Path, caption: &str) -> Result<Media, CoreError>;

    async fn user_info_by_username(&self, username: &str) -> Result<UserInfo, CoreError>;

    async fn user_medias(&self, user_pk: &str, amount: usize) -> Result<Vec<Post>, CoreError>;
}

/// Builds one client per request; nothing is pooled or shared.
pub trait ClientFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn PlatformClient>, CoreError>;
}
