use crate::session::SessionState;
use crate::{ClientFactory, PlatformClient};
use async_trait::async_trait;
use chrono::Utc;
use instagate_core::{
    normalize_timestamp, ClientSettings, CoreError, Media, PlatformError, Post, SessionSettings,
    UserInfo,
};
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const API_PREFIX: &str = "/api/v1";
const IG_APP_ID: &str = "567067343352427";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadKind {
    Photo,
    Video,
}

impl UploadKind {
    fn rupload_path(self) -> &'static str {
        match self {
            UploadKind::Photo => "/rupload_igphoto",
            UploadKind::Video => "/rupload_igvideo",
        }
    }

    fn media_type(self) -> &'static str {
        match self {
            UploadKind::Photo => "1",
            UploadKind::Video => "2",
        }
    }

    fn entity_type(self) -> &'static str {
        match self {
            UploadKind::Photo => "image/jpeg",
            UploadKind::Video => "video/mp4",
        }
    }

    fn configure_endpoint(self) -> &'static str {
        match self {
            UploadKind::Photo => "/media/configure/",
            UploadKind::Video => "/media/configure/?video=1",
        }
    }
}

#[derive(Debug)]
struct ApiResponse {
    status: u16,
    headers: HeaderMap,
    body: Value,
}

/// Private mobile API client. One instance serves exactly one request.
#[derive(Debug)]
pub struct InstagramClient {
    http_client: Client,
    settings: ClientSettings,
    session: SessionState,
    proxy: Option<String>,
}

impl InstagramClient {
    pub fn new(settings: ClientSettings) -> Result<Self, CoreError> {
        let http_client = build_http_client(&settings, None)?;
        let session = SessionState::new(settings.user_agent.clone());

        Ok(Self {
            http_client,
            settings,
            session,
            proxy: None,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.settings.host.trim_end_matches('/'), path);
        let uuids = self.session.uuids();

        let mut builder = self
            .http_client
            .request(method, url)
            .header(USER_AGENT, self.session.user_agent())
            .header("X-IG-App-ID", IG_APP_ID)
            .header("X-IG-Device-ID", &uuids.uuid)
            .header("X-IG-Android-ID", &uuids.android_device_id);

        if let Some(auth) = self.session.authorization_header() {
            builder = builder.header(AUTHORIZATION, auth);
        }
        if let Some(mid) = self.session.mid() {
            builder = builder.header("X-MID", mid);
        }
        builder
    }

    fn api_request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        self.request(method, &format!("{}{}", API_PREFIX, endpoint))
    }

    /// Sends a request and decodes the JSON body without judging the status.
    async fn dispatch(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
    ) -> Result<ApiResponse, CoreError> {
        info!("Making platform API request: {}", endpoint);

        let response = builder.send().await.map_err(|e| {
            error!("Network error for {}: {}", endpoint, e);
            if e.is_timeout() {
                CoreError::Platform(PlatformError::RequestTimeout)
            } else {
                CoreError::Network(e)
            }
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(CoreError::Network)?;
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        debug!("Response {} for {}", status, endpoint);
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    async fn execute(&self, builder: RequestBuilder, endpoint: &str) -> Result<Value, CoreError> {
        let response = self.dispatch(builder, endpoint).await?;
        Ok(ensure_success(response, endpoint)?.body)
    }

    async fn two_factor_login(
        &self,
        username: &str,
        code: &str,
        identifier: &str,
    ) -> Result<ApiResponse, CoreError> {
        let uuids = self.session.uuids();
        let data = json!({
            "verification_code": code,
            "two_factor_identifier": identifier,
            "username": username,
            "phone_id": uuids.phone_id,
            "guid": uuids.uuid,
            "device_id": uuids.android_device_id,
            "trust_this_device": "0",
            "verification_method": "1",
        });

        let endpoint = "/accounts/two_factor_login/";
        let builder = self
            .api_request(Method::POST, endpoint)
            .form(&[("signed_body", signed_body(&data))]);
        let response = self.dispatch(builder, endpoint).await?;
        Ok(ensure_success(response, endpoint)?)
    }

    fn complete_login(&mut self, response: &ApiResponse, username: &str) -> Result<(), CoreError> {
        if let Some(mid) = header_str(&response.headers, "ig-set-x-mid") {
            self.session.set_mid(mid.to_string());
        }

        let header = header_str(&response.headers, "ig-set-authorization").ok_or_else(|| {
            PlatformError::AuthenticationFailed {
                reason: "no authorization returned".to_string(),
            }
        })?;
        self.session.set_authorization_from_header(header)?;
        self.session.mark_logged_in();

        info!(
            "Logged in as {} (user id {})",
            username,
            self.session.user_id().unwrap_or_default()
        );
        Ok(())
    }

    async fn rupload(&self, kind: UploadKind, path: &Path) -> Result<String, CoreError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| PlatformError::MediaRead {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let upload_id = Utc::now().timestamp_millis().to_string();
        let upload_name = format!(
            "{}_0_{}",
            upload_id,
            fastrand::u64(1_000_000_000..=9_999_999_999)
        );
        let rupload_params = json!({
            "retry_context": "{\"num_step_auto_retry\":0,\"num_reupload\":0,\"num_step_manual_retry\":0}",
            "media_type": kind.media_type(),
            "upload_id": upload_id,
            "xsharing_user_ids": "[]",
        });

        let endpoint = format!("{}/{}", kind.rupload_path(), upload_name);
        debug!("Uploading {} bytes from {}", bytes.len(), path.display());

        let builder = self
            .request(Method::POST, &endpoint)
            .header("X-Instagram-Rupload-Params", rupload_params.to_string())
            .header("X-Entity-Type", kind.entity_type())
            .header("X-Entity-Name", &upload_name)
            .header("X-Entity-Length", bytes.len().to_string())
            .header("Offset", "0")
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes);
        self.execute(builder, &endpoint).await?;

        Ok(upload_id)
    }

    async fn configure(
        &self,
        kind: UploadKind,
        upload_id: &str,
        caption: &str,
    ) -> Result<Media, CoreError> {
        let uuids = self.session.uuids();
        let data = json!({
            "upload_id": upload_id,
            "caption": caption,
            "source_type": "4",
            "device_id": uuids.android_device_id,
            "_uuid": uuids.uuid,
            "_uid": self.session.user_id().unwrap_or_default(),
        });

        let endpoint = kind.configure_endpoint();
        let builder = self
            .api_request(Method::POST, endpoint)
            .form(&[("signed_body", signed_body(&data))]);
        let body = self.execute(builder, endpoint).await?;

        let media = parse_media(&body)?;
        info!("Published media {} ({})", media.pk, media.id);
        Ok(media)
    }

    async fn upload(&self, kind: UploadKind, path: &Path, caption: &str) -> Result<Media, CoreError> {
        let upload_id = self.rupload(kind, path).await?;
        self.configure(kind, &upload_id, caption).await
    }
}

#[async_trait]
impl PlatformClient for InstagramClient {
    fn set_proxy(&mut self, proxy_url: &str) -> Result<(), CoreError> {
        self.http_client = build_http_client(&self.settings, Some(proxy_url))?;
        self.proxy = Some(proxy_url.to_string());
        Ok(())
    }

    fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    fn set_settings(&mut self, settings: SessionSettings) {
        self.session.apply(settings);
    }

    fn get_settings(&self) -> SessionSettings {
        self.session.export()
    }

    async fn login(
        &mut self,
        username: &str,
        password: &str,
        verification_code: Option<&str>,
    ) -> Result<(), CoreError> {
        let uuids = self.session.uuids();
        let data = json!({
            "jazoest": jazoest(&uuids.phone_id),
            "phone_id": uuids.phone_id,
            "username": username,
            "enc_password": format!("#PWD_INSTAGRAM:0:{}:{}", Utc::now().timestamp(), password),
            "guid": uuids.uuid,
            "device_id": uuids.android_device_id,
            "adid": uuids.advertising_id,
            "google_tokens": "[]",
            "login_attempt_count": "0",
        });

        let endpoint = "/accounts/login/";
        let builder = self
            .api_request(Method::POST, endpoint)
            .form(&[("signed_body", signed_body(&data))]);
        let response = self.dispatch(builder, endpoint).await?;

        if response.body.get("two_factor_required").and_then(Value::as_bool) == Some(true) {
            let code = verification_code
                .filter(|c| !c.trim().is_empty())
                .ok_or(PlatformError::TwoFactorRequired)?;
            let identifier = response
                .body
                .pointer("/two_factor_info/two_factor_identifier")
                .and_then(Value::as_str)
                .ok_or_else(|| PlatformError::InvalidResponse {
                    details: "two_factor_identifier missing".to_string(),
                })?;

            info!("Two-factor authentication requested for {}", username);
            let response = self.two_factor_login(username, code.trim(), identifier).await?;
            return self.complete_login(&response, username);
        }

        let response = ensure_success(response, endpoint)?;
        self.complete_login(&response, username)
    }

    async fn get_timeline_feed(&self) -> Result<(), CoreError> {
        if !self.session.is_authenticated() {
            warn!("Timeline warm-up attempted without an authenticated session");
            return Err(PlatformError::LoginRequired.into());
        }

        let uuids = self.session.uuids();
        let endpoint = "/feed/timeline/";
        let builder = self.api_request(Method::POST, endpoint).form(&[
            ("is_prefetch", "0"),
            ("feed_view_info", "[]"),
            ("phone_id", uuids.phone_id.as_str()),
            ("device_id", uuids.android_device_id.as_str()),
            ("session_id", uuids.client_session_id.as_str()),
            ("battery_level", "100"),
            ("timezone_offset", "0"),
            ("reason", "cold_start_fetch"),
            ("is_pull_to_refresh", "0"),
        ]);
        self.execute(builder, endpoint).await?;

        debug!("Session warm-up succeeded");
        Ok(())
    }

    async fn photo_upload(&self, path: &Path, caption: &str) -> Result<Media, CoreError> {
        self.upload(UploadKind::Photo, path, caption).await
    }

    async fn video_upload(&self, path: &Path, caption: &str) -> Result<Media, CoreError> {
        self.upload(UploadKind::Video, path, caption).await
    }

    async fn user_info_by_username(&self, username: &str) -> Result<UserInfo, CoreError> {
        let endpoint = format!("/users/{}/usernameinfo/", urlencoding::encode(username));
        let body = self
            .execute(self.api_request(Method::GET, &endpoint), &endpoint)
            .await?;

        let user = body.get("user").ok_or_else(|| PlatformError::InvalidResponse {
            details: format!("user missing for {}", username),
        })?;
        let pk = user
            .get("pk")
            .and_then(value_to_string)
            .ok_or_else(|| PlatformError::InvalidResponse {
                details: format!("pk missing for {}", username),
            })?;

        let info = UserInfo {
            pk,
            username: user
                .get("username")
                .and_then(Value::as_str)
                .unwrap_or(username)
                .to_string(),
            follower_count: user.get("follower_count").and_then(Value::as_u64).unwrap_or(0),
        };
        debug!("Retrieved user info for: {}", info.username);
        Ok(info)
    }

    async fn user_medias(&self, user_pk: &str, amount: usize) -> Result<Vec<Post>, CoreError> {
        let endpoint = format!("/feed/user/{}/", urlencoding::encode(user_pk));
        let count = amount.to_string();
        let builder = self
            .api_request(Method::GET, &endpoint)
            .query(&[("count", count.as_str())]);
        let body = self.execute(builder, &endpoint).await?;

        let items = body
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| PlatformError::InvalidResponse {
                details: format!("items missing in feed of user {}", user_pk),
            })?;

        let posts = items
            .iter()
            .take(amount)
            .map(parse_post)
            .collect::<Result<Vec<_>, _>>()?;

        info!("Retrieved {} posts for user {}", posts.len(), user_pk);
        Ok(posts)
    }
}

/// Creates a fresh [`InstagramClient`] per request.
#[derive(Debug, Clone)]
pub struct InstagramClientFactory {
    settings: ClientSettings,
}

impl InstagramClientFactory {
    pub fn new(settings: ClientSettings) -> Self {
        Self { settings }
    }
}

impl ClientFactory for InstagramClientFactory {
    fn create(&self) -> Result<Box<dyn PlatformClient>, CoreError> {
        Ok(Box::new(InstagramClient::new(self.settings.clone())?))
    }
}

fn build_http_client(
    settings: &ClientSettings,
    proxy_url: Option<&str>,
) -> Result<Client, CoreError> {
    let mut builder = Client::builder().timeout(Duration::from_secs(settings.timeout_secs.max(5)));

    if let Some(url) = proxy_url {
        let proxy = reqwest::Proxy::all(url).map_err(|e| PlatformError::InvalidProxy {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        builder = builder.proxy(proxy);
    }

    builder.build().map_err(|e| match proxy_url {
        Some(url) => CoreError::Platform(PlatformError::InvalidProxy {
            url: url.to_string(),
            reason: e.to_string(),
        }),
        None => CoreError::Network(e),
    })
}

fn ensure_success(response: ApiResponse, endpoint: &str) -> Result<ApiResponse, PlatformError> {
    let failed_status = response.body.get("status").and_then(Value::as_str) == Some("fail");
    if (200..300).contains(&response.status) && !failed_status {
        return Ok(response);
    }

    let err = classify_failure(response.status, &response.body);
    error!(
        "Request failed with status {} for {}: {}",
        response.status, endpoint, err
    );
    Err(err)
}

fn classify_failure(status: u16, body: &Value) -> PlatformError {
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| body.as_str())
        .unwrap_or_default();
    let error_type = body
        .get("error_type")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if body.get("two_factor_required").and_then(Value::as_bool) == Some(true) {
        PlatformError::TwoFactorRequired
    } else if message == "challenge_required" || body.get("challenge").is_some() {
        PlatformError::ChallengeRequired
    } else if message == "login_required" {
        PlatformError::LoginRequired
    } else if error_type == "bad_password" {
        PlatformError::BadPassword
    } else if status == 429 || message.contains("Please wait a few minutes") {
        PlatformError::RateLimited
    } else if status == 401 {
        PlatformError::LoginRequired
    } else {
        PlatformError::ApiFailure {
            status_code: status,
            message: if message.is_empty() {
                "unknown error".to_string()
            } else {
                message.to_string()
            },
        }
    }
}

fn parse_media(body: &Value) -> Result<Media, PlatformError> {
    let media = body.get("media").ok_or_else(|| PlatformError::InvalidResponse {
        details: "media missing in configure response".to_string(),
    })?;
    let pk = media
        .get("pk")
        .and_then(value_to_string)
        .ok_or_else(|| PlatformError::InvalidResponse {
            details: "media pk missing".to_string(),
        })?;
    let id = media
        .get("id")
        .and_then(value_to_string)
        .unwrap_or_else(|| pk.clone());

    Ok(Media { pk, id })
}

fn parse_post(item: &Value) -> Result<Post, PlatformError> {
    let pk = item
        .get("pk")
        .and_then(value_to_string)
        .ok_or_else(|| PlatformError::InvalidResponse {
            details: "post pk missing".to_string(),
        })?;
    let taken_at = item
        .get("taken_at")
        .and_then(normalize_timestamp)
        .ok_or_else(|| PlatformError::InvalidResponse {
            details: format!("taken_at missing or unreadable for post {}", pk),
        })?;

    Ok(Post {
        id: item
            .get("id")
            .and_then(value_to_string)
            .unwrap_or_else(|| pk.clone()),
        pk,
        taken_at,
        like_count: item.get("like_count").and_then(Value::as_u64),
        comment_count: item.get("comment_count").and_then(Value::as_u64),
    })
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

fn signed_body(data: &Value) -> String {
    format!("SIGNATURE.{}", data)
}

fn jazoest(phone_id: &str) -> String {
    let sum: u32 = phone_id.bytes().map(u32::from).sum();
    format!("2{}", sum)
}
