use crate::error::*;
use tracing::{error, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError [{}]: {}", self.error_code(), self);
        match self {
            CoreError::Platform(e) => {
                e.log_error();
            }
            CoreError::Storage(e) => {
                e.log_error();
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError [{}] (warning): {}", self.error_code(), self);
        self
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::Platform(e) => e.error_code(),
            CoreError::Storage(e) => e.error_code(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::NotFound { .. } => "NOT_FOUND".to_string(),
        }
    }
}

impl ErrorExt for PlatformError {
    fn log_error(&self) -> &Self {
        error!("Platform error details: {:?}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("PlatformError (warning): {}", self);
        self
    }

    fn error_code(&self) -> String {
        match self {
            PlatformError::AuthenticationFailed { .. } => "PLATFORM_AUTH_FAILED".to_string(),
            PlatformError::BadPassword => "PLATFORM_BAD_PASSWORD".to_string(),
            PlatformError::TwoFactorRequired => "PLATFORM_TWO_FACTOR_REQUIRED".to_string(),
            PlatformError::ChallengeRequired => "PLATFORM_CHALLENGE_REQUIRED".to_string(),
            PlatformError::LoginRequired => "PLATFORM_LOGIN_REQUIRED".to_string(),
            PlatformError::RateLimited => "PLATFORM_RATE_LIMIT".to_string(),
            PlatformError::InvalidProxy { .. } => "PLATFORM_INVALID_PROXY".to_string(),
            PlatformError::RequestTimeout => "PLATFORM_TIMEOUT".to_string(),
            PlatformError::InvalidResponse { .. } => "PLATFORM_INVALID_RESPONSE".to_string(),
            PlatformError::ApiFailure { .. } => "PLATFORM_API_FAILURE".to_string(),
            PlatformError::MediaRead { .. } => "PLATFORM_MEDIA_READ".to_string(),
        }
    }
}

impl ErrorExt for StorageError {
    fn log_error(&self) -> &Self {
        error!("Storage error details: {:?}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("StorageError (warning): {}", self);
        self
    }

    fn error_code(&self) -> String {
        match self {
            StorageError::NotFound { .. } => "STORAGE_NOT_FOUND".to_string(),
            StorageError::UpstreamFetch { .. } => "STORAGE_UPSTREAM_FETCH".to_string(),
            StorageError::Transport(_) => "STORAGE_TRANSPORT".to_string(),
        }
    }
}
