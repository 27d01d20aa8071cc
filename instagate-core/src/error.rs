use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Platform API error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("File not found: {resource}")]
    NotFound { resource: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("Authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("The password you entered is incorrect")]
    BadPassword,

    #[error("Two-factor authentication required")]
    TwoFactorRequired,

    #[error("Challenge required")]
    ChallengeRequired,

    #[error("Login required")]
    LoginRequired,

    #[error("Rate limit exceeded. Please wait a few minutes before you try again")]
    RateLimited,

    #[error("Invalid proxy {url}: {reason}")]
    InvalidProxy { url: String, reason: String },

    #[error("Request timeout")]
    RequestTimeout,

    #[error("Invalid API response: {details}")]
    InvalidResponse { details: String },

    #[error("API request failed with status {status_code}: {message}")]
    ApiFailure { status_code: u16, message: String },

    #[error("Could not read media file {path}: {reason}")]
    MediaRead { path: String, reason: String },
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("Failed to fetch {path} from storage: {source}")]
    UpstreamFetch {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Storage transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<reqwest::Error> for StorageError {
    fn from(error: reqwest::Error) -> Self {
        StorageError::Transport(Box::new(error))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },

    #[error("Configuration parsing error: {0}")]
    Parse(#[from] toml::de::Error),
}
