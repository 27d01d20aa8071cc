use insta_client::ClientFactory;
use media_storage::MediaResolver;
use std::sync::Arc;

/// Shared by every request. Holds no per-request state: each handler asks
/// the factory for its own client.
#[derive(Clone)]
pub struct AppState {
    pub factory: Arc<dyn ClientFactory>,
    pub resolver: Arc<MediaResolver>,
}

impl AppState {
    pub fn new(factory: Arc<dyn ClientFactory>, resolver: MediaResolver) -> Self {
        Self {
            factory,
            resolver: Arc::new(resolver),
        }
    }
}
