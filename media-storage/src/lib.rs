pub mod resolver;
pub mod transport;

pub use resolver::{normalize_lexically, MediaResolver};
pub use transport::{
    HttpStorageTransport, ObjectRequest, ObjectResponse, StorageTransport, FETCH_TIMEOUT,
};
