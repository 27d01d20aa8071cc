pub mod config;
pub mod engagement;
pub mod error;
pub mod error_utils;
pub mod types;

pub use config::*;
pub use engagement::*;
pub use error::*;
pub use error_utils::*;
pub use types::*;
