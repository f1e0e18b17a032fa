pub mod channel;
pub mod config;
pub mod disposition;
pub mod error;
pub mod error_utils;
pub mod message;
pub mod types;

pub use channel::*;
pub use config::*;
pub use disposition::*;
pub use error::*;
pub use error_utils::*;
pub use message::*;
pub use types::*;
