pub mod config;
pub mod error;
pub mod types;

pub use config::{AiProvider, Config, DEFAULT_CONTEXT_CHARS};
pub use error::*;
pub use types::*;
