pub mod config;
pub mod error;
pub mod records;

pub use config::SnacklineConfig;
pub use error::{Result, SnacklineError};
pub use records::*;
