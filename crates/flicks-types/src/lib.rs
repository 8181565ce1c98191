pub mod config;
pub mod runtime;

pub use runtime::{Runtime, RuntimeFormatError};
