pub mod config;
pub mod error;
pub mod executor;
pub mod io;
pub mod lifecycle;
pub mod paths;
pub mod pipeline;
pub mod status;
pub mod table;

pub use error::{Result, ShuntError};
