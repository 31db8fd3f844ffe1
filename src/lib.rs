pub mod config;
pub mod dashboard;
pub mod error;
pub mod export;
pub mod import;
pub mod models;
pub mod roster;
pub mod session;
pub mod store;

pub use error::{AppError, Result};
