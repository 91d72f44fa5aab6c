//! Database models and queries

pub mod init;
pub mod models;
pub mod music;
pub mod tokens;

pub use init::*;
pub use models::*;
