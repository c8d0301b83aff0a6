pub mod cache;
pub mod cli;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod init;
pub mod services;
pub mod utils;

pub use error::LiedwyserError;
