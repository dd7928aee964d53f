pub mod config;
pub mod error;
pub mod jwt;
pub mod signature;
pub mod swagger_doc;
