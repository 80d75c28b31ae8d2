pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod fixtures;
pub mod output;
pub mod recorder;
pub mod scoring;
pub mod store;
