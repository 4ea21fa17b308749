pub mod archive;
pub mod config;
pub mod download;
pub mod error;
pub mod http;
pub mod platform;
pub mod provider;
pub mod resolver;
pub mod runtime;
pub mod scaffold;
