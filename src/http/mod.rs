//! HTTP client module with manual redirect following and status handling.

mod client;
pub mod redirect;

pub use client::HttpClient;
pub use redirect::MAX_REDIRECTS;
