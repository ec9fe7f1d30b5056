pub mod auth;
pub mod builder;
pub mod client;
pub mod rest;

// Re-export main types for easier importing
pub use auth::Authenticator;
pub use builder::{build_client, connect};
pub use client::Dsp2Client;
pub use rest::StetRest;
