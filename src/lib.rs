//! Validated client for STET/DSP2 account-information APIs.
//!
//! ```rust,no_run
//! use stetx::{AccountInformation, Dsp2Client, Dsp2Config};
//!
//! # async fn example() -> Result<(), stetx::Dsp2Error> {
//! let config = Dsp2Config::new("user".to_string(), "pass".to_string());
//! let client = Dsp2Client::connect(&config).await?;
//!
//! for account in client.get_accounts().await? {
//!     println!("{} {}", account.iban, account.name);
//! }
//! # Ok(())
//! # }
//! ```
pub mod core;
pub mod stet;

pub use crate::core::{
    config::Dsp2Config,
    errors::{AuthError, Dsp2Error, TransportError},
    traits::AccountInformation,
    types::*,
    validation::ListPolicy,
    validation::ValidationError,
};
pub use stet::Dsp2Client;
