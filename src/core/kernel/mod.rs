/// Transport layer shared by the authenticator and the client facade
///
/// The kernel knows nothing about STET resources: it moves JSON over HTTP,
/// attaches the current bearer token, and turns every non-2xx response or
/// transport failure into a `RequestError` naming the failing path.
///
/// # Example
/// ```rust,no_run
/// use stetx::core::kernel::*;
///
/// # async fn example() -> Result<(), stetx::Dsp2Error> {
/// let rest = RestClientBuilder::new(
///     RestClientConfig::new("https://bank.example".to_string()).with_timeout(10),
/// )
/// .build()?;
///
/// rest.set_token("access-token").await;
/// let identity = rest.get("/stet/identity", &[]).await?;
/// # Ok(())
/// # }
/// ```
pub mod rest;

pub use rest::{ReqwestRest, RestClient, RestClientBuilder, RestClientConfig};
