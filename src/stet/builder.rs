use crate::core::config::Dsp2Config;
use crate::core::errors::Dsp2Error;
use crate::core::kernel::{ReqwestRest, RestClientBuilder, RestClientConfig};
use crate::stet::client::Dsp2Client;

/// Create a reqwest-backed client; credentials are checked, nothing is sent
pub fn build_client(config: &Dsp2Config) -> Result<Dsp2Client<ReqwestRest>, Dsp2Error> {
    if !config.has_credentials() {
        return Err(Dsp2Error::ConstructionError(
            "Username and password must be provided".to_string(),
        ));
    }

    let rest_config =
        RestClientConfig::new(config.base_url.clone()).with_timeout(config.timeout_seconds);
    let rest = RestClientBuilder::new(rest_config).build()?;

    Dsp2Client::with_rest(config, rest)
}

/// Create a client and run the password grant before returning it
pub async fn connect(config: &Dsp2Config) -> Result<Dsp2Client<ReqwestRest>, Dsp2Error> {
    let client = build_client(config)?;
    client.authenticate().await?;
    Ok(client)
}
