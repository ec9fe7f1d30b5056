use anyhow::Context;
use stetx::{AccountInformation, Dsp2Client, Dsp2Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let level = std::env::var("DSP2CLIENT_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(level.to_lowercase()).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    #[cfg(feature = "env-file")]
    let config = Dsp2Config::from_env_file().context("loading configuration")?;
    #[cfg(not(feature = "env-file"))]
    let config = Dsp2Config::from_env().context("loading configuration")?;

    let transactions_per_account = match std::env::var("DSP2_TRANSACTIONS_PER_ACCOUNT") {
        Ok(raw) => raw
            .parse::<u32>()
            .context("DSP2_TRANSACTIONS_PER_ACCOUNT must be a positive integer")?,
        Err(_) => 10,
    };

    let client = Dsp2Client::connect(&config)
        .await
        .context("connecting to the DSP2 API")?;
    let data = client
        .get_full_user_data(transactions_per_account)
        .await
        .context("fetching user data")?;

    println!("{}", serde_json::to_string_pretty(&data)?);
    Ok(())
}
