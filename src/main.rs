use clap::Parser;
use vocab_sync::{CliArgs, LoggingConfig, RunOutcome, SyncConfig, init_logging, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logging_config = LoggingConfig::from_env();
    let _guard = init_logging(logging_config)?;

    let cli = CliArgs::parse();
    let config = SyncConfig::from_args(cli)?;

    // Fail before any request is sent
    config.validate()?;

    let outcome = run(&config).await?;
    match &outcome {
        RunOutcome::ListIds { ids } => {
            for id in ids {
                println!("{id}");
            }
        }
        other => println!("{}", serde_json::to_string_pretty(other)?),
    }

    Ok(())
}
