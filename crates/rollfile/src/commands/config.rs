//! Config command implementation

use anyhow::Result;

use crate::cli::LoggerArgs;

pub async fn execute(args: LoggerArgs) -> Result<()> {
    let mut config = super::current_config(&args)?;
    config.filename = Some(config.path());
    config.max_size = config.effective_max_size();

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
