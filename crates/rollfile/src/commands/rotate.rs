//! Rotate command implementation

use anyhow::{Context, Result};
use rollfile_logs::Logger;
use std::time::Duration;

use crate::cli::LoggerArgs;
use crate::output::{print_info, print_success};

/// Upper bound on waiting for retention and compression to finish
const BACKGROUND_GRACE: Duration = Duration::from_secs(30);

pub async fn execute(args: LoggerArgs) -> Result<()> {
    let config = super::current_config(&args)?;
    let logger = Logger::new(config)?;

    logger
        .rotate()
        .with_context(|| format!("Failed to rotate {}", logger.path().display()))?;
    logger.close()?;

    if !logger.wait_for_background(BACKGROUND_GRACE) {
        print_info("Background cleanup is still running");
    }
    print_success(&format!("Rotated {}", logger.path().display()));
    Ok(())
}
