//! Pipe command implementation

use anyhow::{Context, Result};
use rollfile_logs::{Error, Logger};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

use crate::cli::PipeArgs;
use crate::output::{print_error, print_info};

pub async fn execute(args: PipeArgs) -> Result<()> {
    let config = super::current_config(&args.logger)?;
    let logger = Logger::new(config)?;
    info!("Writing stdin to {}", logger.path().display());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut count: u64 = 0;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    debug!("End of input");
                    break;
                };
                if args.tee {
                    println!("{}", line);
                }

                let mut record = line.into_bytes();
                record.push(b'\n');
                match logger.write(&record) {
                    Ok(_) => count += 1,
                    // an oversize line is dropped, the rest still flow
                    Err(e @ Error::WriteTooLarge { .. }) => print_error(&e.to_string()),
                    Err(e) => return Err(e).context("Failed to write log line"),
                }
            }
            _ = &mut ctrl_c => {
                debug!("Interrupted");
                break;
            }
        }
    }

    logger.close()?;
    if !logger.wait_for_background(Duration::from_secs(args.grace)) {
        print_info("Background cleanup did not finish before exit");
    }
    info!("Wrote {} lines to {}", count, logger.path().display());
    Ok(())
}
