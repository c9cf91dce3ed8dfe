//! List command implementation

use anyhow::{Context, Result};
use rollfile_logs::{scan_backups, BackupNamer};
use std::io;

use crate::cli::ListArgs;
use crate::output::print_backup_table;

pub async fn execute(args: ListArgs) -> Result<()> {
    let config = super::current_config(&args.logger)?;
    let path = config.path();
    let namer = BackupNamer::for_path(&path, config.local_time);

    let entries = match scan_backups(&path, &namer) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to scan backups of {}", path.display()))
        }
    };

    print_backup_table(&entries, args.json);
    Ok(())
}
