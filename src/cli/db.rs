//! `db info`

use std::path::PathBuf;

use clap::Subcommand;
use serde::Serialize;

use super::{output, Cli};
use crate::types::error::Result;

#[derive(Debug, Subcommand)]
pub enum DbCommand {
    /// Show resolved DB path and capabilities
    Info,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DbInfo {
    path: PathBuf,
    has_fts: bool,
    read_only: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bridge_dbs: Vec<PathBuf>,
}

pub fn run(cli: &Cli, command: &DbCommand) -> Result<()> {
    match command {
        DbCommand::Info => info(cli),
    }
}

fn info(cli: &Cli) -> Result<()> {
    let (store, path) = cli.open_store()?;

    let info = DbInfo {
        path,
        has_fts: store.has_fts()?,
        read_only: true,
        bridge_dbs: store.bridge_dbs(),
    };

    if cli.json {
        return output::write_json(&info);
    }

    println!("Path: {}", info.path.display());
    println!("FTS: {}", info.has_fts);
    println!("Read-only: {}", info.read_only);
    if !info.bridge_dbs.is_empty() {
        println!("Bridge DBs: {}", info.bridge_dbs.len());
    }
    Ok(())
}
