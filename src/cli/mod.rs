//! Command-line surface
//!
//! Thin handlers over the store: each subcommand opens a session, runs one
//! operation, and renders the result as a table or pretty JSON.

pub mod db;
pub mod messages;
pub mod output;
pub mod search;
pub mod threads;
pub mod time;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::adapters::sqlite::Store;
use crate::config;
use crate::types::error::Result;
use crate::types::StoreOptions;

#[derive(Debug, Parser)]
#[command(
    name = "beeline",
    version,
    about = "Read-only CLI for local Beeper chats",
    long_about = "Read-only access to local Beeper SQLite data, including threads, messages, and search."
)]
pub struct Cli {
    /// Path to Beeper index.db (or set BEEPER_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable megabridge name lookups
    #[arg(long = "no-bridge", global = true)]
    pub no_bridge: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and inspect conversations
    Threads {
        #[command(subcommand)]
        command: threads::ThreadsCommand,
    },
    /// Read messages from a conversation
    Messages {
        #[command(subcommand)]
        command: messages::MessagesCommand,
    },
    /// Full-text search across messages
    Search(search::SearchArgs),
    /// Database helpers
    Db {
        #[command(subcommand)]
        command: db::DbCommand,
    },
}

impl Cli {
    pub fn run(&self) -> Result<()> {
        match &self.command {
            Command::Threads { command } => threads::run(self, command),
            Command::Messages { command } => messages::run(self, command),
            Command::Search(args) => search::run(self, args),
            Command::Db { command } => db::run(self, command),
        }
    }

    /// Resolve the database path and open a store session.
    pub(crate) fn open_store(&self) -> Result<(Store, PathBuf)> {
        let path = config::resolve_db_path(self.db.as_deref())?;
        let store = Store::open_with_options(
            &path,
            StoreOptions {
                bridge_lookup: !self.no_bridge,
                bridge_root: None,
            },
        )?;
        Ok((store, path))
    }
}
