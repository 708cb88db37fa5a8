//! `messages list`

use clap::{Args, Subcommand};

use super::{output, time, Cli};
use crate::types::error::{BeelineError, Result};
use crate::types::{MessageFormat, MessageListOptions};

#[derive(Debug, Subcommand)]
pub enum MessagesCommand {
    /// List recent messages in a thread
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Thread ID (room ID)
    thread_id: Option<String>,

    /// Thread ID (room ID)
    #[arg(long)]
    thread: Option<String>,

    /// Max number of messages to return
    #[arg(long, default_value_t = 50)]
    limit: usize,

    /// Only include messages from the last N days
    #[arg(long, default_value_t = 0)]
    days: u32,

    /// Only include messages after this RFC3339 timestamp
    #[arg(long)]
    after: Option<String>,

    /// Only include messages before this RFC3339 timestamp
    #[arg(long)]
    before: Option<String>,

    /// Message format: plain|rich
    #[arg(long, default_value = "rich")]
    format: MessageFormat,
}

pub fn run(cli: &Cli, command: &MessagesCommand) -> Result<()> {
    match command {
        MessagesCommand::List(args) => list(cli, args),
    }
}

fn list(cli: &Cli, args: &ListArgs) -> Result<()> {
    let thread_id = args
        .thread
        .as_deref()
        .or(args.thread_id.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| BeelineError::InvalidArgument("thread ID is required".to_string()))?;

    let after = time::parse_time_flag(args.after.as_deref(), args.days)?;
    let before = time::parse_time_flag(args.before.as_deref(), 0)?;

    let (store, _) = cli.open_store()?;
    let messages = store.list_messages(&MessageListOptions {
        thread_id: thread_id.to_string(),
        limit: args.limit,
        after,
        before,
        format: args.format,
    })?;

    if cli.json {
        return output::write_json(&messages);
    }

    println!("TIME\tSENDER\tTEXT");
    for message in &messages {
        let sender = message
            .sender_name
            .as_deref()
            .unwrap_or(&message.sender_id);
        println!(
            "{}\t{}\t{}",
            output::format_time(Some(message.timestamp)),
            sender,
            message.text
        );
    }
    Ok(())
}
