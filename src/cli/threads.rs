//! `threads list` and `threads show`

use clap::{Args, Subcommand};

use super::{output, Cli};
use crate::types::error::{BeelineError, Result};
use crate::types::{MessageFormat, MessageListOptions, ThreadLabel, ThreadListOptions};

#[derive(Debug, Subcommand)]
pub enum ThreadsCommand {
    /// List threads ordered by last activity
    List(ListArgs),
    /// Show details for a single thread
    Show(ShowArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Only include threads active in the last N days
    #[arg(long, default_value_t = 0)]
    days: u32,

    /// Max number of threads to return
    #[arg(long, default_value_t = 50)]
    limit: usize,

    /// Filter by account/platform ID
    #[arg(long)]
    account: Option<String>,

    /// Filter by label: inbox|archive|favourite|unread|all
    #[arg(long, default_value = "all")]
    label: ThreadLabel,

    /// Include low-priority threads
    #[arg(long)]
    include_low_priority: bool,

    /// Include participants in JSON output
    #[arg(long)]
    with_participants: bool,

    /// Include message stats in JSON output
    #[arg(long)]
    with_stats: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Thread ID (room ID)
    thread_id: Option<String>,

    /// Thread ID (room ID)
    #[arg(long)]
    id: Option<String>,

    /// Include message stats
    #[arg(long)]
    with_stats: bool,

    /// Include last N messages
    #[arg(long, default_value_t = 0)]
    with_last: usize,

    /// Message format: plain|rich
    #[arg(long, default_value = "rich")]
    format: MessageFormat,
}

pub fn run(cli: &Cli, command: &ThreadsCommand) -> Result<()> {
    match command {
        ThreadsCommand::List(args) => list(cli, args),
        ThreadsCommand::Show(args) => show(cli, args),
    }
}

fn list(cli: &Cli, args: &ListArgs) -> Result<()> {
    let (store, _) = cli.open_store()?;

    let threads = store.list_threads(&ThreadListOptions {
        days: args.days,
        limit: args.limit,
        account_id: args.account.clone(),
        label: args.label,
        include_low_priority: args.include_low_priority,
        with_participants: args.with_participants,
        with_stats: args.with_stats,
    })?;

    if cli.json {
        return output::write_json(&threads);
    }

    println!("TIME\tACCOUNT\tTHREAD\tTHREAD_ID");
    for thread in &threads {
        println!(
            "{}\t{}\t{}\t{}",
            output::format_time(thread.last_activity),
            output::safe(&thread.account_id),
            output::safe(&thread.display_name),
            thread.id
        );
    }
    Ok(())
}

fn show(cli: &Cli, args: &ShowArgs) -> Result<()> {
    let thread_id = args
        .id
        .as_deref()
        .or(args.thread_id.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| BeelineError::InvalidArgument("thread ID is required".to_string()))?;

    let (store, _) = cli.open_store()?;
    let thread = store.get_thread(thread_id, args.with_stats)?;

    let messages = if args.with_last > 0 {
        Some(store.list_messages(&MessageListOptions {
            thread_id: thread_id.to_string(),
            limit: args.with_last,
            format: args.format,
            ..Default::default()
        })?)
    } else {
        None
    };

    if cli.json {
        return match messages {
            Some(messages) => output::write_json(&serde_json::json!({
                "thread": thread,
                "messages": messages,
            })),
            None => output::write_json(&thread),
        };
    }

    println!("FIELD\tVALUE");
    println!("ID\t{}", thread.id);
    println!("Account\t{}", output::safe(&thread.account_id));
    println!("Name\t{}", output::safe(&thread.display_name));
    println!("Type\t{}", output::safe_opt(thread.thread_type.as_deref()));
    println!("Last Activity\t{}", output::format_time(thread.last_activity));
    println!("Archived\t{}", thread.is_archived);
    println!("Low Priority\t{}", thread.is_low_priority);
    println!("Unread\t{}", thread.is_unread);
    println!("Unread Count\t{}", thread.unread_count);
    println!("Unread Mentions\t{}", thread.unread_mentions);
    if !thread.tags.is_empty() {
        println!("Tags\t{}", thread.tags.join(","));
    }

    if !thread.participants.is_empty() {
        println!();
        println!("Participants:");
        for participant in &thread.participants {
            let suffix = if participant.is_self { " (you)" } else { "" };
            println!("- {}{}", participant.name.trim(), suffix);
        }
    }

    if let Some(messages) = messages {
        println!();
        println!("Recent messages:");
        for message in &messages {
            let sender = message
                .sender_name
                .as_deref()
                .unwrap_or(&message.sender_id);
            println!(
                "- {} {}: {}",
                output::format_time(Some(message.timestamp)),
                sender,
                message.text
            );
        }
    }

    Ok(())
}
