//! `search`

use clap::Args;

use super::{output, time, Cli};
use crate::types::error::Result;
use crate::types::{MessageFormat, SearchOptions};

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search query
    #[arg(required = true)]
    query: Vec<String>,

    /// Only include messages from the last N days
    #[arg(long, default_value_t = 0)]
    days: u32,

    /// Max number of results
    #[arg(long, default_value_t = 50)]
    limit: usize,

    /// Only search within a thread (room ID)
    #[arg(long)]
    thread: Option<String>,

    /// Filter by account/platform ID
    #[arg(long)]
    account: Option<String>,

    /// Include N messages before/after the match
    #[arg(long, default_value_t = 0)]
    context: usize,

    /// Context time window (e.g. 60m)
    #[arg(long)]
    window: Option<String>,

    /// Message format: plain|rich
    #[arg(long, default_value = "rich")]
    format: MessageFormat,
}

pub fn run(cli: &Cli, args: &SearchArgs) -> Result<()> {
    let window = time::parse_window(args.window.as_deref())?;

    let (store, _) = cli.open_store()?;
    let results = store.search_messages(&SearchOptions {
        query: args.query.join(" "),
        thread_id: args.thread.clone(),
        account_id: args.account.clone(),
        days: args.days,
        limit: args.limit,
        context: args.context,
        window,
        format: args.format,
    })?;

    if cli.json {
        return output::write_json(&results);
    }

    println!("TIME\tACCOUNT\tTHREAD\tSENDER\tTEXT\tSCORE");
    for result in &results {
        let matched = &result.matched;
        let sender = matched.sender_name.as_deref().unwrap_or(&matched.sender_id);
        println!(
            "{}\t{}\t{}\t{}\t{}\t{:.2}",
            output::format_time(Some(matched.timestamp)),
            output::safe_opt(matched.account_id.as_deref()),
            output::safe_opt(matched.thread_name.as_deref()),
            sender,
            matched.text,
            matched.score.unwrap_or(0.0)
        );

        for context in &result.context {
            let sender = context.sender_name.as_deref().unwrap_or(&context.sender_id);
            println!(
                "  {}\t{}\t{}\t{}\t{}\t",
                output::format_time(Some(context.timestamp)),
                output::safe_opt(context.account_id.as_deref()),
                output::safe_opt(context.thread_name.as_deref()),
                sender,
                context.text
            );
        }
    }
    Ok(())
}
