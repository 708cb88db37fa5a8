use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    // Logs go to stderr so tables and JSON stay pipeable.
    // Override with RUST_LOG.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("beeline=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = beeline::cli::Cli::parse();
    if let Err(err) = cli.run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
