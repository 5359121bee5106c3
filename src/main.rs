use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "domtag-tools")]
#[command(about = "DOM tagging browser automation server for LLM agents (MCP over stdio)")]
#[command(version)]
struct Cli {
    /// Run the browser headless (default)
    #[arg(long, conflicts_with = "headed")]
    headless: bool,

    /// Run the browser with a visible window
    #[arg(long)]
    headed: bool,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    // stdout carries the MCP protocol; logs go to stderr
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    if cli.headless {
        std::env::set_var("DOMTAG_HEADLESS", "true");
    }
    if cli.headed {
        std::env::set_var("DOMTAG_HEADLESS", "false");
    }

    domtag_agent::mcp::run_server().await
}
