use crate::commands::{run_calendar, run_strategy, CalendarArgs, StrategyArgs};
use crate::server;
use cheongyak::error::AppError;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "cheongyak",
    about = "Weekly housing-subscription calendar and recommendation service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Scrape this week's notices and write them as an iCalendar feed
    Calendar(CalendarArgs),
    /// Rank this week's notices for the given applicant profile
    Strategy(StrategyArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Calendar(args) => run_calendar(args).await,
        Command::Strategy(args) => run_strategy(args).await,
    }
}
