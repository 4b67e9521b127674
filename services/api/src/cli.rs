use crate::report::{run_roster_report, run_score, RosterArgs, ScoreArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use mentors_eye::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Mentor's Eye",
    about = "Score student dropout risk from the command line or over HTTP",
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
    /// Score a single student record stored as JSON
    Score(ScoreArgs),
    /// Rank every student in a CSV export by current risk
    Roster(RosterArgs),
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
        Command::Score(args) => run_score(args),
        Command::Roster(args) => run_roster_report(args),
    }
}
