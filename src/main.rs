//! Analyzer CLI entry point.

use clap::Parser;

use analyzer::cli::commands::{builtin, run, serve, tools};
use analyzer::cli::{handle_error, Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => serve::execute(args, cli.json).await,
        Commands::Run(args) => run::execute(args, cli.json).await,
        Commands::Tools(args) => tools::execute(args, cli.json).await,
        Commands::Index(args) => builtin::index(args, cli.json).await,
        Commands::Report(args) => builtin::report(args, cli.json).await,
    };

    if let Err(err) = result {
        handle_error(err, cli.json);
    }
}
