use clap::Parser;

mod client;
mod commands;
mod compiler;
mod core;
mod loader;
mod property;
mod script;
mod syntax;

use commands::Commands;
use core::error::DothttpError;
use core::exit_code::ExitCode;
use core::logger::{LogLevel, Logger};

#[derive(Parser)]
#[command(name = "dothttp")]
#[command(about = "Runs requests written in the dothttp request language.")]
#[command(version = crate::core::version::app_version())]
struct Args {
    #[arg(short, long, help = "Enable debug logging", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Parser)]
#[command(name = "dothttp")]
#[command(about = "Runs requests written in the dothttp request language.")]
#[command(version = crate::core::version::app_version())]
struct DefaultArgs {
    #[arg(short, long, help = "Enable debug logging and source positions in errors")]
    debug: bool,
    #[command(flatten)]
    run_args: commands::run::RunArgs,
}

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();
    let is_subcommand = args.len() > 1 && (args[1] == "server" || args[1] == "help");

    let (debug, result) = if is_subcommand {
        let args = Args::parse();
        Logger::init(LogLevel::from_flags(false, args.debug));
        let result = match args.command {
            Some(Commands::Server(server_args)) => {
                commands::server::execute_server(&server_args).await
            }
            None => Ok(()),
        };
        (args.debug, result)
    } else {
        let default_args = DefaultArgs::parse();
        Logger::init(LogLevel::from_flags(
            default_args.run_args.info,
            default_args.debug,
        ));
        let result = commands::run::execute_run(&default_args.run_args).await;
        (default_args.debug, result)
    };

    if let Err(e) = result {
        report(&e, debug);
        std::process::exit(ExitCode::from(&e).code());
    }
}

fn report(error: &DothttpError, debug: bool) {
    eprintln!("Error: {error}");
    if debug {
        if let Some(hint) = error.position_hint() {
            eprintln!("  {hint}");
        }
    }
}
