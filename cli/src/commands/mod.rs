pub mod run;
pub mod server;
pub mod shared;
pub mod validators;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    Server(server::ServerArgs),
}
