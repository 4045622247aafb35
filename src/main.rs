//! dev-serve - serve the current directory with HTTPS and live reload.
//!
//! Entry point: parses arguments, initializes logging, runs the server, and
//! renders any escaping error through miette before exiting non-zero.

use clap::Parser;
use dev_serve::{cli, commands, error, logger, ui};
use miette::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    logger::init_logger(args.verbose, args.quiet, args.no_color);
    ui::init_colors();

    commands::serve_execute(args).await.map_err(error::to_miette)
}
