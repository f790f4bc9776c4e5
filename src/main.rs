mod api;
mod cli;
mod config;
mod error;
mod playback;
mod player;
mod shutdown;
mod streaming;
mod ui;

use std::fs::{self, File, OpenOptions};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use tracing_subscriber::{
    fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

use crate::cli::Cli;
use crate::error::Result;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.interactive);

    if cli.interactive {
        return cli::commands::interactive().await;
    }

    match cli.query() {
        Some(query) => cli::commands::play(query, cli.username, cli.password).await,
        None => {
            Cli::command().print_help()?;
            println!();
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Log to stderr, or to a file while the terminal UI is drawing
fn init_tracing(interactive: bool) {
    let log_file = if interactive { open_log_file() } else { None };
    let (writer, ansi) = match log_file {
        Some(file) => (BoxMakeWriter::new(Arc::new(file)), false),
        None => (BoxMakeWriter::new(std::io::stderr), true),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .init();
}

fn open_log_file() -> Option<File> {
    let path = config::log_path();
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).ok()?;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}
