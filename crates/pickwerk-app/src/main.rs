// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pickwerk command line.
//
// Entry point. Initialises logging, then probes or drives the picker through
// the same session API an embedding host uses.

mod output;

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use futures_util::stream::StreamExt;

use pickwerk_picker::{PickerEvent, PickerSession, SessionError};

/// Pickwerk: system content picker bridge
#[derive(Parser, Debug)]
#[command(name = "pickwerk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Probe and drive the native screen content picker")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report whether the native picker is available.
    Probe,

    /// Present the picker and print the first outcome.
    Pick {
        /// Use the mock backend (canned display and window selection).
        #[arg(long)]
        mock: bool,

        /// Give up and cancel after this many milliseconds.
        #[arg(long, value_name = "N")]
        timeout_ms: Option<u64>,

        /// Print the raw event envelope instead of a summary.
        #[arg(long)]
        json: bool,
    },
}

/// Exit statuses for `pick`.
const EXIT_CANCELLED: u8 = 1;
const EXIT_FAILED: u8 = 2;
const EXIT_TIMED_OUT: u8 = 3;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Probe => probe(),
        Command::Pick {
            mock,
            timeout_ms,
            json,
        } => match pick(mock, timeout_ms.map(Duration::from_millis), json).await {
            Ok(code) => code,
            Err(e) => {
                tracing::error!(error = %e, "pick failed");
                eprintln!("error: {e}");
                ExitCode::from(EXIT_FAILED)
            }
        },
    }
}

fn probe() -> ExitCode {
    let available = pickwerk_picker::available();
    println!("{}", if available { "available" } else { "unavailable" });
    if available {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILED)
    }
}

async fn pick(mock: bool, timeout: Option<Duration>, json: bool) -> Result<ExitCode, SessionError> {
    let session = if mock {
        PickerSession::new_mock()?
    } else {
        PickerSession::new()?
    };
    let mut events = session.listen();
    session.launch()?;
    tracing::info!(mock, "picker launched");

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, events.next()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                session.stop();
                tracing::warn!(timeout_ms = limit.as_millis() as u64, "no picker outcome in time");
                eprintln!("timed out");
                return Ok(ExitCode::from(EXIT_TIMED_OUT));
            }
        },
        None => events.next().await,
    };

    let Some(event) = outcome else {
        eprintln!("picker closed without an outcome");
        return Ok(ExitCode::from(EXIT_FAILED));
    };

    if json {
        println!("{}", pickwerk_core::envelope::encode(&event)?);
    } else {
        print!("{}", output::summary(&event));
    }

    Ok(match event {
        PickerEvent::Selection { .. } => ExitCode::SUCCESS,
        PickerEvent::Cancelled => ExitCode::from(EXIT_CANCELLED),
        PickerEvent::Error { .. } => ExitCode::from(EXIT_FAILED),
    })
}
