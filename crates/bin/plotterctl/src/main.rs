//! # plotterctl: interactive plotter console
//!
//! Composition root that wires the session engine to a transport and reads
//! commands from stdin.
//!
//! ## Responsibilities
//! - Load configuration (`plotter.toml`, env vars)
//! - Initialize `tracing` diagnostics on stderr
//! - Construct the session engine over the port router (serial or simulated)
//! - Print the terminal log stream on stdout
//! - Turn console lines into intents until EOF, `:quit` or Ctrl-C
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer, no domain logic belongs here.

mod config;
mod console;
mod transport;

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

use plotter_app::services::PlotterSession;
use plotter_domain::session_config::SessionConfig;

use config::Config;
use console::Line;
use transport::PortRouter;

type Session = PlotterSession<PortRouter>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.logging.filter);

    let session = Arc::new(PlotterSession::new(
        PortRouter::default(),
        config.session_options(),
    ));
    session.set_workspace(config.workspace()?);

    let log = session.subscribe_log();
    tokio::spawn(async move {
        let mut log = std::pin::pin!(log);
        while let Some(record) = log.next().await {
            println!("{record}");
        }
    });

    if config.session.emulation {
        session.set_emulation(true).await;
    } else if config.session.auto_connect {
        // failure is already on the terminal log
        let _ = session.connect(config.serial.clone()).await;
    }

    eprintln!("plotterctl ready, :help for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !run_line(&session, &config.serial, &line).await {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    session.disconnect().await;
    tracing::info!("plotterctl stopped");
    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {filter:?}: {err}, falling back to info");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run one console line. Returns `false` when the console should exit.
async fn run_line(session: &Session, serial: &SessionConfig, line: &str) -> bool {
    let parsed = match console::parse(line) {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("{err}");
            return true;
        }
    };

    let intent = match parsed {
        Line::Empty => return true,
        Line::Quit => return false,
        Line::Help => {
            println!("{}", console::HELP);
            return true;
        }
        Line::State => {
            print_state(session);
            return true;
        }
        Line::Ports => {
            print_ports();
            return true;
        }
        Line::Connect(port) => {
            let mut config = serial.clone();
            if let Some(port) = port {
                config.port = port;
            }
            plotter_app::intent::Intent::Connect(config)
        }
        Line::Intent(intent) => intent,
    };

    if let Err(err) = session.handle(intent).await {
        tracing::debug!(%err, "intent failed");
        eprintln!("error: {err}");
    }
    true
}

fn print_state(session: &Session) {
    let state = session.snapshot();
    let workspace = session.workspace();
    println!(
        "mode={} {} pen={} motor={} marker={:?} workspace={}x{} µm",
        session.mode(),
        state.position,
        if state.pen_down { "down" } else { "up" },
        if state.motor_enabled { "on" } else { "off" },
        state.marker(),
        workspace.max_x,
        workspace.max_y,
    );
}

fn print_ports() {
    match plotter_adapter_serial::available_ports() {
        Ok(ports) if ports.is_empty() => println!("no serial ports found"),
        Ok(ports) => {
            for port in ports {
                println!("{}  ({})", port.name, port.description);
            }
        }
        Err(err) => eprintln!("error: cannot list serial ports: {err}"),
    }
    println!("{}  (simulated plotter)", plotter_adapter_virtual::VIRTUAL_PORT);
}
