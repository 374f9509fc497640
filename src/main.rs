//! Teleop GW - robot teleoperation gateway
//!
//! Drives a differential-drive robot from gamepad, slider, or keyboard
//! input over a pub/sub broker link.

use anyhow::Result;
use clap::Parser;
use colored::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use teleop_gw::cli::{self, OperatorCommand};
use teleop_gw::config::AppConfig;
use teleop_gw::control::{ControlSession, SessionMode};
use teleop_gw::input::gamepad::{GamepadSource, InputEvent};
use teleop_gw::playback;
use teleop_gw::transport::{ConnectionStatus, ConsoleTransport, Transport, WsTransport};

/// Teleop Gateway - drive a robot from gamepad, sliders, or keyboard
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Broker URL override (e.g. ws://rover.local:9001)
    #[arg(long)]
    broker: Option<String>,

    /// Log publishes to the console instead of a broker
    #[arg(long)]
    dry_run: bool,

    /// Disable the gamepad input source
    #[arg(long)]
    no_gamepad: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level)?;

    info!("Starting Teleop GW...");
    info!("Configuration file: {}", args.config);

    let config = AppConfig::load(&args.config).await?;

    // Build the transport
    let transport: Arc<dyn Transport> = if args.dry_run {
        Arc::new(ConsoleTransport::new())
    } else {
        let url = args.broker.clone().unwrap_or_else(|| config.broker_url());
        info!("Broker: {} (topic {})", url, config.broker.topic);
        Arc::new(WsTransport::new(url, config.connect_timeout()))
    };

    // Surface link drops to the main loop so the session can react
    let (status_tx, status_rx) = mpsc::unbounded_channel::<ConnectionStatus>();
    transport.subscribe_status(Arc::new(move |status| {
        let _ = status_tx.send(status);
    }));

    // Initial connection is best-effort; the operator can `connect` later
    if let Err(e) = transport.connect().await {
        warn!("Initial connection failed: {} (use 'connect' to retry)", e);
    }

    let session = ControlSession::new(&config);

    // Gamepad input source
    let gamepad_enabled = config.gamepad.enabled && !args.no_gamepad;
    let (gamepad, input_rx) = if gamepad_enabled {
        let (source, rx) = GamepadSource::start(config.gamepad.deadzone)?;
        (Some(source), Some(rx))
    } else {
        info!("Gamepad input disabled");
        (None, None)
    };

    // Operator REPL on its own thread
    let (op_tx, op_rx) = mpsc::channel::<OperatorCommand>(64);
    std::thread::spawn(move || {
        if let Err(e) = cli::run_repl(op_tx) {
            warn!("REPL failed: {}", e);
        }
    });

    run_loop(session, transport.clone(), &config, input_rx, op_rx, status_rx).await?;

    // Cleanup
    info!("Shutting down...");
    if let Some(gamepad) = gamepad {
        gamepad.shutdown().await;
    }
    transport.shutdown().await;
    info!("Teleop GW shutdown complete");

    Ok(())
}

async fn run_loop(
    mut session: ControlSession,
    transport: Arc<dyn Transport>,
    config: &AppConfig,
    input_rx: Option<mpsc::UnboundedReceiver<InputEvent>>,
    mut op_rx: mpsc::Receiver<OperatorCommand>,
    mut status_rx: mpsc::UnboundedReceiver<ConnectionStatus>,
) -> Result<()> {
    let mut tick = tokio::time::interval(config.tick_interval());
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // A closed/absent gamepad channel must not wake the loop in a spin
    let mut input_rx = input_rx;
    let (playback_done_tx, mut playback_done_rx) = mpsc::channel::<()>(1);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    info!("Ready to drive");

    loop {
        tokio::select! {
            // Control tick: ramp + transmit
            _ = tick.tick() => {
                session.tick(transport.as_ref()).await;
            }

            // Gamepad events
            Some(event) = recv_input(&mut input_rx) => {
                match event {
                    InputEvent::Stick(input) => session.set_stick(input),
                    InputEvent::Zero => session.zero(),
                }
            }

            // Operator commands from the REPL
            Some(command) = op_rx.recv() => {
                if handle_operator_command(
                    command,
                    &mut session,
                    &transport,
                    &playback_done_tx,
                ).await {
                    break;
                }
            }

            // Playback task finished
            Some(()) = playback_done_rx.recv() => {
                session.playback_finished();
            }

            // Link status changes
            Some(status) = status_rx.recv() => {
                if status == ConnectionStatus::Disconnected {
                    warn!("⚠️  Link lost, zeroing velocity");
                    session.handle_disconnect();
                }
            }

            // Shutdown signal
            _ = &mut shutdown => {
                break;
            }
        }
    }

    // Best-effort halt before the link goes away
    session.zero();
    session.tick(transport.as_ref()).await;

    Ok(())
}

async fn recv_input(rx: &mut Option<mpsc::UnboundedReceiver<InputEvent>>) -> Option<InputEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Apply one operator command. Returns true when the loop should exit.
async fn handle_operator_command(
    command: OperatorCommand,
    session: &mut ControlSession,
    transport: &Arc<dyn Transport>,
    playback_done_tx: &mpsc::Sender<()>,
) -> bool {
    match command {
        OperatorCommand::Key(key) => session.apply_key(key),
        OperatorCommand::Zero => session.zero(),
        OperatorCommand::SetMaxLinear(v) => {
            session.set_max_linear(v);
            info!("Max linear velocity: {}", v);
        }
        OperatorCommand::SetMaxAngular(v) => {
            session.set_max_angular(v);
            info!("Max angular velocity: {}", v);
        }
        OperatorCommand::InvertLinear => {
            let inverted = session.toggle_invert_linear();
            info!("Linear axis inverted: {}", inverted);
        }
        OperatorCommand::InvertAngular => {
            let inverted = session.toggle_invert_angular();
            info!("Angular axis inverted: {}", inverted);
        }
        OperatorCommand::Reconnect => {
            if let Err(e) = transport.reconnect().await {
                warn!("Reconnect failed: {}", e);
            }
        }
        OperatorCommand::Status => print_status(session, transport.as_ref()),
        OperatorCommand::Record => match session.mode() {
            SessionMode::Recording => session.stop_recording(),
            _ => session.start_recording(),
        },
        OperatorCommand::Play => {
            if let Some((steps, stop)) = session.begin_playback() {
                let transport = Arc::clone(transport);
                let topic = session.topic().to_string();
                let done = playback_done_tx.clone();
                tokio::spawn(async move {
                    playback::play(steps, transport, topic, stop).await;
                    let _ = done.send(()).await;
                });
            }
        }
        OperatorCommand::StopPlayback => session.stop_playback(),
        OperatorCommand::Clear => session.clear_recording(),
        OperatorCommand::Legacy(cmd) => session.send_legacy(cmd, transport.as_ref()).await,
        // Handled inside the REPL thread
        OperatorCommand::Help => {}
        OperatorCommand::Quit => return true,
    }

    false
}

fn print_status(session: &ControlSession, transport: &dyn Transport) {
    let snap = session.snapshot();
    let status = transport.status();

    let status_str = match status {
        ConnectionStatus::Connected => "connected".green(),
        ConnectionStatus::Connecting => "connecting".yellow(),
        ConnectionStatus::Disconnected => "disconnected".red(),
    };

    println!("\n{}", "=== Session ===".bold().cyan());
    println!("  Link:     {} ({})", status_str, transport.name());
    println!("  Mode:     {}", snap.mode.to_string().yellow());
    println!(
        "  Target:   linear {:+.2}  angular {:+.2}",
        snap.target_linear, snap.target_angular
    );
    println!(
        "  Actual:   linear {:+.2}  angular {:+.2}",
        snap.actual.linear, snap.actual.angular
    );
    println!(
        "  Proxy:    linear {:+.2}  angular {:+.2}",
        snap.linear_proxy, snap.angular_proxy
    );
    println!(
        "  Bounds:   linear {:.2}  angular {:.2}",
        snap.max_linear, snap.max_angular
    );
    println!(
        "  Invert:   linear {}  angular {}",
        snap.invert_linear, snap.invert_angular
    );
    println!("  Recorded: {} steps\n", snap.recorded_steps);
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}
