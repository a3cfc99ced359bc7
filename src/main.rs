use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use rust_ofp_bridge::bridge::{IpcBridge, QueueBridge};
use rust_ofp_bridge::config::{Cli, IpcSide, Mode};
use rust_ofp_bridge::learning_switch::LearningSwitch;
use rust_ofp_bridge::logging;
use rust_ofp_bridge::ofp_controller::{ControllerSession, SessionVariant};
use rust_ofp_bridge::transport::Endpoint;

/// Open `endpoint` and run one session over it on a dedicated thread.
fn serve<V>(name: &str, endpoint: Endpoint, variant: V) -> Result<JoinHandle<()>>
    where V: SessionVariant + Send + 'static
{
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let stream = match endpoint.open() {
                Ok(stream) => stream,
                Err(e) => {
                    error!("{}", e);
                    return;
                }
            };
            let mut session = ControllerSession::new(stream, variant);
            if let Err(e) = session.run() {
                info!("Session on {} ended: {}", endpoint, e);
            }
        })
        .with_context(|| format!("cannot start {} session", name))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_config.as_deref(), &cli.log_file(), cli.level())?;
    info!("rust_ofp_controller starting");

    let sessions = match cli.mode {
        Mode::LearningSwitch { connection } => {
            vec![serve("learning-switch", connection, LearningSwitch)?]
        }
        Mode::QueueBridge { capture, inject, capacity, tap_name } => {
            let (capturing, injecting) = QueueBridge::pair(capacity, &tap_name);
            vec![serve("capture", capture, capturing)?, serve("inject", inject, injecting)?]
        }
        Mode::IpcBridge { side: IpcSide::Capture { connection, ipc_socket } } => {
            let bridge = IpcBridge::capture(&ipc_socket)
                .with_context(|| format!("cannot open bridge socket {}", ipc_socket.display()))?;
            vec![serve("ipc-capture", connection, bridge)?]
        }
        Mode::IpcBridge { side: IpcSide::Inject { connection, ipc_socket, tap_name } } => {
            let bridge = IpcBridge::inject(&ipc_socket, &tap_name)
                .with_context(|| format!("cannot bind bridge socket {}", ipc_socket.display()))?;
            vec![serve("ipc-inject", connection, bridge)?]
        }
    };

    for session in sessions {
        if session.join().is_err() {
            error!("Session thread panicked");
        }
    }
    info!("rust_ofp_controller stopped");
    Ok(())
}
