use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;

use crate::bridge::{DEFAULT_QUEUE_CAPACITY, DEFAULT_TAP_NAME};
use crate::logging::{level_for, log_file_name};
use crate::transport::Endpoint;

#[derive(Parser, Debug)]
#[command(name = "rust_ofp_controller")]
#[command(about = "OpenFlow 1.0 learning-switch controller with switch bridging", version)]
pub struct Cli {
    /// Raise log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// log4rs YAML configuration, replacing the built-in console and file loggers
    #[arg(long, global = true)]
    pub log_config: Option<PathBuf>,

    /// Log file, by default named after the switch connection
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub mode: Mode,
}

#[derive(Subcommand, Debug)]
pub enum Mode {
    /// Control one switch as a MAC-learning switch
    LearningSwitch {
        /// tcp:IP[:PORT], ptcp:[PORT][:IP], unix:FILE or punix:FILE
        connection: Endpoint,
    },
    /// Control two switches, injecting frames captured on the first into the second
    QueueBridge {
        capture: Endpoint,
        inject: Endpoint,
        /// Frames held between the two switches before new ones are dropped
        #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
        capacity: usize,
        #[arg(long, default_value = DEFAULT_TAP_NAME)]
        tap_name: String,
    },
    /// Control one side of a switch pair bridged through a Unix datagram socket
    IpcBridge {
        #[command(subcommand)]
        side: IpcSide,
    },
}

#[derive(Subcommand, Debug)]
pub enum IpcSide {
    /// Send captured frames to the socket
    Capture {
        connection: Endpoint,
        #[arg(long)]
        ipc_socket: PathBuf,
    },
    /// Bind the socket and inject what arrives on it
    Inject {
        connection: Endpoint,
        #[arg(long)]
        ipc_socket: PathBuf,
        #[arg(long, default_value = DEFAULT_TAP_NAME)]
        tap_name: String,
    },
}

impl Cli {
    pub fn level(&self) -> LevelFilter {
        level_for(self.verbose)
    }

    /// The switch connection the log file is named after.
    pub fn primary_connection(&self) -> &Endpoint {
        match self.mode {
            Mode::LearningSwitch { ref connection } => connection,
            Mode::QueueBridge { ref capture, .. } => capture,
            Mode::IpcBridge { side: IpcSide::Capture { ref connection, .. } } |
            Mode::IpcBridge { side: IpcSide::Inject { ref connection, .. } } => connection,
        }
    }

    pub fn log_file(&self) -> PathBuf {
        match self.log_file {
            Some(ref path) => path.clone(),
            None => PathBuf::from(log_file_name(&self.primary_connection().to_string())),
        }
    }
}
