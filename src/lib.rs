#![crate_name = "rust_ofp_bridge"]
#![crate_type = "lib"]

pub mod bridge;
pub mod config;
pub mod learning_switch;
pub mod logging;
pub mod ofp_controller;
pub mod ofp_header;
pub mod ofp_message;
pub mod ofp_utils;
pub mod openflow0x01;
pub mod packet;
pub mod transport;
