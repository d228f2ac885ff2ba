use std::io;

use crate::{
    config,
    network,
    protocol::{codec, session},
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connect to lobby server error: {0}")]
    Connect(#[source] io::Error),
    #[error("Connection lost: {0}")]
    ConnectionLost(#[from] network::Error),
    #[error("Already connected or connecting")]
    AlreadyConnected,
    #[error("Not connected")]
    NotConnected,
    #[error("Handshake timed out")]
    HandshakeTimeout,
    #[error("Codec error: {0}")]
    Codec(#[from] codec::Error),
    #[error("Session error: {0}")]
    Session(#[from] session::Error),
    #[error("Config error: {0}")]
    Config(#[from] config::Error),
}
