//! ircbot-channel-irc: IRC wire handling.
//!
//! - [`framer`] splits raw reads into protocol lines
//! - [`classifier`] maps a line to at most one [`IrcEvent`](ircbot_types::IrcEvent)
//! - [`commands`] builds outbound command lines
//! - [`transport`] abstracts the socket, with a tokio TCP implementation
//! - [`testing`] provides a scripted transport for driving the engine in tests

pub mod classifier;
pub mod commands;
pub mod framer;
pub mod testing;
pub mod transport;

pub use classifier::Classifier;
pub use framer::LineFramer;
pub use transport::{Readiness, TcpTransport, Transport, TransportError};
