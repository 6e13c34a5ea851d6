//! Infrastructure layer: everything that touches sockets or files.

pub mod config_file;
pub mod outbound;
pub mod ws_server;

pub use config_file::{load_config, ConfigError, FileConfig};
pub use outbound::{ChannelSink, Outbound};
pub use ws_server::{bind, run_server, serve};
