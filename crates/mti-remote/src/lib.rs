//! # MTi Remote
//!
//! 把航向缓存通过持久连接暴露给其他进程。
//!
//! ```text
//! RemoteCompass ──TCP (行分隔 JSON)──▶ HeadingServer
//!                                        ├─ accept 线程
//!                                        └─ 每连接一个 ConnectionSession 线程
//!                                              └─ CommandRegistry ─▶ HeadingSource
//! ```
//!
//! # Example
//!
//! ```no_run
//! use mti_driver::HeadingCache;
//! use mti_remote::{ClientConfig, CommandRegistry, HeadingServer, RemoteCompass, ServerConfig};
//! use std::sync::Arc;
//!
//! let cache = Arc::new(HeadingCache::new());
//! let server = HeadingServer::bind(ServerConfig::default(), CommandRegistry::with_heading(cache))
//!     .unwrap()
//!     .spawn()
//!     .unwrap();
//!
//! let config = ClientConfig::new(server.local_addr().to_string());
//! let client = RemoteCompass::connect(&config).unwrap();
//! let heading = client.heading().unwrap();
//! # let _ = heading;
//! ```

mod client;
mod error;
mod registry;
mod server;
pub mod session;
mod stats;
pub mod transport;

pub use client::{ClientConfig, RemoteCompass};
pub use error::{RemoteError, ServerError, TransportError};
pub use registry::{CommandHandler, CommandRegistry};
pub use server::{HeadingServer, ServerConfig, ServerHandle};
pub use session::{ConnectionSession, SessionEnd, SessionState};
pub use stats::{ServerStats, ServerStatsSnapshot};
pub use transport::{Inbound, MessageTransport, TcpLineTransport};
