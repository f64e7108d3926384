//! WebSocket transport adapter and the per-socket echo session.

pub mod session;
pub mod transport;

pub use session::{SessionContext, run_echo_session};
pub use transport::WsTransport;
