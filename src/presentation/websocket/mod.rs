//! WebSocket Hub
//!
//! Live connections: the session registry, the per-connection pumps and the
//! frame types they exchange.

pub mod handler;
pub mod messages;
pub mod registry;
pub mod session;

pub use handler::ws_handler;
pub use messages::{InboundEvent, OutboundEvent};
pub use registry::{PushError, SessionHandle, SessionRegistry};
pub use session::{run_session, SessionContext};
