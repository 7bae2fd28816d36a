//! Cross-grid login protocol for the Hypergate federation plane.
//!
//! Implements both roles of the handshake that hands an authenticated
//! session from a home grid to a destination grid: the client connector
//! that ships an encoded circuit record over HTTP, and the server-side
//! processing that decodes it and asks the local acceptance policy whether
//! the visitor may enter. The companion keyed-parameter calls (home-region
//! lookup, agent/client verification, logout) and the live-session table
//! that backs them on the home side live here as well.
//!
//! Federation is bilateral and single-attempt: every outbound call has a
//! bounded timeout, never retries, and surfaces failure as a boolean plus
//! a human-readable reason. No error type in this crate crosses the
//! federation boundary.

pub mod client;
pub mod handshake;
pub mod session;

pub use client::{decode_login_response, LoginOutcome, UserAgentClient};
pub use handshake::{process_home_agent, AgentTransferPolicy, HandshakeError, HomeAgentResponse};
pub use session::{LiveSession, SessionTable};

use std::time::Duration;

/// Per-call timeout for every outbound federation request. Callers that
/// give up must treat an in-flight call as abandoned, not aborted.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
