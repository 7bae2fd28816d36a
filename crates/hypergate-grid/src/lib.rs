//! Region linking for the Hypergate federation plane.
//!
//! Registers remote grids' regions into this grid's coordinate space as
//! hyperlinks: the persisted region directory, the gatekeeper-connector
//! seam used for the remote link handshake, and the linker that drives
//! link/unlink and enforces the coordinate-space distance limit imposed
//! by client map addressing.

pub mod directory;
pub mod gatekeeper;
pub mod linker;

pub use directory::{DirectoryError, RegionDirectory};
pub use gatekeeper::{GatekeeperConnector, GatekeeperHttpClient, LinkReply};
pub use linker::{HypergridLinker, LinkError};
