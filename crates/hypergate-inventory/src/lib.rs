//! Inventory routing for a federated grid.
//!
//! Every inventory call names an owner; the owner is either native to this
//! grid (served by the local backend) or a visitor whose inventory lives on
//! their home grid (served by a session-authenticated HTTP client pointed
//! at the `InventoryServerURI` their circuit carried in).

pub mod accounts;
pub mod local;
pub mod remote;
pub mod router;
pub mod types;

pub use accounts::SqlAccountLookup;
pub use local::{AccountLookup, LocalInventoryService};
pub use remote::RemoteInventoryClient;
pub use router::InventoryRouter;
pub use types::{folder_types, FolderContent, InventoryFolder, InventoryItem};
