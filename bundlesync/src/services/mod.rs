//! Collaborator contracts the resolver consumes.
//!
//! - [`RemoteServices`]: turns a bundle file name into primary and fallback
//!   remote addresses.
//! - [`BuildinQueryServices`]: answers whether a bundle file already ships
//!   with the application.
//!
//! Both are queried once per candidate bundle during resolution, so
//! implementations should be cheap and deterministic within a session.

mod buildin;
mod remote;

pub use buildin::{BuildinCatalog, BuildinQueryServices, NoBuildinContent};
pub use remote::{HostRemoteServices, RemoteServices};
