//! Client-side state for HackVault front ends.
//!
//! [`MirroredStore`] keeps a local, persisted mirror of the content tables and
//! the signed-in session, talks to the data service through a
//! [`RemoteService`], and runs every result through the same visibility gate
//! the server uses before handing it to a renderer.

pub mod cache;
pub mod error;
pub mod remote;
pub mod store;

pub use cache::{LocalCache, Session};
pub use error::ClientError;
pub use remote::{HttpRemote, RemoteService};
pub use store::MirroredStore;
