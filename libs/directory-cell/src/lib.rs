//! Read-only facade over the clinic directory: doctors, their services and
//! schedule definitions, patients and their address books. Owned and edited
//! elsewhere; the scheduling engine only consumes it.

pub mod models;
pub mod store;

pub use store::{DirectoryApi, InMemoryDirectory};
