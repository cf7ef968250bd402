//! On-disk storage for generated images.
//!
//! [`ImageStore`] writes decoded images into a managed directory with unique,
//! timestamped names, deletes its own files once they pass a fixed TTL, and
//! keeps a single-slot reference to the most recent save.

mod store;

pub use store::{DEFAULT_TTL, ImageStore, ImageStoreConfig};
