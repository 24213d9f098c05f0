//! Flat-directory file storage and digest computation

pub mod digest;
pub mod store;

pub use digest::{hash_reader, DigestAlgorithm};
pub use store::{FileError, FileStore, StoredFileInfo};
