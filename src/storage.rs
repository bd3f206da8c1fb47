//! Storage abstraction layer.
//!
//! Index files are written through the [`Storage`] trait so the writer can run
//! against a directory on disk ([`file::FileStorage`]) or entirely in memory
//! ([`memory::MemoryStorage`]) in tests.
//!
//! # Example
//!
//! ```
//! use crawldex::storage::Storage;
//! use crawldex::storage::memory::MemoryStorage;
//! use std::io::{Read, Write};
//!
//! # fn main() -> crawldex::error::Result<()> {
//! let storage = MemoryStorage::new();
//!
//! let mut output = storage.create_output("segments.json.tmp")?;
//! output.write_all(b"{}")?;
//! output.close()?;
//!
//! // Atomic replacement: write under a temporary name, then rename.
//! storage.rename_file("segments.json.tmp", "segments.json")?;
//!
//! let mut input = storage.open_input("segments.json")?;
//! let mut buffer = Vec::new();
//! input.read_to_end(&mut buffer)?;
//! assert_eq!(buffer, b"{}");
//! # Ok(())
//! # }
//! ```

pub mod file;
pub mod memory;
pub mod structured;
pub mod traits;

pub use traits::{Storage, StorageConfig, StorageError, StorageInput, StorageLock, StorageOutput};
