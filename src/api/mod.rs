//! Backend contracts, the in-memory and file backends, and the load, submit,
//! delete, and version flows built on them.

pub mod backend;
pub mod file;
pub mod memory;
pub mod runtime;
pub mod versions;
