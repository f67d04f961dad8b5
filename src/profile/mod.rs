//! Profile data: rows, wire shapes, metadata, and access rules.

pub mod access;
pub mod tuple;
pub mod wire;
