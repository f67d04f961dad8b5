//! Editor core: dual row sets, search, structural edits, validation, and the
//! Elm-style session model driven by [`update::update`].

pub mod model;
pub mod ops;
pub mod search;
pub mod state;
pub mod update;
pub mod validate;

#[cfg(test)]
mod test_properties;
