#![forbid(unsafe_code)]

//! Metric profile editor (mpe): the editing core behind the metric profile
//! form of a monitoring admin UI.
//!
//! A profile is a named list of (service, metric) rows. The editor keeps the
//! full row set and the filtered view in step, validates the form against
//! the tenant's service flavours and metrics, and submits the result to the
//! upstream Web API before mirroring it into the internal store.
//!
//! # Library usage
//!
//! ```rust,no_run
//! use metric_profile_editor::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use metric_profile_editor::core::config::Config;
//! use metric_profile_editor::editor::update::update;
//! ```

pub mod prelude;

pub mod api;
pub mod core;
pub mod editor;
pub mod logger;
pub mod profile;
