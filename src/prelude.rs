//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use metric_profile_editor::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{MpeError, Result};

// Profile data
pub use crate::profile::access::{ProfileMetadata, Session};
pub use crate::profile::tuple::{ServiceTuple, TupleField};
pub use crate::profile::wire::{FlatPair, MetricProfile, ServiceEntry};

// Editor
pub use crate::editor::model::{EditorCmd, EditorMode, EditorModel, EditorMsg, Notification};
pub use crate::editor::state::{EditorState, IndexPolicy, Vocabularies};
pub use crate::editor::update::update;
pub use crate::editor::validate::ErrorMap;

// Backends
pub use crate::api::backend::{ApiResponse, Backend, InternalStore, ProfileApi, SessionProvider};
pub use crate::api::file::FileBackend;
pub use crate::api::memory::{InMemoryBackend, Snapshot};
pub use crate::api::runtime::{EditorSession, load_editor};

// Logging
pub use crate::logger::activity::{ActivityEvent, ActivityLog};
