//! bytehub-timeseries: per-feature time-series storage for Bytehub
//!
//! Defines the contract every storage backend satisfies ([`FeatureBackend`]),
//! the [`Frame`] type used to move time-indexed values around, the
//! bitemporal/resampling rules applied on load, and the outer-join plus
//! forward-fill alignment used to combine several features.
//!
//! Two reference backends are registered by default:
//! - `memory://` keeps points in process memory
//! - `file://` stores JSON-lines files partitioned by date, month or year

pub mod backend;
pub mod error;
pub mod file;
pub mod frame;
pub mod frequency;
pub mod memory;
pub mod partition;
pub mod series;

pub use backend::{BackendFactory, BackendRegistry, BackendTarget, FeatureBackend, LoadRequest};
pub use error::{BackendError, Result};
pub use file::{FileBackend, FileBackendFactory};
pub use frame::{Frame, CREATED_TIME_COLUMN, TIME_COLUMN, VALUE_COLUMN};
pub use frequency::Frequency;
pub use memory::{MemoryBackend, MemoryBackendFactory};
pub use partition::Partition;
pub use series::{Point, Series};
