//! Core domain layer for Strata.
//!
//! Pure settings logic: values, layers, deferred templates, and the helper
//! registry they are evaluated against. All I/O (reading files, environment
//! access, log sinks) is handled via ports in the application layer.
//!
//! ## Rules
//!
//! - **No async**: Domain logic is synchronous
//! - **No I/O**: No filesystem, network, or process environment access
//! - **No tracing**: Observability belongs to the application and CLI layers
//! - **Deferred by default**: Templates are stored as text and evaluated on read

pub mod clock;
pub mod error;
pub mod expression;
pub mod helpers;
pub mod layer;
pub mod setting;
pub mod skeleton;
pub mod template;
pub mod value;

pub use clock::Clock;
pub use error::{DomainError, ErrorCategory};
pub use helpers::Helpers;
pub use layer::{DEFAULT_ENVIRONMENT, DEFAULT_SECTION, GLOBAL_SECTION, Layer, LayerOrigin};
pub use setting::{Setting, SettingsTable, normalize_key};
pub use skeleton::{SettingsSkeleton, SkeletonContext, SkeletonFile};
pub use template::{Marker, Scope, Template};
pub use value::{FromValue, Value};
