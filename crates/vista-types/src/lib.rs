//! Foundation types for Vista.
//!
//! Every other Vista crate depends on `vista-types`. It defines what a data
//! source produces and the narrow capability the aggregation core uses to
//! talk to one.
//!
//! # Key Types
//!
//! - [`SourceData`]: one source's rendered fragment plus summary lines
//! - [`Source`]: the two-method capability every adapter implements
//! - [`FetchContext`]: deadline and cancellation handed to each fetch
//! - [`Clock`]: wall-clock abstraction for time-dependent policy

pub mod clock;
pub mod context;
pub mod error;
pub mod source;

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::FetchContext;
pub use error::{SourceError, SourceResult};
pub use source::{name_to_id, Source, SourceData};
