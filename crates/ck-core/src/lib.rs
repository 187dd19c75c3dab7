//! ck-core: shared foundation for ctrlkit.
//!
//! Contains:
//! - error (shared error types)
//! - numeric (Real + tolerances + float helpers)
//! - series (loaded signal and step-experiment value objects)
//! - selection (user-marked spans and points)
//! - stats (span statistics over sampled signals)

pub mod error;
pub mod numeric;
pub mod selection;
pub mod series;
pub mod stats;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use selection::{Point, PointName, Span, SpanName, SpanSelections, StepTuneSelections};
pub use series::{StepSeries, TimeSeries};
