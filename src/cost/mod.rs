//! Cost aggregation and recommendation engine.
//!
//! Rates and thresholds are plain values handed to [`Analyzer`]; nothing here
//! holds state between analyses.

mod analyzer;
mod duration;
mod rates;
mod recommend;

pub use analyzer::{analyze, Analyzer};
pub use duration::{elapsed_minutes, parse_timestamp};
pub use rates::{classify_environment, ComputeEnvironment, RateTable};
pub use recommend::{recommend, Recommender, Thresholds};
