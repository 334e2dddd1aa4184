//! Streaming min/mean/max aggregation over `<key>;<value>` records.
//!
//! Input is read in fixed-size blocks, cut at record boundaries, parsed by a
//! pool of workers and folded into a fixed-capacity open-addressing table by
//! a single aggregator thread. See [`pipeline::run`].

pub mod aggregator;
pub mod config;
pub mod error;
pub mod fixed_point;
pub mod pipeline;
pub mod reader;
pub mod report;
pub mod splitter;
pub mod table;
pub mod worker;

pub use config::PipelineConfig;
pub use error::{Error, Result};
pub use pipeline::run;
pub use report::Summary;
pub use table::Stats;
