//! Batch mail-merge pipeline orchestration.
//!
//! This module contains the engine that turns one template and one data
//! source into a batch of generated documents:
//!
//! - [`MergePipelineBuilder`]: fluent construction plus all fatal
//!   pre-batch validation
//! - [`MergePipeline`]: bounded-concurrency batch execution
//! - [`BatchSummary`] / [`GenerationResult`]: the reported outcome
//!
//! # Example
//!
//! ```ignore
//! use missive::MergePipelineBuilder;
//!
//! let pipeline = MergePipelineBuilder::new()
//!     .with_template_file("letter.docx")
//!     .with_data_file("recipients.xlsx")
//!     .with_destination("out")
//!     .with_convert(true)
//!     .build()?;
//!
//! let summary = pipeline.run()?;
//! println!("{} generated, {} failed", summary.completed, summary.failed);
//! ```

pub mod api;
mod builder;
pub mod config;
pub mod context;
mod orchestrator;
pub(crate) mod worker;

pub use api::{BatchSummary, GenerationResult, RowStatus};
pub use builder::MergePipelineBuilder;
pub use config::MergeConfig;
pub use orchestrator::MergePipeline;
