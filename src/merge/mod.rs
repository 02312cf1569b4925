//! Core merge algorithms.
//!
//! - [`PlaceholderScanner`]: finds `#name#` tokens inside document text
//!   fragments
//! - [`bind_columns`]: maps every distinct placeholder name to a data
//!   column before any generation starts
//! - [`display_value`]: resolves a cell's display string, following the
//!   shared-string indirection

pub mod binder;
pub mod cell;
pub mod scanner;

pub use binder::{ColumnIndexMap, bind_columns};
pub use cell::display_value;
pub use scanner::{PlaceholderOccurrence, PlaceholderScanner, PlaceholderToken};
