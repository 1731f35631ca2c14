#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Shared helpers for the runmod workspace.
//!
//! - [`Colors`]: ANSI palette used by signature listings, dumps and run reports
//! - [`ColorChoice`]: the `auto`/`always`/`never` switch behind it
//! - [`names`]: qualified routine names and case-insensitive matching

pub mod colors;
pub mod names;


pub use colors::{ColorChoice, Colors};
