// src/lib.rs

//! cinewatch Library
//!
//! Scrapes cinema programme listings, diffs them against the last stored
//! snapshot and notifies subscribers about what changed.

pub mod config;
pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod locale;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod test_support;
