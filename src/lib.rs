// src/lib.rs

//! Contest Notifier Library
//!
//! Discovers open Kaggle and Dacon competitions, diffs them against the last
//! checkpoint, and announces the new ones on Slack.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
