//! # MEV Protection
//!
//! Sandwich and front-running detection with weighted confidence scoring,
//! configurable ordering policies, and the bounded alert history the
//! banking stage's MEV pass consumes.

#![warn(missing_docs)]
#![allow(missing_docs)]

pub mod alert_history;
pub mod detection;
pub mod filter;
pub mod ordering;

pub use alert_history::{AlertHistory, MevAlert};
pub use detection::{scan_batch, AlertType, Detection, DEFAULT_SANDWICH_THRESHOLD, FRONT_RUN_CONFIDENCE};
pub use filter::{filter_suspicious, DEFAULT_CONFIDENCE_THRESHOLD};
pub use ordering::{apply as apply_ordering, OrderingPolicy};
