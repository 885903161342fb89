//! Weather Forecast
//!
//! Daily multi-target weather forecasting with weighted tree ensembles.
//!
//! ## Architecture
//!
//! ```text
//! CSV / Synthetic ─→ Features ─→ Trainer ─→ Registry (Staging → Production)
//!                       ↑                        │
//!                       └──── Forecast ←─────────┘
//!                                 ↑
//!                     Validation gate (CI, exit codes)
//! ```
//!
//! - `features`: calendar, lag, rolling and derived-index columns
//! - `ml`: histogram trees, depth-wise and leaf-wise boosting, random forest,
//!   weighted ensemble
//! - `training`: chronological split, one ensemble per target, holdout metrics
//! - `registry`: versioned JSON artifacts with stage promotion
//! - `forecast`: recursive day-by-day forecasting and the serving facade
//! - `validation`: threshold gate used by the `validate_model` binary

pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod forecast;
pub mod logging;
pub mod ml;
pub mod registry;
pub mod training;
pub mod types;
pub mod validation;

#[cfg(test)]
mod test_fixtures;
#[cfg(test)]
mod types_tests;
#[cfg(test)]
mod config_tests;
