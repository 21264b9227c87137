//! # Engine Module
//!
//! The stateful evaluation layer: everything that is computed once at setup
//! and consulted every step, plus the per-step scoring pass itself.
//!
//! ## Overview
//!
//! - **Configuration** ([`config`]) - typed setup parameters with all
//!   validation done before any computation starts
//! - **Pair tables** ([`pairs`]) - per-pair prefactors, inverse combined
//!   covariances, and data-component self-overlaps, cached for the run
//! - **Neighbor list** ([`neighbor`]) - overlap-pruned pair list with
//!   stride-gated rebuilds
//! - **Work partitioning** ([`partition`]) - disjoint sharding of the pair
//!   index space with deterministic reduction
//! - **Scoring** ([`scorer`]) - the per-step overlap accumulation, energy
//!   functional, and gradient assembly
//! - **Error handling** ([`error`]) - the engine-wide error type

pub mod config;
pub mod error;
pub mod neighbor;
pub mod overlap;
pub mod pairs;
pub mod partition;
pub mod scorer;
