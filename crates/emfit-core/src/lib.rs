//! # emfit Core Library
//!
//! A library for scoring simulated atomic models against reference density
//! maps, with both sides represented as Gaussian Mixture Models (GMMs).
//!
//! The fit between model and map is measured through closed-form analytic
//! overlap integrals between pairs of 3-D Gaussian components. The score is a
//! sum-of-squared-log-ratios energy over the per-component overlaps, and its
//! gradient with respect to the atom positions is assembled through the same
//! pair decomposition, so the result can drive a biased simulation.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** Stateless data model and pure math: the
//!   small 3x3 matrix kernel, the electron scattering-factor table, the GMM
//!   component types, the per-atom model-GMM builder, and the data-GMM file
//!   loader.
//!
//! - **[`engine`]: The Logic Core.** The stateful evaluation layer: typed
//!   setup configuration, per-pair auxiliary tables cached for the run, the
//!   overlap-pruned neighbor list, worker partitioning with deterministic
//!   reduction, and the per-step scorer that ties them together.
//!
//! The caller owns atom storage and the simulation loop: positions are read
//! through a borrowed slice each step, and the score plus per-atom gradient
//! are handed back in an [`engine::scorer::Evaluation`].

pub mod core;
pub mod engine;
