//! # Core Module
//!
//! Stateless building blocks for GMM density-map fitting.
//!
//! ## Overview
//!
//! Everything in this module is pure data or pure computation: nothing here
//! holds per-run state or knows about evaluation steps. The submodules cover:
//!
//! - **Small-matrix math** ([`math`]) - 3x3 log-determinant, inverse, and
//!   quadratic-form operations used by the overlap formulas
//! - **Scattering factors** ([`scattering`]) - the static element table and
//!   atom-name resolution rule
//! - **Component model** ([`gmm`]) - Gaussian components and weight
//!   normalization
//! - **Model construction** ([`model`]) - one isotropic Gaussian per atom
//! - **File I/O** ([`io`]) - reading data-GMM parameter files

pub mod gmm;
pub mod io;
pub mod math;
pub mod model;
pub mod scattering;
