//! Readers for external parameter files.

pub mod gmm_file;
