//! Minimal-sample selection strategies for the consensus loop.
//!
//! RANSAC, MSAC and LMedS draw uniformly; PROSAC and PROMedS draw from a
//! quality-ordered pool that grows with the iteration count.

pub mod prosac;
pub mod uniform;

pub use prosac::ProsacSampler;
pub use uniform::UniformRandomSampler;
