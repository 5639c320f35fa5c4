//! # Workflows Module
//!
//! Entry points that turn a composed energy function into derivatives.
//!
//! ## Overview
//!
//! Every workflow accepts any [`EnergyFunction`](crate::engine::potential::EnergyFunction),
//! so the combined [`Potential`](crate::engine::potential::Potential) and each of its
//! single-term functions are differentiated the same way. Inputs are validated up front and
//! shape mismatches surface as [`EngineError`](crate::engine::error::EngineError) before any
//! arithmetic is recorded.
//!
//! ## Architecture
//!
//! - **Differentiation** ([`differentiate`]) - Reverse-mode evaluation of forces and
//!   parameter gradients from a single recorded energy evaluation.
//! - **Numerical Differentiation** ([`numerical`]) - Central finite differences over
//!   coordinates and parameter leaves, used to cross-check the analytic derivatives.

pub mod differentiate;
pub mod numerical;
