// ==============================================================================
// lib.rs - Ig Purity Checker Library
// ==============================================================================
// Description: Library interface for myeloma Ig purity/clonality modules
// Author: Matt Barham
// Created: 2025-11-03
// Modified: 2026-10-18
// Version: 2.0.0
// ==============================================================================

pub mod parsers;
pub mod audit;
pub mod validator;
pub mod config;
pub mod error;
pub mod models;
pub mod reference;
pub mod metrics;
pub mod aggregator;
pub mod classifier;
pub mod processor;
pub mod output;

#[cfg(test)]
pub(crate) mod test_fixtures;
