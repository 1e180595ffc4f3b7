//! # wmm-core
//!
//! The event-application pipeline for the Watermelon Meow Meow game.
//!
//! This crate provides:
//! - The seam traits (`EventLogStore`, `Validator`, `InfectionResolver`,
//!   `EffectivenessSampler`, `RandomSource`, `Notifier`, `Clock`)
//! - The `AppendTransaction` that wires them together in the right order
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wmm_core::{AppendTransaction, traits::{EventLogStore, Validator}};
//! ```

pub mod traits;
pub mod transaction;

pub use transaction::AppendTransaction;
