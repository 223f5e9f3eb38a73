// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Probe, converge and the dependency-ordered loop tying them together.

pub mod driver;
pub mod executor;
pub mod prober;

pub use driver::{Driver, ResourceOutcome};
pub use executor::ActionExecutor;
pub use prober::StateProber;
