// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resource descriptors and the transient state derived from probing them.

pub mod resource;
pub mod state;

pub use resource::{
    ChartSource, ConvergePolicy, DesiredSpec, ManagedResource, ReleaseSpec, ResourceKind,
    RolloutCheck, SecretSpec, Tier, ValuesOverlay,
};
pub use state::{ActionError, ActionResult, AdminCredential, Outcome, ResourceState};
