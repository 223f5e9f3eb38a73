// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod error;
pub mod exposure;
pub mod helm;
pub mod kubernetes;
pub mod reconciler;
pub mod registry;
pub mod types;

#[cfg(test)]
pub mod test_utils;
