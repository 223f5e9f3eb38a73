// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Operator interaction: prompts and credential display.

use crate::config::{parse_port, ExposureMethod};
use crate::error::{BootstrapError, Result};
use crate::types::AdminCredential;
use dialoguer::Input;

/// Source of operator decisions. Methods return the raw answer so parsing
/// and validation stay with the caller.
pub trait Operator: Send {
    fn choose_exposure(&mut self) -> Result<String>;

    fn choose_local_port(&mut self, default: u16) -> Result<String>;

    fn confirm_applications(&mut self) -> Result<String>;

    fn show_credential(&mut self, credential: &AdminCredential);
}

/// Interactive operator on the controlling terminal
#[derive(Debug, Default)]
pub struct TerminalOperator;

impl TerminalOperator {
    fn ask(prompt: &str) -> Result<String> {
        Ok(Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?)
    }
}

impl Operator for TerminalOperator {
    fn choose_exposure(&mut self) -> Result<String> {
        println!("How should Argo CD be exposed?");
        println!("  1) Ingress");
        println!("  2) Port-forward");
        Self::ask("Choice [1/2]")
    }

    fn choose_local_port(&mut self, default: u16) -> Result<String> {
        Self::ask(&format!("Local port for port-forward [{}]", default))
    }

    fn confirm_applications(&mut self) -> Result<String> {
        Self::ask("Install the application releases? [y/N]")
    }

    fn show_credential(&mut self, credential: &AdminCredential) {
        println!("Argo CD admin password: {}", credential.expose());
    }
}

/// `1` selects ingress, `2` port-forward
pub fn parse_exposure_choice(input: &str) -> Result<ExposureMethod> {
    match input.trim() {
        "1" => Ok(ExposureMethod::Ingress),
        "2" => Ok(ExposureMethod::PortForward),
        other => Err(BootstrapError::InvalidInput(format!(
            "exposure choice must be 1 or 2, got '{}'",
            other
        ))),
    }
}

/// Empty input selects `default`
pub fn parse_local_port(input: &str, default: u16) -> Result<u16> {
    if input.trim().is_empty() {
        return Ok(default);
    }
    parse_port(input).map_err(|e| BootstrapError::InvalidInput(format!("{:#}", e)))
}

/// Only `y`/`yes` (any case) confirm
pub fn is_affirmative(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}
