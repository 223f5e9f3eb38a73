// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Dependency-ordered reconciliation of one tier at a time.

use super::{ActionExecutor, StateProber};
use crate::error::{BootstrapError, ErrorCategory, Result};
use crate::registry::Registry;
use crate::types::{ManagedResource, Outcome, ResourceKind, ResourceState, Tier};
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceOutcome {
    pub name: String,
    pub kind: ResourceKind,
    pub outcome: Outcome,
}

/// Walks registry tiers through probe and converge, remembering outcomes
/// across tiers so later tiers can depend on earlier ones.
pub struct Driver<'a> {
    registry: &'a Registry,
    prober: StateProber,
    executor: ActionExecutor,
    outcomes: Vec<ResourceOutcome>,
}

impl<'a> Driver<'a> {
    pub fn new(registry: &'a Registry, prober: StateProber, executor: ActionExecutor) -> Self {
        Self {
            registry,
            prober,
            executor,
            outcomes: Vec::new(),
        }
    }

    pub fn executor_mut(&mut self) -> &mut ActionExecutor {
        &mut self.executor
    }

    pub fn outcomes(&self) -> &[ResourceOutcome] {
        &self.outcomes
    }

    pub fn outcome(&self, name: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .rev()
            .find(|o| o.name == name)
            .map(|o| &o.outcome)
    }

    /// Reconcile every resource of `tier` in dependency order.
    ///
    /// Returns an error only for a fatal action failure; the rest of the tier
    /// is then recorded as not attempted.
    #[instrument(skip(self))]
    pub async fn reconcile(&mut self, tier: Tier) -> Result<()> {
        let registry = self.registry;
        let ordered = registry.ordered(tier);
        info!("Reconciling {} resources", ordered.len());

        for (position, resource) in ordered.iter().enumerate() {
            let outcome = self.reconcile_one(resource).await;

            if let Outcome::Failed(err) = &outcome {
                if err.category.is_fatal() {
                    error!("Fatal error on {}, aborting: {}", resource.name, err);
                    let message = err.to_string();
                    self.record(resource, outcome);
                    for remaining in &ordered[position + 1..] {
                        self.record(remaining, Outcome::NotAttempted);
                    }
                    return Err(BootstrapError::Fatal {
                        resource: resource.name.clone(),
                        message,
                    });
                }
            }

            self.record(resource, outcome);
        }

        Ok(())
    }

    async fn reconcile_one(&mut self, resource: &ManagedResource) -> Outcome {
        if let Some(dependency) = self.unsatisfied_dependency(resource) {
            warn!(
                "Skipping {}: dependency {} is not satisfied",
                resource.name, dependency
            );
            return Outcome::Blocked { dependency };
        }

        let state = self.prober.probe(resource).await;
        if let ResourceState::Unknown(reason) = state {
            warn!(
                "State of {} is unknown, not converging and blocking dependents",
                resource.name
            );
            return Outcome::Unknown(reason);
        }

        let result = self.executor.converge(resource, &state).await;
        match &result.error {
            Some(err) if err.category == ErrorCategory::Conflict => {
                warn!(
                    "Conflict converging {}, another actor may have created it; re-probing",
                    resource.name
                );
                match self.prober.probe(resource).await {
                    ResourceState::Present => {
                        info!("{} is present after conflict, treating as converged", resource.name);
                        Outcome::Skipped
                    }
                    _ => Outcome::Failed(err.clone()),
                }
            }
            Some(err) => {
                warn!("Converging {} failed: {}", resource.name, err);
                Outcome::from(result)
            }
            None => {
                if result.applied {
                    info!("{} converged", resource.name);
                }
                Outcome::from(result)
            }
        }
    }

    fn unsatisfied_dependency(&self, resource: &ManagedResource) -> Option<String> {
        resource
            .depends_on
            .iter()
            .find(|dep| !self.outcome(dep).is_some_and(Outcome::is_satisfied))
            .cloned()
    }

    fn record(&mut self, resource: &ManagedResource, outcome: Outcome) {
        self.outcomes.push(ResourceOutcome {
            name: resource.name.clone(),
            kind: resource.kind(),
            outcome,
        });
    }

    /// Names of `tier` resources that did not reach a satisfied outcome
    pub fn unsatisfied(&self, tier: Tier) -> Vec<String> {
        let registry = self.registry;
        registry
            .ordered(tier)
            .into_iter()
            .filter(|r| !self.outcome(&r.name).is_some_and(Outcome::is_satisfied))
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn log_summary(&self) {
        info!("Reconciliation summary:");
        for o in &self.outcomes {
            if o.outcome.is_satisfied() {
                info!("  {:<24} {:<12} {}", o.name, o.kind.to_string(), o.outcome);
            } else {
                warn!("  {:<24} {:<12} {}", o.name, o.kind.to_string(), o.outcome);
            }
        }
    }
}
