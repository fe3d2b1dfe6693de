//! Business logic services

pub mod circulation;
pub mod holds;
pub mod ledger;
pub mod policy;

use crate::{config::CirculationConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub policy: policy::PolicyService,
    pub circulation: circulation::CirculationService,
    pub holds: holds::HoldsService,
    pub ledger: ledger::LedgerService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, circulation_defaults: CirculationConfig) -> Self {
        let policy = policy::PolicyService::new(repository.clone());
        Self {
            circulation: circulation::CirculationService::new(
                repository.clone(),
                policy.clone(),
                circulation_defaults,
            ),
            holds: holds::HoldsService::new(repository.clone()),
            ledger: ledger::LedgerService::new(repository),
            policy,
        }
    }
}
