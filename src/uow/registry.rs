//! Unit of Work Registry
//!
//! Maps strategy identifiers (e.g. `"echo"`) to constructors, so shards and the
//! coordinator can instantiate the same strategy from the identifier alone.

use super::echo::{ECHO_UOW, EchoUow};
use super::types::UnitOfWork;
use crate::error::WorkerError;

use dashmap::DashMap;
use std::sync::Arc;

/// Builds a strategy bound to the given run prefix.
pub type UowConstructor = Arc<dyn Fn(&str) -> Arc<dyn UnitOfWork> + Send + Sync>;

pub struct UowRegistry {
    constructors: DashMap<String, UowConstructor>,
}

impl UowRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a registry holding the strategies that ship with the crate.
    pub fn with_builtins() -> Arc<Self> {
        let registry = Self::new();
        registry.register(ECHO_UOW, |prefix| Arc::new(EchoUow::new(prefix)));
        registry
    }

    /// Registers `constructor` under `name`, replacing any previous registration.
    pub fn register<F, U>(&self, name: &str, constructor: F)
    where
        F: Fn(&str) -> Arc<U> + Send + Sync + 'static,
        U: UnitOfWork + 'static,
    {
        let constructor: UowConstructor =
            Arc::new(move |prefix: &str| constructor(prefix) as Arc<dyn UnitOfWork>);
        self.constructors.insert(name.to_string(), constructor);

        tracing::info!("Registered unit of work: {}", name);
    }

    /// Instantiates the strategy registered under `name` for the run `prefix`.
    pub fn instantiate(&self, name: &str, prefix: &str) -> Result<Arc<dyn UnitOfWork>, WorkerError> {
        match self.constructors.get(name) {
            Some(constructor) => {
                tracing::debug!("Instantiating unit of work {} for {}", name, prefix);
                Ok(constructor.value()(prefix))
            }
            None => {
                tracing::error!("Unknown unit of work: {}", name);
                Err(WorkerError::UnknownStrategy(name.to_string()))
            }
        }
    }

    pub fn list_strategies(&self) -> Vec<String> {
        self.constructors
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    pub fn has_strategy(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn strategy_count(&self) -> usize {
        self.constructors.len()
    }
}

impl Default for UowRegistry {
    fn default() -> Self {
        Self {
            constructors: DashMap::new(),
        }
    }
}
