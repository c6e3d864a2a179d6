//! Selector registry — grouping discriminator → selector constructor.
//!
//! The orchestrator instantiates every outbound port's selector through
//! a registry, so deployments reject unknown groupings up front and
//! embedders can hang additional strategies off new discriminators.

use std::collections::HashMap;

use tracing::debug;

use flowgrid_topology::{
    GROUPING_BROADCAST, GROUPING_FIELDS, GROUPING_RANDOM, GROUPING_ROUND_ROBIN, SelectorConfig,
};

use crate::error::{SelectError, SelectResult};
use crate::selector::Selector;

type SelectorFactory = Box<dyn Fn(&SelectorConfig) -> SelectResult<Selector> + Send + Sync>;

/// Maps grouping discriminators to selector constructors.
pub struct SelectorRegistry {
    factories: HashMap<String, SelectorFactory>,
}

impl SelectorRegistry {
    /// A registry with the built-in groupings registered.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for grouping in [
            GROUPING_RANDOM,
            GROUPING_FIELDS,
            GROUPING_ROUND_ROBIN,
            GROUPING_BROADCAST,
        ] {
            registry.register(grouping, Selector::from_config);
        }
        registry
    }

    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a constructor under a grouping discriminator, replacing
    /// any existing registration.
    pub fn register<F>(&mut self, grouping: impl Into<String>, factory: F)
    where
        F: Fn(&SelectorConfig) -> SelectResult<Selector> + Send + Sync + 'static,
    {
        let grouping = grouping.into();
        debug!(%grouping, "selector grouping registered");
        self.factories.insert(grouping, Box::new(factory));
    }

    pub fn contains(&self, grouping: &str) -> bool {
        self.factories.contains_key(grouping)
    }

    /// Instantiate the selector for a connection's configuration.
    pub fn instantiate(&self, config: &SelectorConfig) -> SelectResult<Selector> {
        let factory = self
            .factories
            .get(&config.grouping)
            .ok_or_else(|| SelectError::UnknownGrouping(config.grouping.clone()))?;
        factory(config)
    }
}

impl Default for SelectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::RoundRobinSelector;

    #[test]
    fn builtins_are_registered() {
        let registry = SelectorRegistry::new();
        for grouping in ["random", "fields", "round-robin", "broadcast"] {
            assert!(registry.contains(grouping));
        }
    }

    #[test]
    fn instantiates_from_config() {
        let registry = SelectorRegistry::new();
        let selector = registry.instantiate(&SelectorConfig::fields("user")).unwrap();
        assert_eq!(selector.grouping(), GROUPING_FIELDS);
    }

    #[test]
    fn unknown_grouping_is_rejected() {
        let registry = SelectorRegistry::new();
        let err = registry
            .instantiate(&SelectorConfig::new("stickiness"))
            .unwrap_err();
        assert!(matches!(err, SelectError::UnknownGrouping(_)));
    }

    #[test]
    fn custom_grouping_can_be_registered() {
        let mut registry = SelectorRegistry::new();
        registry.register("sticky", |_config| {
            Ok(Selector::RoundRobin(RoundRobinSelector::new()))
        });

        let selector = registry.instantiate(&SelectorConfig::new("sticky")).unwrap();
        assert_eq!(selector.grouping(), GROUPING_ROUND_ROBIN);
    }
}
