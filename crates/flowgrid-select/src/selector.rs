//! Selection strategies over a port's candidate connections.
//!
//! A closed tagged set of variants sharing the `select`/`state` surface,
//! constructed from the serializable key-value form so a redeployed
//! network restores selection behavior without re-specifying it in code.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use flowgrid_topology::{
    GROUPING_BROADCAST, GROUPING_FIELDS, GROUPING_RANDOM, GROUPING_ROUND_ROBIN,
    OutputConnectionContext, SelectorConfig,
};

use crate::error::{SelectError, SelectResult};
use crate::message::Message;

/// Uniformly selects one connection from the candidate list.
///
/// The PRNG is the only mutable state; draws are serialized behind a
/// mutex so one instance is safe across concurrent producers.
#[derive(Debug)]
pub struct RandomSelector {
    rng: Mutex<StdRng>,
}

impl RandomSelector {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic PRNG seed, for reproducible tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn select<'a>(
        &self,
        connections: &'a [OutputConnectionContext],
    ) -> SelectResult<Vec<&'a OutputConnectionContext>> {
        if connections.is_empty() {
            return Err(SelectError::EmptyTarget);
        }
        let index = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            rng.gen_range(0..connections.len())
        };
        Ok(vec![&connections[index]])
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

/// Consistent-hash selection on a named message field.
///
/// The stable hash of the field's string value, reduced modulo the
/// candidate count, yields the same relative position for equal values
/// across calls within a topology version. An absent field is an error;
/// selection never silently selects nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldsSelector {
    field: String,
}

impl FieldsSelector {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn select<'a>(
        &self,
        message: &Message,
        connections: &'a [OutputConnectionContext],
    ) -> SelectResult<Vec<&'a OutputConnectionContext>> {
        if connections.is_empty() {
            return Err(SelectError::EmptyTarget);
        }
        let value = message
            .field(&self.field)
            .ok_or_else(|| SelectError::MissingField(self.field.clone()))?;

        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        let index = (hasher.finish() as usize) % connections.len();
        Ok(vec![&connections[index]])
    }
}

/// Cycling selection across the candidate list.
///
/// The cursor advances on every call and wraps modulo the candidate
/// count; it is not reset when the count changes.
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    cursor: AtomicUsize,
}

impl RoundRobinSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select<'a>(
        &self,
        connections: &'a [OutputConnectionContext],
    ) -> SelectResult<Vec<&'a OutputConnectionContext>> {
        if connections.is_empty() {
            return Err(SelectError::EmptyTarget);
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % connections.len();
        Ok(vec![&connections[index]])
    }
}

/// Selects every candidate connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastSelector;

impl BroadcastSelector {
    pub fn new() -> Self {
        Self
    }

    pub fn select<'a>(
        &self,
        connections: &'a [OutputConnectionContext],
    ) -> SelectResult<Vec<&'a OutputConnectionContext>> {
        if connections.is_empty() {
            return Err(SelectError::EmptyTarget);
        }
        Ok(connections.iter().collect())
    }
}

/// A selection strategy, discriminated by its grouping string.
#[derive(Debug)]
pub enum Selector {
    Random(RandomSelector),
    Fields(FieldsSelector),
    RoundRobin(RoundRobinSelector),
    Broadcast(BroadcastSelector),
}

impl Selector {
    /// Construct a selector from its serialized key-value form.
    pub fn from_config(config: &SelectorConfig) -> SelectResult<Self> {
        match config.grouping.as_str() {
            GROUPING_RANDOM => Ok(Self::Random(RandomSelector::new())),
            GROUPING_FIELDS => {
                let field = config.param(SelectorConfig::FIELD_PARAM).ok_or_else(|| {
                    SelectError::InvalidConfig(format!(
                        "fields grouping requires a {:?} param",
                        SelectorConfig::FIELD_PARAM
                    ))
                })?;
                Ok(Self::Fields(FieldsSelector::new(field)))
            }
            GROUPING_ROUND_ROBIN => Ok(Self::RoundRobin(RoundRobinSelector::new())),
            GROUPING_BROADCAST => Ok(Self::Broadcast(BroadcastSelector::new())),
            other => Err(SelectError::UnknownGrouping(other.to_string())),
        }
    }

    /// The subset of candidate connections that should receive the
    /// message. Never an empty success.
    pub fn select<'a>(
        &self,
        message: &Message,
        connections: &'a [OutputConnectionContext],
    ) -> SelectResult<Vec<&'a OutputConnectionContext>> {
        match self {
            Self::Random(selector) => selector.select(connections),
            Self::Fields(selector) => selector.select(message, connections),
            Self::RoundRobin(selector) => selector.select(connections),
            Self::Broadcast(selector) => selector.select(connections),
        }
    }

    /// The grouping discriminator of this selector.
    pub fn grouping(&self) -> &'static str {
        match self {
            Self::Random(_) => GROUPING_RANDOM,
            Self::Fields(_) => GROUPING_FIELDS,
            Self::RoundRobin(_) => GROUPING_ROUND_ROBIN,
            Self::Broadcast(_) => GROUPING_BROADCAST,
        }
    }

    /// Serialize the strategy parameters for persistence across
    /// redeploys.
    pub fn state(&self) -> SelectorConfig {
        match self {
            Self::Random(_) => SelectorConfig::random(),
            Self::Fields(selector) => SelectorConfig::fields(selector.field()),
            Self::RoundRobin(_) => SelectorConfig::round_robin(),
            Self::Broadcast(_) => SelectorConfig::broadcast(),
        }
    }

    /// Restore the strategy from a persisted key-value form.
    pub fn set_state(&mut self, config: &SelectorConfig) -> SelectResult<()> {
        *self = Self::from_config(config)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candidates(count: usize) -> Vec<OutputConnectionContext> {
        (1..=count)
            .map(|i| OutputConnectionContext {
                address: format!("net.b.in.{i}"),
                target: {
                    let mut target = flowgrid_topology::TargetInfo::new("b", "in");
                    target.instance = i as u32;
                    target
                },
                selector: SelectorConfig::default(),
            })
            .collect()
    }

    #[test]
    fn every_variant_rejects_empty_candidates() {
        let message = Message::new(json!({"user": "ada"}));
        let empty: Vec<OutputConnectionContext> = Vec::new();

        for config in [
            SelectorConfig::random(),
            SelectorConfig::fields("user"),
            SelectorConfig::round_robin(),
            SelectorConfig::broadcast(),
        ] {
            let selector = Selector::from_config(&config).unwrap();
            assert!(matches!(
                selector.select(&message, &empty),
                Err(SelectError::EmptyTarget)
            ));
        }
    }

    #[test]
    fn fields_selection_is_deterministic() {
        let selector = FieldsSelector::new("user");
        let connections = candidates(4);
        let message = Message::new(json!({"user": "ada"}));

        let first = selector.select(&message, &connections).unwrap()[0].address.clone();
        for _ in 0..50 {
            let picked = selector.select(&message, &connections).unwrap();
            assert_eq!(picked.len(), 1);
            assert_eq!(picked[0].address, first);
        }
    }

    #[test]
    fn fields_selection_survives_candidate_count_change() {
        let selector = FieldsSelector::new("user");
        let message = Message::new(json!({"user": "ada"}));

        for count in [1usize, 2, 3, 7] {
            let connections = candidates(count);
            let a = selector.select(&message, &connections).unwrap()[0].address.clone();
            let b = selector.select(&message, &connections).unwrap()[0].address.clone();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn fields_selection_fails_on_missing_field() {
        let selector = FieldsSelector::new("user");
        let connections = candidates(3);
        let message = Message::new(json!({"other": "x"}));
        assert!(matches!(
            selector.select(&message, &connections),
            Err(SelectError::MissingField(field)) if field == "user"
        ));
    }

    #[test]
    fn random_selects_single_candidate_trivially() {
        let selector = RandomSelector::seeded(7);
        let connections = candidates(1);
        for _ in 0..10 {
            let picked = selector.select(&connections).unwrap();
            assert_eq!(picked.len(), 1);
            assert_eq!(picked[0].address, "net.b.in.1");
        }
    }

    #[test]
    fn random_distribution_approaches_uniform() {
        let selector = RandomSelector::seeded(42);
        let connections = candidates(5);
        let draws = 5000;

        let mut counts = [0usize; 5];
        for _ in 0..draws {
            let picked = selector.select(&connections).unwrap()[0];
            let index = picked.target.instance as usize - 1;
            counts[index] += 1;
        }

        // Expected 1000 per candidate; allow a generous tolerance.
        for count in counts {
            assert!((700..=1300).contains(&count), "skewed distribution: {counts:?}");
        }
    }

    #[test]
    fn round_robin_cycles_and_wraps() {
        let selector = RoundRobinSelector::new();
        let connections = candidates(3);

        let picks: Vec<String> = (0..4)
            .map(|_| selector.select(&connections).unwrap()[0].address.clone())
            .collect();
        assert_eq!(picks[0], "net.b.in.1");
        assert_eq!(picks[1], "net.b.in.2");
        assert_eq!(picks[2], "net.b.in.3");
        assert_eq!(picks[3], "net.b.in.1"); // wraps
    }

    #[test]
    fn round_robin_cursor_is_not_reset_by_count_change() {
        let selector = RoundRobinSelector::new();

        let two = candidates(2);
        assert_eq!(selector.select(&two).unwrap()[0].address, "net.b.in.1");
        assert_eq!(selector.select(&two).unwrap()[0].address, "net.b.in.2");

        // Candidate list grows; the cursor keeps rolling.
        let four = candidates(4);
        assert_eq!(selector.select(&four).unwrap()[0].address, "net.b.in.3");
        assert_eq!(selector.select(&four).unwrap()[0].address, "net.b.in.4");
        assert_eq!(selector.select(&four).unwrap()[0].address, "net.b.in.1");
    }

    #[test]
    fn round_robin_is_safe_under_concurrent_producers() {
        use std::sync::Arc;
        use std::thread;

        let selector = Arc::new(RoundRobinSelector::new());
        let connections = Arc::new(candidates(4));

        let mut handles = vec![];
        for _ in 0..4 {
            let selector = selector.clone();
            let connections = connections.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    let picked = selector.select(&connections).unwrap();
                    assert_eq!(picked.len(), 1);
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // 400 selections advanced the cursor 400 times.
        assert_eq!(selector.cursor.load(Ordering::Relaxed), 400);
    }

    #[test]
    fn broadcast_returns_every_candidate() {
        let selector = BroadcastSelector::new();
        let connections = candidates(3);
        let picked = selector.select(&connections).unwrap();
        assert_eq!(picked.len(), 3);
    }

    #[test]
    fn state_round_trips_through_config() {
        let mut selector = Selector::from_config(&SelectorConfig::fields("user")).unwrap();
        let state = selector.state();
        assert_eq!(state, SelectorConfig::fields("user"));

        selector.set_state(&SelectorConfig::broadcast()).unwrap();
        assert_eq!(selector.grouping(), GROUPING_BROADCAST);
    }

    #[test]
    fn fields_config_without_field_param_is_invalid() {
        let config = SelectorConfig::new(GROUPING_FIELDS);
        assert!(matches!(
            Selector::from_config(&config),
            Err(SelectError::InvalidConfig(_))
        ));
    }
}
