//! Property-based tests for token derivation and driver selection.
//!
//! - Tokens: derivation is idempotent and always yields snake case
//! - Selection: the winner is the earliest-registered driver with the highest
//!   positive score, and nothing wins when every score is `<= 0`

use automate_plugin::{
    Dispatcher, Driver, DriverContext, DriverDescriptor, DriverRegistration, Manager,
    ManagerRegistration, Operation, Plugins, Registry, Token,
};
use proptest::prelude::*;
use std::sync::Arc;

// =============================================================================
// Scored context
// =============================================================================

struct Scored {
    scores: Vec<i32>,
    plugins: Plugins,
}

struct Pick;

impl Operation for Pick {
    fn name(&self) -> &'static str {
        "pick"
    }
}

trait ScoredDriver: Driver {
    fn suitability(&self) -> i32;
}

struct Slot<const N: usize> {
    ctx: DriverContext<Scored>,
}

impl<const N: usize> Slot<N> {
    #[allow(clippy::unnecessary_box_returns)]
    fn boxed(ctx: DriverContext<Scored>) -> Box<dyn ScoredDriver> {
        Box::new(Self { ctx })
    }
}

impl<const N: usize> Driver for Slot<N> {
    fn descriptor(&self) -> &DriverDescriptor {
        self.ctx.descriptor()
    }

    fn is_available(&self) -> automate_plugin::Result<bool> {
        Ok(true)
    }
}

impl<const N: usize> ScoredDriver for Slot<N> {
    fn suitability(&self) -> i32 {
        self.ctx
            .context()
            .map_or(i32::MIN, |context| context.scores[N])
    }
}

struct ScoredManager {
    dispatcher: Dispatcher<Self>,
}

impl Manager for ScoredManager {
    type Driver = dyn ScoredDriver;
    type Call<'a> = Pick;
    type Context = Scored;

    fn from_dispatcher(dispatcher: Dispatcher<Self>) -> Self {
        Self { dispatcher }
    }

    fn dispatcher(&self) -> &Dispatcher<Self> {
        &self.dispatcher
    }

    fn suitability(driver: &dyn ScoredDriver, _call: &Pick) -> i32 {
        driver.suitability()
    }
}

fn registry() -> Registry<Scored> {
    let mut registry = Registry::new();
    registry
        .register_manager::<ScoredManager>(ManagerRegistration::new("ScoredManager"))
        .unwrap();
    registry
        .register_driver::<ScoredManager>(DriverRegistration::new("Slot0"), Slot::<0>::boxed)
        .unwrap();
    registry
        .register_driver::<ScoredManager>(DriverRegistration::new("Slot1"), Slot::<1>::boxed)
        .unwrap();
    registry
        .register_driver::<ScoredManager>(DriverRegistration::new("Slot2"), Slot::<2>::boxed)
        .unwrap();
    registry
        .register_driver::<ScoredManager>(DriverRegistration::new("Slot3"), Slot::<3>::boxed)
        .unwrap();
    registry
}

fn expected_winner(scores: &[i32]) -> Option<usize> {
    let mut winner: Option<(usize, i32)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score > 0 && winner.is_none_or(|(_, best)| score > best) {
            winner = Some((i, score));
        }
    }
    winner.map(|(i, _)| i)
}

// =============================================================================
// Strategies
// =============================================================================

fn type_name_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_ -]{0,24}".prop_map(String::from)
}

fn scores_strategy() -> impl Strategy<Value = Vec<i32>> {
    prop::collection::vec(-3i32..6, 4)
}

proptest! {
    #[test]
    fn token_derivation_is_idempotent(name in type_name_strategy()) {
        let once = Token::from_type_name(&name);
        let twice = Token::from_type_name(once.as_str());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn tokens_are_snake_case(name in type_name_strategy()) {
        let token = Token::from_type_name(&name);
        let s = token.as_str();
        prop_assert!(!s.chars().any(char::is_uppercase));
        prop_assert!(!s.starts_with('_') && !s.ends_with('_'));
        prop_assert!(!s.contains("__"));
    }

    #[test]
    fn selection_prefers_highest_then_earliest(scores in scores_strategy()) {
        let registry = registry();
        let context = Arc::new_cyclic(|weak| Scored {
            scores: scores.clone(),
            plugins: Plugins::instantiate(&registry, weak).unwrap(),
        });
        let dispatcher = context.plugins.get::<ScoredManager>().unwrap().dispatcher();

        match expected_winner(&scores) {
            Some(i) => {
                let driver = dispatcher.driver_for(&Pick).unwrap();
                prop_assert_eq!(driver.token().as_str(), format!("slot{i}"));
            }
            None => {
                let err = dispatcher.driver_for(&Pick).err().unwrap();
                prop_assert!(err.is_no_suitable_driver());
            }
        }
    }

    #[test]
    fn selection_is_repeatable(scores in scores_strategy()) {
        let registry = registry();
        let context = Arc::new_cyclic(|weak| Scored {
            scores: scores.clone(),
            plugins: Plugins::instantiate(&registry, weak).unwrap(),
        });
        let dispatcher = context.plugins.get::<ScoredManager>().unwrap().dispatcher();

        let first = dispatcher.driver_for(&Pick).ok().map(|d| d.token().clone());
        let second = dispatcher.driver_for(&Pick).ok().map(|d| d.token().clone());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn default_wins_regardless_of_score(scores in scores_strategy(), pinned in 0usize..4) {
        let registry = registry();
        let context = Arc::new_cyclic(|weak| Scored {
            scores: scores.clone(),
            plugins: Plugins::instantiate(&registry, weak).unwrap(),
        });
        let dispatcher = context.plugins.get::<ScoredManager>().unwrap().dispatcher();
        let token = format!("slot{pinned}");

        dispatcher.set_default(Some(&token)).unwrap();
        let driver = dispatcher.driver_for(&Pick).unwrap();
        prop_assert_eq!(driver.token().as_str(), token.as_str());
    }
}
