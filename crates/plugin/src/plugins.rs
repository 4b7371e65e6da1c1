//! The per-context table of instantiated managers.

use indexmap::IndexMap;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::info;

use crate::error::ConfigurationError;
use crate::manager::{AnyManager, Manager};
use crate::registry::Registry;
use crate::token::Token;

/// One instance of every concrete manager, keyed by token.
///
/// Built once per context. Managers hold a non-owning reference back to the
/// context, so the context owns the table and nothing in the table keeps the
/// context alive.
#[derive(Default)]
pub struct Plugins {
    managers: IndexMap<Token, Box<dyn AnyManager>>,
}

impl Plugins {
    /// Instantiate every concrete manager in the registry, and every concrete
    /// driver under each.
    ///
    /// # Errors
    ///
    /// Fails when a driver factory does not match its manager's interface.
    pub fn instantiate<C>(
        registry: &Registry<C>,
        context: &Weak<C>,
    ) -> Result<Self, ConfigurationError> {
        let mut managers = IndexMap::new();

        for entry in registry.manager_entries() {
            if entry.descriptor.is_abstract() {
                continue;
            }

            let manager = (entry.factory)(
                registry,
                Arc::clone(&entry.descriptor),
                Weak::clone(context),
            )?;
            info!(
                manager = %manager.token(),
                drivers = ?manager.driver_tokens(),
                "Loaded manager"
            );
            managers.insert(entry.descriptor.token().clone(), manager);
        }

        Ok(Self { managers })
    }

    /// The instance of manager type `M`, if it was instantiated.
    #[must_use]
    pub fn get<M: Manager>(&self) -> Option<&M> {
        self.managers
            .values()
            .find_map(|m| m.as_any().downcast_ref::<M>())
    }

    /// The manager registered under a token.
    #[must_use]
    pub fn by_token(&self, token: &str) -> Option<&dyn AnyManager> {
        self.managers.get(token).map(|m| &**m)
    }

    /// Manager tokens in registration order.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.managers.keys()
    }

    /// Managers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&Token, &dyn AnyManager)> {
        self.managers.iter().map(|(k, v)| (k, &**v))
    }

    /// Number of instantiated managers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.managers.len()
    }

    /// Whether no managers were instantiated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }
}

impl fmt::Debug for Plugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugins")
            .field("managers", &self.managers.keys().collect::<Vec<_>>())
            .finish()
    }
}
