//! Catalog of manager and driver types.
//!
//! Types are registered explicitly, once, with their token, dependency spec
//! and constructor. The table is append-only: entries can be flagged abstract
//! but never removed. Abstract entries stay visible for introspection and are
//! skipped when managers and drivers are instantiated.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, Weak};

use crate::dependency::DependencySpec;
use crate::driver::DriverContext;
use crate::error::ConfigurationError;
use crate::manager::{AnyManager, Dispatcher, Manager};
use crate::token::Token;

/// Constructor for a concrete driver of manager `M`.
pub type DriverFactory<M> =
    fn(DriverContext<<M as Manager>::Context>) -> Box<<M as Manager>::Driver>;

type ManagerFactory<C> = fn(
    &Registry<C>,
    Arc<ManagerDescriptor>,
    Weak<C>,
) -> Result<Box<dyn AnyManager>, ConfigurationError>;

/// Registered manager type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerDescriptor {
    name: String,
    token: Token,
    is_abstract: bool,
}

impl ManagerDescriptor {
    /// Type name the token was derived from.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The manager's token.
    #[must_use]
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Whether the manager is a non-instantiable marker.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

/// Registered driver type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverDescriptor {
    name: String,
    token: Token,
    manager: Token,
    dependencies: DependencySpec,
    is_abstract: bool,
}

impl DriverDescriptor {
    /// Type name the token was derived from.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The driver's token.
    #[must_use]
    pub fn token(&self) -> &Token {
        &self.token
    }

    /// Token of the owning manager.
    #[must_use]
    pub fn manager(&self) -> &Token {
        &self.manager
    }

    /// Declared dependencies.
    #[must_use]
    pub fn dependencies(&self) -> &DependencySpec {
        &self.dependencies
    }

    /// Whether the driver is a base-contract marker.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }
}

/// Options for registering a manager type.
#[derive(Debug, Clone)]
pub struct ManagerRegistration {
    name: String,
    is_abstract: bool,
}

impl ManagerRegistration {
    /// Register under the given type name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_abstract: false,
        }
    }

    /// Mark the manager as a non-instantiable marker.
    #[must_use]
    pub fn abstract_marker(mut self) -> Self {
        self.is_abstract = true;
        self
    }
}

/// Options for registering a driver type.
#[derive(Debug, Clone)]
pub struct DriverRegistration {
    name: String,
    dependencies: DependencySpec,
    is_abstract: bool,
}

impl DriverRegistration {
    /// Register under the given type name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dependencies: DependencySpec::default(),
            is_abstract: false,
        }
    }

    /// Declare the driver's dependencies.
    #[must_use]
    pub fn depends_on(mut self, dependencies: DependencySpec) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Mark the driver as a base-contract marker.
    #[must_use]
    pub fn abstract_marker(mut self) -> Self {
        self.is_abstract = true;
        self
    }
}

pub(crate) struct ManagerEntry<C> {
    pub(crate) descriptor: Arc<ManagerDescriptor>,
    type_id: TypeId,
    pub(crate) factory: ManagerFactory<C>,
}

pub(crate) struct DriverEntry {
    pub(crate) descriptor: Arc<DriverDescriptor>,
    pub(crate) factory: Option<Arc<dyn Any + Send + Sync>>,
}

/// Catalog of manager and driver types for contexts of type `C`.
///
/// # Example
///
/// ```ignore
/// let mut registry = Registry::new();
/// registry.register_manager::<ShellManager>(ManagerRegistration::new("ShellManager"))?;
/// registry.register_driver::<ShellManager>(
///     DriverRegistration::new("POSIX"),
///     |ctx| Box::new(Posix::new(ctx)),
/// )?;
/// ```
pub struct Registry<C> {
    managers: Vec<ManagerEntry<C>>,
    drivers: Vec<DriverEntry>,
}

impl<C> Registry<C> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            managers: Vec::new(),
            drivers: Vec::new(),
        }
    }

    /// Register a manager type.
    ///
    /// # Errors
    ///
    /// Fails when the type or its token is already registered.
    pub fn register_manager<M>(
        &mut self,
        registration: ManagerRegistration,
    ) -> Result<Token, ConfigurationError>
    where
        M: Manager<Context = C>,
        C: Send + Sync + 'static,
    {
        let type_id = TypeId::of::<M>();
        if let Some(existing) = self.managers.iter().find(|m| m.type_id == type_id) {
            return Err(ConfigurationError::DuplicateManagerType {
                name: registration.name,
                existing: existing.descriptor.token.clone(),
            });
        }

        let token = Token::from_type_name(&registration.name);
        if self.manager(token.as_str()).is_some() {
            return Err(ConfigurationError::DuplicateToken {
                scope: "managers".to_string(),
                token,
            });
        }

        self.managers.push(ManagerEntry {
            descriptor: Arc::new(ManagerDescriptor {
                name: registration.name,
                token: token.clone(),
                is_abstract: registration.is_abstract,
            }),
            type_id,
            factory: instantiate_manager::<M>,
        });
        Ok(token)
    }

    /// Register a concrete driver under manager type `M`.
    ///
    /// # Errors
    ///
    /// Fails when `M` is not registered, when the dependency spec contains an
    /// unknown kind, or when the token collides with another driver of `M`.
    pub fn register_driver<M>(
        &mut self,
        registration: DriverRegistration,
        factory: DriverFactory<M>,
    ) -> Result<Token, ConfigurationError>
    where
        M: Manager<Context = C>,
        C: 'static,
    {
        self.push_driver::<M>(registration, Some(Arc::new(factory)))
    }

    /// Register a base-contract marker under manager type `M`.
    ///
    /// # Errors
    ///
    /// Fails when `M` is not registered or the token collides.
    pub fn register_abstract_driver<M>(
        &mut self,
        name: impl Into<String>,
    ) -> Result<Token, ConfigurationError>
    where
        M: Manager<Context = C>,
        C: 'static,
    {
        self.push_driver::<M>(DriverRegistration::new(name).abstract_marker(), None)
    }

    fn push_driver<M>(
        &mut self,
        registration: DriverRegistration,
        factory: Option<Arc<dyn Any + Send + Sync>>,
    ) -> Result<Token, ConfigurationError>
    where
        M: Manager<Context = C>,
        C: 'static,
    {
        let type_id = TypeId::of::<M>();
        let Some(owner) = self.managers.iter().find(|m| m.type_id == type_id) else {
            return Err(ConfigurationError::OrphanedDriver {
                driver: registration.name,
            });
        };
        let manager = owner.descriptor.token.clone();

        registration.dependencies.validate()?;

        let token = Token::from_type_name(&registration.name);
        if self.drivers_of(manager.as_str()).any(|d| d.token == token) {
            return Err(ConfigurationError::DuplicateToken {
                scope: manager.to_string(),
                token,
            });
        }

        self.drivers.push(DriverEntry {
            descriptor: Arc::new(DriverDescriptor {
                name: registration.name,
                token: token.clone(),
                manager,
                dependencies: registration.dependencies,
                is_abstract: registration.is_abstract,
            }),
            factory,
        });
        Ok(token)
    }

    /// Flag exactly this manager as non-instantiable.
    ///
    /// # Errors
    ///
    /// Fails when no manager has that token.
    pub fn mark_abstract_manager(&mut self, manager: &str) -> Result<(), ConfigurationError> {
        let entry = self
            .managers
            .iter_mut()
            .find(|m| m.descriptor.token == manager)
            .ok_or_else(|| ConfigurationError::UnknownManager {
                manager: manager.to_string(),
            })?;
        Arc::make_mut(&mut entry.descriptor).is_abstract = true;
        Ok(())
    }

    /// Flag exactly this driver as a base-contract marker.
    ///
    /// # Errors
    ///
    /// Fails when the manager or driver token is unknown.
    pub fn mark_abstract_driver(
        &mut self,
        manager: &str,
        driver: &str,
    ) -> Result<(), ConfigurationError> {
        let Some(owner) = self.manager(manager) else {
            return Err(ConfigurationError::UnknownManager {
                manager: manager.to_string(),
            });
        };
        let owner = owner.token.clone();

        let entry = self
            .drivers
            .iter_mut()
            .find(|d| d.descriptor.manager == owner && d.descriptor.token == driver)
            .ok_or_else(|| ConfigurationError::UnknownDriver {
                manager: owner.clone(),
                driver: driver.to_string(),
            })?;
        Arc::make_mut(&mut entry.descriptor).is_abstract = true;
        Ok(())
    }

    /// All registered managers, abstract ones included, in registration order.
    pub fn managers(&self) -> impl Iterator<Item = &ManagerDescriptor> {
        self.managers.iter().map(|m| m.descriptor.as_ref())
    }

    /// Managers that can be instantiated.
    pub fn concrete_managers(&self) -> impl Iterator<Item = &ManagerDescriptor> {
        self.managers().filter(|m| !m.is_abstract)
    }

    /// Look up a manager by token.
    #[must_use]
    pub fn manager(&self, token: &str) -> Option<&ManagerDescriptor> {
        self.managers().find(|m| m.token == token)
    }

    /// Drivers declared under a manager, abstract ones included, in
    /// registration order.
    pub fn drivers_of<'a>(&'a self, manager: &'a str) -> impl Iterator<Item = &'a DriverDescriptor> {
        self.driver_entries(manager).map(|d| d.descriptor.as_ref())
    }

    /// Total number of registered manager and driver types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.managers.len() + self.drivers.len()
    }

    /// Whether nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.managers.is_empty() && self.drivers.is_empty()
    }

    pub(crate) fn manager_entries(&self) -> impl Iterator<Item = &ManagerEntry<C>> {
        self.managers.iter()
    }

    pub(crate) fn driver_entries<'a>(
        &'a self,
        manager: &'a str,
    ) -> impl Iterator<Item = &'a DriverEntry> {
        self.drivers
            .iter()
            .filter(move |d| d.descriptor.manager == manager)
    }
}

fn instantiate_manager<M: Manager>(
    registry: &Registry<M::Context>,
    descriptor: Arc<ManagerDescriptor>,
    context: Weak<M::Context>,
) -> Result<Box<dyn AnyManager>, ConfigurationError> {
    let dispatcher = Dispatcher::instantiate(registry, descriptor, context)?;
    Ok(Box::new(M::from_dispatcher(dispatcher)))
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for Registry<C> {
    fn clone(&self) -> Self {
        Self {
            managers: self
                .managers
                .iter()
                .map(|m| ManagerEntry {
                    descriptor: Arc::clone(&m.descriptor),
                    type_id: m.type_id,
                    factory: m.factory,
                })
                .collect(),
            drivers: self
                .drivers
                .iter()
                .map(|d| DriverEntry {
                    descriptor: Arc::clone(&d.descriptor),
                    factory: d.factory.clone(),
                })
                .collect(),
        }
    }
}

impl<C> fmt::Debug for Registry<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let managers: Vec<&str> = self.managers().map(|m| m.token.as_str()).collect();
        let drivers: Vec<String> = self
            .drivers
            .iter()
            .map(|d| format!("{}::{}", d.descriptor.manager, d.descriptor.token))
            .collect();
        f.debug_struct("Registry")
            .field("managers", &managers)
            .field("drivers", &drivers)
            .finish()
    }
}
