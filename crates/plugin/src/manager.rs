//! Manager facades and the dispatch engine behind them.
//!
//! A manager type exposes a closed set of operations. Each operation is an
//! explicit method on the manager that describes the call as a
//! [`Manager::Call`] value and hands it to its [`Dispatcher`], which picks one
//! driver and invokes the matching driver interface method.
//!
//! # Selection
//!
//! 1. Candidates are the concrete drivers registered under the manager, in
//!    registration order.
//! 2. A per-call target or the sticky default bypasses availability and
//!    suitability entirely.
//! 3. Unavailable drivers are dropped.
//! 4. Drivers scoring `<= 0` are dropped; the highest score wins and ties go to
//!    the earliest registered driver.
//! 5. No survivor is [`Error::NoSuitableDriver`].

use indexmap::IndexMap;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use tracing::{debug, trace};

use crate::driver::{Driver, DriverContext};
use crate::error::{ConfigurationError, Error, Result};
use crate::registry::{DriverFactory, ManagerDescriptor, Registry};
use crate::token::Token;

/// A described call to one of a manager's operations.
pub trait Operation {
    /// Operation name, used in errors and logs.
    fn name(&self) -> &'static str;

    /// Driver explicitly requested for this call, if any.
    fn target(&self) -> Option<&str> {
        None
    }
}

/// A manager type: a dispatch facade over a set of drivers.
///
/// # Example
///
/// ```ignore
/// pub struct ShellManager {
///     dispatcher: Dispatcher<Self>,
/// }
///
/// impl Manager for ShellManager {
///     type Driver = dyn ShellDriver;
///     type Call<'a> = ShellCall<'a>;
///     type Context = Interpreter;
///
///     fn from_dispatcher(dispatcher: Dispatcher<Self>) -> Self {
///         Self { dispatcher }
///     }
///
///     fn dispatcher(&self) -> &Dispatcher<Self> {
///         &self.dispatcher
///     }
///
///     fn suitability(driver: &dyn ShellDriver, call: &ShellCall<'_>) -> i32 {
///         driver.suitability(call)
///     }
/// }
/// ```
pub trait Manager: Send + Sync + Sized + 'static {
    /// The driver interface implemented by every driver of this manager.
    type Driver: ?Sized + Driver;

    /// Description of a call to one of the manager's operations.
    type Call<'a>: Operation;

    /// The context that owns the manager.
    type Context: Send + Sync + 'static;

    /// Wrap a freshly instantiated dispatcher.
    fn from_dispatcher(dispatcher: Dispatcher<Self>) -> Self;

    /// The manager's dispatcher.
    fn dispatcher(&self) -> &Dispatcher<Self>;

    /// Ask a driver how suitable it is for a call.
    fn suitability(driver: &Self::Driver, call: &Self::Call<'_>) -> i32;
}

/// Object-safe view of any manager, used by contexts that hold managers of
/// different types side by side.
pub trait AnyManager: Send + Sync + 'static {
    /// The manager's registration.
    fn descriptor(&self) -> &ManagerDescriptor;

    /// The manager's token.
    fn token(&self) -> &Token {
        self.descriptor().token()
    }

    /// Tokens of the concrete drivers, in registration order.
    fn driver_tokens(&self) -> Vec<Token>;

    /// The sticky default driver, if set.
    fn default_driver(&self) -> Option<Token>;

    /// Set or clear the sticky default driver.
    ///
    /// # Errors
    ///
    /// Fails when the token does not name a concrete driver.
    fn set_default(&self, driver: Option<&str>) -> Result<()>;

    /// Downcast support.
    fn as_any(&self) -> &dyn Any;
}

impl<M: Manager> AnyManager for M {
    fn descriptor(&self) -> &ManagerDescriptor {
        self.dispatcher().descriptor()
    }

    fn driver_tokens(&self) -> Vec<Token> {
        self.dispatcher().driver_tokens()
    }

    fn default_driver(&self) -> Option<Token> {
        self.dispatcher().default_driver()
    }

    fn set_default(&self, driver: Option<&str>) -> Result<()> {
        self.dispatcher().set_default(driver)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Owns a manager's drivers and selects one per call.
pub struct Dispatcher<M: Manager> {
    descriptor: Arc<ManagerDescriptor>,
    drivers: Vec<Box<M::Driver>>,
    index: HashMap<Token, usize>,
    declared: usize,
    default: RwLock<Option<Token>>,
    context: Weak<M::Context>,
}

impl<M: Manager> Dispatcher<M> {
    /// Build one instance of every concrete driver declared under the manager.
    pub(crate) fn instantiate(
        registry: &Registry<M::Context>,
        descriptor: Arc<ManagerDescriptor>,
        context: Weak<M::Context>,
    ) -> std::result::Result<Self, ConfigurationError> {
        let manager = descriptor.token().clone();
        let mut drivers: Vec<Box<M::Driver>> = Vec::new();
        let mut index = HashMap::new();
        let mut declared = 0;

        for entry in registry.driver_entries(manager.as_str()) {
            declared += 1;
            if entry.descriptor.is_abstract() {
                continue;
            }

            let factory = entry
                .factory
                .as_ref()
                .and_then(|f| f.downcast_ref::<DriverFactory<M>>())
                .ok_or_else(|| ConfigurationError::InterfaceMismatch {
                    manager: manager.clone(),
                    driver: entry.descriptor.token().clone(),
                })?;

            let ctx = DriverContext::new(
                Arc::clone(&entry.descriptor),
                manager.clone(),
                Weak::clone(&context),
            );
            index.insert(entry.descriptor.token().clone(), drivers.len());
            drivers.push(factory(ctx));
        }

        debug!(
            manager = %manager,
            drivers = drivers.len(),
            declared,
            "Instantiated manager"
        );

        Ok(Self {
            descriptor,
            drivers,
            index,
            declared,
            default: RwLock::new(None),
            context,
        })
    }

    /// The manager's registration.
    #[must_use]
    pub fn descriptor(&self) -> &ManagerDescriptor {
        &self.descriptor
    }

    /// The manager's token.
    #[must_use]
    pub fn token(&self) -> &Token {
        self.descriptor.token()
    }

    /// The owning context, if it is still alive.
    #[must_use]
    pub fn context(&self) -> Option<Arc<M::Context>> {
        self.context.upgrade()
    }

    /// Concrete drivers in registration order.
    pub fn drivers(&self) -> impl Iterator<Item = &M::Driver> {
        self.drivers.iter().map(|d| &**d)
    }

    /// Tokens of the concrete drivers in registration order.
    #[must_use]
    pub fn driver_tokens(&self) -> Vec<Token> {
        self.drivers().map(|d| d.token().clone()).collect()
    }

    /// Retrieve a driver by token, bypassing ranking.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoDrivers`] when no driver types are declared under
    /// the manager at all, and a configuration error when the token does not
    /// name one of its concrete drivers.
    pub fn lookup(&self, driver: &str) -> Result<&M::Driver> {
        if self.declared == 0 {
            return Err(Error::NoDrivers {
                manager: self.token().clone(),
            });
        }

        self.index
            .get(driver)
            .map(|&i| &*self.drivers[i])
            .ok_or_else(|| {
                ConfigurationError::UnknownDriver {
                    manager: self.token().clone(),
                    driver: driver.to_string(),
                }
                .into()
            })
    }

    /// Pin a driver for every future call, or clear the pin with `None`.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigurationError::UnknownDriver`] when the token does
    /// not name a concrete driver, including on a manager without drivers.
    pub fn set_default(&self, driver: Option<&str>) -> Result<()> {
        let token = match driver {
            Some(driver) => match self.lookup(driver) {
                Ok(found) => Some(found.token().clone()),
                Err(Error::NoDrivers { manager }) => {
                    return Err(ConfigurationError::UnknownDriver {
                        manager,
                        driver: driver.to_string(),
                    }
                    .into());
                }
                Err(err) => return Err(err),
            },
            None => None,
        };

        debug!(manager = %self.token(), default = ?token, "Setting default driver");
        *self.default.write().unwrap_or_else(PoisonError::into_inner) = token;
        Ok(())
    }

    /// Remove the sticky default.
    pub fn clear_default(&self) {
        *self.default.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// The sticky default driver, if set.
    #[must_use]
    pub fn default_driver(&self) -> Option<Token> {
        self.default
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Suitability of every available driver for a call.
    ///
    /// Unavailable drivers are omitted rather than reported as zero.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a dependency spec is malformed.
    pub fn suitability_levels_for(&self, call: &M::Call<'_>) -> Result<IndexMap<Token, i32>> {
        let mut levels = IndexMap::new();
        for driver in self.drivers() {
            if driver.is_available()? {
                levels.insert(driver.token().clone(), M::suitability(driver, call));
            }
        }
        Ok(levels)
    }

    /// Select the driver that would serve a call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuitableDriver`] when no candidate survives, and the
    /// lookup errors of [`Dispatcher::lookup`] for explicit selections.
    pub fn driver_for(&self, call: &M::Call<'_>) -> Result<&M::Driver> {
        let operation = call.name();

        if let Some(target) = call.target() {
            debug!(manager = %self.token(), operation, driver = target, "Using requested driver");
            return self.lookup(target);
        }

        if let Some(default) = self.default_driver() {
            debug!(manager = %self.token(), operation, driver = %default, "Using default driver");
            return self.lookup(default.as_str());
        }

        let mut winner: Option<(&M::Driver, i32)> = None;
        for driver in self.drivers() {
            if !driver.is_available()? {
                trace!(manager = %self.token(), driver = %driver.token(), "Skipping unavailable driver");
                continue;
            }

            let score = M::suitability(driver, call);
            trace!(manager = %self.token(), driver = %driver.token(), operation, score, "Scored driver");
            if score <= 0 {
                continue;
            }
            if winner.is_none_or(|(_, best)| score > best) {
                winner = Some((driver, score));
            }
        }

        match winner {
            Some((driver, score)) => {
                debug!(
                    manager = %self.token(),
                    operation,
                    driver = %driver.token(),
                    score,
                    "Selected driver"
                );
                Ok(driver)
            }
            None => Err(Error::no_suitable_driver(self.token(), operation)),
        }
    }

    /// Whether some driver would be selected for a call.
    ///
    /// # Errors
    ///
    /// Propagates every selection error except [`Error::NoSuitableDriver`].
    pub fn can_dispatch(&self, call: &M::Call<'_>) -> Result<bool> {
        match self.driver_for(call) {
            Ok(_) => Ok(true),
            Err(err) if err.is_no_suitable_driver() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Select a driver and invoke the operation on it.
    ///
    /// The driver's result is returned unmodified.
    ///
    /// # Errors
    ///
    /// Selection errors are converted into `E`; errors from the operation
    /// itself propagate unchanged.
    pub fn dispatch<T, E>(
        &self,
        call: &M::Call<'_>,
        invoke: impl FnOnce(&M::Driver) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<Error>,
    {
        let driver = self.driver_for(call)?;
        invoke(driver)
    }

    /// Like [`Dispatcher::dispatch`], but a call no driver can serve yields
    /// `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Every error other than the selection's own "no suitable driver"
    /// propagates, including any raised by the operation.
    pub fn dispatch_safely<T, E>(
        &self,
        call: &M::Call<'_>,
        invoke: impl FnOnce(&M::Driver) -> std::result::Result<T, E>,
    ) -> std::result::Result<Option<T>, E>
    where
        E: From<Error>,
    {
        match self.driver_for(call) {
            Ok(driver) => invoke(driver).map(Some),
            Err(err) if err.is_no_suitable_driver() => {
                debug!(manager = %self.token(), operation = call.name(), "No driver for optional call");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }
}

impl<M: Manager> fmt::Debug for Dispatcher<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("manager", self.token())
            .field("drivers", &self.driver_tokens())
            .field("default", &self.default_driver())
            .finish()
    }
}
