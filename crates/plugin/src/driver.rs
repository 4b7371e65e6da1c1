//! The driver contract.
//!
//! A driver is one strategy implementing some of a manager's operations. Each
//! manager type declares its own driver interface trait extending [`Driver`];
//! that trait carries the suitability function and the operations, each with a
//! default body that reports [`Error::UnimplementedOperation`].

use std::fmt;
use std::sync::{Arc, Weak};

use crate::dependency::{Availability, DependencyChecker, DependencySpec};
use crate::error::{Error, Result};
use crate::manager::Manager;
use crate::plugins::Plugins;
use crate::registry::DriverDescriptor;
use crate::token::Token;

/// Score returned by drivers that never declared their suitability.
///
/// Negative scores exclude a driver from automatic selection, so such a
/// driver can only be reached by explicit selection.
pub const UNSUITABLE: i32 = -1;

/// Score for drivers that are usable but should never win automatically.
pub const NEUTRAL: i32 = 0;

/// Behaviour shared by every driver, independent of its manager.
pub trait Driver: Send + Sync + 'static {
    /// The registration this driver was built from.
    fn descriptor(&self) -> &DriverDescriptor;

    /// The driver's token.
    fn token(&self) -> &Token {
        self.descriptor().token()
    }

    /// Declared dependencies.
    fn dependencies(&self) -> &DependencySpec {
        self.descriptor().dependencies()
    }

    /// Evaluate the declared dependencies against the host.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the spec contains an unknown kind.
    fn availability(&self) -> Result<Availability> {
        Ok(DependencyChecker::host().check(self.dependencies())?)
    }

    /// Whether the driver can run here.
    ///
    /// Drivers may override this to hard-code the answer.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the spec contains an unknown kind.
    fn is_available(&self) -> Result<bool> {
        Ok(self.availability()?.is_available())
    }

    /// Fail unless the driver is available.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnavailableDriver`] listing every missing requirement.
    fn require_available(&self) -> Result<()> {
        if self.is_available()? {
            return Ok(());
        }

        let mut reasons = self.availability()?.reasons().to_vec();
        if reasons.is_empty() {
            reasons.push("availability overridden by the driver".to_string());
        }
        Err(Error::UnavailableDriver {
            driver: self.token().clone(),
            reasons,
        })
    }

    /// Build the error for an operation this driver does not implement.
    fn unimplemented(&self, operation: &'static str) -> Error {
        Error::unimplemented(self.token(), operation)
    }
}

/// Construction context handed to every driver factory.
///
/// Holds the driver's descriptor, the token of its owning manager, and a
/// non-owning reference to the context that owns the manager.
///
/// The manager is referenced by token only, since the driver is built before
/// its manager exists. [`DriverContext::manager_in`] resolves it against the
/// context's [`Plugins`] table.
pub struct DriverContext<C> {
    descriptor: Arc<DriverDescriptor>,
    manager: Token,
    context: Weak<C>,
}

impl<C> DriverContext<C> {
    pub(crate) fn new(descriptor: Arc<DriverDescriptor>, manager: Token, context: Weak<C>) -> Self {
        Self {
            descriptor,
            manager,
            context,
        }
    }

    /// The driver's registration.
    #[must_use]
    pub fn descriptor(&self) -> &DriverDescriptor {
        &self.descriptor
    }

    /// Token of the owning manager.
    #[must_use]
    pub fn manager(&self) -> &Token {
        &self.manager
    }

    /// The owning manager instance within a context's plugin table.
    ///
    /// Returns `None` when the table holds no manager under this token or
    /// that manager is not of type `M`.
    #[must_use]
    pub fn manager_in<'a, M: Manager>(&self, plugins: &'a Plugins) -> Option<&'a M> {
        plugins
            .by_token(self.manager.as_str())?
            .as_any()
            .downcast_ref::<M>()
    }

    /// The owning context, if it is still alive.
    #[must_use]
    pub fn context(&self) -> Option<Arc<C>> {
        self.context.upgrade()
    }

    /// The owning context.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContextReleased`] when the context has been dropped.
    pub fn require_context(&self) -> Result<Arc<C>> {
        self.context().ok_or_else(|| Error::ContextReleased {
            driver: self.descriptor.token().clone(),
        })
    }
}

impl<C> Clone for DriverContext<C> {
    fn clone(&self) -> Self {
        Self {
            descriptor: Arc::clone(&self.descriptor),
            manager: self.manager.clone(),
            context: Weak::clone(&self.context),
        }
    }
}

impl<C> fmt::Debug for DriverContext<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverContext")
            .field("driver", self.descriptor.token())
            .field("manager", &self.manager)
            .field("attached", &(self.context.strong_count() > 0))
            .finish()
    }
}
