//! Service locator used by the dependency resolver.
//!
//! Parameters whose declared type is not a framework type and not a scalar
//! are looked up by type name in an optional [`ServiceLocator`]. The default
//! implementation, [`ServiceRegistry`], holds shared instances:
//!
//! ```rust,ignore
//! let mut services = ServiceRegistry::new();
//! services.insert(Arc::new(Db::connect(url).await?));
//! router.services(services);
//!
//! router.on_bot_command("/stats").func(|bot: Bot, db: Service<Db>| async move {
//!     bot.reply(db.stats().await).await
//! });
//! ```

use std::any::type_name;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use crate::error::{ExtractError, ExtractResult, ServiceError};
use crate::handler::{Arg, Binding, DeclaredType, FromArg, ServiceArc};

/// Optional has/get capability keyed by type name.
pub trait ServiceLocator: Send + Sync {
    fn has(&self, type_name: &str) -> bool;

    fn get(&self, type_name: &str) -> Result<ServiceArc, ServiceError>;
}

/// A map of shared service instances.
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    services: HashMap<String, ServiceArc>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service` under the type name of `T`, replacing an earlier one.
    pub fn insert<T: ?Sized + Send + Sync + 'static>(&mut self, service: Arc<T>) -> &mut Self {
        self.services
            .insert(type_name::<T>().to_string(), Arc::new(service));
        self
    }

    /// Returns the instance registered for `T`.
    pub fn get_typed<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.services
            .get(type_name::<T>())
            .and_then(|s| s.downcast_ref::<Arc<T>>())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceLocator for ServiceRegistry {
    fn has(&self, type_name: &str) -> bool {
        self.services.contains_key(type_name)
    }

    fn get(&self, type_name: &str) -> Result<ServiceArc, ServiceError> {
        self.services
            .get(type_name)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(type_name.to_string()))
    }
}

/// Handler parameter receiving a registered service.
pub struct Service<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized> Deref for Service<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized> Clone for Service<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: ?Sized + Send + Sync + 'static> FromArg for Service<T> {
    fn binding() -> Binding {
        Binding::new(DeclaredType::Class(type_name::<T>().to_string()))
    }

    fn from_arg(arg: Arg) -> ExtractResult<Self> {
        match arg {
            Arg::Service(any) => any
                .downcast_ref::<Arc<T>>()
                .cloned()
                .map(Service)
                .ok_or_else(|| {
                    ExtractError::custom(format!(
                        "registered service is not a {}",
                        type_name::<T>()
                    ))
                }),
            other => Err(ExtractError::Mismatch {
                expected: type_name::<Self>(),
                got: other.kind(),
            }),
        }
    }
}
