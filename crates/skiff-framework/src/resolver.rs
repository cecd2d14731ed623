//! Dependency resolution for handler arguments.
//!
//! For every declared parameter, in order, the first source that yields a
//! value wins:
//!
//! 1. a named route argument with the parameter's name
//! 2. a framework context value of the declared type (facade, update, chat,
//!    user, message, `next`, route args); an accessor that fails moves on
//! 3. a service registered under the declared type name (failures move on)
//! 4. the next unused positional route argument
//! 5. the declared default
//! 6. null, when the parameter is nullable
//!
//! Otherwise resolution fails with a [`ResolveError`] naming the parameter,
//! its type and the handler.
//!
//! Parameter specs are cached per handler identity in a process-local map
//! and, optionally, in a persistent [`MetadataCache`] so restarts skip
//! introspection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use skiff_core::BoxedCache;
use tracing::{debug, trace, warn};

use crate::bot::Bot;
use crate::error::ResolveError;
use crate::handler::{Arg, ContextType, DeclaredType, Handler, ParamSpec, RouteArgs};
use crate::router::Next;
use crate::service::ServiceLocator;

/// TTL of persisted handler metadata.
pub const METADATA_TTL: Duration = Duration::from_secs(86_400);

/// Cache key of a handler identity in the persistent tier.
pub fn metadata_key(identity: &str) -> String {
    format!("handler_meta_{}", hex::encode(Sha256::digest(identity.as_bytes())))
}

/// Builds handler argument lists.
#[derive(Default)]
pub struct DependencyResolver {
    local: RwLock<HashMap<String, Arc<[ParamSpec]>>>,
    persistent: Option<BoxedCache>,
    services: Option<Arc<dyn ServiceLocator>>,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a persistent metadata tier.
    pub fn with_cache(mut self, cache: BoxedCache) -> Self {
        self.persistent = Some(cache);
        self
    }

    /// Adds a service locator.
    pub fn with_services(mut self, services: Arc<dyn ServiceLocator>) -> Self {
        self.services = Some(services);
        self
    }

    /// Returns the parameter specs of `handler`, introspecting on a miss.
    pub async fn metadata(&self, handler: &Handler) -> Arc<[ParamSpec]> {
        if let Some(specs) = self.local.read().get(handler.key()) {
            return Arc::clone(specs);
        }

        let key = metadata_key(handler.key());

        if let Some(cache) = &self.persistent
            && let Some(value) = cache.get(&key).await
        {
            match serde_json::from_value::<Vec<ParamSpec>>(value) {
                Ok(specs) => {
                    trace!(handler = handler.key(), "Handler metadata loaded from cache");
                    return self.remember(handler, specs.into());
                }
                Err(e) => warn!(handler = handler.key(), error = %e, "Discarding corrupt handler metadata"),
            }
        }

        let specs: Arc<[ParamSpec]> = handler.introspect().into();
        debug!(handler = handler.key(), params = specs.len(), "Introspected handler");

        if let Some(cache) = &self.persistent {
            match serde_json::to_value(&*specs) {
                Ok(value) => {
                    if let Err(e) = cache.set(&key, value, METADATA_TTL).await {
                        warn!(handler = handler.key(), error = %e, "Failed to persist handler metadata");
                    }
                }
                Err(e) => warn!(handler = handler.key(), error = %e, "Failed to encode handler metadata"),
            }
        }

        self.remember(handler, specs)
    }

    fn remember(&self, handler: &Handler, specs: Arc<[ParamSpec]>) -> Arc<[ParamSpec]> {
        self.local
            .write()
            .entry(handler.key().to_string())
            .or_insert(specs)
            .clone()
    }

    /// Resolves the argument list for one invocation of `handler`.
    ///
    /// `next` is handed to the first parameter asking for it.
    pub async fn resolve(
        &self,
        handler: &Handler,
        bot: &Bot,
        args: &RouteArgs,
        mut next: Option<Next>,
    ) -> Result<Vec<Arg>, ResolveError> {
        let specs = self.metadata(handler).await;
        let mut positional = args.positional().iter();
        let mut resolved = Vec::with_capacity(specs.len());

        for (index, spec) in specs.iter().enumerate() {
            if !spec.name.is_empty()
                && let Some(value) = args.get(&spec.name)
            {
                resolved.push(Arg::Route(value.clone()));
                continue;
            }

            if let DeclaredType::Context(kind) = &spec.ty
                && let Some(arg) = context_arg(*kind, bot, args, &mut next)
            {
                resolved.push(arg);
                continue;
            }

            if let DeclaredType::Class(name) = &spec.ty
                && let Some(arg) = self.service_arg(name)
            {
                resolved.push(arg);
                continue;
            }

            if let Some(value) = positional.next() {
                resolved.push(Arg::Route(value.clone()));
                continue;
            }

            if let Some(default) = &spec.default {
                resolved.push(Arg::Value(default.clone()));
                continue;
            }

            if spec.nullable {
                resolved.push(Arg::Null);
                continue;
            }

            return Err(ResolveError {
                param: if spec.name.is_empty() {
                    format!("#{index}")
                } else {
                    spec.name.clone()
                },
                ty: spec.ty.name(),
                handler: handler.key().to_string(),
            });
        }

        Ok(resolved)
    }

    fn service_arg(&self, type_name: &str) -> Option<Arg> {
        let services = self.services.as_ref()?;
        if !services.has(type_name) {
            return None;
        }
        match services.get(type_name) {
            Ok(service) => Some(Arg::Service(service)),
            Err(e) => {
                debug!(service = type_name, error = %e, "Service lookup failed");
                None
            }
        }
    }
}

fn context_arg(kind: ContextType, bot: &Bot, args: &RouteArgs, next: &mut Option<Next>) -> Option<Arg> {
    match kind {
        ContextType::Bot => Some(Arg::Bot(bot.clone())),
        ContextType::Update => Some(Arg::Update(bot.context_arc())),
        ContextType::Chat => bot.chat().ok().map(Arg::Chat),
        ContextType::User => bot.user().ok().map(Arg::User),
        ContextType::Message => bot.message().ok().map(Arg::Message),
        ContextType::Next => next.take().map(Arg::Next),
        ContextType::RouteArgs => Some(Arg::Args(args.clone())),
    }
}
