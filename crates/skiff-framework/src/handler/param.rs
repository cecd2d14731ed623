//! Parameter binding specs and resolved argument values.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use skiff_core::{ChatDto, MessageDto, UpdateContext, UserDto};

use crate::bot::Bot;
use crate::file::FileRef;
use crate::router::Next;

// ============================================================================
// Declared types
// ============================================================================

/// Framework-provided values injected by type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    Bot,
    Update,
    Chat,
    User,
    Message,
    Next,
    RouteArgs,
}

/// What a handler parameter declares it accepts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum DeclaredType {
    /// A framework context value.
    Context(ContextType),
    /// A non-primitive type that may come from the service locator.
    Class(String),
    /// A scalar or array type filled from route arguments.
    Primitive(String),
    /// No usable declaration; any value is accepted.
    Untyped,
}

impl DeclaredType {
    /// Human-readable type name for diagnostics.
    pub fn name(&self) -> String {
        match self {
            Self::Context(ctx) => format!("{ctx:?}"),
            Self::Class(name) | Self::Primitive(name) => name.clone(),
            Self::Untyped => "mixed".to_string(),
        }
    }
}

/// How a Rust type binds to a parameter slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub ty: DeclaredType,
    pub nullable: bool,
}

impl Binding {
    pub fn new(ty: DeclaredType) -> Self {
        Self {
            ty,
            nullable: false,
        }
    }

    /// Marks the binding as accepting null.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

// ============================================================================
// ParamSpec
// ============================================================================

/// Metadata of one handler parameter, in declaration order.
///
/// Specs are derived once per handler identity and may be persisted in a
/// [`MetadataCache`](skiff_core::MetadataCache), hence the serde derives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name; empty when unknown (closures).
    pub name: String,
    pub ty: DeclaredType,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    /// Spec for a parameter of Rust type `T`.
    pub fn of<T: crate::handler::FromArg>(name: impl Into<String>) -> Self {
        let binding = T::binding();
        Self {
            name: name.into(),
            ty: binding.ty,
            nullable: binding.nullable,
            default: None,
        }
    }

    /// Attaches a declared default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.ty, DeclaredType::Primitive(_) | DeclaredType::Untyped)
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

// ============================================================================
// Route arguments
// ============================================================================

/// A value extracted by the router for a handler.
#[derive(Debug, Clone)]
pub enum RouteValue {
    Value(Value),
    User(UserDto),
    Users(Vec<UserDto>),
    File(FileRef),
}

impl RouteValue {
    /// The value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Value(Value::String(s)) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for RouteValue {
    fn from(s: &str) -> Self {
        Self::Value(Value::String(s.to_string()))
    }
}

impl From<String> for RouteValue {
    fn from(s: String) -> Self {
        Self::Value(Value::String(s))
    }
}

impl From<Value> for RouteValue {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

/// Arguments a route extracted from an update: named captures plus
/// positional values in capture order.
#[derive(Debug, Clone, Default)]
pub struct RouteArgs {
    named: Vec<(String, RouteValue)>,
    positional: Vec<RouteValue>,
}

impl RouteArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Args holding only positional values.
    pub fn positional_from<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<RouteValue>,
    {
        Self {
            named: Vec::new(),
            positional: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Appends a positional value.
    pub fn push(&mut self, value: impl Into<RouteValue>) -> &mut Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a named value, replacing an earlier one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RouteValue>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.named.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.named.push((name, value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&RouteValue> {
        self.named.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Named string value.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(RouteValue::as_str)
    }

    pub fn positional(&self) -> &[RouteValue] {
        &self.positional
    }

    /// Positional string value at `index`.
    pub fn nth_str(&self, index: usize) -> Option<&str> {
        self.positional.get(index).and_then(RouteValue::as_str)
    }

    pub fn named(&self) -> impl Iterator<Item = (&str, &RouteValue)> {
        self.named.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.positional.is_empty()
    }
}

// ============================================================================
// Resolved arguments
// ============================================================================

/// A type-erased service instance.
pub type ServiceArc = Arc<dyn Any + Send + Sync>;

/// One resolved handler argument, before conversion to the parameter type.
pub enum Arg {
    Bot(Bot),
    Update(Arc<UpdateContext>),
    Chat(ChatDto),
    User(UserDto),
    Message(MessageDto),
    Next(Next),
    Args(RouteArgs),
    Service(ServiceArc),
    Route(RouteValue),
    Value(Value),
    Null,
}

impl Arg {
    /// Short name of the variant, used in mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bot(_) => "bot",
            Self::Update(_) => "update",
            Self::Chat(_) => "chat",
            Self::User(_) => "user",
            Self::Message(_) => "message",
            Self::Next(_) => "next",
            Self::Args(_) => "route args",
            Self::Service(_) => "service",
            Self::Route(RouteValue::Value(_)) | Self::Value(_) => "value",
            Self::Route(RouteValue::User(_)) => "user",
            Self::Route(RouteValue::Users(_)) => "users",
            Self::Route(RouteValue::File(_)) => "file",
            Self::Null => "null",
        }
    }

    /// Flattens route values into plain arguments.
    pub(crate) fn normalize(self) -> Self {
        match self {
            Self::Route(RouteValue::Value(v)) => Self::Value(v),
            Self::Route(RouteValue::User(u)) => Self::User(u),
            Self::Value(Value::Null) => Self::Null,
            other => other,
        }
    }
}

impl From<RouteValue> for Arg {
    fn from(value: RouteValue) -> Self {
        Self::Route(value)
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Self::Route(v) => f.debug_tuple("Route").field(v).finish(),
            other => f.write_str(other.kind()),
        }
    }
}
