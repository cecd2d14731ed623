//! Conversion of resolved arguments into handler parameter types.
//!
//! Every parameter type implements [`FromArg`], which tells the resolver
//! what the parameter declares ([`FromArg::binding`]) and converts the
//! resolved [`Arg`] into the concrete value ([`FromArg::from_arg`]).
//!
//! Scalars are lenient the way route captures need them to be: captures are
//! always strings, so integer, float and bool parameters parse strings.

use std::any::type_name;
use std::sync::Arc;

use serde_json::Value;
use skiff_core::{ChatDto, MessageDto, UpdateContext, UserDto};

use super::param::{Arg, Binding, ContextType, DeclaredType, RouteArgs, RouteValue};
use crate::bot::Bot;
use crate::error::{ExtractError, ExtractResult};
use crate::file::FileRef;
use crate::router::Next;

/// A type that can be produced from a resolved handler argument.
pub trait FromArg: Sized + Send + 'static {
    /// Declared type and nullability of a parameter of this type.
    fn binding() -> Binding;

    /// Converts the resolved argument.
    fn from_arg(arg: Arg) -> ExtractResult<Self>;
}

/// Converts `arg` into `T`, flattening route values first.
pub fn extract<T: FromArg>(arg: Arg) -> ExtractResult<T> {
    T::from_arg(arg.normalize())
}

fn mismatch<T>(arg: &Arg) -> ExtractError {
    ExtractError::Mismatch {
        expected: type_name::<T>(),
        got: arg.kind(),
    }
}

// ============================================================================
// Context types
// ============================================================================

macro_rules! impl_context_arg {
    ($ty:ty, $ctx:ident, $variant:ident) => {
        impl FromArg for $ty {
            fn binding() -> Binding {
                Binding::new(DeclaredType::Context(ContextType::$ctx))
            }

            fn from_arg(arg: Arg) -> ExtractResult<Self> {
                match arg {
                    Arg::$variant(value) => Ok(value),
                    other => Err(mismatch::<Self>(&other)),
                }
            }
        }
    };
}

impl_context_arg!(Bot, Bot, Bot);
impl_context_arg!(Arc<UpdateContext>, Update, Update);
impl_context_arg!(ChatDto, Chat, Chat);
impl_context_arg!(UserDto, User, User);
impl_context_arg!(MessageDto, Message, Message);
impl_context_arg!(Next, Next, Next);
impl_context_arg!(RouteArgs, RouteArgs, Args);

impl FromArg for Vec<UserDto> {
    fn binding() -> Binding {
        Binding::new(DeclaredType::Primitive("array".into()))
    }

    fn from_arg(arg: Arg) -> ExtractResult<Self> {
        match arg {
            Arg::Route(RouteValue::Users(users)) => Ok(users),
            Arg::User(user) => Ok(vec![user]),
            Arg::Value(value @ Value::Array(_)) => serde_json::from_value(value)
                .map_err(|e| ExtractError::custom(format!("invalid user list: {e}"))),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl FromArg for FileRef {
    fn binding() -> Binding {
        Binding::new(DeclaredType::Class(type_name::<FileRef>().into()))
    }

    fn from_arg(arg: Arg) -> ExtractResult<Self> {
        match arg {
            Arg::Route(RouteValue::File(file)) => Ok(file),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

// ============================================================================
// Scalars
// ============================================================================

impl FromArg for String {
    fn binding() -> Binding {
        Binding::new(DeclaredType::Primitive("string".into()))
    }

    fn from_arg(arg: Arg) -> ExtractResult<Self> {
        match arg {
            Arg::Value(Value::String(s)) => Ok(s),
            Arg::Value(v @ (Value::Number(_) | Value::Bool(_))) => Ok(v.to_string()),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

macro_rules! impl_int_arg {
    ($($ty:ty),*) => {
        $(
            impl FromArg for $ty {
                fn binding() -> Binding {
                    Binding::new(DeclaredType::Primitive("int".into()))
                }

                fn from_arg(arg: Arg) -> ExtractResult<Self> {
                    let parsed = match &arg {
                        Arg::Value(Value::Number(n)) => n
                            .as_i64()
                            .and_then(|n| <$ty>::try_from(n).ok())
                            .or_else(|| n.as_u64().and_then(|n| <$ty>::try_from(n).ok())),
                        Arg::Value(Value::String(s)) => s.trim().parse::<$ty>().ok(),
                        _ => None,
                    };
                    parsed.ok_or_else(|| mismatch::<Self>(&arg))
                }
            }
        )*
    };
}

impl_int_arg!(i32, i64, u32, u64, usize);

macro_rules! impl_float_arg {
    ($($ty:ty),*) => {
        $(
            impl FromArg for $ty {
                fn binding() -> Binding {
                    Binding::new(DeclaredType::Primitive("float".into()))
                }

                #[allow(clippy::cast_possible_truncation)]
                fn from_arg(arg: Arg) -> ExtractResult<Self> {
                    let parsed = match &arg {
                        Arg::Value(Value::Number(n)) => n.as_f64().map(|n| n as $ty),
                        Arg::Value(Value::String(s)) => s.trim().parse::<$ty>().ok(),
                        _ => None,
                    };
                    parsed.ok_or_else(|| mismatch::<Self>(&arg))
                }
            }
        )*
    };
}

impl_float_arg!(f32, f64);

impl FromArg for bool {
    fn binding() -> Binding {
        Binding::new(DeclaredType::Primitive("bool".into()))
    }

    fn from_arg(arg: Arg) -> ExtractResult<Self> {
        match &arg {
            Arg::Value(Value::Bool(b)) => Ok(*b),
            Arg::Value(Value::Number(n)) => Ok(n.as_f64().is_some_and(|n| n != 0.0)),
            Arg::Value(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(true),
                "false" | "0" | "no" | "off" | "" => Ok(false),
                _ => Err(mismatch::<Self>(&arg)),
            },
            _ => Err(mismatch::<Self>(&arg)),
        }
    }
}

impl FromArg for Value {
    fn binding() -> Binding {
        Binding::new(DeclaredType::Untyped).nullable()
    }

    fn from_arg(arg: Arg) -> ExtractResult<Self> {
        match arg {
            Arg::Value(v) => Ok(v),
            Arg::Null => Ok(Value::Null),
            Arg::Route(RouteValue::Users(users)) => serde_json::to_value(users)
                .map_err(|e| ExtractError::custom(e.to_string())),
            Arg::User(user) => {
                serde_json::to_value(user).map_err(|e| ExtractError::custom(e.to_string()))
            }
            Arg::Route(RouteValue::File(file)) => Ok(Value::String(file.id().to_string())),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl<T: FromArg> FromArg for Option<T> {
    fn binding() -> Binding {
        T::binding().nullable()
    }

    fn from_arg(arg: Arg) -> ExtractResult<Self> {
        match arg {
            Arg::Null => Ok(None),
            other => T::from_arg(other).map(Some),
        }
    }
}
