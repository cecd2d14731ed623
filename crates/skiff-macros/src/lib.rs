//! Procedural macros for the skiff bot framework.
//!
//! This crate provides:
//!
//! - `#[handler]` - Turns an async function into a handler whose parameter
//!   names and `#[default(...)]` values take part in argument binding
//!
//! # Handler Macro
//!
//! Plain async closures and functions are handlers already, but the
//! framework only sees their parameter types. `#[handler]` records names
//! too, so route captures bind by name:
//!
//! ```rust,ignore
//! use skiff::prelude::*;
//!
//! #[handler]
//! async fn show_page(bot: Bot, page: i64, #[default(10)] per_page: i64) -> String {
//!     format!("page {page}, {per_page} per page")
//! }
//!
//! router.on_callback("list_{page}").func(show_page);
//! ```
//!
//! The function is replaced by a unit struct of the same name implementing
//! `HandlerFn`. Use `#[handler(crate = "path")]` when the framework is not
//! reachable as `::skiff::framework`.

mod handler;

use proc_macro::TokenStream;
use syn::{ItemFn, parse_macro_input};

/// Makes an async function a named-parameter handler.
///
/// # Attributes
///
/// - `#[handler(crate = "...")]` - Path of the framework crate
///   (default: `::skiff::framework`)
/// - `#[default(expr)]` on a parameter - Value used when nothing else binds;
///   `expr` is anything `serde_json::json!` accepts
#[proc_macro_attribute]
pub fn handler(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut args = handler::HandlerArgs::default();
    let parser = syn::meta::parser(|meta| args.parse(meta));
    parse_macro_input!(attr with parser);
    let func = parse_macro_input!(item as ItemFn);

    match handler::expand(args, func) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
