//! `#[handler]` expansion.
//!
//! ```rust,ignore
//! #[handler]
//! pub async fn greet(bot: Bot, #[default("world")] name: String) -> String { .. }
//! ```
//!
//! becomes
//!
//! ```rust,ignore
//! #[derive(Clone, Copy)]
//! pub struct greet;
//!
//! impl greet {
//!     pub async fn run(bot: Bot, name: String) -> String { .. }
//! }
//!
//! impl HandlerFn for greet {
//!     fn key(&self) -> &'static str { concat!(module_path!(), "::greet(Bot, String)") }
//!     fn params(&self) -> Vec<ParamSpec> { .. }
//!     fn call(&self, bot: Bot, args: Vec<Arg>) -> BoxFuture<'static, DispatchResult> { .. }
//! }
//! ```

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::meta::ParseNestedMeta;
use syn::spanned::Spanned;
use syn::{Expr, FnArg, ItemFn, LitStr, Pat, Path, Type};

// ============================================================================
// Attribute arguments
// ============================================================================

#[derive(Default)]
pub struct HandlerArgs {
    krate: Option<Path>,
}

impl HandlerArgs {
    pub fn parse(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        if meta.path.is_ident("crate") {
            let lit: LitStr = meta.value()?.parse()?;
            self.krate = Some(lit.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported handler attribute, expected `crate = \"...\"`"))
        }
    }

    fn krate(&self) -> TokenStream {
        match &self.krate {
            Some(path) => quote!(#path),
            None => quote!(::skiff::framework),
        }
    }
}

/// One parameter of the annotated function.
struct Param {
    name: String,
    ty: Type,
    default: Option<Expr>,
}

// ============================================================================
// Expansion
// ============================================================================

pub fn expand(args: HandlerArgs, mut func: ItemFn) -> syn::Result<TokenStream> {
    if func.sig.asyncness.is_none() {
        return Err(syn::Error::new(
            func.sig.fn_token.span(),
            "#[handler] functions must be async",
        ));
    }
    if !func.sig.generics.params.is_empty() {
        return Err(syn::Error::new(
            func.sig.generics.span(),
            "#[handler] functions cannot be generic",
        ));
    }

    let params = take_params(&mut func)?;
    let krate = args.krate();

    let name = func.sig.ident.clone();
    let vis = func.vis.clone();
    let attrs = std::mem::take(&mut func.attrs);

    func.sig.ident = format_ident!("run");

    let key = format!(
        "::{name}({})",
        params
            .iter()
            .map(|p| {
                let ty = &p.ty;
                quote!(#ty).to_string().replace(' ', "")
            })
            .collect::<Vec<_>>()
            .join(", ")
    );

    let specs = params.iter().map(|p| {
        let ty = &p.ty;
        let param_name = &p.name;
        match &p.default {
            Some(default) => quote! {
                #krate::handler::ParamSpec::of::<#ty>(#param_name)
                    .with_default(#krate::__private::serde_json::json!(#default))
            },
            None => quote! {
                #krate::handler::ParamSpec::of::<#ty>(#param_name)
            },
        }
    });

    let bindings: Vec<_> = (0..params.len()).map(|i| format_ident!("__arg{i}")).collect();
    let extracts = params.iter().zip(&bindings).map(|(p, binding)| {
        let ty = &p.ty;
        quote! {
            let #binding = #krate::handler::extract::<#ty>(
                args.next().unwrap_or(#krate::handler::Arg::Null)
            )?;
        }
    });

    Ok(quote! {
        #(#attrs)*
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug)]
        #vis struct #name;

        impl #name {
            #func
        }

        impl #krate::handler::HandlerFn for #name {
            fn key(&self) -> &'static str {
                concat!(module_path!(), #key)
            }

            fn params(&self) -> ::std::vec::Vec<#krate::handler::ParamSpec> {
                ::std::vec![#(#specs),*]
            }

            fn call(
                &self,
                bot: #krate::Bot,
                args: ::std::vec::Vec<#krate::handler::Arg>,
            ) -> #krate::handler::BoxFuture<'static, #krate::error::DispatchResult> {
                ::std::boxed::Box::pin(async move {
                    let mut args = args.into_iter();
                    #(#extracts)*
                    #krate::handler::respond(Self::run(#(#bindings),*).await, &bot).await
                })
            }
        }
    })
}

/// Collects parameter metadata and strips `#[default]` attributes.
fn take_params(func: &mut ItemFn) -> syn::Result<Vec<Param>> {
    let mut params = Vec::with_capacity(func.sig.inputs.len());

    for input in &mut func.sig.inputs {
        let FnArg::Typed(arg) = input else {
            return Err(syn::Error::new(
                input.span(),
                "#[handler] functions cannot take `self`",
            ));
        };

        let mut default = None;
        let mut kept = Vec::with_capacity(arg.attrs.len());
        for attr in arg.attrs.drain(..) {
            if attr.path().is_ident("default") {
                if default.is_some() {
                    return Err(syn::Error::new(attr.span(), "duplicate #[default]"));
                }
                default = Some(attr.parse_args::<Expr>()?);
            } else {
                kept.push(attr);
            }
        }
        arg.attrs = kept;

        let name = match &*arg.pat {
            Pat::Ident(ident) => ident.ident.to_string(),
            _ => String::new(),
        };

        params.push(Param {
            name,
            ty: (*arg.ty).clone(),
            default,
        });
    }

    Ok(params)
}
