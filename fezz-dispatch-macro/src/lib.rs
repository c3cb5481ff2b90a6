//! Procedural macros for the Fezz dispatch core.
//!
//! This crate provides the `#[message_function]` and `#[request_function]`
//! attribute macros, which turn a plain async function into a registered
//! handler type.
//!
//! # Example
//!
//! ```ignore
//! use fezz_dispatch::prelude::*;
//!
//! #[message_function(name = "order-created", destination = "orders", group = "processing")]
//! async fn order_created(order: OrderCreated, ctx: &InvocationContext) -> Result<(), FezzError> {
//!     Ok(())
//! }
//!
//! let module = StaticModule::new("orders").with(OrderCreatedHandler::type_info());
//! ```

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, punctuated::Punctuated, Expr, ExprLit, FnArg, ItemFn, Lit, Meta, Token,
    Type,
};

/// Attributes shared by both handler macros.
#[derive(Default, Debug)]
struct HandlerAttrs {
    /// Handler identity.
    name: Option<String>,
    /// Destination (topic/queue).
    destination: Option<String>,
    /// Group (subscription).
    group: Option<String>,
    /// Connection reference.
    connection: Option<String>,
}

impl HandlerAttrs {
    fn parse_meta_list(metas: Punctuated<Meta, Token![,]>, allow_route: bool) -> syn::Result<Self> {
        let mut attrs = HandlerAttrs::default();

        for meta in metas {
            let nv = match meta {
                Meta::NameValue(nv) => nv,
                other => {
                    return Err(syn::Error::new_spanned(other, "expected name = \"value\""));
                }
            };
            let ident = nv
                .path
                .get_ident()
                .ok_or_else(|| syn::Error::new_spanned(&nv.path, "expected identifier"))?
                .to_string();

            let value = match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(lit_str),
                    ..
                }) => lit_str.value(),
                _ => return Err(syn::Error::new_spanned(&nv.value, "expected string literal")),
            };

            let slot = match ident.as_str() {
                "name" => &mut attrs.name,
                "destination" if allow_route => &mut attrs.destination,
                "group" if allow_route => &mut attrs.group,
                "connection" if allow_route => &mut attrs.connection,
                _ => {
                    return Err(syn::Error::new_spanned(
                        nv.path,
                        format!("unknown attribute: {}", ident),
                    ));
                }
            };
            *slot = Some(value);
        }

        Ok(attrs)
    }
}

/// Declare a message handler.
///
/// The annotated function must be `async`, take the payload by value and an
/// `&InvocationContext`, and return `Result<(), FezzError>`. The payload
/// type is taken from the first argument.
///
/// # Attributes
///
/// - `name` (optional): handler identity (default: the function name with
///   `_` replaced by `-`)
/// - `destination`, `group`, `connection` (optional): explicit route
///   metadata, which wins over configuration
///
/// Generates `<FnName>Handler` implementing `MessageHandler`, with a
/// `type_info()` constructor for `StaticModule::with`.
#[proc_macro_attribute]
pub fn message_function(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args with Punctuated::<Meta, Token![,]>::parse_terminated);
    let input_fn = parse_macro_input!(input as ItemFn);

    match generate_message_function(args, input_fn) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Declare a request handler.
///
/// The annotated function must be `async`, take a `FezzRequest` and an
/// `&InvocationContext`, and return `Result<ActionResult, FezzError>`.
///
/// # Attributes
///
/// - `name` (optional): handler identity (default: the function name with
///   `_` replaced by `-`)
#[proc_macro_attribute]
pub fn request_function(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args with Punctuated::<Meta, Token![,]>::parse_terminated);
    let input_fn = parse_macro_input!(input as ItemFn);

    match generate_request_function(args, input_fn) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_message_function(
    args: Punctuated<Meta, Token![,]>,
    input_fn: ItemFn,
) -> syn::Result<proc_macro2::TokenStream> {
    let attrs = HandlerAttrs::parse_meta_list(args, true)?;
    check_signature(&input_fn, "message_function")?;

    let payload_ty = payload_type(&input_fn)?;
    let fn_name = &input_fn.sig.ident;
    let fn_vis = &input_fn.vis;
    let struct_name = format_ident!("{}Handler", to_pascal_case(&fn_name.to_string()));
    let handler_name = attrs
        .name
        .unwrap_or_else(|| fn_name.to_string().replace('_', "-"));

    let destination = attrs.destination.map(|d| quote! { route = route.destination(#d); });
    let group = attrs.group.map(|g| quote! { route = route.group(#g); });
    let connection = attrs.connection.map(|c| quote! { route = route.connection(#c); });

    let expanded = quote! {
        /// Generated message handler.
        #[derive(Debug, Default, Clone, Copy)]
        #fn_vis struct #struct_name;

        impl #struct_name {
            /// Handler identity.
            pub const NAME: &'static str = #handler_name;

            /// Create a new instance of the handler.
            pub fn new() -> Self {
                Self
            }

            /// Registration entry for a `StaticModule`.
            pub fn type_info() -> ::fezz_dispatch::registry::TypeInfo {
                ::fezz_dispatch::registry::TypeInfo::message::<Self>(Self::NAME)
            }
        }

        #[::fezz_dispatch::prelude::async_trait]
        impl ::fezz_dispatch::handler::MessageHandler for #struct_name {
            type Payload = #payload_ty;

            async fn handle(
                &self,
                payload: #payload_ty,
                ctx: &::fezz_dispatch::handler::InvocationContext,
            ) -> ::core::result::Result<(), ::fezz_dispatch::error::FezzError> {
                #fn_name(payload, ctx).await
            }

            fn route() -> ::fezz_dispatch::route::RouteMetadata {
                #[allow(unused_mut)]
                let mut route = ::fezz_dispatch::route::RouteMetadata::new();
                #destination
                #group
                #connection
                route
            }
        }

        #input_fn
    };

    Ok(expanded)
}

fn generate_request_function(
    args: Punctuated<Meta, Token![,]>,
    input_fn: ItemFn,
) -> syn::Result<proc_macro2::TokenStream> {
    let attrs = HandlerAttrs::parse_meta_list(args, false)?;
    check_signature(&input_fn, "request_function")?;

    let fn_name = &input_fn.sig.ident;
    let fn_vis = &input_fn.vis;
    let struct_name = format_ident!("{}Handler", to_pascal_case(&fn_name.to_string()));
    let handler_name = attrs
        .name
        .unwrap_or_else(|| fn_name.to_string().replace('_', "-"));

    let expanded = quote! {
        /// Generated request handler.
        #[derive(Debug, Default, Clone, Copy)]
        #fn_vis struct #struct_name;

        impl #struct_name {
            /// Handler identity.
            pub const NAME: &'static str = #handler_name;

            /// Create a new instance of the handler.
            pub fn new() -> Self {
                Self
            }

            /// Registration entry for a `StaticModule`.
            pub fn type_info() -> ::fezz_dispatch::registry::TypeInfo {
                ::fezz_dispatch::registry::TypeInfo::request::<Self>(Self::NAME)
            }
        }

        #[::fezz_dispatch::prelude::async_trait]
        impl ::fezz_dispatch::handler::RequestHandler for #struct_name {
            async fn handle(
                &self,
                request: ::fezz_dispatch::http::FezzRequest,
                ctx: &::fezz_dispatch::handler::InvocationContext,
            ) -> ::core::result::Result<::fezz_dispatch::http::ActionResult, ::fezz_dispatch::error::FezzError> {
                #fn_name(request, ctx).await
            }
        }

        #input_fn
    };

    Ok(expanded)
}

/// Both macros wrap an async function of exactly two arguments.
fn check_signature(input_fn: &ItemFn, macro_name: &str) -> syn::Result<()> {
    if input_fn.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            &input_fn.sig,
            format!("{} must be async", macro_name),
        ));
    }
    if input_fn.sig.inputs.len() != 2 {
        return Err(syn::Error::new_spanned(
            &input_fn.sig.inputs,
            format!("{} takes (payload, &InvocationContext)", macro_name),
        ));
    }
    Ok(())
}

/// Type of the first, by-value argument.
fn payload_type(input_fn: &ItemFn) -> syn::Result<Type> {
    match input_fn.sig.inputs.first() {
        Some(FnArg::Typed(pat_type)) => match pat_type.ty.as_ref() {
            Type::Reference(reference) => Err(syn::Error::new_spanned(
                reference,
                "the payload must be taken by value",
            )),
            ty => Ok(ty.clone()),
        },
        Some(other) => Err(syn::Error::new_spanned(other, "expected a payload argument")),
        None => Err(syn::Error::new_spanned(&input_fn.sig, "missing payload argument")),
    }
}

/// Convert a snake_case string to PascalCase.
fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}
