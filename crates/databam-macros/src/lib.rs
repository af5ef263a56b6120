#![doc = include_str!("../README.md")]

//! # Model Derive

#![forbid(unsafe_code)]

mod expand;
mod model;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives `databam::Model` and `databam::Record` for a struct with named
/// fields.
///
/// Every field type must implement `databam::Scalar` unless it is marked
/// `#[databam(skip)]` or `#[databam(relation)]`, and the struct must
/// implement `Default`.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Default, Model)]
/// #[databam(table = "tenants")]
/// pub struct Tenant {
///     pub id: String,
///     pub creator_id: String,
///
///     #[databam(relation)]
///     pub creator: Option<Box<Person>>,
/// }
/// ```
#[proc_macro_derive(Model, attributes(databam))]
pub fn model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let model = match model::Model::try_from(&input) {
        Ok(model) => model,
        Err(e) => return e.into_compile_error().into(),
    };
    expand::expand(&model).into()
}
