use proc_macro2::{Literal, TokenStream};
use quote::quote;
use syn::LitStr;

use crate::model::{Field, Kind, Model};

pub fn expand(model: &Model) -> TokenStream {
    let ident = &model.ident;
    let name = &model.name;
    let table = option(model.table.as_ref());

    let shapes = model.fields.iter().map(shape);

    let probes = model.fields.iter().enumerate().map(|(index, field)| {
        let index = Literal::usize_unsuffixed(index);
        let probe = probe(field);
        quote! { #index => #probe, }
    });

    let assigns = model.fields.iter().enumerate().filter(|(_, field)| field.is_mapped()).map(
        |(index, field)| {
            let index = Literal::usize_unsuffixed(index);
            let field = &field.ident;
            quote! {
                #index => {
                    self.#field = ::databam::Scalar::from_value(value)?;
                    Ok(())
                }
            }
        },
    );

    quote! {
        #[automatically_derived]
        impl ::databam::Model for #ident {
            fn shape() -> ::databam::Shape {
                ::databam::Shape {
                    name: #name,
                    table: #table,
                    fields: ::std::vec![#(#shapes),*],
                }
            }
        }

        #[automatically_derived]
        impl ::databam::Record for #ident {
            fn model(&self) -> ::databam::ModelRef {
                ::databam::ModelRef::of::<Self>()
            }

            fn probe(&self, field: usize) -> ::databam::Probe<'_> {
                match field {
                    #(#probes)*
                    _ => ::databam::Probe::Zero,
                }
            }

            fn assign(
                &mut self, field: usize, value: ::databam::Value,
            ) -> ::databam::__private::anyhow::Result<()> {
                match field {
                    #(#assigns)*
                    _ => {
                        ::core::mem::drop(value);
                        Err(::databam::__private::unassignable(#name, field))
                    }
                }
            }
        }
    }
}

fn shape(field: &Field) -> TokenStream {
    let name = &field.name;
    let column = option(field.column.as_ref());
    let table = option(field.table.as_ref());
    let skip = field.skip;
    let kind = match &field.kind {
        Kind::Scalar => quote! { ::databam::Kind::Scalar },
        Kind::Optional => quote! { ::databam::Kind::Optional },
        Kind::Entity { inner, .. } => {
            quote! { ::databam::Kind::Entity(::databam::ModelRef::of::<#inner>()) }
        }
        Kind::Collection { inner, .. } => {
            quote! { ::databam::Kind::Collection(::databam::ModelRef::of::<#inner>()) }
        }
    };

    quote! {
        ::databam::FieldShape {
            name: #name,
            column: #column,
            table: #table,
            skip: #skip,
            kind: #kind,
        }
    }
}

fn probe(field: &Field) -> TokenStream {
    if field.skip {
        return quote! { ::databam::Probe::Zero };
    }

    let ident = &field.ident;
    match &field.kind {
        Kind::Scalar | Kind::Optional => quote! { ::databam::Probe::scalar(&self.#ident) },
        Kind::Entity { boxed: true, optional: true, .. } => {
            quote! { ::databam::Probe::entity(self.#ident.as_deref()) }
        }
        Kind::Entity { boxed: false, optional: true, .. } => {
            quote! { ::databam::Probe::entity(self.#ident.as_ref()) }
        }
        Kind::Entity { boxed: true, optional: false, .. } => {
            quote! { ::databam::Probe::embedded(&*self.#ident) }
        }
        Kind::Entity { boxed: false, optional: false, .. } => {
            quote! { ::databam::Probe::embedded(&self.#ident) }
        }
        Kind::Collection { boxed: true, .. } => {
            quote! { ::databam::Probe::collection(self.#ident.iter().map(|item| &**item)) }
        }
        Kind::Collection { boxed: false, .. } => {
            quote! { ::databam::Probe::collection(&self.#ident) }
        }
    }
}

fn option(value: Option<&LitStr>) -> TokenStream {
    value.map_or_else(
        || quote! { ::core::option::Option::None },
        |value| quote! { ::core::option::Option::Some(#value) },
    )
}
