// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! This crate is the implementation of the `SchemaView` derive macro.
//! Please use it via the [`recfmt`](https://crates.io/crates/recfmt) crate:
//!
//! ```no_run
//! use recfmt::{Field, SchemaView};
//!
//! #[derive(SchemaView, Default)]
//! struct Exposure {
//!     duration: Field<f64>,
//!     #[view(rename = "iso")]
//!     gain: Field<u32>,
//!     #[view(skip)]
//!     frames_seen: usize,
//! }
//! ```
//!
//! Every member that isn't skipped must be a [`Field`]. It's bound to the field of the same name
//! in the block's description.
//!
//! [`Field`]: https://docs.rs/recfmt/latest/recfmt/layout/struct.Field.html

mod attributes;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr, parse_macro_input, spanned::Spanned};

use crate::attributes::{BoundMember, has_view_attribute};

#[proc_macro_derive(SchemaView, attributes(view))]
pub fn proc_macro_derive_schema_view(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_schema_view(input)
        .unwrap_or_else(to_compile_errors)
        .into()
}

fn derive_schema_view(input: DeriveInput) -> Result<TokenStream, Vec<syn::Error>> {
    let input_span = input.span();
    if has_view_attribute(&input.attrs) {
        return Err(vec![syn::Error::new(
            input_span,
            "SchemaView: `#[view(..)]` is only supported on struct members",
        )]);
    }
    let fields = match input.data {
        Data::Struct(data_struct) => match data_struct.fields {
            Fields::Named(fields) => fields.named,
            Fields::Unit => Default::default(),
            Fields::Unnamed(_) => {
                return Err(vec![syn::Error::new(
                    input_span,
                    "SchemaView: only structs with named fields are supported",
                )]);
            }
        },
        Data::Enum(_) | Data::Union(_) => {
            return Err(vec![syn::Error::new(
                input_span,
                "SchemaView: derive only works for structs",
            )]);
        }
    };

    // Collect errors so the user gets all feedback at once
    let mut errors = Vec::new();
    let mut members = Vec::new();
    for field in &fields {
        match BoundMember::new(field) {
            Ok(Some(member)) => members.push(member),
            Ok(None) => {}
            Err(mut e) => errors.append(&mut e),
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    let binds = members.iter().map(|BoundMember { ident, field_name }| {
        let name = LitStr::new(field_name, ident.span());
        quote! {
            ::recfmt::Field::bind(&mut self.#ident, schema, #name);
        }
    });
    let ident = input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::recfmt::SchemaView for #ident #ty_generics #where_clause {
            fn bind(&mut self, schema: &::recfmt::RawSchema) {
                #(#binds)*
            }
        }
    })
}

fn to_compile_errors(errors: Vec<syn::Error>) -> proc_macro2::TokenStream {
    let compile_errors = errors.iter().map(syn::Error::to_compile_error);
    quote!(#(#compile_errors)*)
}
