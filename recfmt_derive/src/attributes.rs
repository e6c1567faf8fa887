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

//! Attributes of the members of a `SchemaView` struct.

use darling::FromAttributes;
use syn::{Attribute, Field, Ident, ext::IdentExt, spanned::Spanned};

/// All the attributes a member can have.
#[derive(FromAttributes, Default)]
#[darling(attributes(view))]
pub struct FieldAttributes {
    /// Look the field up under this name instead of the member's name.
    #[darling(default)]
    pub rename: Option<String>,
    /// Leave the member alone when binding.
    #[darling(default)]
    pub skip: bool,
}

/// A member that is bound to a schema field.
pub struct BoundMember {
    pub ident: Ident,
    pub field_name: String,
}

impl BoundMember {
    /// Returns `None` for skipped members.
    pub fn new(field: &Field) -> Result<Option<Self>, Vec<syn::Error>> {
        let Some(ident) = field.ident.clone() else {
            return Err(vec![syn::Error::new(
                field.span(),
                "SchemaView: only structs with named fields are supported",
            )]);
        };
        let attributes = FieldAttributes::from_attributes(&field.attrs).map_err(darling_to_syn)?;
        if attributes.skip {
            if attributes.rename.is_some() {
                return Err(vec![syn::Error::new(
                    field.span(),
                    "SchemaView: `rename` has no effect on a skipped member",
                )]);
            }
            return Ok(None);
        }
        let field_name = match attributes.rename {
            Some(name) if name.is_empty() => {
                return Err(vec![syn::Error::new(
                    field.span(),
                    "SchemaView: `rename` can't be empty",
                )]);
            }
            Some(name) => name,
            None => ident.unraw().to_string(),
        };
        Ok(Some(Self { ident, field_name }))
    }
}

/// Whether any of the attributes is one of ours, to reject them where they aren't supported.
pub fn has_view_attribute(attributes: &[Attribute]) -> bool {
    attributes
        .iter()
        .any(|attribute| attribute.path().is_ident("view"))
}

fn darling_to_syn(e: darling::Error) -> Vec<syn::Error> {
    let msg = format!("{e}");
    let token_errors = e.write_errors();
    vec![syn::Error::new(token_errors.span(), msg)]
}
