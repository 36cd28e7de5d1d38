//! Procedural macros for the doclink project.
//!
//! Provides `#[derive(Stamped)]`, which wires a struct's identifier and timestamp fields
//! to the insert-time stamping performed by collections.
//!
//! # Field selection
//!
//! A field receives a value when it is marked with `#[stamp(id)]`, `#[stamp(created)]` or
//! `#[stamp(updated)]`. Roles without a marked field fall back to the fields named `id`,
//! `created_at` and `updated_at`. `#[stamp(skip)]` keeps a field out of the fallback.
//!
//! Stamped values are assigned through `From`, so the identifier field may be a
//! `DocumentId`, an `Option<DocumentId>`, an `ObjectId` or a `Bson`, and timestamp fields
//! a `bson::DateTime`, an `Option<bson::DateTime>` or a `chrono::DateTime<Utc>`.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize, Stamped)]
//! struct Order {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     id: Option<DocumentId>,
//!     #[stamp(created)]
//!     placed_at: Option<DateTime>,
//!     updated_at: Option<DateTime>,
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as doclink_macros;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, parse_macro_input, spanned::Spanned};

#[proc_macro_derive(Stamped, attributes(stamp))]
pub fn derive_stamped(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_stamped(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Id,
    Created,
    Updated,
}

impl Role {
    const ALL: [Role; 3] = [Role::Id, Role::Created, Role::Updated];

    fn attribute(self) -> &'static str {
        match self {
            Role::Id => "id",
            Role::Created => "created",
            Role::Updated => "updated",
        }
    }

    fn fallback_field(self) -> &'static str {
        match self {
            Role::Id => "id",
            Role::Created => "created_at",
            Role::Updated => "updated_at",
        }
    }
}

#[derive(Default)]
struct FieldStamp {
    roles: Vec<Role>,
    skip: bool,
}

fn parse_field_stamp(field: &syn::Field) -> syn::Result<FieldStamp> {
    let mut stamp = FieldStamp::default();

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("stamp")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                stamp.skip = true;
                return Ok(());
            }
            match Role::ALL.iter().find(|role| meta.path.is_ident(role.attribute())) {
                Some(role) => {
                    stamp.roles.push(*role);
                    Ok(())
                }
                None => Err(meta.error("expected one of `id`, `created`, `updated`, `skip`")),
            }
        })?;
    }

    if stamp.skip && !stamp.roles.is_empty() {
        return Err(syn::Error::new(field.span(), "a skipped field cannot take a stamp role"));
    }
    Ok(stamp)
}

fn expand_stamped(input: DeriveInput) -> syn::Result<TokenStream2> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            Fields::Unit => {
                return Ok(emit(&input, [None, None, None]));
            }
            Fields::Unnamed(_) => {
                return Err(syn::Error::new(
                    input.ident.span(),
                    "Stamped can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "Stamped can only be derived for structs",
            ));
        }
    };

    let mut explicit: [Option<&Ident>; 3] = [None, None, None];
    let mut fallback: [Option<&Ident>; 3] = [None, None, None];

    for field in fields {
        let Some(ident) = field.ident.as_ref() else { continue };
        let stamp = parse_field_stamp(field)?;

        for role in &stamp.roles {
            let slot = &mut explicit[*role as usize];
            if slot.is_some() {
                return Err(syn::Error::new(
                    ident.span(),
                    format!("more than one field is marked `#[stamp({})]`", role.attribute()),
                ));
            }
            *slot = Some(ident);
        }

        if !stamp.skip {
            for role in Role::ALL {
                if ident == role.fallback_field() {
                    fallback[role as usize] = Some(ident);
                }
            }
        }
    }

    let chosen = [0, 1, 2].map(|i| explicit[i].or(fallback[i]));
    Ok(emit(&input, chosen))
}

fn emit(input: &DeriveInput, fields: [Option<&Ident>; 3]) -> TokenStream2 {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let [id, created, updated] = fields;
    let stamp_id = id.map(|f| {
        quote! {
            fn stamp_id(&mut self, id: ::doclink::id::DocumentId) {
                self.#f = ::core::convert::From::from(id);
            }
        }
    });
    let stamp_created = created.map(|f| {
        quote! {
            fn stamp_created(&mut self, at: ::doclink::bson::DateTime) {
                self.#f = ::core::convert::From::from(at);
            }
        }
    });
    let stamp_updated = updated.map(|f| {
        quote! {
            fn stamp_updated(&mut self, at: ::doclink::bson::DateTime) {
                self.#f = ::core::convert::From::from(at);
            }
        }
    });

    quote! {
        impl #impl_generics ::doclink::stamp::Stamped for #name #ty_generics #where_clause {
            #stamp_id
            #stamp_created
            #stamp_updated
        }
    }
}
