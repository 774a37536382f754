//! Derive macros for tether-orm.
//!
//! `#[derive(Entity)]` emits the field declarations and the object-safe accessors of an
//! entity struct. `#[derive(TetherEnum)]` maps a unit-only enum to its variant names.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod derive_entity;
mod derive_enum;
mod types;

#[proc_macro_derive(Entity, attributes(orm))]
pub fn entity_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    derive_entity::expand(ast).unwrap_or_else(syn::Error::into_compile_error).into()
}

#[proc_macro_derive(TetherEnum)]
pub fn enum_derive(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);
    derive_enum::expand(ast).unwrap_or_else(syn::Error::into_compile_error).into()
}
