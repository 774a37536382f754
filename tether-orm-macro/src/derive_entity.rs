//! # Entity Derive Macro Implementation
//!
//! Expands `#[derive(Entity)]` into the `Entity` and `Record` impls of a struct with named
//! fields. Field behavior is controlled by `#[orm(...)]`:
//!
//! * `primary_key`, `auto_increment`, `unique`, `nullable`
//! * `foreign_key = "Parent::column"`, with optional `parent_reference = "field"` (the
//!   parent field that receives this entity) and `child_reference = "field"` (the field on
//!   this entity that receives the parent)
//! * `enumeration` for a `#[derive(TetherEnum)]` type stored by variant name
//! * `encoded = "int"` for a column produced by a model codec override
//! * `reference` for a field holding related entities (`Vec<T>`, `Option<T>`, `Option<Box<T>>`)
//! * `transient` for a field that is not mapped at all

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Ident, LitStr, Type};

use crate::types::{self, ReferenceShape};

#[derive(Default)]
struct FieldOptions {
    primary_key: bool,
    auto_increment: bool,
    unique: bool,
    nullable: bool,
    transient: bool,
    reference: bool,
    enumeration: bool,
    encoded: Option<LitStr>,
    foreign_key: Option<(String, String)>,
    parent_reference: Option<String>,
    child_reference: Option<String>,
}

fn parse_options(field: &Field) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();

    for attr in &field.attrs {
        if !attr.path().is_ident("orm") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("primary_key") {
                options.primary_key = true;
            } else if meta.path.is_ident("auto_increment") {
                options.auto_increment = true;
            } else if meta.path.is_ident("unique") {
                options.unique = true;
            } else if meta.path.is_ident("nullable") {
                options.nullable = true;
            } else if meta.path.is_ident("transient") {
                options.transient = true;
            } else if meta.path.is_ident("reference") {
                options.reference = true;
            } else if meta.path.is_ident("enumeration") {
                options.enumeration = true;
            } else if meta.path.is_ident("encoded") {
                options.encoded = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("foreign_key") {
                let value: LitStr = meta.value()?.parse()?;
                let target = value.value();
                match target.split_once("::") {
                    Some((table, column)) if !table.is_empty() && !column.is_empty() => {
                        options.foreign_key = Some((table.to_string(), column.to_string()));
                    }
                    _ => return Err(meta.error("invalid format for foreign_key, use \"Parent::column\"")),
                }
            } else if meta.path.is_ident("parent_reference") {
                let value: LitStr = meta.value()?.parse()?;
                options.parent_reference = Some(value.value());
            } else if meta.path.is_ident("child_reference") {
                let value: LitStr = meta.value()?.parse()?;
                options.child_reference = Some(value.value());
            } else {
                return Err(meta.error("unknown orm attribute"));
            }
            Ok(())
        })?;
    }

    if options.foreign_key.is_none() && (options.parent_reference.is_some() || options.child_reference.is_some()) {
        return Err(syn::Error::new_spanned(field, "parent_reference and child_reference need a foreign_key"));
    }
    Ok(options)
}

fn optional(value: &Option<String>) -> TokenStream {
    match value {
        Some(value) => quote! { Some(#value) },
        None => quote! { None },
    }
}

/// The `FieldDef` literal of one field.
fn field_def(name: &str, ty: &Type, options: &FieldOptions) -> syn::Result<TokenStream> {
    let types::Mapping { mut semantic, nullable, .. } = types::semantic_type(ty);

    if options.enumeration {
        let inner = types::generic_inner(ty, "Option").unwrap_or(ty);
        semantic = quote! {
            tether_orm::SemanticType::Enumeration(<#inner as tether_orm::EnumMapping>::VARIANTS)
        };
    }
    if let Some(encoded) = &options.encoded {
        semantic = types::encoded_type(&encoded.value())
            .ok_or_else(|| syn::Error::new_spanned(encoded, "unknown encoded type"))?;
    }

    let nullable = nullable || options.nullable;
    let primary_key = options.primary_key;
    let auto_increment = options.auto_increment;
    let unique = options.unique;
    let transient = options.transient || options.reference;

    let foreign_key = match &options.foreign_key {
        Some((table, column)) => {
            let parent_reference = optional(&options.parent_reference);
            let child_reference = optional(&options.child_reference);
            quote! {
                Some(tether_orm::ForeignKeyDef {
                    table: #table,
                    column: #column,
                    parent_reference: #parent_reference,
                    child_reference: #child_reference,
                })
            }
        }
        None => quote! { None },
    };

    Ok(quote! {
        tether_orm::FieldDef {
            name: #name,
            ty: #semantic,
            nullable: #nullable,
            primary_key: #primary_key,
            auto_increment: #auto_increment,
            unique: #unique,
            transient: #transient,
            foreign_key: #foreign_key,
        }
    })
}

/// Expands the `#[derive(Entity)]` macro.
pub fn expand(ast: DeriveInput) -> syn::Result<TokenStream> {
    let struct_name = &ast.ident;
    let entity_name = struct_name.to_string();
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let fields = match &ast.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => return Err(syn::Error::new_spanned(&ast, "Entity must have named fields")),
        },
        _ => return Err(syn::Error::new_spanned(&ast, "Entity must be a struct")),
    };

    let mut field_defs = Vec::new();
    let mut reference_defs = Vec::new();
    let mut get_arms = Vec::new();
    let mut set_arms = Vec::new();
    let mut references_arms = Vec::new();
    let mut set_reference_arms = Vec::new();

    for field in fields {
        let Some(ident) = &field.ident else {
            continue;
        };
        let name = ident.to_string();
        let ty = &field.ty;
        let options = parse_options(field)?;

        field_defs.push(field_def(&name, ty, &options)?);

        if options.reference {
            let (shape, target) = types::reference_shape(ty).ok_or_else(|| {
                syn::Error::new_spanned(ty, "reference fields must be Vec<T>, Option<T> or Option<Box<T>>")
            })?;
            reference_arms(ident, &name, &shape, target, &mut reference_defs, &mut references_arms, &mut set_reference_arms);
            continue;
        }
        if options.transient {
            continue;
        }
        // Encoded columns are produced by a model codec; unsupported ones fail at registration.
        if options.encoded.is_some() || !(options.enumeration || types::semantic_type(ty).supported) {
            get_arms.push(quote! {
                #name => Err(tether_orm::CodecError::Unmapped { field: #name.to_string() }.into()),
            });
            set_arms.push(quote! {
                #name => Err(tether_orm::CodecError::Unmapped { field: #name.to_string() }.into()),
            });
            continue;
        }

        get_arms.push(quote! {
            #name => Ok(tether_orm::ToValue::to_value(&self.#ident)),
        });
        if types::generic_inner(ty, "Option").is_some() {
            set_arms.push(quote! {
                #name => {
                    self.#ident = <#ty as tether_orm::FromValue>::from_value(value)?;
                    Ok(())
                }
            });
        } else {
            set_arms.push(quote! {
                #name => {
                    self.#ident = tether_orm::value::require::<#ty>(value, #name)?;
                    Ok(())
                }
            });
        }
    }

    let unknown_field = quote! {
        Err(tether_orm::Error::UnknownField { entity: #entity_name.to_string(), field: field.to_string() })
    };
    let broken_reference = quote! {
        Err(tether_orm::RelationshipError::BrokenReference { entity: #entity_name.to_string(), field: field.to_string() }.into())
    };

    Ok(quote! {
        impl #impl_generics tether_orm::Entity for #struct_name #ty_generics #where_clause {
            fn name() -> &'static str {
                #entity_name
            }

            fn fields() -> Vec<tether_orm::FieldDef> {
                vec![#(#field_defs),*]
            }

            fn reference_fields() -> Vec<tether_orm::ReferenceField> {
                vec![#(#reference_defs),*]
            }
        }

        impl #impl_generics tether_orm::Record for #struct_name #ty_generics #where_clause {
            fn entity_name(&self) -> &'static str {
                #entity_name
            }

            fn get_field(&self, field: &str) -> Result<tether_orm::Value, tether_orm::Error> {
                match field {
                    #(#get_arms)*
                    _ => #unknown_field,
                }
            }

            #[allow(unused_variables)]
            fn set_field(&mut self, field: &str, value: tether_orm::Value) -> Result<(), tether_orm::Error> {
                match field {
                    #(#set_arms)*
                    _ => #unknown_field,
                }
            }

            fn references_mut(&mut self, field: &str) -> Option<Vec<&mut dyn tether_orm::Record>> {
                match field {
                    #(#references_arms)*
                    _ => None,
                }
            }

            #[allow(unused_variables)]
            fn set_reference(&mut self, field: &str, related: tether_orm::Related) -> Result<(), tether_orm::Error> {
                match field {
                    #(#set_reference_arms)*
                    _ => #broken_reference,
                }
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }

            fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
                self
            }
        }
    })
}

fn reference_arms(
    ident: &Ident,
    name: &str,
    shape: &ReferenceShape,
    target: &Type,
    reference_defs: &mut Vec<TokenStream>,
    references_arms: &mut Vec<TokenStream>,
    set_reference_arms: &mut Vec<TokenStream>,
) {
    let target_name = types::last_ident(target).unwrap_or_default();
    let many = matches!(shape, ReferenceShape::Many);

    reference_defs.push(quote! {
        tether_orm::ReferenceField { name: #name, target: #target_name, many: #many }
    });

    let (collect, assign) = match shape {
        ReferenceShape::Many => (
            quote! { self.#ident.iter_mut().map(|r| r as &mut dyn tether_orm::Record).collect() },
            quote! { related.into_many::<#target>(<Self as tether_orm::Entity>::name(), #name)? },
        ),
        ReferenceShape::One => (
            quote! { self.#ident.iter_mut().map(|r| r as &mut dyn tether_orm::Record).collect() },
            quote! { related.into_one::<#target>(<Self as tether_orm::Entity>::name(), #name)? },
        ),
        ReferenceShape::Boxed => (
            quote! { self.#ident.iter_mut().map(|r| &mut **r as &mut dyn tether_orm::Record).collect() },
            quote! { related.into_one::<#target>(<Self as tether_orm::Entity>::name(), #name)?.map(Box::new) },
        ),
    };

    references_arms.push(quote! {
        #name => Some(#collect),
    });
    set_reference_arms.push(quote! {
        #name => {
            self.#ident = #assign;
            Ok(())
        }
    });
}
