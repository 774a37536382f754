//! # Enum Derive Macro Implementation
//!
//! Expands `#[derive(TetherEnum)]` for enums of unit variants. The variant names are the
//! stored representation: the macro generates `Display`, `FromStr`, `EnumMapping`,
//! `ToValue` and `FromValue` around them.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

/// Expands the `#[derive(TetherEnum)]` macro.
pub fn expand(ast: DeriveInput) -> syn::Result<TokenStream> {
    let name = &ast.ident;
    let enum_name = name.to_string();

    let variants = match &ast.data {
        Data::Enum(data_enum) => &data_enum.variants,
        _ => return Err(syn::Error::new_spanned(&ast, "TetherEnum can only be derived for enums")),
    };
    if let Some(variant) = variants.iter().find(|variant| !matches!(variant.fields, Fields::Unit)) {
        return Err(syn::Error::new_spanned(variant, "TetherEnum variants cannot carry data"));
    }

    let variant_names: Vec<String> = variants.iter().map(|variant| variant.ident.to_string()).collect();

    // Self::Variant => "Variant"
    let display_arms = variants.iter().zip(&variant_names).map(|(variant, variant_name)| {
        let variant_ident = &variant.ident;
        quote! {
            Self::#variant_ident => f.write_str(#variant_name),
        }
    });

    // "Variant" => Ok(Self::Variant)
    let from_str_arms = variants.iter().zip(&variant_names).map(|(variant, variant_name)| {
        let variant_ident = &variant.ident;
        quote! {
            #variant_name => Ok(Self::#variant_ident),
        }
    });

    Ok(quote! {
        impl std::fmt::Display for #name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    #(#display_arms)*
                }
            }
        }

        impl std::str::FromStr for #name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    #(#from_str_arms)*
                    _ => Err(format!("Unknown variant: {}", s)),
                }
            }
        }

        impl tether_orm::EnumMapping for #name {
            const NAME: &'static str = #enum_name;
            const VARIANTS: &'static [&'static str] = &[#(#variant_names),*];
        }

        impl tether_orm::ToValue for #name {
            fn to_value(&self) -> tether_orm::Value {
                tether_orm::Value::Enum(self.to_string())
            }
        }

        impl tether_orm::FromValue for #name {
            fn from_value(value: tether_orm::Value) -> Result<Self, tether_orm::CodecError> {
                match value {
                    tether_orm::Value::Enum(s) | tether_orm::Value::Text(s) => s.parse::<Self>().map_err(|_| {
                        tether_orm::CodecError::InvalidEnumValue { target: #enum_name.to_string(), value: s }
                    }),
                    other => Err(tether_orm::CodecError::TypeMismatch {
                        expected: #enum_name.to_string(),
                        found: other.kind().to_string(),
                    }),
                }
            }
        }
    })
}
