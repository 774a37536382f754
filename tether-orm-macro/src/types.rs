use proc_macro2::TokenStream;
use quote::quote;
use syn::{GenericArgument, PathArguments, Type};

/// The last path segment of `ty`, e.g. `DateTime` for `chrono::DateTime<Utc>`.
pub fn last_ident(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last().map(|segment| segment.ident.to_string()),
        _ => None,
    }
}

/// The single generic argument of `ty` when its last segment is `wrapper`.
///
/// `generic_inner(Option<String>, "Option")` is `Some(String)`.
pub fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) => Some(inner),
        _ => None,
    }
}

/// The column mapping of a Rust field type.
pub struct Mapping {
    /// `SemanticType` tokens.
    pub semantic: TokenStream,
    /// `Option<T>`.
    pub nullable: bool,
    /// `false` for types with no mapping, emitted as `SemanticType::Unsupported` so that
    /// registration rejects them.
    pub supported: bool,
}

/// Maps a Rust field type to its semantic type.
pub fn semantic_type(ty: &Type) -> Mapping {
    if let Some(inner) = generic_inner(ty, "Option") {
        return Mapping { nullable: true, ..semantic_type(inner) };
    }

    let type_name = last_ident(ty).unwrap_or_else(|| "?".to_string());
    let semantic = match type_name.as_str() {
        "String" => quote! { tether_orm::SemanticType::Text },
        "bool" => quote! { tether_orm::SemanticType::Bool },
        "i8" => quote! { tether_orm::SemanticType::Byte },
        "i16" => quote! { tether_orm::SemanticType::Short },
        "i32" => quote! { tether_orm::SemanticType::Int },
        "i64" => quote! { tether_orm::SemanticType::Long },
        "f32" => quote! { tether_orm::SemanticType::Float },
        "f64" => quote! { tether_orm::SemanticType::Double },
        "DateTime" | "NaiveDateTime" => quote! { tether_orm::SemanticType::Timestamp },
        "Vec" if generic_inner(ty, "Vec").and_then(last_ident).is_some_and(|inner| inner == "u8") => {
            quote! { tether_orm::SemanticType::Binary }
        }
        _ => {
            return Mapping {
                semantic: quote! { tether_orm::SemanticType::Unsupported(#type_name) },
                nullable: false,
                supported: false,
            };
        }
    };
    Mapping { semantic, nullable: false, supported: true }
}

/// Semantic type named by `#[orm(encoded = "...")]`.
pub fn encoded_type(name: &str) -> Option<TokenStream> {
    let mapped = match name.to_ascii_lowercase().as_str() {
        "text" => quote! { tether_orm::SemanticType::Text },
        "bool" => quote! { tether_orm::SemanticType::Bool },
        "byte" => quote! { tether_orm::SemanticType::Byte },
        "short" => quote! { tether_orm::SemanticType::Short },
        "int" => quote! { tether_orm::SemanticType::Int },
        "long" => quote! { tether_orm::SemanticType::Long },
        "float" => quote! { tether_orm::SemanticType::Float },
        "double" => quote! { tether_orm::SemanticType::Double },
        "timestamp" => quote! { tether_orm::SemanticType::Timestamp },
        "binary" => quote! { tether_orm::SemanticType::Binary },
        _ => return None,
    };
    Some(mapped)
}

/// How a reference field holds its related instances.
pub enum ReferenceShape {
    /// `Vec<T>`
    Many,
    /// `Option<T>`
    One,
    /// `Option<Box<T>>`, for a child pointing back at its parent.
    Boxed,
}

/// The shape and target entity type of a `#[orm(reference)]` field.
pub fn reference_shape(ty: &Type) -> Option<(ReferenceShape, &Type)> {
    if let Some(inner) = generic_inner(ty, "Vec") {
        return Some((ReferenceShape::Many, inner));
    }
    let inner = generic_inner(ty, "Option")?;
    match generic_inner(inner, "Box") {
        Some(boxed) => Some((ReferenceShape::Boxed, boxed)),
        None => Some((ReferenceShape::One, inner)),
    }
}
