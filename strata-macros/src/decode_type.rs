use strata_core::ValueType;
use syn::{GenericArgument, PathArguments, Type, TypePath, TypeReference, TypeSlice};

pub(crate) struct TypeDecoded {
    pub(crate) value_type: ValueType,
    pub(crate) nullable: bool,
}

/// The single generic argument of `Wrapper<T>` when the last path segment is one of `wrappers`.
pub(crate) fn unwrap_generic<'a>(ty: &'a Type, wrappers: &[&str]) -> Option<&'a Type> {
    let Type::Path(TypePath { path, .. }) = ty else {
        return None;
    };
    let last = path.segments.last()?;
    if !wrappers.iter().any(|w| last.ident == w) {
        return None;
    }
    let PathArguments::AngleBracketed(arguments) = &last.arguments else {
        return None;
    };
    match arguments.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn is_u8(ty: &Type) -> bool {
    matches!(ty, Type::Path(TypePath { path, .. }) if path.is_ident("u8"))
}

pub(crate) fn decode_type(ty: &Type) -> TypeDecoded {
    if let Some(inner) = unwrap_generic(ty, &["Option"]) {
        return TypeDecoded {
            nullable: true,
            ..decode_type(inner)
        };
    }
    if let Some(inner) = unwrap_generic(ty, &["Box", "Arc", "Rc"]) {
        if let Type::Slice(TypeSlice { elem, .. }) = inner
            && is_u8(elem)
        {
            return TypeDecoded {
                value_type: ValueType::Bytes,
                nullable: false,
            };
        }
        return decode_type(inner);
    }
    if unwrap_generic(ty, &["Vec"]).is_some_and(is_u8) {
        return TypeDecoded {
            value_type: ValueType::Bytes,
            nullable: false,
        };
    }
    let value_type = match ty {
        Type::Path(TypePath { path, .. }) => path
            .segments
            .last()
            .map(|v| ValueType::from_type_name(&v.ident.to_string()))
            .unwrap_or_default(),
        Type::Reference(TypeReference { elem, .. }) => return decode_type(elem),
        _ => ValueType::Unknown,
    };
    TypeDecoded {
        value_type,
        nullable: false,
    }
}
