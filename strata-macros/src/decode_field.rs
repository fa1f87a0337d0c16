use crate::decode_type::{decode_type, unwrap_generic};
use proc_macro2::Span;
use quote::ToTokens;
use std::borrow::Cow;
use strata_core::ColumnDef;
use syn::{
    Error, Field, Ident, LitInt, LitStr, Path, Result, Type, ext::IdentExt, meta::ParseNestedMeta,
    parse::ParseBuffer, spanned::Spanned,
};

pub(crate) struct ColumnMetadata {
    pub(crate) ident: Ident,
    pub(crate) def: ColumnDef,
}

pub(crate) struct ForeignKeyMetadata {
    pub(crate) property: String,
    pub(crate) columns: Vec<String>,
    pub(crate) target: Type,
}

pub(crate) struct ForeignKeyTargetMetadata {
    pub(crate) property: String,
    pub(crate) source: Path,
    pub(crate) foreign_key: String,
}

pub(crate) enum FieldMetadata {
    Column(ColumnMetadata),
    ForeignKey(ForeignKeyMetadata),
    ForeignKeyTarget(ForeignKeyTargetMetadata),
    Ignored,
}

fn nested_name(meta: &ParseNestedMeta) -> Result<String> {
    meta.path
        .get_ident()
        .map(|v| v.unraw().to_string())
        .ok_or_else(|| meta.error("expected a field name"))
}

fn is_flag(arg: &ParseNestedMeta) -> bool {
    arg.input.is_empty() || arg.input.peek(syn::Token![,])
}

pub(crate) fn decode_field(field: &Field) -> Result<FieldMetadata> {
    let Some(ident) = field.ident.clone() else {
        return Err(Error::new(
            field.span(),
            "Entity fields are expected to have a name",
        ));
    };
    let property = ident.unraw().to_string();
    let decoded = decode_type(&field.ty);
    let mut column = ColumnDef {
        property: Cow::Owned(property.clone()),
        name: Cow::Owned(property.clone()),
        value_type: decoded.value_type,
        nullable: decoded.nullable,
        auto_increment: false,
        primary_key: None,
    };
    let mut result = None;
    for attr in &field.attrs {
        if !attr.path().is_ident("strata") {
            continue;
        }
        attr.parse_nested_meta(|arg| {
            if arg.path.is_ident("column") {
                let Ok(v) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                    return Err(arg.error(
                        "Error while parsing `column`, use it like: `#[strata(column = \"my_column\")]`",
                    ));
                };
                column.name = Cow::Owned(v.value());
            } else if arg.path.is_ident("primary_key") {
                let position = if is_flag(&arg) {
                    1
                } else {
                    let Ok(v) = arg
                        .value()
                        .and_then(ParseBuffer::parse::<LitInt>)
                        .and_then(|v| v.base10_parse::<u8>())
                    else {
                        return Err(arg.error(
                            "Error while parsing `primary_key`, use it like: `#[strata(primary_key)]` or `#[strata(primary_key = 2)]`",
                        ));
                    };
                    v
                };
                column.primary_key = Some(position);
                column.nullable = false;
            } else if arg.path.is_ident("auto_increment") {
                column.auto_increment = true;
            } else if arg.path.is_ident("foreign_key") {
                let mut columns = Vec::new();
                arg.parse_nested_meta(|inner| {
                    columns.push(nested_name(&inner)?);
                    Ok(())
                })?;
                let target = unwrap_generic(&field.ty, &["Option", "Box"])
                    .and_then(|v| unwrap_generic(v, &["Box"]).or(Some(v)))
                    .unwrap_or(&field.ty)
                    .clone();
                result = Some(FieldMetadata::ForeignKey(ForeignKeyMetadata {
                    property: property.clone(),
                    columns,
                    target,
                }));
            } else if arg.path.is_ident("foreign_key_target") {
                let mut source = None;
                let mut foreign_key = None;
                arg.parse_nested_meta(|inner| {
                    if source.is_none() {
                        source = Some(inner.path.clone());
                    } else {
                        foreign_key = Some(nested_name(&inner)?);
                    }
                    Ok(())
                })?;
                let (Some(source), Some(foreign_key)) = (source, foreign_key) else {
                    return Err(arg.error(
                        "Error while parsing `foreign_key_target`, use it like: `#[strata(foreign_key_target(Source, foreign_key_field))]`",
                    ));
                };
                result = Some(FieldMetadata::ForeignKeyTarget(ForeignKeyTargetMetadata {
                    property: property.clone(),
                    source,
                    foreign_key,
                }));
            } else if arg.path.is_ident("ignore") {
                result = Some(FieldMetadata::Ignored);
            } else {
                return Err(arg.error(format!(
                    "Unknown attribute `{}` inside strata macro",
                    arg.path.to_token_stream()
                )));
            }
            Ok(())
        })?;
    }
    Ok(result.unwrap_or(FieldMetadata::Column(ColumnMetadata { ident, def: column })))
}

pub(crate) fn missing_column(property: &str) -> Error {
    Error::new(
        Span::call_site(),
        format!("Foreign key column `{property}` is not a column of the entity"),
    )
}
