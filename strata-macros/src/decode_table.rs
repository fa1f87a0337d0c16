use crate::decode_field::{
    ColumnMetadata, FieldMetadata, ForeignKeyMetadata, ForeignKeyTargetMetadata, decode_field,
    missing_column,
};
use convert_case::{Case, Casing};
use syn::{Ident, ItemStruct, LitStr, Result, parse::ParseBuffer};

pub(crate) struct TableMetadata {
    pub(crate) ident: Ident,
    pub(crate) name: String,
    pub(crate) schema: String,
    pub(crate) database: String,
    pub(crate) columns: Vec<ColumnMetadata>,
    pub(crate) foreign_keys: Vec<ForeignKeyMetadata>,
    pub(crate) foreign_key_targets: Vec<ForeignKeyTargetMetadata>,
}

pub(crate) fn decode_table(item: &ItemStruct) -> Result<TableMetadata> {
    let mut name = item.ident.to_string().to_case(Case::Snake);
    let mut schema = String::new();
    let mut database = String::new();
    if name.starts_with('_') {
        name.remove(0);
    }
    for attr in &item.attrs {
        if !attr.path().is_ident("strata") {
            continue;
        }
        attr.parse_nested_meta(|arg| {
            let target = if arg.path.is_ident("name") {
                &mut name
            } else if arg.path.is_ident("schema") {
                &mut schema
            } else if arg.path.is_ident("database") {
                &mut database
            } else {
                return Err(arg.error("Unknown attribute inside strata macro, expected one of `name`, `schema`, `database`"));
            };
            let Ok(value) = arg.value().and_then(ParseBuffer::parse::<LitStr>) else {
                return Err(arg.error(
                    "Error while parsing the table attribute, use it like: `#[strata(name = \"my_table\")]`",
                ));
            };
            *target = value.value();
            Ok(())
        })?;
    }
    let mut columns = Vec::new();
    let mut foreign_keys = Vec::new();
    let mut foreign_key_targets = Vec::new();
    for field in &item.fields {
        match decode_field(field)? {
            FieldMetadata::Column(v) => columns.push(v),
            FieldMetadata::ForeignKey(v) => foreign_keys.push(v),
            FieldMetadata::ForeignKeyTarget(v) => foreign_key_targets.push(v),
            FieldMetadata::Ignored => {}
        }
    }
    for foreign_key in &foreign_keys {
        if let Some(missing) = foreign_key
            .columns
            .iter()
            .find(|c| !columns.iter().any(|v| v.def.property == c.as_str()))
        {
            return Err(missing_column(missing));
        }
    }
    Ok(TableMetadata {
        ident: item.ident.clone(),
        name,
        schema,
        database,
        columns,
        foreign_keys,
        foreign_key_targets,
    })
}
