use crate::{GenericSqlWriter, SqlWriter, ValueType, quote_cow, quote_option};
use quote::{ToTokens, TokenStreamExt, quote};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Static description of a table, read by the typed layer to seed projections and derive joins.
///
/// Empty `schema` or `database` fall back to the [`SchemaDefaults`] in use.
#[derive(Debug)]
pub struct TableDef {
    pub name: Cow<'static, str>,
    pub schema: Cow<'static, str>,
    pub database: Cow<'static, str>,
    pub columns: &'static [ColumnDef],
    pub foreign_keys: &'static [ForeignKeyDef],
    pub foreign_key_targets: &'static [ForeignKeyTargetDef],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    /// Rust field, the key used in projections and results.
    pub property: Cow<'static, str>,
    /// Database column.
    pub name: Cow<'static, str>,
    pub value_type: ValueType,
    pub nullable: bool,
    pub auto_increment: bool,
    /// 1 based position inside the primary key.
    pub primary_key: Option<u8>,
}

/// Navigation to the single row referenced by `columns`.
#[derive(Debug)]
pub struct ForeignKeyDef {
    pub property: Cow<'static, str>,
    /// Properties of the owning table, in the order of the target primary key.
    pub columns: &'static [&'static str],
    pub target: fn() -> &'static TableDef,
}

/// Reverse navigation: the rows of `source` whose foreign key `foreign_key` points here.
#[derive(Debug)]
pub struct ForeignKeyTargetDef {
    pub property: Cow<'static, str>,
    pub source: fn() -> &'static TableDef,
    pub foreign_key: &'static str,
}

/// Database and schema used when a table does not declare its own.
#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefaults {
    pub database: Option<String>,
    pub schema: Option<String>,
}

impl TableDef {
    /// `[database].[schema].[name]`, omitting the parts that are not known.
    pub fn qualified_name(&self, defaults: &SchemaDefaults) -> String {
        let pick = |own: &str, fallback: &Option<String>| -> Option<String> {
            if own.is_empty() {
                fallback.clone().filter(|v| !v.is_empty())
            } else {
                Some(own.to_owned())
            }
        };
        let database = pick(&self.database, &defaults.database);
        let mut schema = pick(&self.schema, &defaults.schema);
        if database.is_some() && schema.is_none() {
            schema = Some("dbo".into());
        }
        let writer = GenericSqlWriter::new();
        let mut out = String::new();
        for part in [database, schema].into_iter().flatten() {
            writer.write_identifier_quoted(&mut out, &part);
            out.push('.');
        }
        writer.write_identifier_quoted(&mut out, &self.name);
        out
    }

    pub fn column(&self, property: &str) -> Option<&'static ColumnDef> {
        self.columns.iter().find(|c| c.property == property)
    }

    /// Primary key columns ordered by their position in the key.
    pub fn primary_key(&self) -> Vec<&'static ColumnDef> {
        let mut result = self
            .columns
            .iter()
            .filter(|c| c.primary_key.is_some())
            .collect::<Vec<_>>();
        result.sort_by_key(|c| c.primary_key);
        result
    }

    pub fn foreign_key(&self, property: &str) -> Option<&'static ForeignKeyDef> {
        self.foreign_keys.iter().find(|c| c.property == property)
    }

    pub fn foreign_key_target(&self, property: &str) -> Option<&'static ForeignKeyTargetDef> {
        self.foreign_key_targets
            .iter()
            .find(|c| c.property == property)
    }
}

impl ToTokens for ColumnDef {
    fn to_tokens(&self, tokens: &mut proc_macro2::TokenStream) {
        let property = quote_cow(&self.property);
        let name = quote_cow(&self.name);
        let value_type = &self.value_type;
        let nullable = self.nullable;
        let auto_increment = self.auto_increment;
        let primary_key = quote_option(&self.primary_key);
        tokens.append_all(quote! {
            ::strata::ColumnDef {
                property: #property,
                name: #name,
                value_type: #value_type,
                nullable: #nullable,
                auto_increment: #auto_increment,
                primary_key: #primary_key,
            }
        });
    }
}
