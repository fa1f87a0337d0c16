mod decode_field;
mod decode_table;
mod decode_type;

use decode_table::{TableMetadata, decode_table};
use proc_macro::TokenStream;
use quote::quote;
use syn::{ItemStruct, parse_macro_input};

/// Generates `strata::Entity`: the static table description and the insertable row.
///
/// ```ignore
/// #[derive(Entity)]
/// #[strata(name = "Item", schema = "dbo")]
/// struct Item {
///     #[strata(primary_key, auto_increment)]
///     id: Option<i32>,
///     #[strata(column = "itemName")]
///     name: String,
///     parent_id: Option<i32>,
///     #[strata(foreign_key(parent_id))]
///     parent: Option<Box<Item>>,
///     #[strata(foreign_key_target(Item, parent))]
///     children: Vec<Item>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(strata))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemStruct);
    match decode_table(&item) {
        Ok(table) => encode_entity(&table).into(),
        Err(e) => e.into_compile_error().into(),
    }
}

fn encode_entity(table: &TableMetadata) -> proc_macro2::TokenStream {
    let ident = &table.ident;
    let name = &table.name;
    let schema = &table.schema;
    let database = &table.database;
    let columns = table.columns.iter().map(|c| &c.def);
    let foreign_keys = table.foreign_keys.iter().map(|fk| {
        let property = &fk.property;
        let columns = &fk.columns;
        let target = &fk.target;
        quote! {
            ::strata::ForeignKeyDef {
                property: ::std::borrow::Cow::Borrowed(#property),
                columns: &[#(#columns),*],
                target: <#target as ::strata::Entity>::table_def,
            }
        }
    });
    let foreign_key_targets = table.foreign_key_targets.iter().map(|fkt| {
        let property = &fkt.property;
        let source = &fkt.source;
        let foreign_key = &fkt.foreign_key;
        quote! {
            ::strata::ForeignKeyTargetDef {
                property: ::std::borrow::Cow::Borrowed(#property),
                source: <#source as ::strata::Entity>::table_def,
                foreign_key: #foreign_key,
            }
        }
    });
    let capacity = table.columns.len();
    let push_values = table.columns.iter().map(|c| {
        let field = &c.ident;
        let property = c.def.property.as_ref();
        let skip_null = c.def.auto_increment;
        quote! {
            let value = ::strata::AsValue::as_value(::std::clone::Clone::clone(&self.#field));
            if !(#skip_null && value.is_null()) {
                row.push((#property, value));
            }
        }
    });
    quote! {
        impl ::strata::Entity for #ident {
            fn table_def() -> &'static ::strata::TableDef {
                static TABLE_DEF: ::strata::TableDef = ::strata::TableDef {
                    name: ::std::borrow::Cow::Borrowed(#name),
                    schema: ::std::borrow::Cow::Borrowed(#schema),
                    database: ::std::borrow::Cow::Borrowed(#database),
                    columns: &[#(#columns),*],
                    foreign_keys: &[#(#foreign_keys),*],
                    foreign_key_targets: &[#(#foreign_key_targets),*],
                };
                &TABLE_DEF
            }

            fn row(&self) -> ::std::vec::Vec<(&'static str, ::strata::Value)> {
                let mut row = ::std::vec::Vec::with_capacity(#capacity);
                #(#push_values)*
                row
            }
        }
    }
}
