//! Rebuilds nested objects out of the flat rows a joined statement returns.
use crate::{Result, ResultShape, RowLabeled, Value};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};

/// Rows grouped at one multi row path, the root being the empty path.
struct Level<'s> {
    path: &'s str,
    /// Column key and its path relative to the level.
    columns: Vec<(&'s str, &'s str)>,
    children: Vec<Level<'s>>,
}

fn relative<'k>(level: &str, key: &'k str) -> &'k str {
    if level.is_empty() {
        return key;
    }
    key.strip_prefix(level)
        .and_then(|v| v.strip_prefix('.'))
        .unwrap_or(key)
}

/// The deepest multi row path strictly containing `key`.
fn owner<'s>(multi: &[&'s str], key: &str) -> &'s str {
    multi
        .iter()
        .filter(|p| {
            key.strip_prefix(**p)
                .is_some_and(|rest| rest.starts_with('.'))
        })
        .max_by_key(|p| p.len())
        .copied()
        .unwrap_or("")
}

fn level<'s>(shape: &'s ResultShape, multi: &[&'s str], path: &'s str) -> Level<'s> {
    Level {
        path,
        columns: shape
            .columns
            .iter()
            .filter(|c| owner(multi, &c.key) == path)
            .map(|c| (c.key.as_str(), relative(path, &c.key)))
            .collect(),
        children: multi
            .iter()
            .filter(|p| **p != path && owner(multi, p) == path)
            .map(|p| level(shape, multi, *p))
            .collect(),
    }
}

fn insert_path(object: &mut Map<String, JsonValue>, path: &str, value: JsonValue) {
    match path.split_once('.') {
        None => {
            object.insert(path.to_owned(), value);
        }
        Some((head, rest)) => {
            let entry = object
                .entry(head)
                .or_insert_with(|| JsonValue::Object(Map::new()));
            if !entry.is_object() {
                *entry = JsonValue::Object(Map::new());
            }
            if let JsonValue::Object(nested) = entry {
                insert_path(nested, rest, value);
            }
        }
    }
}

fn build(level: &Level, rows: &[&RowLabeled]) -> Result<Vec<JsonValue>> {
    // Nested levels repeat once per row of their siblings and the root repeats once per child
    // row, a flat root keeps every row
    let distinct = !level.path.is_empty() || !level.children.is_empty();
    let mut groups: Vec<(Vec<&Value>, Vec<&RowLabeled>)> = Vec::new();
    for row in rows {
        let key = level
            .columns
            .iter()
            .map(|(column, _)| row.get_column(column).unwrap_or(&Value::Null))
            .collect::<Vec<_>>();
        match groups.iter_mut().find(|(k, _)| distinct && *k == key) {
            Some((_, members)) => members.push(row),
            None => groups.push((key, vec![row])),
        }
    }
    let mut result = Vec::with_capacity(groups.len());
    for (key, members) in groups {
        let mut object = Map::new();
        let mut empty = true;
        for ((_, path), value) in level.columns.iter().zip(&key) {
            if value.is_null() {
                continue;
            }
            empty = false;
            insert_path(&mut object, path, serde_json::to_value(value)?);
        }
        for child in &level.children {
            let items = build(child, &members)?;
            empty &= items.is_empty();
            insert_path(&mut object, relative(level.path, child.path), JsonValue::Array(items));
        }
        if !empty {
            result.push(JsonValue::Object(object));
        }
    }
    Ok(result)
}

/// Nest `rows` according to `shape`.
///
/// Dotted keys become nested objects, multi row paths become arrays of the distinct rows found
/// under each parent. Without multi row paths every row yields its own object, duplicates
/// included. Null cells are left out so a single row relation with no match vanishes,
/// and fully null rows are dropped. Sibling arrays are collected independently.
pub fn reshape(rows: &[RowLabeled], shape: &ResultShape) -> Result<Vec<JsonValue>> {
    let multi = shape
        .paths
        .iter()
        .filter(|p| !p.single)
        .map(|p| p.path.as_str())
        .collect::<Vec<_>>();
    let root = level(shape, &multi, "");
    build(&root, &rows.iter().collect::<Vec<_>>())
}

/// [`reshape`] then deserialize every object into `T`.
pub fn parse<T: DeserializeOwned>(rows: &[RowLabeled], shape: &ResultShape) -> Result<Vec<T>> {
    reshape(rows, shape)?
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(Into::into))
        .collect()
}
