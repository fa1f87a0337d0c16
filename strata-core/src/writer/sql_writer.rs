use crate::{
    FromDef, QueryDef, QueryError, QueryKind, Result, ShapeProblem, Value,
    separated_by, write_indented,
};
use indexmap::IndexMap;
use std::fmt::Write;
use time::{Date, PrimitiveDateTime, Time};
use uuid::Uuid;

macro_rules! write_integer {
    ($out:ident, $value:expr) => {{
        let mut buffer = itoa::Buffer::new();
        $out.push_str(buffer.format($value));
    }};
}

fn shape_error(kind: QueryKind, problem: ShapeProblem) -> crate::Error {
    QueryError::StatementShape { kind, problem }.into()
}

/// Dialect printer turning literals and [`QueryDef`]s into SQL text.
///
/// Every method has a default implementation producing bracket quoted T-SQL, a dialect
/// overrides only what differs.
pub trait SqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter;

    /// Escape occurrences of `search` char with `replace` while copying into buffer.
    fn write_escaped(&self, out: &mut String, value: &str, search: char, replace: &str) {
        let mut position = 0;
        for (i, c) in value.char_indices() {
            if c == search {
                out.push_str(&value[position..i]);
                out.push_str(replace);
                position = i + c.len_utf8();
            }
        }
        out.push_str(&value[position..]);
    }

    /// Quote identifiers `[name]`, doubling inner closing brackets.
    fn write_identifier_quoted(&self, out: &mut String, value: &str) {
        out.push('[');
        self.write_escaped(out, value, ']', "]]");
        out.push(']');
    }

    fn write_value(&self, out: &mut String, value: &Value) {
        let writer = self.as_dyn();
        match value {
            Value::Null
            | Value::Boolean(None)
            | Value::Int64(None)
            | Value::Float64(None)
            | Value::Decimal(None)
            | Value::Varchar(None)
            | Value::Blob(None)
            | Value::Date(None)
            | Value::Time(None)
            | Value::Timestamp(None)
            | Value::Uuid(None) => writer.write_value_none(out),
            Value::Boolean(Some(v)) => writer.write_value_bool(out, *v),
            Value::Int64(Some(v)) => write_integer!(out, *v),
            Value::Float64(Some(v)) => writer.write_value_float(out, *v),
            Value::Decimal(Some(v)) => {
                let _ = write!(out, "{v}");
            }
            Value::Varchar(Some(v)) => writer.write_value_string(out, v),
            Value::Blob(Some(v)) => writer.write_value_blob(out, v),
            Value::Date(Some(v)) => writer.write_value_date(out, v, false),
            Value::Time(Some(v)) => writer.write_value_time(out, v, false),
            Value::Timestamp(Some(v)) => writer.write_value_timestamp(out, v),
            Value::Uuid(Some(v)) => writer.write_value_uuid(out, v),
        }
    }

    fn write_value_none(&self, out: &mut String) {
        out.push_str("NULL");
    }

    fn write_value_bool(&self, out: &mut String, value: bool) {
        out.push(['0', '1'][value as usize]);
    }

    /// Non finite numbers have no literal, they render as NULL.
    fn write_value_float(&self, out: &mut String, value: f64) {
        if value.is_finite() {
            let mut buffer = ryu::Buffer::new();
            out.push_str(buffer.format(value));
        } else {
            self.write_value_none(out);
        }
    }

    /// `N'...'` unicode literal with doubled single quotes.
    fn write_value_string(&self, out: &mut String, value: &str) {
        out.push_str("N'");
        self.write_escaped(out, value, '\'', "''");
        out.push('\'');
    }

    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push_str("0x");
        out.push_str(&hex::encode_upper(value));
    }

    /// Render a DATE literal (optionally as part of TIMESTAMP composition).
    fn write_value_date(&self, out: &mut String, value: &Date, timestamp: bool) {
        let b = if timestamp { "" } else { "'" };
        let _ = write!(
            out,
            "{b}{:04}-{:02}-{:02}{b}",
            value.year(),
            value.month() as u8,
            value.day()
        );
    }

    /// Render a TIME literal (optionally as part of TIMESTAMP composition).
    fn write_value_time(&self, out: &mut String, value: &Time, timestamp: bool) {
        let b = if timestamp { "" } else { "'" };
        let _ = write!(
            out,
            "{b}{:02}:{:02}:{:02}",
            value.hour(),
            value.minute(),
            value.second(),
        );
        // datetime2 keeps 7 fractional digits
        let mut subsecond = value.nanosecond() / 100;
        if subsecond != 0 {
            let mut width = 7;
            while subsecond % 10 == 0 {
                subsecond /= 10;
                width -= 1;
            }
            let _ = write!(out, ".{:0width$}", subsecond);
        }
        out.push_str(b);
    }

    fn write_value_timestamp(&self, out: &mut String, value: &PrimitiveDateTime) {
        out.push('\'');
        self.write_value_date(out, &value.date(), true);
        out.push(' ');
        self.write_value_time(out, &value.time(), true);
        out.push('\'');
    }

    fn write_value_uuid(&self, out: &mut String, value: &Uuid) {
        let _ = write!(out, "'{value}'");
    }

    /// Render any statement, after checking that its fields are legal for its kind.
    fn write_query_def(&self, out: &mut String, def: &QueryDef) -> Result<()> {
        def.check_fields()?;
        match def.kind {
            QueryKind::Insert | QueryKind::Upsert if def.identity_insert => {
                self.write_identity_insert(out, def)
            }
            QueryKind::Select => self.write_select(out, def),
            QueryKind::Insert => self.write_insert(out, def),
            QueryKind::Update => self.write_update(out, def),
            QueryKind::Upsert => self.write_upsert(out, def),
            QueryKind::Delete => self.write_delete(out, def),
        }
    }

    fn write_select(&self, out: &mut String, def: &QueryDef) -> Result<()> {
        if def.having.is_some() && def.group_by.is_none() {
            return Err(QueryError::AggregationScope.into());
        }
        if def.limit.is_some() && def.order_by.is_none() {
            return Err(QueryError::PaginationOrder.into());
        }
        out.push_str("SELECT");
        if def.distinct {
            out.push_str(" DISTINCT");
        }
        if let Some(top) = def.top {
            out.push_str(" TOP ");
            write_integer!(out, top);
        }
        out.push('\n');
        match &def.select {
            Some(select) if !select.is_empty() => {
                self.write_assignments(out, select, "  ", " AS ", true);
            }
            _ => out.push_str("  *"),
        }
        out.push_str("\nFROM ");
        self.write_source(out, def)?;
        self.write_joins(out, def);
        self.write_predicates(out, "WHERE", def.filter.as_deref());
        if let Some(group_by) = &def.group_by {
            out.push_str("\nGROUP BY ");
            out.push_str(&group_by.join(", "));
        }
        self.write_predicates(out, "HAVING", def.having.as_deref());
        if let Some(order_by) = &def.order_by {
            out.push_str("\nORDER BY ");
            out.push_str(&order_by.join(", "));
        }
        if let Some(limit) = def.limit {
            out.push_str("\nOFFSET ");
            write_integer!(out, limit.skip);
            out.push_str(" ROWS FETCH NEXT ");
            write_integer!(out, limit.take);
            out.push_str(" ROWS ONLY");
        }
        Ok(())
    }

    fn write_update(&self, out: &mut String, def: &QueryDef) -> Result<()> {
        let table = self.table_name(def)?;
        let Some(update) = def.update.as_ref().filter(|v| !v.is_empty()) else {
            return Err(shape_error(def.kind, ShapeProblem::MissingValues));
        };
        out.push_str("UPDATE ");
        self.write_top(out, def);
        out.push_str(def.alias.as_deref().unwrap_or(table));
        out.push_str(" SET\n");
        self.write_assignments(out, update, "  ", " = ", false);
        self.write_output(out, def);
        out.push_str("\nFROM ");
        self.write_source(out, def)?;
        self.write_joins(out, def);
        self.write_predicates(out, "WHERE", def.filter.as_deref());
        Ok(())
    }

    fn write_delete(&self, out: &mut String, def: &QueryDef) -> Result<()> {
        let table = self.table_name(def)?;
        out.push_str("DELETE ");
        self.write_top(out, def);
        out.push_str("FROM ");
        out.push_str(def.alias.as_deref().unwrap_or(table));
        self.write_output(out, def);
        out.push_str("\nFROM ");
        self.write_source(out, def)?;
        self.write_joins(out, def);
        self.write_predicates(out, "WHERE", def.filter.as_deref());
        Ok(())
    }

    fn write_insert(&self, out: &mut String, def: &QueryDef) -> Result<()> {
        let table = self.table_name(def)?;
        let Some(insert) = def.insert.as_ref().filter(|v| !v.is_empty()) else {
            return Err(shape_error(def.kind, ShapeProblem::MissingValues));
        };
        out.push_str("INSERT INTO ");
        out.push_str(table);
        out.push_str(" (");
        out.push_str(&insert.keys().map(String::as_str).collect::<Vec<_>>().join(", "));
        out.push(')');
        self.write_output(out, def);
        out.push_str("\nVALUES (");
        out.push_str(&insert.values().map(String::as_str).collect::<Vec<_>>().join(", "));
        out.push(')');
        Ok(())
    }

    fn write_identity_insert(&self, out: &mut String, def: &QueryDef) -> Result<()> {
        let table = self.table_name(def)?;
        let _ = write!(out, "SET IDENTITY_INSERT {table} ON;\n");
        if def.kind == QueryKind::Upsert {
            self.write_upsert(out, def)?;
        } else {
            self.write_insert(out, def)?;
            out.push(';');
        }
        let _ = write!(out, "\nSET IDENTITY_INSERT {table} OFF;");
        Ok(())
    }

    fn write_upsert(&self, out: &mut String, def: &QueryDef) -> Result<()> {
        let table = self.table_name(def)?;
        let Some(filter) = def.filter.as_ref().filter(|v| !v.is_empty()) else {
            return Err(QueryError::MissingUpsertPredicate.into());
        };
        let update = def.update.as_ref().filter(|v| !v.is_empty());
        let insert = def.insert.as_ref().filter(|v| !v.is_empty());
        if update.is_none() && insert.is_none() {
            return Err(shape_error(def.kind, ShapeProblem::MissingValues));
        }
        out.push_str("MERGE ");
        self.write_top(out, def);
        out.push_str(table);
        if let Some(alias) = &def.alias {
            out.push_str(" AS ");
            out.push_str(alias);
        }
        out.push_str("\nUSING (SELECT 0 as _using) AS _using\nON ");
        separated_by(
            out,
            filter,
            |out, v| {
                out.push('(');
                out.push_str(v);
                out.push(')');
            },
            "\n  AND ",
        );
        if let Some(update) = update {
            out.push_str("\nWHEN MATCHED THEN\n  UPDATE SET\n");
            self.write_assignments(out, update, "    ", " = ", false);
        }
        if let Some(insert) = insert {
            out.push_str("\nWHEN NOT MATCHED THEN\n  INSERT (");
            out.push_str(&insert.keys().map(String::as_str).collect::<Vec<_>>().join(", "));
            out.push_str(")\n  VALUES (");
            out.push_str(&insert.values().map(String::as_str).collect::<Vec<_>>().join(", "));
            out.push(')');
        }
        self.write_output(out, def);
        out.push(';');
        Ok(())
    }

    /// Render the clause joining `target` into an outer statement.
    ///
    /// A bare table (possibly filtered) becomes `LEFT OUTER JOIN`, anything carrying its own
    /// projection or shaping becomes `OUTER APPLY` over the rendered subquery.
    fn write_join(&self, out: &mut String, target: &QueryDef) -> Result<()> {
        if target.is_shaped_select() {
            let mut query = String::new();
            self.write_query_def(&mut query, target)?;
            out.push_str("OUTER APPLY (\n  ");
            write_indented(out, &query, "  ");
            out.push_str("\n)");
            if let Some(alias) = &target.alias {
                out.push_str(" AS ");
                out.push_str(alias);
            }
            return Ok(());
        }
        target.check_fields()?;
        out.push_str("LEFT OUTER JOIN ");
        self.write_source(out, target)?;
        if let Some(filter) = target.filter.as_ref().filter(|v| !v.is_empty()) {
            out.push_str(" ON ");
            separated_by(
                out,
                filter,
                |out, v| {
                    out.push('(');
                    out.push_str(v);
                    out.push(')');
                },
                " AND ",
            );
        }
        Ok(())
    }

    /// `<from>[ AS <alias>]`
    fn write_source(&self, out: &mut String, def: &QueryDef) -> Result<()> {
        let Some(from) = &def.from else {
            return Err(shape_error(def.kind, ShapeProblem::MissingFrom));
        };
        match from {
            FromDef::Table(table) => out.push_str(table),
            FromDef::Subquery(query) => {
                let mut text = String::new();
                self.write_query_def(&mut text, query)?;
                out.push_str("(\n  ");
                write_indented(out, &text, "  ");
                out.push_str("\n)");
            }
            FromDef::Union(queries) => {
                if queries.is_empty() {
                    return Err(shape_error(def.kind, ShapeProblem::EmptyUnion));
                }
                out.push_str("(\n\n  ");
                let mut texts = Vec::with_capacity(queries.len());
                for query in queries {
                    let mut text = String::new();
                    self.write_query_def(&mut text, query)?;
                    texts.push(text);
                }
                separated_by(
                    out,
                    texts,
                    |out, v| write_indented(out, &v, "  "),
                    "\n\n  UNION ALL\n\n  ",
                );
                out.push_str("\n\n)");
            }
        }
        if let Some(alias) = &def.alias {
            out.push_str(" AS ");
            out.push_str(alias);
        }
        Ok(())
    }

    fn write_joins(&self, out: &mut String, def: &QueryDef) {
        for join in def.join.iter().flatten() {
            out.push('\n');
            out.push_str(join);
        }
    }

    /// `WHERE (p1)\nAND   (p2)`
    fn write_predicates(&self, out: &mut String, keyword: &str, predicates: Option<&[String]>) {
        let Some(predicates) = predicates.filter(|v| !v.is_empty()) else {
            return;
        };
        out.push('\n');
        out.push_str(keyword);
        out.push_str(" (");
        separated_by(out, predicates, |out, v| out.push_str(v), ")\nAND   (");
        out.push(')');
    }

    fn write_assignments(
        &self,
        out: &mut String,
        values: &IndexMap<String, String>,
        indent: &str,
        operator: &str,
        value_first: bool,
    ) {
        separated_by(
            out,
            values.iter(),
            |out, (key, value)| {
                out.push_str(indent);
                let (lhs, rhs) = if value_first {
                    (value.as_str(), key.as_str())
                } else {
                    (key.as_str(), value.as_str())
                };
                out.push_str(lhs);
                out.push_str(operator);
                out.push_str(rhs);
            },
            ",\n",
        );
    }

    fn write_top(&self, out: &mut String, def: &QueryDef) {
        if let Some(top) = def.top {
            out.push_str("TOP (");
            write_integer!(out, top);
            out.push_str(") ");
        }
    }

    fn write_output(&self, out: &mut String, def: &QueryDef) {
        if let Some(output) = def.output.as_ref().filter(|v| !v.is_empty()) {
            out.push_str("\nOUTPUT ");
            out.push_str(&output.join(", "));
        }
    }

    fn table_name<'d>(&self, def: &'d QueryDef) -> Result<&'d str> {
        match &def.from {
            Some(FromDef::Table(table)) => Ok(table),
            Some(..) => Err(shape_error(def.kind, ShapeProblem::NotATable)),
            None => Err(shape_error(def.kind, ShapeProblem::MissingFrom)),
        }
    }
}

/// Bracket quoted T-SQL writer.
#[derive(Default, Debug, Clone, Copy)]
pub struct GenericSqlWriter {}

impl GenericSqlWriter {
    pub const fn new() -> Self {
        Self {}
    }
}

impl SqlWriter for GenericSqlWriter {
    fn as_dyn(&self) -> &dyn SqlWriter {
        self
    }
}
