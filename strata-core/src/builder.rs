use crate::{
    Assignments, ExpressionUnit, FromDef, GenericSqlWriter, Limit, Order, QueryDef,
    QueryError, QueryKind, Result, SelectMap, ShapeProblem, SqlWriter,
};
use indexmap::IndexMap;

/// Clone on write builder over a single [`QueryDef`].
///
/// Mutators never touch the receiver, they return a copy with one field changed so every
/// intermediate builder stays reusable.
///
/// ```rust
/// use strata_core::{ExpressionUnit, QueryDefBuilder, ValueType};
/// let base = QueryDefBuilder::from_table("[db].[dbo].[Item]").alias("TBL");
/// let id = ExpressionUnit::from_column("TBL", "id", ValueType::Number);
/// let filtered = base.filter([id.equal(1)]);
/// assert!(base.def().filter.is_none());
/// assert_eq!(
///     filtered.query().unwrap(),
///     "SELECT\n  *\nFROM [db].[dbo].[Item] AS [TBL]\nWHERE ([TBL].[id] = 1)"
/// );
/// ```
#[derive(Default, Debug, Clone, PartialEq)]
pub struct QueryDefBuilder {
    def: QueryDef,
}

fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    GenericSqlWriter::new().write_identifier_quoted(&mut out, value);
    out
}

fn quoted_keys(values: &Assignments) -> IndexMap<String, String> {
    values
        .iter()
        .map(|(k, v)| (quoted(k), v.text.clone()))
        .collect()
}

impl QueryDefBuilder {
    pub fn new(def: QueryDef) -> Self {
        Self { def }
    }

    /// Select from an already rendered table reference, e.g. `[db].[schema].[name]`.
    pub fn from_table(table: impl Into<String>) -> Self {
        Self::new(QueryDef {
            from: Some(FromDef::Table(table.into())),
            ..Default::default()
        })
    }

    /// Select from `(\n  <query>\n)`.
    pub fn from_subquery(query: &QueryDefBuilder) -> Self {
        Self::new(QueryDef {
            from: Some(FromDef::Subquery(Box::new(query.def.clone()))),
            ..Default::default()
        })
    }

    /// Select from the `UNION ALL` of `queries`. Each member must carry an alias, the outer
    /// projection mirrors the column names of the first member.
    pub fn from_union(queries: &[QueryDefBuilder]) -> Result<Self> {
        if queries.is_empty() {
            return Err(QueryError::StatementShape {
                kind: QueryKind::Select,
                problem: ShapeProblem::EmptyUnion,
            }
            .into());
        }
        if let Some(i) = queries.iter().position(|q| q.def.alias.is_none()) {
            return Err(QueryError::StatementShape {
                kind: QueryKind::Select,
                problem: ShapeProblem::UnaliasedUnionMember(i),
            }
            .into());
        }
        let select = queries[0]
            .def
            .select
            .as_ref()
            .map(|v| v.keys().map(|k| (k.clone(), k.clone())).collect());
        Ok(Self::new(QueryDef {
            from: Some(FromDef::Union(
                queries.iter().map(|q| q.def.clone()).collect(),
            )),
            select,
            ..Default::default()
        }))
    }

    pub fn def(&self) -> &QueryDef {
        &self.def
    }

    pub fn build(&self) -> QueryDef {
        self.def.clone()
    }

    fn with(&self, f: impl FnOnce(&mut QueryDef)) -> Self {
        let mut result = self.clone();
        f(&mut result.def);
        result
    }

    /// Replace the source keeping every other field.
    pub fn from(&self, from: FromDef) -> Self {
        self.with(|def| def.from = Some(from))
    }

    /// Set the source alias, it gets bracket quoted.
    #[doc(alias = "as")]
    pub fn alias(&self, alias: &str) -> Self {
        let alias = quoted(alias);
        self.with(|def| def.alias = Some(alias))
    }

    /// Replace the projection. Keys are output aliases and get bracket quoted.
    pub fn select(&self, select: &SelectMap) -> Self {
        let select = quoted_keys(select);
        self.with(|def| def.select = Some(select))
    }

    /// Append predicates, they are AND combined.
    #[doc(alias = "where")]
    pub fn filter(&self, predicates: impl IntoIterator<Item = ExpressionUnit>) -> Self {
        self.with(|def| {
            def.filter
                .get_or_insert_default()
                .extend(predicates.into_iter().map(|v| v.text))
        })
    }

    pub fn distinct(&self) -> Self {
        self.with(|def| def.distinct = true)
    }

    pub fn top(&self, count: u64) -> Self {
        self.with(|def| def.top = Some(count))
    }

    pub fn order_by(&self, expression: &ExpressionUnit, order: Order) -> Self {
        let entry = format!("{} {}", expression.text, order.as_str());
        self.with(|def| def.order_by.get_or_insert_default().push(entry))
    }

    pub fn limit(&self, skip: u64, take: u64) -> Self {
        self.with(|def| def.limit = Some(Limit { skip, take }))
    }

    pub fn group_by(&self, expressions: impl IntoIterator<Item = ExpressionUnit>) -> Self {
        self.with(|def| {
            def.group_by
                .get_or_insert_default()
                .extend(expressions.into_iter().map(|v| v.text))
        })
    }

    pub fn having(&self, predicates: impl IntoIterator<Item = ExpressionUnit>) -> Self {
        self.with(|def| {
            def.having
                .get_or_insert_default()
                .extend(predicates.into_iter().map(|v| v.text))
        })
    }

    /// Join `target`, see [`SqlWriter::write_join`] for the rendered form. Joining the same
    /// clause twice keeps a single copy.
    pub fn join(&self, target: &QueryDefBuilder) -> Result<Self> {
        let clause = target.join_clause()?;
        if self.def.join.iter().flatten().any(|v| *v == clause) {
            return Ok(self.clone());
        }
        Ok(self.with(|def| def.join.get_or_insert_default().push(clause)))
    }

    /// The clause this builder renders to when joined into another statement.
    pub fn join_clause(&self) -> Result<String> {
        let mut out = String::new();
        GenericSqlWriter::new().write_join(&mut out, &self.def)?;
        Ok(out)
    }

    /// Turn into an UPDATE writing `values`, keys are column names.
    pub fn update(&self, values: &Assignments) -> Self {
        let values = quoted_keys(values);
        self.with(|def| {
            def.kind = QueryKind::Update;
            def.update = Some(values);
        })
    }

    /// Turn into a DELETE, outputting the deleted rows unless an output is already set.
    pub fn delete(&self) -> Self {
        self.with(|def| {
            def.kind = QueryKind::Delete;
            def.output.get_or_insert_with(|| vec!["DELETED.*".into()]);
        })
    }

    pub fn insert(&self, values: &Assignments) -> Self {
        let values = quoted_keys(values);
        self.with(|def| {
            def.kind = QueryKind::Insert;
            def.insert = Some(values);
        })
    }

    /// Turn into a MERGE: rows matching the predicates get `update`, otherwise `insert` is added.
    pub fn upsert(&self, update: &Assignments, insert: &Assignments) -> Self {
        let update = quoted_keys(update);
        let insert = quoted_keys(insert);
        self.with(|def| {
            def.kind = QueryKind::Upsert;
            def.update = Some(update);
            def.insert = Some(insert);
        })
    }

    /// Wrap the write in `SET IDENTITY_INSERT ... ON` and `OFF`.
    pub fn identity_insert(&self) -> Self {
        self.with(|def| def.identity_insert = true)
    }

    pub fn output(&self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let columns = columns.into_iter().map(Into::into).collect();
        self.with(|def| def.output = Some(columns))
    }

    /// Render with the default writer.
    pub fn query(&self) -> Result<String> {
        self.query_with(&GenericSqlWriter::new())
    }

    pub fn query_with(&self, writer: &dyn SqlWriter) -> Result<String> {
        let mut out = String::new();
        writer.write_query_def(&mut out, &self.def)?;
        Ok(out)
    }
}

impl From<QueryDef> for QueryDefBuilder {
    fn from(def: QueryDef) -> Self {
        Self::new(def)
    }
}
