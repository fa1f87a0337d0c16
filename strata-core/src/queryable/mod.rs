mod crud;
mod join;

use crate::{
    CompiledQuery, ColumnShape, Entity, ExpressionUnit, Flattened, JoinDef, Order, PathShape,
    QueryDef, QueryDefBuilder, QueryError, QueryKind, Record, Result, ResultShape, SchemaDefaults,
    SelectMap, ShapeProblem, TableDef,
};
use std::{
    fmt::{self, Debug},
    marker::PhantomData,
    sync::Arc,
};

/// Alias of the outermost source, joins nest under it as `TBL.<path>`.
pub const ROOT_ALIAS: &str = "TBL";

/// Typed fluent query over rows of type `T`.
///
/// It pairs a [`QueryDefBuilder`] with the select map that both projects the statement and
/// rebuilds nested results, plus the metadata of the joins performed. Every operation returns
/// a new queryable, the receiver stays usable.
pub struct Queryable<T> {
    table: Option<&'static TableDef>,
    defaults: Arc<SchemaDefaults>,
    alias: String,
    builder: QueryDefBuilder,
    select: SelectMap,
    joins: Vec<JoinDef>,
    single_paths: Vec<String>,
    multi_paths: Vec<String>,
    custom_select: bool,
    _row: PhantomData<fn() -> T>,
}

impl<T> Debug for Queryable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queryable")
            .field("table", &self.table.map(|t| &t.name))
            .field("alias", &self.alias)
            .field("def", self.builder.def())
            .field("select", &self.select.keys().collect::<Vec<_>>())
            .field("joins", &self.joins)
            .finish()
    }
}

impl<T> Clone for Queryable<T> {
    fn clone(&self) -> Self {
        Self {
            table: self.table,
            defaults: self.defaults.clone(),
            alias: self.alias.clone(),
            builder: self.builder.clone(),
            select: self.select.clone(),
            joins: self.joins.clone(),
            single_paths: self.single_paths.clone(),
            multi_paths: self.multi_paths.clone(),
            custom_select: self.custom_select,
            _row: PhantomData,
        }
    }
}

fn seed_select(table: &TableDef, alias: &str) -> SelectMap {
    table
        .columns
        .iter()
        .map(|c| {
            (
                c.property.to_string(),
                ExpressionUnit::from_column(alias, &c.name, c.value_type),
            )
        })
        .collect()
}

impl<T: Entity> Queryable<T> {
    /// Every column of `T`, from `[database].[schema].[table] AS [TBL]`.
    pub fn new(defaults: &SchemaDefaults) -> Self {
        Self::from_table_def(
            T::table_def(),
            ROOT_ALIAS.to_owned(),
            Arc::new(defaults.clone()),
        )
    }
}

impl<T> Queryable<T> {
    pub(crate) fn from_table_def(
        table: &'static TableDef,
        alias: String,
        defaults: Arc<SchemaDefaults>,
    ) -> Self {
        let builder = QueryDefBuilder::from_table(table.qualified_name(&defaults)).alias(&alias);
        Self {
            table: Some(table),
            select: seed_select(table, &alias),
            defaults,
            alias,
            builder,
            joins: Vec::new(),
            single_paths: Vec::new(),
            multi_paths: Vec::new(),
            custom_select: false,
            _row: PhantomData,
        }
    }

    /// Same query, different row type. Used once joins or projections changed the shape.
    pub fn cast<R>(self) -> Queryable<R> {
        Queryable {
            table: self.table,
            defaults: self.defaults,
            alias: self.alias,
            builder: self.builder,
            select: self.select,
            joins: self.joins,
            single_paths: self.single_paths,
            multi_paths: self.multi_paths,
            custom_select: self.custom_select,
            _row: PhantomData,
        }
    }

    /// Re-source over a nested source keeping the row shape: the select map becomes plain
    /// references into the new source and the join cardinalities carry over.
    fn resourced(&self, builder: QueryDefBuilder) -> Self {
        let shape = self.result_shape();
        let (single_paths, multi_paths) = shape.paths.into_iter().fold(
            (Vec::new(), Vec::new()),
            |(mut single, mut multi), path| {
                if path.single {
                    single.push(path.path);
                } else {
                    multi.push(path.path);
                }
                (single, multi)
            },
        );
        Self {
            table: self.table,
            defaults: self.defaults.clone(),
            alias: self.alias.clone(),
            select: self
                .select
                .iter()
                .map(|(key, unit)| {
                    (
                        key.clone(),
                        ExpressionUnit::from_column(&self.alias, key, unit.value_type),
                    )
                })
                .collect(),
            builder,
            joins: Vec::new(),
            single_paths,
            multi_paths,
            custom_select: false,
            _row: PhantomData,
        }
    }

    /// Use this query as the source of a new one, e.g. to limit before a one-to-many join.
    pub fn wrap(&self) -> Result<Self> {
        let inner = self.materialized();
        inner.query()?;
        Ok(self.resourced(QueryDefBuilder::from_subquery(&inner).alias(&self.alias)))
    }

    /// `UNION ALL` of `queryables`, shaped like the first one.
    pub fn union(queryables: &[Queryable<T>]) -> Result<Self> {
        let Some(first) = queryables.first() else {
            return Err(QueryError::StatementShape {
                kind: QueryKind::Select,
                problem: ShapeProblem::EmptyUnion,
            }
            .into());
        };
        let members = queryables
            .iter()
            .map(Queryable::materialized)
            .collect::<Vec<_>>();
        let builder = QueryDefBuilder::from_union(&members)?.alias(&first.alias);
        Ok(first.resourced(builder))
    }

    fn with_builder(&self, builder: QueryDefBuilder) -> Self {
        let mut result = self.clone();
        result.builder = builder;
        result
    }

    /// Replace the projection with the record returned by `projector`.
    ///
    /// Nested objects become single row paths and arrays multi row paths in the result.
    pub fn select<R>(
        &self,
        projector: impl FnOnce(&Record) -> Result<Record>,
    ) -> Result<Queryable<R>> {
        let record = projector(&self.entity())?;
        if !matches!(record, Record::Object(..)) {
            return Err(QueryError::StatementShape {
                kind: QueryKind::Select,
                problem: ShapeProblem::ProjectionNotObject,
            }
            .into());
        }
        let Flattened {
            select,
            single_paths,
            multi_paths,
        } = record.flatten();
        let mut result = self.clone().cast::<R>();
        result.select = select;
        result.single_paths = single_paths;
        result.multi_paths = multi_paths;
        result.custom_select = true;
        Ok(result)
    }

    /// Append predicates, AND combined.
    #[doc(alias = "where")]
    pub fn filter(
        &self,
        predicate: impl FnOnce(&Record) -> Result<Vec<ExpressionUnit>>,
    ) -> Result<Self> {
        let predicates = predicate(&self.entity())?;
        Ok(self.with_builder(self.builder.filter(predicates)))
    }

    pub fn having(
        &self,
        predicate: impl FnOnce(&Record) -> Result<Vec<ExpressionUnit>>,
    ) -> Result<Self> {
        let predicates = predicate(&self.entity())?;
        Ok(self.with_builder(self.builder.having(predicates)))
    }

    pub fn distinct(&self) -> Self {
        self.with_builder(self.builder.distinct())
    }

    pub fn top(&self, count: u64) -> Self {
        self.with_builder(self.builder.top(count))
    }

    pub fn order_by(
        &self,
        expression: impl FnOnce(&Record) -> Result<ExpressionUnit>,
        order: Order,
    ) -> Result<Self> {
        let expression = expression(&self.entity())?;
        Ok(self.with_builder(self.builder.order_by(&expression, order)))
    }

    pub fn group_by(
        &self,
        expressions: impl FnOnce(&Record) -> Result<Vec<ExpressionUnit>>,
    ) -> Result<Self> {
        let expressions = expressions(&self.entity())?;
        Ok(self.with_builder(self.builder.group_by(expressions)))
    }

    /// Page the rows. Rejected when a one-to-many join already multiplied them.
    pub fn limit(&self, skip: u64, take: u64) -> Result<Self> {
        if self.fans_out() {
            return Err(QueryError::FanoutLimit.into());
        }
        Ok(self.with_builder(self.builder.limit(skip, take)))
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn table(&self) -> Option<&'static TableDef> {
        self.table
    }

    pub fn defaults(&self) -> &SchemaDefaults {
        &self.defaults
    }

    /// The builder before the projection is applied.
    pub fn builder(&self) -> &QueryDefBuilder {
        &self.builder
    }

    pub fn select_map(&self) -> &SelectMap {
        &self.select
    }

    pub fn joins(&self) -> &[JoinDef] {
        &self.joins
    }

    pub fn all_join_defs(&self) -> Vec<&JoinDef> {
        JoinDef::flatten(&self.joins)
    }

    /// Whether a one-to-many relation multiplies the root rows, directly or inside a wrapped
    /// source.
    pub fn fans_out(&self) -> bool {
        !self.multi_paths.is_empty() || self.all_join_defs().iter().any(|j| !j.single)
    }

    pub fn has_custom_select(&self) -> bool {
        self.custom_select
    }

    /// Whether the nested `path` holds at most one row.
    pub fn is_single_path(&self, path: &str) -> bool {
        if self.single_paths.iter().any(|p| p == path) {
            return true;
        }
        if self.multi_paths.iter().any(|p| p == path) {
            return false;
        }
        self.all_join_defs()
            .into_iter()
            .find(|j| j.alias == path)
            .is_some_and(|j| j.single)
    }

    /// The nested view of the select map handed to projections and predicates.
    pub fn entity(&self) -> Record {
        Record::unflatten(&self.select, |path| self.is_single_path(path))
    }

    /// The builder with the select map applied to the projection.
    pub fn materialized(&self) -> QueryDefBuilder {
        if self.builder.def().kind == QueryKind::Select {
            self.builder.select(&self.select)
        } else {
            self.builder.clone()
        }
    }

    pub fn query_def(&self) -> QueryDef {
        self.materialized().build()
    }

    pub fn query(&self) -> Result<String> {
        self.materialized().query()
    }

    pub fn compile(&self) -> Result<CompiledQuery> {
        let builder = self.materialized();
        Ok(CompiledQuery {
            sql: builder.query()?,
            def: builder.build(),
        })
    }

    /// Columns with their types and nested paths with their cardinality, parents first.
    pub fn result_shape(&self) -> ResultShape {
        let columns = self
            .select
            .iter()
            .map(|(key, unit)| ColumnShape {
                key: key.to_owned(),
                value_type: unit.value_type,
            })
            .collect();
        let mut paths: Vec<PathShape> = Vec::new();
        for key in self.select.keys() {
            let mut end = 0;
            while let Some(i) = key[end..].find('.') {
                let path = &key[..end + i];
                if !paths.iter().any(|p| p.path == path) {
                    paths.push(PathShape {
                        path: path.to_owned(),
                        single: self.is_single_path(path),
                    });
                }
                end += i + 1;
            }
        }
        paths.sort_by_key(|p| p.path.matches('.').count());
        ResultShape { columns, paths }
    }
}
