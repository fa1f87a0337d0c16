use super::{Queryable, seed_select};
use crate::{
    Assignments, Entity, ExpressionUnit, Field, FromDef, GenericSqlWriter, QueryDefBuilder,
    QueryError, QueryKind, Record, Result, ShapeProblem, SqlWriter, TableDef,
};

const INSERTED: &str = "INSERTED";
const DELETED: &str = "DELETED";

/// `INSERTED.[column] AS [property]` for every column, the rows written come back shaped
/// like the entity.
fn output(table: &TableDef, source: &str) -> Vec<String> {
    let writer = GenericSqlWriter::new();
    table
        .columns
        .iter()
        .map(|c| {
            let mut out = String::with_capacity(source.len() + c.name.len() + c.property.len() + 9);
            out.push_str(source);
            out.push('.');
            writer.write_identifier_quoted(&mut out, &c.name);
            out.push_str(" AS ");
            writer.write_identifier_quoted(&mut out, &c.property);
            out
        })
        .collect()
}

/// Property keyed values to column keyed values.
fn columns(table: &TableDef, values: &Assignments) -> Result<Assignments> {
    values
        .iter()
        .map(|(property, value)| {
            table
                .column(property)
                .map(|c| (c.name.to_string(), value.clone()))
                .ok_or_else(|| QueryError::UnknownPath(property.to_owned()).into())
        })
        .collect()
}

/// An auto increment column receives an explicit non null value.
fn writes_identity(table: &TableDef, values: &Assignments) -> bool {
    table.columns.iter().any(|c| {
        c.auto_increment
            && values
                .get(c.property.as_ref())
                .is_some_and(|v| !v.text.eq_ignore_ascii_case("NULL"))
    })
}

impl<T> Queryable<T> {
    /// The table written by a `kind` statement, after checking nothing but `allowed` was
    /// applied to this queryable.
    fn written_table(&self, kind: QueryKind, allowed: &[Field]) -> Result<&'static TableDef> {
        let def = self.builder.def();
        let mut illegal = Vec::new();
        if self.custom_select {
            illegal.push(Field::Select);
        }
        illegal.extend(
            def.populated_fields()
                .into_iter()
                .filter(|f| !matches!(f, Field::From | Field::As) && !allowed.contains(f)),
        );
        if !illegal.is_empty() {
            return Err(QueryError::StatementShape {
                kind,
                problem: ShapeProblem::IllegalFields(illegal),
            }
            .into());
        }
        match (self.table, &def.from) {
            (Some(table), Some(FromDef::Table(..))) => Ok(table),
            _ => Err(QueryError::StatementShape {
                kind,
                problem: ShapeProblem::NotATable,
            }
            .into()),
        }
    }

    /// The statement in `builder`, returning rows shaped like the table.
    fn writing(&self, table: &TableDef, builder: QueryDefBuilder) -> Self {
        let mut result = self.clone();
        result.builder = builder;
        result.select = seed_select(table, &self.alias);
        result.joins.clear();
        result.single_paths.clear();
        result.multi_paths.clear();
        result.custom_select = false;
        result
    }

    /// `INSERT` the fields of `row`. Auto increment fields left unset are omitted.
    pub fn insert(&self, row: &T) -> Result<Self>
    where
        T: Entity,
    {
        let values = row
            .row()
            .into_iter()
            .map(|(property, value)| (property.to_owned(), ExpressionUnit::from_literal(value)))
            .collect::<Assignments>();
        self.insert_values(&values)
    }

    /// `INSERT` explicit property keyed values. A value for the identity column turns on
    /// `IDENTITY_INSERT` around the statement.
    pub fn insert_values(&self, values: &Assignments) -> Result<Self> {
        let table = self.written_table(QueryKind::Insert, &[])?;
        let mut builder = self
            .builder
            .insert(&columns(table, values)?)
            .output(output(table, INSERTED));
        if writes_identity(table, values) {
            builder = builder.identity_insert();
        }
        Ok(self.writing(table, builder))
    }

    /// `UPDATE` the rows matched so far with the assignments returned by `values`.
    pub fn update(&self, values: impl FnOnce(&Record) -> Result<Assignments>) -> Result<Self> {
        let table =
            self.written_table(QueryKind::Update, &[Field::Where, Field::Top, Field::Join])?;
        let values = values(&self.entity())?;
        let builder = self
            .builder
            .update(&columns(table, &values)?)
            .output(output(table, INSERTED));
        Ok(self.writing(table, builder))
    }

    /// Update the rows matched by the predicates, insert a row when there is none.
    ///
    /// The inserted row carries the update values plus `additional_insert`, which wins on
    /// overlapping properties.
    pub fn upsert(
        &self,
        values: impl FnOnce(&Record) -> Result<Assignments>,
        additional_insert: Option<&Assignments>,
    ) -> Result<Self> {
        let table =
            self.written_table(QueryKind::Upsert, &[Field::Where, Field::Top, Field::Join])?;
        if self.builder.def().filter.is_none() {
            return Err(QueryError::MissingUpsertPredicate.into());
        }
        let update = values(&self.entity())?;
        let mut insert = update.clone();
        for (property, value) in additional_insert.into_iter().flat_map(|v| v.iter()) {
            insert.insert(property.clone(), value.clone());
        }
        let mut builder = self
            .builder
            .upsert(&columns(table, &update)?, &columns(table, &insert)?)
            .output(output(table, INSERTED));
        if writes_identity(table, &insert) {
            builder = builder.identity_insert();
        }
        Ok(self.writing(table, builder))
    }

    /// `DELETE` the rows matched so far.
    pub fn delete(&self) -> Result<Self> {
        let table =
            self.written_table(QueryKind::Delete, &[Field::Where, Field::Top, Field::Join])?;
        let builder = self.builder.delete().output(output(table, DELETED));
        Ok(self.writing(table, builder))
    }
}
