use crate::{
    AsValue, GenericSqlWriter, Queryable, QueryError, Result, SqlWriter, SubqueryConstraint,
    ValueType, write_indented,
};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A rendered SQL fragment paired with its runtime type.
///
/// Every projection, predicate and assignment is expressed through this type, the text is
/// spliced verbatim into the statement being rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExpressionUnit {
    pub text: String,
    pub value_type: ValueType,
}

impl ExpressionUnit {
    /// Trusted SQL text, it is not escaped.
    pub fn raw(text: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            text: text.into(),
            value_type,
        }
    }

    /// Inline literal.
    ///
    /// ```rust
    /// use strata_core::{ExpressionUnit, ValueType};
    /// let unit = ExpressionUnit::from_literal("it's");
    /// assert_eq!(unit.text, "N'it''s'");
    /// assert_eq!(unit.value_type, ValueType::String);
    /// ```
    pub fn from_literal(value: impl AsValue) -> Self {
        let value = value.as_value();
        let mut text = String::new();
        GenericSqlWriter::new().write_value(&mut text, &value);
        Self {
            text,
            value_type: value.value_type(),
        }
    }

    /// Column reference `[alias].[column]`.
    pub fn from_column(alias: &str, column: &str, value_type: ValueType) -> Self {
        let writer = GenericSqlWriter::new();
        let mut text = String::with_capacity(alias.len() + column.len() + 5);
        writer.write_identifier_quoted(&mut text, alias);
        text.push('.');
        writer.write_identifier_quoted(&mut text, column);
        Self { text, value_type }
    }

    /// Correlated scalar subquery. The queryable must be `TOP 1` and project exactly one column.
    pub fn from_subquery<T>(queryable: &Queryable<T>) -> Result<Self> {
        if queryable.builder().def().top != Some(1) {
            return Err(QueryError::SubqueryShape(SubqueryConstraint::TopOne).into());
        }
        let select = queryable.select_map();
        let Some((_, unit)) = select.first().filter(|_| select.len() == 1) else {
            return Err(QueryError::SubqueryShape(SubqueryConstraint::SingleColumn {
                found: select.len(),
            })
            .into());
        };
        let value_type = unit.value_type;
        let query = queryable.query()?;
        let mut text = String::with_capacity(query.len() + 8);
        text.push_str("(\n  ");
        write_indented(&mut text, &query, "  ");
        text.push_str("\n)");
        Ok(Self { text, value_type })
    }

    /// Same text, different type tag.
    pub fn with_type(mut self, value_type: ValueType) -> Self {
        self.value_type = value_type;
        self
    }
}

impl Display for ExpressionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
