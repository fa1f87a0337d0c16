use crate::{Field, QueryKind};
use std::fmt::{self, Display};
use thiserror::Error;

/// Construction and render time failures. They are deterministic: they signal a query
/// built the wrong way, never a transient condition.
///
/// They travel inside [`crate::Error`], match on them with `downcast_ref::<QueryError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("A subquery used as a value {0}")]
    SubqueryShape(SubqueryConstraint),

    #[error("Invalid {kind} statement: {problem}")]
    StatementShape { kind: QueryKind, problem: ShapeProblem },

    #[error("LIMIT requires ORDER BY")]
    PaginationOrder,

    #[error("HAVING requires GROUP BY")]
    AggregationScope,

    #[error(
        "LIMIT cannot be applied after a one-to-many join, limit first, then wrap, then join"
    )]
    FanoutLimit,

    #[error("UPSERT requires a WHERE predicate to match existing rows")]
    MissingUpsertPredicate,

    #[error("Unknown path `{0}`")]
    UnknownPath(String),

    #[error("Table `{table}` does not declare a navigation named `{name}`")]
    UnknownNavigation { table: String, name: String },

    #[error(
        "Foreign key `{name}` has {columns} column(s) but the primary key of `{target}` has {keys}"
    )]
    KeyMismatch {
        name: String,
        target: String,
        columns: usize,
        keys: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubqueryConstraint {
    TopOne,
    SingleColumn { found: usize },
}

impl Display for SubqueryConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubqueryConstraint::TopOne => f.write_str("must be TOP 1"),
            SubqueryConstraint::SingleColumn { found } => write!(
                f,
                "must project exactly one column (it projects {found})"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeProblem {
    /// Fields populated that the statement kind does not accept.
    IllegalFields(Vec<Field>),
    MissingFrom,
    /// Nothing to write.
    MissingValues,
    /// The statement needs a plain table as its source.
    NotATable,
    EmptyUnion,
    UnaliasedUnionMember(usize),
    /// A projection must produce an object.
    ProjectionNotObject,
    /// The alias is already joined with a different clause.
    AliasConflict(String),
}

impl Display for ShapeProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeProblem::IllegalFields(fields) => {
                f.write_str("cannot be used with ")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}")?;
                }
                Ok(())
            }
            ShapeProblem::MissingFrom => f.write_str("FROM is not set"),
            ShapeProblem::MissingValues => f.write_str("there are no values to write"),
            ShapeProblem::NotATable => f.write_str("the source must be a table"),
            ShapeProblem::EmptyUnion => f.write_str("UNION ALL needs at least one query"),
            ShapeProblem::UnaliasedUnionMember(i) => {
                write!(f, "UNION ALL member {i} has no alias")
            }
            ShapeProblem::ProjectionNotObject => f.write_str("the projection must be an object"),
            ShapeProblem::AliasConflict(alias) => {
                write!(f, "alias {alias} is already joined with a different clause")
            }
        }
    }
}
