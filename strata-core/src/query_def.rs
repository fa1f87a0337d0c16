use crate::{QueryError, Result, ShapeProblem};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    #[default]
    Select,
    Insert,
    Update,
    Upsert,
    Delete,
}

impl QueryKind {
    /// Whether a populated `field` is legal for this statement kind.
    pub fn allows(&self, field: Field) -> bool {
        use Field::*;
        match self {
            QueryKind::Select => matches!(
                field,
                Distinct | Top | Select | From | As | Join | Where | GroupBy | Having | OrderBy
                    | Limit
            ),
            QueryKind::Update => matches!(
                field,
                Top | Select | From | Update | Output | As | Join | Where
            ),
            QueryKind::Delete => matches!(field, Top | Select | From | Output | As | Join | Where),
            QueryKind::Insert => {
                matches!(field, From | Select | As | Insert | Output | IdentityInsert)
            }
            QueryKind::Upsert => matches!(
                field,
                Top | From | Select | As | Where | Update | Insert | Output | IdentityInsert
            ),
        }
    }
}

impl Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            QueryKind::Select => "SELECT",
            QueryKind::Insert => "INSERT",
            QueryKind::Update => "UPDATE",
            QueryKind::Upsert => "UPSERT",
            QueryKind::Delete => "DELETE",
        })
    }
}

/// Optional parts of a [`QueryDef`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    From,
    As,
    Select,
    Where,
    Distinct,
    Top,
    GroupBy,
    Having,
    Join,
    OrderBy,
    Limit,
    Update,
    Insert,
    Output,
    IdentityInsert,
}

impl Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::From => "FROM",
            Field::As => "AS",
            Field::Select => "SELECT",
            Field::Where => "WHERE",
            Field::Distinct => "DISTINCT",
            Field::Top => "TOP",
            Field::GroupBy => "GROUP BY",
            Field::Having => "HAVING",
            Field::Join => "JOIN",
            Field::OrderBy => "ORDER BY",
            Field::Limit => "LIMIT",
            Field::Update => "UPDATE",
            Field::Insert => "INSERT",
            Field::Output => "OUTPUT",
            Field::IdentityInsert => "IDENTITY_INSERT",
        })
    }
}

/// Source of a statement: a table, a nested definition or a `UNION ALL` of definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FromDef {
    Table(String),
    Union(Vec<QueryDef>),
    Subquery(Box<QueryDef>),
}

/// `OFFSET skip ROWS FETCH NEXT take ROWS ONLY`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limit {
    pub skip: u64,
    pub take: u64,
}

/// Intermediate representation of one statement.
///
/// All the fragments are already rendered SQL. The serialized form is stable and doubles as
/// the result cache key, so it must capture every input of the query.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryDef {
    #[serde(rename = "type")]
    pub kind: QueryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<FromDef>,
    #[serde(rename = "as", default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub select: Option<IndexMap<String, String>>,
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub distinct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub having: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<Limit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<String>>,
    /// Explicit values are written into the identity column.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub identity_insert: bool,
}

impl QueryDef {
    pub fn new(kind: QueryKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// The optional fields currently set, in declaration order.
    pub fn populated_fields(&self) -> Vec<Field> {
        [
            (Field::From, self.from.is_some()),
            (Field::As, self.alias.is_some()),
            (Field::Select, self.select.is_some()),
            (Field::Where, self.filter.is_some()),
            (Field::Distinct, self.distinct),
            (Field::Top, self.top.is_some()),
            (Field::GroupBy, self.group_by.is_some()),
            (Field::Having, self.having.is_some()),
            (Field::Join, self.join.is_some()),
            (Field::OrderBy, self.order_by.is_some()),
            (Field::Limit, self.limit.is_some()),
            (Field::Update, self.update.is_some()),
            (Field::Insert, self.insert.is_some()),
            (Field::Output, self.output.is_some()),
            (Field::IdentityInsert, self.identity_insert),
        ]
        .into_iter()
        .filter_map(|(field, set)| set.then_some(field))
        .collect()
    }

    /// Fails with a statement shape error listing every field illegal for the kind.
    pub fn check_fields(&self) -> Result<()> {
        let illegal = self
            .populated_fields()
            .into_iter()
            .filter(|f| !self.kind.allows(*f))
            .collect::<Vec<_>>();
        if !illegal.is_empty() {
            return Err(QueryError::StatementShape {
                kind: self.kind,
                problem: ShapeProblem::IllegalFields(illegal),
            }
            .into());
        }
        Ok(())
    }

    /// A select carrying anything beyond its source, alias and predicates.
    pub fn is_shaped_select(&self) -> bool {
        self.kind == QueryKind::Select
            && self
                .populated_fields()
                .into_iter()
                .any(|f| !matches!(f, Field::From | Field::As | Field::Where))
    }

    pub fn table_name(&self) -> Option<&str> {
        match &self.from {
            Some(FromDef::Table(name)) => Some(name),
            _ => None,
        }
    }
}
