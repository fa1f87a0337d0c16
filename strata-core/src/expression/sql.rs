//! Functions and connectives producing [`ExpressionUnit`]s.
use crate::{AsValue, ExpressionUnit, IntoOperand, Queryable, Result, ValueType, write_indented};

fn connective(
    predicates: impl IntoIterator<Item = ExpressionUnit>,
    op: &str,
    empty: &str,
) -> ExpressionUnit {
    let predicates = predicates.into_iter().collect::<Vec<_>>();
    let text = match predicates.as_slice() {
        [] => empty.to_owned(),
        [single] => single.text.clone(),
        many => many
            .iter()
            .map(|v| format!("({v})"))
            .collect::<Vec<_>>()
            .join(op),
    };
    ExpressionUnit::raw(text, ValueType::Boolean)
}

/// `(p1) AND (p2)`, true when empty.
pub fn and(predicates: impl IntoIterator<Item = ExpressionUnit>) -> ExpressionUnit {
    connective(predicates, " AND ", "1 = 1")
}

/// `(p1) OR (p2)`, false when empty.
pub fn or(predicates: impl IntoIterator<Item = ExpressionUnit>) -> ExpressionUnit {
    connective(predicates, " OR ", "1 = 0")
}

pub fn not(predicate: &ExpressionUnit) -> ExpressionUnit {
    ExpressionUnit::raw(format!("NOT ({predicate})"), ValueType::Boolean)
}

pub fn lit(value: impl AsValue) -> ExpressionUnit {
    ExpressionUnit::from_literal(value)
}

pub fn raw(text: impl Into<String>, value_type: ValueType) -> ExpressionUnit {
    ExpressionUnit::raw(text, value_type)
}

/// `COUNT(*)`
pub fn count() -> ExpressionUnit {
    ExpressionUnit::raw("COUNT(*)", ValueType::Number)
}

pub fn count_of(value: &ExpressionUnit) -> ExpressionUnit {
    ExpressionUnit::raw(format!("COUNT({value})"), ValueType::Number)
}

pub fn count_distinct(value: &ExpressionUnit) -> ExpressionUnit {
    ExpressionUnit::raw(format!("COUNT(DISTINCT {value})"), ValueType::Number)
}

pub fn sum(value: &ExpressionUnit) -> ExpressionUnit {
    ExpressionUnit::raw(format!("SUM({value})"), ValueType::Number)
}

pub fn avg(value: &ExpressionUnit) -> ExpressionUnit {
    ExpressionUnit::raw(format!("AVG({value})"), ValueType::Number)
}

pub fn max(value: &ExpressionUnit) -> ExpressionUnit {
    ExpressionUnit::raw(format!("MAX({value})"), value.value_type)
}

pub fn min(value: &ExpressionUnit) -> ExpressionUnit {
    ExpressionUnit::raw(format!("MIN({value})"), value.value_type)
}

/// `ISNULL(value, fallback)`
pub fn if_null(value: &ExpressionUnit, fallback: impl IntoOperand) -> ExpressionUnit {
    let fallback: ExpressionUnit = fallback.into_operand().into();
    let value_type = match value.value_type {
        ValueType::Unknown => fallback.value_type,
        v => v,
    };
    ExpressionUnit::raw(format!("ISNULL({value}, {fallback})"), value_type)
}

/// `CASE WHEN predicate THEN then ELSE otherwise END`
pub fn case_when(
    predicate: &ExpressionUnit,
    then: impl IntoOperand,
    otherwise: impl IntoOperand,
) -> ExpressionUnit {
    let then: ExpressionUnit = then.into_operand().into();
    let otherwise: ExpressionUnit = otherwise.into_operand().into();
    let value_type = match then.value_type {
        ValueType::Unknown => otherwise.value_type,
        v => v,
    };
    ExpressionUnit::raw(
        format!("CASE WHEN {predicate} THEN {then} ELSE {otherwise} END"),
        value_type,
    )
}

/// Turns a predicate into a projectable boolean column.
pub fn is(predicate: &ExpressionUnit) -> ExpressionUnit {
    ExpressionUnit::raw(
        format!("CASE WHEN {predicate} THEN 1 ELSE 0 END"),
        ValueType::Boolean,
    )
}

pub fn concat<I>(values: I) -> ExpressionUnit
where
    I: IntoIterator,
    I::Item: IntoOperand,
{
    let values = values
        .into_iter()
        .map(|v| ExpressionUnit::from(v.into_operand()).text)
        .collect::<Vec<_>>();
    ExpressionUnit::raw(format!("CONCAT({})", values.join(", ")), ValueType::String)
}

/// `EXISTS (subquery)`
pub fn exists<T>(queryable: &Queryable<T>) -> Result<ExpressionUnit> {
    let query = queryable.query()?;
    let mut text = String::with_capacity(query.len() + 14);
    text.push_str("EXISTS (\n  ");
    write_indented(&mut text, &query, "  ");
    text.push_str("\n)");
    Ok(ExpressionUnit::raw(text, ValueType::Boolean))
}
