use crate::{ExpressionUnit, IntoOperand};
use indexmap::IndexMap;

/// Dot-path alias to expression, drives both the projection and the result reconstruction.
pub type SelectMap = IndexMap<String, ExpressionUnit>;

/// Property to expression, the values of an INSERT, UPDATE or UPSERT.
pub type Assignments = IndexMap<String, ExpressionUnit>;

/// Builder style insertion into [`Assignments`], accepting literals as well as expressions.
///
/// ```rust
/// use strata_core::{Assignments, AssignmentsExt, ValueType};
/// let values = Assignments::new().set("name", "hello").set("count", 3);
/// assert_eq!(values.get("name").map(|v| v.text.as_str()), Some("N'hello'"));
/// assert_eq!(values.get("count").map(|v| v.value_type), Some(ValueType::Number));
/// ```
pub trait AssignmentsExt {
    fn set(self, key: impl Into<String>, value: impl IntoOperand) -> Self;
}

impl AssignmentsExt for Assignments {
    fn set(mut self, key: impl Into<String>, value: impl IntoOperand) -> Self {
        self.insert(key.into(), value.into_operand().into());
        self
    }
}

/// Insert `key` right after the last key sharing its deepest existing dotted prefix, so keys
/// of the same nested object stay adjacent. Keys with no such prefix go at the end.
pub(crate) fn insert_grouped(select: &mut SelectMap, key: String, value: ExpressionUnit) {
    if let Some(entry) = select.get_mut(&key) {
        *entry = value;
        return;
    }
    let mut prefix = key.as_str();
    while let Some((head, _)) = prefix.rsplit_once('.') {
        prefix = head;
        let position = select.keys().rposition(|k| {
            k.strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with('.'))
        });
        if let Some(position) = position {
            select.shift_insert(position + 1, key, value);
            return;
        }
    }
    select.insert(key, value);
}
