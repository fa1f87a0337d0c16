use serde::{Deserialize, Serialize};

/// A joined relation. `alias` is the dot separated path from the queryable that owns the
/// join, `single` tells whether it yields at most one row per parent row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinDef {
    pub alias: String,
    pub single: bool,
    pub joins: Vec<JoinDef>,
}

impl JoinDef {
    /// Copy with `prefix.` prepended to this alias and every nested one.
    pub fn prefixed(&self, prefix: &str) -> JoinDef {
        JoinDef {
            alias: format!("{prefix}.{}", self.alias),
            single: self.single,
            joins: self.joins.iter().map(|j| j.prefixed(prefix)).collect(),
        }
    }

    /// Depth first walk over `joins` and all their nested joins.
    pub fn flatten(joins: &[JoinDef]) -> Vec<&JoinDef> {
        let mut result = Vec::new();
        let mut stack = joins.iter().rev().collect::<Vec<_>>();
        while let Some(join) = stack.pop() {
            result.push(join);
            stack.extend(join.joins.iter().rev());
        }
        result
    }

    /// Insert `join` under the deepest join whose alias prefixes it.
    pub fn insert_nested(joins: &mut Vec<JoinDef>, join: JoinDef) {
        let parent = joins.iter_mut().find(|j| {
            join.alias
                .strip_prefix(j.alias.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
        });
        match parent {
            Some(parent) => JoinDef::insert_nested(&mut parent.joins, join),
            None => joins.push(join),
        }
    }
}
