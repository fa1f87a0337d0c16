use super::Queryable;
use crate::{
    Entity, ExpressionUnit, JoinDef, QueryError, QueryKind, Record, Result, ShapeProblem,
    TableDef, insert_grouped, join_path,
};

/// Where a navigation property leads: the target table, its cardinality and the
/// `(target property, owner property)` pairs equated by the join.
struct Navigation {
    target: &'static TableDef,
    single: bool,
    keys: Vec<(String, String)>,
}

fn navigate(table: &'static TableDef, name: &str) -> Result<Navigation> {
    if let Some(foreign_key) = table.foreign_key(name) {
        let target = (foreign_key.target)();
        let primary_key = target.primary_key();
        if primary_key.len() != foreign_key.columns.len() {
            return Err(QueryError::KeyMismatch {
                name: name.to_owned(),
                target: target.name.to_string(),
                columns: foreign_key.columns.len(),
                keys: primary_key.len(),
            }
            .into());
        }
        return Ok(Navigation {
            target,
            single: true,
            keys: primary_key
                .iter()
                .zip(foreign_key.columns)
                .map(|(pk, column)| (pk.property.to_string(), column.to_string()))
                .collect(),
        });
    }
    if let Some(reverse) = table.foreign_key_target(name) {
        let source = (reverse.source)();
        let foreign_key =
            source
                .foreign_key(reverse.foreign_key)
                .ok_or_else(|| QueryError::UnknownNavigation {
                    table: source.name.to_string(),
                    name: reverse.foreign_key.to_owned(),
                })?;
        let primary_key = table.primary_key();
        if primary_key.len() != foreign_key.columns.len() {
            return Err(QueryError::KeyMismatch {
                name: name.to_owned(),
                target: table.name.to_string(),
                columns: foreign_key.columns.len(),
                keys: primary_key.len(),
            }
            .into());
        }
        return Ok(Navigation {
            target: source,
            single: false,
            keys: foreign_key
                .columns
                .iter()
                .zip(primary_key)
                .map(|(column, pk)| (column.to_string(), pk.property.to_string()))
                .collect(),
        });
    }
    Err(QueryError::UnknownNavigation {
        table: table.name.to_string(),
        name: name.to_owned(),
    }
    .into())
}

impl<T> Queryable<T> {
    /// Join the table of `J` under `alias`.
    ///
    /// `configure` receives the target queryable and the current record, it returns the target
    /// with the join predicates (and anything else) applied. A target left as a plain filtered
    /// table becomes a `LEFT OUTER JOIN`, a shaped one an `OUTER APPLY`.
    pub fn join<J: Entity>(
        &self,
        alias: &str,
        configure: impl FnOnce(Queryable<J>, &Record) -> Result<Queryable<J>>,
        single: bool,
    ) -> Result<Self> {
        self.join_table(alias, J::table_def(), configure, single)
    }

    fn join_table<J>(
        &self,
        alias: &str,
        table: &'static TableDef,
        configure: impl FnOnce(Queryable<J>, &Record) -> Result<Queryable<J>>,
        single: bool,
    ) -> Result<Self> {
        let target = Queryable::<J>::from_table_def(
            table,
            join_path(&self.alias, alias),
            self.defaults.clone(),
        );
        let target = configure(target, &self.entity())?;
        self.join_queryable(alias, &target, single)
    }

    /// Join an already built queryable, its alias must be `<this alias>.<alias>`.
    pub fn join_queryable<J>(
        &self,
        alias: &str,
        target: &Queryable<J>,
        single: bool,
    ) -> Result<Self> {
        if (!single || target.fans_out()) && self.builder.def().limit.is_some() {
            return Err(QueryError::FanoutLimit.into());
        }
        // An applied target is a subquery, the outer statement reads its columns by key
        let applied = target.custom_select || target.builder.def().is_shaped_select();
        let target_builder = if applied {
            target.builder.select(&target.select)
        } else {
            target.builder.clone()
        };
        let clause = target_builder.join_clause()?;
        let existing = self
            .all_join_defs()
            .into_iter()
            .find(|j| j.alias == alias)
            .map(|j| j.single);
        if self.builder.def().join.iter().flatten().any(|v| *v == clause)
            && existing.is_none_or(|v| v == single)
        {
            return Ok(self.clone());
        }
        if existing.is_some() {
            return Err(QueryError::StatementShape {
                kind: QueryKind::Select,
                problem: ShapeProblem::AliasConflict(alias.to_owned()),
            }
            .into());
        }
        let mut result = self.clone();
        result.builder = self.builder.join(&target_builder)?;
        for (key, unit) in target.select.iter() {
            let unit = if applied {
                ExpressionUnit::from_column(&target.alias, key, unit.value_type)
            } else {
                unit.clone()
            };
            insert_grouped(&mut result.select, join_path(alias, key), unit);
        }
        result
            .single_paths
            .extend(target.single_paths.iter().map(|p| join_path(alias, p)));
        result
            .multi_paths
            .extend(target.multi_paths.iter().map(|p| join_path(alias, p)));
        JoinDef::insert_nested(
            &mut result.joins,
            JoinDef {
                alias: alias.to_owned(),
                single,
                joins: target.joins.iter().map(|j| j.prefixed(alias)).collect(),
            },
        );
        Ok(result)
    }

    /// Join along declared foreign keys, `parent.parent` walks two of them.
    ///
    /// A foreign key joins the single referenced row, a reverse foreign key the rows pointing
    /// back. Segments already joined are reused.
    pub fn include(&self, navigation: &str) -> Result<Self> {
        Ok(self.walk(navigation)?.0)
    }

    /// Like [`Queryable::include`] but the last segment is joined under `alias` and `refine`
    /// further configures it once the key predicates are applied.
    ///
    /// Ordering or limiting the target inside `refine` turns the join into an `OUTER APPLY`.
    pub fn include_as(
        &self,
        navigation: &str,
        alias: &str,
        refine: impl FnOnce(Queryable<()>, &Record) -> Result<Queryable<()>>,
    ) -> Result<Self> {
        let (result, table, owner, name) = match navigation.rsplit_once('.') {
            Some((parent, name)) => {
                let (result, table, owner) = self.walk(parent)?;
                (result, table, owner, name)
            }
            None => (self.clone(), self.root_table(navigation)?, String::new(), navigation),
        };
        let path = join_path(&owner, alias);
        result.join_navigation(&path, &owner, navigate(table, name)?, refine)
    }

    fn root_table(&self, navigation: &str) -> Result<&'static TableDef> {
        self.table.ok_or_else(|| {
            QueryError::UnknownNavigation {
                table: self.alias.clone(),
                name: navigation.to_owned(),
            }
            .into()
        })
    }

    /// Include every segment of `navigation`, returning the table and path reached.
    fn walk(&self, navigation: &str) -> Result<(Self, &'static TableDef, String)> {
        let mut table = self.root_table(navigation)?;
        let mut result = self.clone();
        let mut prefix = String::new();
        for name in navigation.split('.') {
            let path = join_path(&prefix, name);
            let navigation = navigate(table, name)?;
            let target = navigation.target;
            if !result.all_join_defs().iter().any(|j| j.alias == path) {
                result =
                    result.join_navigation(&path, &prefix, navigation, |joined, _| Ok(joined))?;
            }
            table = target;
            prefix = path;
        }
        Ok((result, table, prefix))
    }

    /// Join `navigation` under `path`, equating its keys with the ones of `owner`.
    fn join_navigation(
        &self,
        path: &str,
        owner: &str,
        navigation: Navigation,
        refine: impl FnOnce(Queryable<()>, &Record) -> Result<Queryable<()>>,
    ) -> Result<Self> {
        let Navigation {
            target,
            single,
            keys,
        } = navigation;
        self.join_table::<()>(
            path,
            target,
            |joined, outer| {
                let inner = joined.entity();
                let predicates = keys
                    .iter()
                    .map(|(target_key, owner_key)| {
                        Ok(inner
                            .col(target_key)?
                            .equal(outer.col(&join_path(owner, owner_key))?))
                    })
                    .collect::<Result<Vec<_>>>()?;
                refine(joined.filter(|_| Ok(predicates))?, outer)
            },
            single,
        )
    }
}
