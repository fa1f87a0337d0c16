use crate::{
    Assignments, CompiledQuery, Context, Entity, Error, Executor, QueryKind, Queryable, Record,
    Result, ResultCache, ResultShape, RowLabeled, SchemaDefaults, result_parser, sql,
    truncate_long,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::Duration;
use tokio::sync::Mutex;

/// Settings of a [`DbContext`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbConfig {
    /// Database of the entities that do not declare one.
    pub database: Option<String>,
    /// Schema of the entities that do not declare one.
    pub schema: Option<String>,
    /// How long a read waits for an identical one already running.
    pub cache_wait: Duration,
    /// How long completed read results are reused.
    pub cache_hold: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database: None,
            schema: None,
            cache_wait: Duration::from_secs(30),
            cache_hold: Duration::from_millis(500),
        }
    }
}

#[derive(Deserialize)]
struct CountRow {
    cnt: u64,
}

/// Entry point of an application: builds queryables and runs them on the executor.
///
/// Reads go through a [`ResultCache`] owned by the context, writes invalidate it.
pub struct DbContext<E: Executor> {
    executor: Mutex<E>,
    cache: ResultCache,
    defaults: SchemaDefaults,
    config: DbConfig,
}

impl<E: Executor> DbContext<E> {
    pub fn new(executor: E, config: DbConfig) -> Self {
        Self {
            executor: Mutex::new(executor),
            cache: ResultCache::new(config.cache_wait, config.cache_hold),
            defaults: SchemaDefaults {
                database: config.database.clone(),
                schema: config.schema.clone(),
            },
            config,
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Direct access to the executor, e.g. to inspect a test double.
    pub fn executor(&self) -> &Mutex<E> {
        &self.executor
    }

    pub fn queryable<T: Entity>(&self) -> Queryable<T> {
        Queryable::new(&self.defaults)
    }

    pub async fn connect(&self) -> Result<()> {
        self.executor.lock().await.connect().await
    }

    pub async fn begin_transaction(&self) -> Result<()> {
        self.executor.lock().await.begin_transaction().await
    }

    pub async fn commit(&self) -> Result<()> {
        self.executor.lock().await.commit().await
    }

    /// Undoes the writes of the transaction, cached reads may have seen them.
    pub async fn rollback(&self) -> Result<()> {
        let result = self.executor.lock().await.rollback().await;
        self.cache.invalidate().await;
        result
    }

    pub async fn close(&self) -> Result<()> {
        self.executor.lock().await.close().await
    }

    async fn fetch(
        &self,
        queries: &[CompiledQuery],
        shapes: &[ResultShape],
    ) -> Result<Vec<Vec<RowLabeled>>> {
        for query in queries {
            log::debug!("{}", query);
        }
        self.executor
            .lock()
            .await
            .execute_defs(queries, Some(shapes))
            .await
            .with_context(|| {
                let sql = queries.iter().map(|q| q.sql.as_str()).collect::<Vec<_>>().join(";\n");
                format!("While executing:\n{}", truncate_long!(sql))
            })
            .inspect_err(|e| log::error!("{:#}", e))
    }

    /// Run `queries` as one batch with the cache invalidated around it.
    async fn write<T: DeserializeOwned>(&self, queries: &[Queryable<T>]) -> Result<Vec<T>> {
        let compiled = queries
            .iter()
            .map(Queryable::compile)
            .collect::<Result<Vec<_>>>()?;
        let shapes = queries
            .iter()
            .map(Queryable::result_shape)
            .collect::<Vec<_>>();
        self.cache.invalidate().await;
        let result = self.fetch(&compiled, &shapes).await;
        self.cache.invalidate().await;
        let mut parsed = Vec::new();
        for (rows, shape) in result?.iter().zip(&shapes) {
            parsed.extend(result_parser::parse::<T>(rows, shape)?);
        }
        Ok(parsed)
    }

    /// Every row of `queryable`, nested according to its joins and projection.
    ///
    /// An identical read running or completed within the hold window is reused. Write
    /// statements run uncached.
    pub async fn result<R: DeserializeOwned>(&self, queryable: &Queryable<R>) -> Result<Vec<R>> {
        if queryable.builder().def().kind != QueryKind::Select {
            return self.write(std::slice::from_ref(queryable)).await;
        }
        let compiled = queryable.compile()?;
        let shape = queryable.result_shape();
        let key = serde_json::to_string(&compiled.def)?;
        let rows = self
            .cache
            .run(&key, || async {
                let mut result = self
                    .fetch(std::slice::from_ref(&compiled), std::slice::from_ref(&shape))
                    .await?;
                Ok(result.pop().unwrap_or_default())
            })
            .await?;
        result_parser::parse(&rows, &shape)
    }

    /// The only row of `queryable`, if any. More than one row is an error.
    pub async fn single<R: DeserializeOwned>(
        &self,
        queryable: &Queryable<R>,
    ) -> Result<Option<R>> {
        let mut rows = self.result(queryable).await?;
        if rows.len() > 1 {
            return Err(Error::msg(format!(
                "The query returned {} rows instead of at most 1",
                rows.len()
            )));
        }
        Ok(rows.pop())
    }

    /// Number of rows `queryable` returns, counted over the flat joined rows.
    pub async fn count<R>(&self, queryable: &Queryable<R>) -> Result<u64> {
        let counted = queryable
            .wrap()?
            .select::<CountRow>(|_| Ok(Record::object().with("cnt", sql::count())))?;
        Ok(self
            .result(&counted)
            .await?
            .first()
            .map(|v| v.cnt)
            .unwrap_or(0))
    }

    /// Insert `row`, returning it as stored (generated values included).
    pub async fn insert<T: Entity + DeserializeOwned>(&self, row: &T) -> Result<T> {
        self.insert_many([row])
            .await?
            .pop()
            .ok_or_else(|| Error::msg("The insert returned no row"))
    }

    /// Insert every row in a single batch.
    pub async fn insert_many<'a, T: Entity + DeserializeOwned + 'a>(
        &self,
        rows: impl IntoIterator<Item = &'a T>,
    ) -> Result<Vec<T>> {
        let base = self.queryable::<T>();
        let queries = rows
            .into_iter()
            .map(|row| base.insert(row))
            .collect::<Result<Vec<_>>>()?;
        if queries.is_empty() {
            return Ok(Vec::new());
        }
        self.write(&queries).await
    }

    /// Apply `values` to the rows matched by `queryable`, returning them updated.
    pub async fn update<T: DeserializeOwned>(
        &self,
        queryable: &Queryable<T>,
        values: impl FnOnce(&Record) -> Result<Assignments>,
    ) -> Result<Vec<T>> {
        self.write(&[queryable.update(values)?]).await
    }

    /// Update the rows matched by `queryable` or insert one, see [`Queryable::upsert`].
    pub async fn upsert<T: DeserializeOwned>(
        &self,
        queryable: &Queryable<T>,
        values: impl FnOnce(&Record) -> Result<Assignments>,
        additional_insert: Option<&Assignments>,
    ) -> Result<Vec<T>> {
        self.write(&[queryable.upsert(values, additional_insert)?])
            .await
    }

    /// Delete the rows matched by `queryable`, returning them.
    pub async fn delete<T: DeserializeOwned>(&self, queryable: &Queryable<T>) -> Result<Vec<T>> {
        self.write(&[queryable.delete()?]).await
    }
}
