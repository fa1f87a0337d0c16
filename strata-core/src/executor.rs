use crate::{CompiledQuery, Result, ResultShape, RowLabeled};
use std::future::Future;

/// Runs compiled statements against a live database.
///
/// Implemented by drivers, consumed by [`crate::DbContext`].
pub trait Executor: Send + Sized {
    fn connect(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn begin_transaction(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn commit(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn rollback(&mut self) -> impl Future<Output = Result<()>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Execute a batch, returning one row list per query.
    ///
    /// `shapes`, when present, is aligned with `queries` and describes the columns each of them
    /// returns so that values can be decoded into the right type.
    fn execute_defs(
        &mut self,
        queries: &[CompiledQuery],
        shapes: Option<&[ResultShape]>,
    ) -> impl Future<Output = Result<Vec<Vec<RowLabeled>>>> + Send;

    /// Execute a single query.
    fn execute(
        &mut self,
        query: &CompiledQuery,
        shape: Option<&ResultShape>,
    ) -> impl Future<Output = Result<Vec<RowLabeled>>> + Send {
        let queries = std::slice::from_ref(query);
        let shapes = shape.map(std::slice::from_ref);
        async move {
            let mut result = self.execute_defs(queries, shapes).await?;
            Ok(result.pop().unwrap_or_default())
        }
    }
}
