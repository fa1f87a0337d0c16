//! Typed query compiler: entities described by `#[derive(Entity)]` become fluent [`Queryable`]s
//! that render T-SQL and rebuild nested results from the flat rows an [`Executor`] returns.
pub use strata_core::*;
pub use strata_macros::*;
