use crate::{TableDef, Value};

/// A type backed by a table. Usually generated by `#[derive(Entity)]`, it can also be written
/// by hand over a `static` [`TableDef`].
pub trait Entity {
    fn table_def() -> &'static TableDef;

    /// Values to insert keyed by property. Auto increment keys left unset are skipped.
    fn row(&self) -> Vec<(&'static str, Value)>;
}
