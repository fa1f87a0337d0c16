mod as_value;
mod builder;
mod cache;
mod context;
mod entity;
mod error;
mod executor;
mod expression;
mod join;
mod select_map;
mod query;
mod query_def;
mod queryable;
mod record;
pub mod result_parser;
mod table;
mod util;
mod value;
mod writer;

pub use ::anyhow::Context;
pub use as_value::*;
pub use builder::*;
pub use cache::*;
pub use context::*;
pub use entity::*;
pub use error::*;
pub use executor::*;
pub use expression::*;
pub use join::*;
pub use select_map::*;
pub use query::*;
pub use query_def::*;
pub use queryable::*;
pub use record::*;
pub use table::*;
pub use util::*;
pub use value::*;
pub use writer::*;

pub type Result<T> = anyhow::Result<T>;
pub type Error = anyhow::Error;
