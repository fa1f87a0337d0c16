mod compare;
mod operand;
mod ordered;
pub mod sql;
mod unit;

pub use operand::*;
pub use ordered::*;
pub use unit::*;
