use crate::{AsValue, ExpressionUnit, Value};

/// Right hand side of a comparison: either an expression or a literal still holding its value,
/// so that a NULL literal can turn `=` into `IS NULL`.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Unit(ExpressionUnit),
    Literal(Value),
}

pub trait IntoOperand {
    fn into_operand(self) -> Operand;
}

impl IntoOperand for Operand {
    fn into_operand(self) -> Operand {
        self
    }
}

impl IntoOperand for ExpressionUnit {
    fn into_operand(self) -> Operand {
        Operand::Unit(self)
    }
}

impl IntoOperand for &ExpressionUnit {
    fn into_operand(self) -> Operand {
        Operand::Unit(self.clone())
    }
}

impl<T: AsValue> IntoOperand for T {
    fn into_operand(self) -> Operand {
        Operand::Literal(self.as_value())
    }
}

impl Operand {
    pub fn is_null(&self) -> bool {
        matches!(self, Operand::Literal(v) if v.is_null())
    }
}

impl From<Operand> for ExpressionUnit {
    fn from(value: Operand) -> Self {
        match value {
            Operand::Unit(unit) => unit,
            Operand::Literal(value) => ExpressionUnit::from_literal(value),
        }
    }
}
