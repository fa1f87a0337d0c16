use crate::{ExpressionUnit, IntoOperand, Operand, ValueType};

fn boolean(text: String) -> ExpressionUnit {
    ExpressionUnit::raw(text, ValueType::Boolean)
}

fn binary(lhs: &ExpressionUnit, op: &str, rhs: impl IntoOperand) -> ExpressionUnit {
    let rhs: ExpressionUnit = rhs.into_operand().into();
    boolean(format!("{lhs} {op} {rhs}"))
}

/// Predicate builders. Every method returns a [`ValueType::Boolean`] unit.
impl ExpressionUnit {
    /// Null aware equality.
    ///
    /// A NULL literal renders `IS NULL`, comparing two expressions also matches when both are NULL.
    pub fn equal(&self, rhs: impl IntoOperand) -> ExpressionUnit {
        match rhs.into_operand() {
            v if v.is_null() => self.is_null(),
            Operand::Literal(v) => binary(self, "=", v),
            Operand::Unit(rhs) => boolean(format!(
                "({self} IS NULL AND {rhs} IS NULL) OR {self} = {rhs}"
            )),
        }
    }

    /// Null aware inequality, the dual of [`ExpressionUnit::equal`].
    pub fn not_equal(&self, rhs: impl IntoOperand) -> ExpressionUnit {
        match rhs.into_operand() {
            v if v.is_null() => self.is_not_null(),
            Operand::Literal(v) => {
                let rhs = ExpressionUnit::from_literal(v);
                boolean(format!("{self} IS NULL OR {self} != {rhs}"))
            }
            Operand::Unit(rhs) => boolean(format!(
                "({self} IS NULL AND {rhs} IS NOT NULL) OR ({self} IS NOT NULL AND {rhs} IS NULL) OR {self} != {rhs}"
            )),
        }
    }

    pub fn less_than(&self, rhs: impl IntoOperand) -> ExpressionUnit {
        binary(self, "<", rhs)
    }

    pub fn less_or_equal(&self, rhs: impl IntoOperand) -> ExpressionUnit {
        binary(self, "<=", rhs)
    }

    pub fn greater_than(&self, rhs: impl IntoOperand) -> ExpressionUnit {
        binary(self, ">", rhs)
    }

    pub fn greater_or_equal(&self, rhs: impl IntoOperand) -> ExpressionUnit {
        binary(self, ">=", rhs)
    }

    pub fn between(&self, from: impl IntoOperand, to: impl IntoOperand) -> ExpressionUnit {
        let from: ExpressionUnit = from.into_operand().into();
        let to: ExpressionUnit = to.into_operand().into();
        boolean(format!("{self} BETWEEN {from} AND {to}"))
    }

    pub fn is_null(&self) -> ExpressionUnit {
        boolean(format!("{self} IS NULL"))
    }

    pub fn is_not_null(&self) -> ExpressionUnit {
        boolean(format!("{self} IS NOT NULL"))
    }

    pub fn like(&self, pattern: impl IntoOperand) -> ExpressionUnit {
        binary(self, "LIKE", pattern)
    }

    /// Substring match, `LIKE N'%' + x + N'%'`.
    pub fn includes(&self, value: impl IntoOperand) -> ExpressionUnit {
        let value: ExpressionUnit = value.into_operand().into();
        boolean(format!("{self} LIKE N'%' + {value} + N'%'"))
    }

    pub fn starts_with(&self, value: impl IntoOperand) -> ExpressionUnit {
        let value: ExpressionUnit = value.into_operand().into();
        boolean(format!("{self} LIKE {value} + N'%'"))
    }

    pub fn ends_with(&self, value: impl IntoOperand) -> ExpressionUnit {
        let value: ExpressionUnit = value.into_operand().into();
        boolean(format!("{self} LIKE N'%' + {value}"))
    }

    /// `IN (...)`, an empty list matches nothing.
    pub fn in_list<I>(&self, values: I) -> ExpressionUnit
    where
        I: IntoIterator,
        I::Item: IntoOperand,
    {
        self.membership("IN", "1 = 0", values)
    }

    /// `NOT IN (...)`, an empty list matches everything.
    pub fn not_in_list<I>(&self, values: I) -> ExpressionUnit
    where
        I: IntoIterator,
        I::Item: IntoOperand,
    {
        self.membership("NOT IN", "1 = 1", values)
    }

    fn membership<I>(&self, op: &str, empty: &str, values: I) -> ExpressionUnit
    where
        I: IntoIterator,
        I::Item: IntoOperand,
    {
        let values = values
            .into_iter()
            .map(|v| ExpressionUnit::from(v.into_operand()).text)
            .collect::<Vec<_>>();
        if values.is_empty() {
            return boolean(empty.to_owned());
        }
        boolean(format!("{self} {op} ({})", values.join(", ")))
    }
}
