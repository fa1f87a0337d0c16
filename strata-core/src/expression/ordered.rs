use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Order {
    #[default]
    ASC,
    DESC,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::ASC => "ASC",
            Order::DESC => "DESC",
        }
    }
}
