use crate::{AsValue, ExpressionUnit, QueryError, Result, SelectMap, join_path};
use indexmap::IndexMap;

/// Nested view over a select map, handed to projections and predicates.
///
/// Leaves are expressions, single row relations are objects and multi row relations are arrays
/// holding one representative element.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Unit(ExpressionUnit),
    Object(IndexMap<String, Record>),
    Array(Box<Record>),
}

/// A record flattened back into a select map, plus the cardinality of every nested path.
#[derive(Default, Debug, Clone, PartialEq)]
pub struct Flattened {
    pub select: SelectMap,
    pub single_paths: Vec<String>,
    pub multi_paths: Vec<String>,
}

impl Record {
    pub fn object() -> Self {
        Record::Object(IndexMap::new())
    }

    pub fn array(element: impl Into<Record>) -> Self {
        Record::Array(Box::new(element.into()))
    }

    /// Add a field. Called on anything but an object it starts a new object.
    ///
    /// ```rust
    /// use strata_core::{ExpressionUnit, Record, ValueType};
    /// let id = ExpressionUnit::from_column("TBL", "id", ValueType::Number);
    /// let record = Record::object().with("id", id.clone()).with("one", 1);
    /// assert_eq!(record.col("id").unwrap(), id);
    /// assert_eq!(record.col("one").unwrap().text, "1");
    /// ```
    pub fn with(self, key: impl Into<String>, value: impl Into<Record>) -> Self {
        let mut map = match self {
            Record::Object(map) => map,
            _ => IndexMap::new(),
        };
        map.insert(key.into(), value.into());
        Record::Object(map)
    }

    /// Field `key`. Arrays are transparent: the lookup goes through their element.
    pub fn get(&self, key: &str) -> Result<&Record> {
        match self {
            Record::Object(map) => map
                .get(key)
                .ok_or_else(|| QueryError::UnknownPath(key.to_owned()).into()),
            Record::Array(element) => element.get(key),
            Record::Unit(..) => Err(QueryError::UnknownPath(key.to_owned()).into()),
        }
    }

    /// Dot separated lookup, `parent.name`.
    pub fn path(&self, path: &str) -> Result<&Record> {
        if path.is_empty() {
            return Ok(self);
        }
        let mut current = self;
        for segment in path.split('.') {
            current = current
                .get(segment)
                .map_err(|_| QueryError::UnknownPath(path.to_owned()))?;
        }
        Ok(current)
    }

    /// The expression at `path`.
    pub fn col(&self, path: &str) -> Result<ExpressionUnit> {
        match self.path(path)?.first() {
            Record::Unit(unit) => Ok(unit.clone()),
            _ => Err(QueryError::UnknownPath(path.to_owned()).into()),
        }
    }

    /// The element of an array, any other record is returned as is.
    pub fn first(&self) -> &Record {
        match self {
            Record::Array(element) => element.first(),
            _ => self,
        }
    }

    pub fn flatten(&self) -> Flattened {
        let mut result = Flattened::default();
        self.flatten_into(&mut result, "", true);
        result
    }

    fn flatten_into(&self, result: &mut Flattened, prefix: &str, in_array: bool) {
        match self {
            Record::Unit(unit) => {
                result.select.insert(prefix.to_owned(), unit.clone());
            }
            Record::Object(map) => {
                if !prefix.is_empty() && !in_array {
                    result.single_paths.push(prefix.to_owned());
                }
                for (key, value) in map.iter() {
                    value.flatten_into(result, &join_path(prefix, key), false);
                }
            }
            Record::Array(element) => {
                result.multi_paths.push(prefix.to_owned());
                element.flatten_into(result, prefix, true);
            }
        }
    }

    /// Inverse of [`Record::flatten`]: every dot descends into an object when `is_single`
    /// holds for the path so far, into the element of an array otherwise.
    pub fn unflatten(select: &SelectMap, is_single: impl Fn(&str) -> bool) -> Record {
        let mut root = Record::object();
        for (key, unit) in select.iter() {
            let mut segments = key.split('.').collect::<Vec<_>>();
            let Some(last) = segments.pop() else {
                continue;
            };
            let mut path = String::new();
            let mut cursor = root.container_mut();
            for segment in segments {
                path = join_path(&path, segment);
                let single = is_single(&path);
                cursor = cursor
                    .entry(segment.to_owned())
                    .or_insert_with(|| {
                        if single {
                            Record::object()
                        } else {
                            Record::array(Record::object())
                        }
                    })
                    .container_mut();
            }
            cursor.insert(last.to_owned(), Record::Unit(unit.clone()));
        }
        root
    }

    /// The map fields are inserted into, a leaf found on the way is replaced by an object.
    fn container_mut(&mut self) -> &mut IndexMap<String, Record> {
        match self {
            Record::Object(map) => map,
            Record::Array(element) => element.container_mut(),
            unit => {
                *unit = Record::object();
                unit.container_mut()
            }
        }
    }
}

impl From<ExpressionUnit> for Record {
    fn from(value: ExpressionUnit) -> Self {
        Record::Unit(value)
    }
}

impl From<&ExpressionUnit> for Record {
    fn from(value: &ExpressionUnit) -> Self {
        Record::Unit(value.clone())
    }
}

impl From<&Record> for Record {
    fn from(value: &Record) -> Self {
        value.clone()
    }
}

impl<T: AsValue> From<T> for Record {
    fn from(value: T) -> Self {
        Record::Unit(ExpressionUnit::from_literal(value))
    }
}
