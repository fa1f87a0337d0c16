#[cfg(test)]
mod tests {
    use strata_core::{ExpressionUnit, QueryError, Record, ValueType};

    fn column(alias: &str, name: &str) -> ExpressionUnit {
        ExpressionUnit::from_column(alias, name, ValueType::Number)
    }

    fn nested() -> Record {
        Record::object()
            .with("id", column("TBL", "id"))
            .with(
                "parent",
                Record::object().with("name", column("TBL.parent", "name")),
            )
            .with(
                "tags",
                Record::array(
                    Record::object()
                        .with("label", column("TBL.tags", "label"))
                        .with(
                            "owner",
                            Record::object().with("id", column("TBL.tags.owner", "id")),
                        ),
                ),
            )
    }

    #[test]
    fn flatten() {
        let flattened = nested().flatten();
        assert_eq!(
            flattened.select.keys().collect::<Vec<_>>(),
            ["id", "parent.name", "tags.label", "tags.owner.id"]
        );
        assert_eq!(
            flattened.select.get("tags.owner.id"),
            Some(&column("TBL.tags.owner", "id"))
        );
        assert_eq!(flattened.single_paths, ["parent", "tags.owner"]);
        assert_eq!(flattened.multi_paths, ["tags"]);
    }

    #[test]
    fn unflatten_restores_the_record() {
        let flattened = nested().flatten();
        let restored = Record::unflatten(&flattened.select, |path| {
            flattened.single_paths.iter().any(|p| p == path)
        });
        assert_eq!(restored, nested());
    }

    #[test]
    fn lookups_go_through_arrays() {
        let record = nested();
        assert_eq!(record.col("id").unwrap(), column("TBL", "id"));
        assert_eq!(
            record.col("tags.label").unwrap(),
            column("TBL.tags", "label")
        );
        assert_eq!(
            record.col("tags.owner.id").unwrap(),
            column("TBL.tags.owner", "id")
        );
        assert!(matches!(record.path("tags").unwrap(), Record::Array(..)));
        assert!(matches!(
            record.path("tags").unwrap().first(),
            Record::Object(..)
        ));
    }

    #[test]
    fn unknown_paths() {
        let record = nested();
        let error = record.col("nope").unwrap_err();
        assert_eq!(
            error.downcast_ref::<QueryError>(),
            Some(&QueryError::UnknownPath("nope".into()))
        );
        let error = record.col("parent").unwrap_err();
        assert_eq!(
            error.downcast_ref::<QueryError>(),
            Some(&QueryError::UnknownPath("parent".into()))
        );
        let error = record.path("id.deeper").unwrap_err();
        assert_eq!(
            error.downcast_ref::<QueryError>(),
            Some(&QueryError::UnknownPath("id.deeper".into()))
        );
    }

    #[test]
    fn literals_become_units() {
        let record = Record::object().with("one", 1).with("name", "x");
        assert_eq!(record.col("one").unwrap().text, "1");
        assert_eq!(record.col("name").unwrap().value_type, ValueType::String);
    }

    #[test]
    fn with_replaces_existing_keys() {
        let record = Record::object().with("a", 1).with("b", 2).with("a", 3);
        let flattened = record.flatten();
        assert_eq!(flattened.select.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(record.col("a").unwrap().text, "3");
    }

    #[test]
    fn nested_arrays() {
        let record = Record::object().with(
            "children",
            Record::array(Record::object().with(
                "toys",
                Record::array(Record::object().with("name", column("TBL.children.toys", "name"))),
            )),
        );
        let flattened = record.flatten();
        assert_eq!(flattened.multi_paths, ["children", "children.toys"]);
        assert!(flattened.single_paths.is_empty());
        assert_eq!(
            flattened.select.keys().collect::<Vec<_>>(),
            ["children.toys.name"]
        );
        assert_eq!(Record::unflatten(&flattened.select, |_| false), record);
    }
}
