mod common;

#[cfg(test)]
mod tests {
    use crate::common::{Author, Book, init_logs};
    use indoc::indoc;
    use strata::{
        ExpressionUnit, Order, QueryError, QueryKind, Queryable, Record, SchemaDefaults,
        ShapeProblem, SubqueryConstraint, sql,
    };

    fn books() -> Queryable<Book> {
        Queryable::new(&SchemaDefaults::default())
    }

    fn query_error(error: strata::Error) -> QueryError {
        error.downcast::<QueryError>().expect("a query error")
    }

    #[test]
    fn every_column() {
        init_logs();
        assert_eq!(
            books().query().unwrap(),
            indoc! {"
                SELECT
                  [TBL].[id] AS [id],
                  [TBL].[title] AS [title],
                  [TBL].[authorId] AS [author_id],
                  [TBL].[published] AS [published]
                FROM [Book] AS [TBL]"}
        );
        let authors = Queryable::<Author>::new(&SchemaDefaults {
            database: Some("library".into()),
            schema: None,
        });
        assert_eq!(
            authors.query().unwrap(),
            indoc! {"
                SELECT
                  [TBL].[id] AS [id],
                  [TBL].[fullName] AS [name]
                FROM [library].[dbo].[Author] AS [TBL]"}
        );
    }

    #[test]
    fn filter_order_limit() {
        let query = books()
            .filter(|b| {
                Ok(vec![
                    b.col("title")?.starts_with("The"),
                    b.col("published")?.is_not_null(),
                ])
            })
            .unwrap()
            .order_by(|b| b.col("published"), Order::DESC)
            .unwrap()
            .limit(0, 10)
            .unwrap();
        assert_eq!(
            query.query().unwrap(),
            indoc! {"
                SELECT
                  [TBL].[id] AS [id],
                  [TBL].[title] AS [title],
                  [TBL].[authorId] AS [author_id],
                  [TBL].[published] AS [published]
                FROM [Book] AS [TBL]
                WHERE ([TBL].[title] LIKE N'The' + N'%')
                AND   ([TBL].[published] IS NOT NULL)
                ORDER BY [TBL].[published] DESC
                OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"}
        );
    }

    #[test]
    fn operations_do_not_mutate() {
        let base = books();
        let filtered = base.filter(|b| Ok(vec![b.col("id")?.equal(1)])).unwrap();
        assert!(base.builder().def().filter.is_none());
        assert!(filtered.builder().def().filter.is_some());
        assert_eq!(base.query().unwrap(), books().query().unwrap());
    }

    #[test]
    fn unknown_column() {
        let error = books()
            .filter(|b| Ok(vec![b.col("nope")?.equal(1)]))
            .unwrap_err();
        assert_eq!(query_error(error), QueryError::UnknownPath("nope".into()));
    }

    #[test]
    fn distinct_top() {
        let query = books()
            .select::<()>(|b| Ok(Record::object().with("title", b.col("title")?)))
            .unwrap()
            .distinct()
            .top(3);
        assert_eq!(
            query.query().unwrap(),
            indoc! {"
                SELECT DISTINCT TOP 3
                  [TBL].[title] AS [title]
                FROM [Book] AS [TBL]"}
        );
    }

    #[test]
    fn projection() {
        let query = books()
            .select::<()>(|b| {
                Ok(Record::object()
                    .with("name", b.col("title")?)
                    .with("released", sql::is(&b.col("published")?.is_not_null()))
                    .with("meta", Record::object().with("id", b.col("id")?)))
            })
            .unwrap();
        assert_eq!(
            query.query().unwrap(),
            indoc! {"
                SELECT
                  [TBL].[title] AS [name],
                  CASE WHEN [TBL].[published] IS NOT NULL THEN 1 ELSE 0 END AS [released],
                  [TBL].[id] AS [meta.id]
                FROM [Book] AS [TBL]"}
        );
        let shape = query.result_shape();
        assert_eq!(shape.path("meta").map(|p| p.single), Some(true));
        assert_eq!(
            shape.columns.iter().map(|c| c.key.as_str()).collect::<Vec<_>>(),
            ["name", "released", "meta.id"]
        );
        assert!(query.has_custom_select());
    }

    #[test]
    fn projection_must_be_an_object() {
        let error = books()
            .select::<()>(|b| Ok(Record::from(b.col("id")?)))
            .unwrap_err();
        assert_eq!(
            query_error(error),
            QueryError::StatementShape {
                kind: QueryKind::Select,
                problem: ShapeProblem::ProjectionNotObject,
            }
        );
    }

    #[test]
    fn grouped() {
        let query = books()
            .select::<()>(|b| {
                Ok(Record::object()
                    .with("author_id", b.col("author_id")?)
                    .with("n", sql::count()))
            })
            .unwrap()
            .group_by(|b| Ok(vec![b.col("author_id")?]))
            .unwrap()
            .having(|_| Ok(vec![sql::count().greater_than(1)]))
            .unwrap();
        assert_eq!(
            query.query().unwrap(),
            indoc! {"
                SELECT
                  [TBL].[authorId] AS [author_id],
                  COUNT(*) AS [n]
                FROM [Book] AS [TBL]
                GROUP BY [TBL].[authorId]
                HAVING (COUNT(*) > 1)"}
        );
    }

    #[test]
    fn limit_without_order() {
        let error = books().limit(0, 5).unwrap().query().unwrap_err();
        assert_eq!(query_error(error), QueryError::PaginationOrder);
    }

    #[test]
    fn wrap() {
        let query = books().top(5).wrap().unwrap();
        assert_eq!(
            query.query().unwrap(),
            indoc! {"
                SELECT
                  [TBL].[id] AS [id],
                  [TBL].[title] AS [title],
                  [TBL].[author_id] AS [author_id],
                  [TBL].[published] AS [published]
                FROM (
                  SELECT TOP 5
                    [TBL].[id] AS [id],
                    [TBL].[title] AS [title],
                    [TBL].[authorId] AS [author_id],
                    [TBL].[published] AS [published]
                  FROM [Book] AS [TBL]
                ) AS [TBL]"}
        );
        let filtered = query
            .filter(|b| Ok(vec![b.col("author_id")?.equal(2)]))
            .unwrap();
        assert!(
            filtered
                .query()
                .unwrap()
                .ends_with(") AS [TBL]\nWHERE ([TBL].[author_id] = 2)")
        );
    }

    #[test]
    fn union() {
        let first = books().filter(|b| Ok(vec![b.col("id")?.equal(1)])).unwrap();
        let second = books().filter(|b| Ok(vec![b.col("id")?.equal(2)])).unwrap();
        let query = Queryable::union(&[first, second]).unwrap();
        assert_eq!(
            query.query().unwrap(),
            indoc! {"
                SELECT
                  [TBL].[id] AS [id],
                  [TBL].[title] AS [title],
                  [TBL].[author_id] AS [author_id],
                  [TBL].[published] AS [published]
                FROM (

                  SELECT
                    [TBL].[id] AS [id],
                    [TBL].[title] AS [title],
                    [TBL].[authorId] AS [author_id],
                    [TBL].[published] AS [published]
                  FROM [Book] AS [TBL]
                  WHERE ([TBL].[id] = 1)

                  UNION ALL

                  SELECT
                    [TBL].[id] AS [id],
                    [TBL].[title] AS [title],
                    [TBL].[authorId] AS [author_id],
                    [TBL].[published] AS [published]
                  FROM [Book] AS [TBL]
                  WHERE ([TBL].[id] = 2)

                ) AS [TBL]"}
        );
        let error = Queryable::<Book>::union(&[]).unwrap_err();
        assert_eq!(
            query_error(error),
            QueryError::StatementShape {
                kind: QueryKind::Select,
                problem: ShapeProblem::EmptyUnion,
            }
        );
    }

    #[test]
    fn scalar_subquery() {
        let latest = books()
            .select::<()>(|b| Ok(Record::object().with("title", b.col("title")?)))
            .unwrap()
            .order_by(|b| b.col("title"), Order::ASC)
            .unwrap()
            .top(1);
        let unit = ExpressionUnit::from_subquery(&latest).unwrap();
        assert_eq!(
            unit.text,
            indoc! {"
                (
                  SELECT TOP 1
                    [TBL].[title] AS [title]
                  FROM [Book] AS [TBL]
                  ORDER BY [TBL].[title] ASC
                )"}
        );
        assert_eq!(unit.value_type, strata::ValueType::String);

        let error = ExpressionUnit::from_subquery(&books()).unwrap_err();
        assert_eq!(
            query_error(error),
            QueryError::SubqueryShape(SubqueryConstraint::TopOne)
        );
        let error = ExpressionUnit::from_subquery(&books().top(1)).unwrap_err();
        assert_eq!(
            query_error(error),
            QueryError::SubqueryShape(SubqueryConstraint::SingleColumn { found: 4 })
        );
    }

    #[test]
    fn exists() {
        let any = books().filter(|b| Ok(vec![b.col("id")?.equal(1)])).unwrap();
        let unit = sql::exists(&any).unwrap();
        assert!(unit.text.starts_with("EXISTS (\n  SELECT\n    [TBL].[id] AS [id],"));
        assert!(unit.text.ends_with("  WHERE ([TBL].[id] = 1)\n)"));
    }

    #[test]
    fn debug_output() {
        let query = books()
            .include("author")
            .unwrap()
            .filter(|b| Ok(vec![b.col("id")?.equal(1)]))
            .unwrap();
        let text = format!("{query:?}");
        assert!(text.starts_with("Queryable { table: Some(\"Book\"), alias: \"TBL\""));
        assert!(text.contains("\"author.name\""));
        assert!(text.contains("alias: \"author\", single: true"));
        let error = books()
            .order_by(|b| b.col("id"), Order::ASC)
            .unwrap()
            .limit(0, 1)
            .unwrap()
            .include("reviews")
            .unwrap_err();
        assert_eq!(query_error(error), QueryError::FanoutLimit);
    }
}
