mod common;

#[cfg(test)]
mod tests {
    use crate::common::{
        Author, BOOK_LABELS, Book, MockExecutor, Review, book_row, init_logs, rows,
    };
    use indoc::indoc;
    use std::time::Duration;
    use strata::{Assignments, AssignmentsExt, DbConfig, DbContext, Error, QueryError, Value};
    use time::macros::date;

    fn config() -> DbConfig {
        DbConfig {
            database: Some("library".into()),
            ..Default::default()
        }
    }

    fn context(executor: MockExecutor) -> DbContext<MockExecutor> {
        init_logs();
        DbContext::new(executor, config())
    }

    #[test]
    fn config_defaults() {
        let config = DbConfig::default();
        assert_eq!(config.database, None);
        assert_eq!(config.cache_wait, Duration::from_secs(30));
        assert_eq!(config.cache_hold, Duration::from_millis(500));
        let parsed: DbConfig = serde_json::from_value(serde_json::json!({
            "database": "library",
            "schema": "app",
            "cache_wait": {"secs": 5, "nanos": 0},
            "cache_hold": {"secs": 0, "nanos": 0},
        }))
        .unwrap();
        assert_eq!(parsed.schema.as_deref(), Some("app"));
        assert_eq!(parsed.cache_hold, Duration::ZERO);
    }

    #[tokio::test]
    async fn result() {
        let ctx = context(MockExecutor::default().respond(Ok(vec![rows(
            &BOOK_LABELS,
            vec![book_row(1, "Dune", Some(1)), book_row(2, "Emma", None)],
        )])));
        let books = ctx.queryable::<Book>();
        let found = ctx.result(&books).await.unwrap();
        assert_eq!(
            found,
            [
                Book {
                    id: Some(1),
                    title: "Dune".into(),
                    author_id: Some(1),
                    ..Default::default()
                },
                Book {
                    id: Some(2),
                    title: "Emma".into(),
                    ..Default::default()
                },
            ]
        );
        let executor = ctx.executor().lock().await;
        assert_eq!(
            executor.statements(),
            [indoc! {"
                SELECT
                  [TBL].[id] AS [id],
                  [TBL].[title] AS [title],
                  [TBL].[authorId] AS [author_id],
                  [TBL].[published] AS [published]
                FROM [library].[dbo].[Book] AS [TBL]"}]
        );
        assert_eq!(executor.shapes, [books.result_shape()]);
    }

    #[tokio::test]
    async fn nested_result() {
        let labels = [
            "id",
            "title",
            "author_id",
            "published",
            "author.id",
            "author.name",
            "reviews.book_id",
            "reviews.reviewer",
            "reviews.stars",
        ];
        let row = |reviewer: Option<&str>, stars: Option<i64>| {
            let mut row = book_row(1, "Dune", Some(7));
            row.extend([
                Value::Int64(Some(7)),
                Value::Varchar(Some("Frank Herbert".into())),
                Value::Int64(reviewer.map(|_| 1)),
                Value::Varchar(reviewer.map(Into::into)),
                Value::Int64(stars),
            ]);
            row
        };
        let ctx = context(MockExecutor::default().respond(Ok(vec![rows(
            &labels,
            vec![row(Some("ann"), Some(5)), row(Some("bob"), Some(3))],
        )])));
        let query = ctx
            .queryable::<Book>()
            .include("author")
            .unwrap()
            .include("reviews")
            .unwrap();
        let found = ctx.single(&query).await.unwrap().unwrap();
        assert_eq!(
            found.author.as_deref(),
            Some(&Author {
                id: Some(7),
                name: "Frank Herbert".into(),
                books: vec![],
            })
        );
        assert_eq!(
            found.reviews,
            [
                Review {
                    book_id: 1,
                    reviewer: "ann".into(),
                    stars: 5,
                    book: None,
                },
                Review {
                    book_id: 1,
                    reviewer: "bob".into(),
                    stars: 3,
                    book: None,
                },
            ]
        );
    }

    #[tokio::test]
    async fn identical_reads_are_shared() {
        let ctx = context(MockExecutor::default());
        let books = ctx.queryable::<Book>();
        let other = books.filter(|b| Ok(vec![b.col("id")?.equal(1)])).unwrap();
        let (a, b) = tokio::join!(ctx.result(&books), ctx.result(&books));
        a.unwrap();
        b.unwrap();
        ctx.result(&books).await.unwrap();
        ctx.result(&other).await.unwrap();
        assert_eq!(ctx.executor().lock().await.executed.len(), 2);
    }

    #[tokio::test]
    async fn writes_invalidate_reads() {
        let ctx = context(MockExecutor::default());
        let books = ctx.queryable::<Book>();
        ctx.result(&books).await.unwrap();
        let _ = ctx.delete(&books.filter(|b| Ok(vec![b.col("id")?.equal(1)])).unwrap()).await;
        ctx.result(&books).await.unwrap();
        ctx.rollback().await.unwrap();
        ctx.result(&books).await.unwrap();
        let executor = ctx.executor().lock().await;
        assert_eq!(executor.executed.len(), 4);
        assert!(executor.statements()[1].starts_with("DELETE FROM [TBL]"));
        assert_eq!(executor.events, ["rollback"]);
    }

    #[tokio::test]
    async fn single() {
        let ctx = context(
            MockExecutor::default()
                .respond(Ok(vec![rows(&BOOK_LABELS, vec![])]))
                .respond(Ok(vec![rows(
                    &BOOK_LABELS,
                    vec![book_row(1, "Dune", None), book_row(2, "Emma", None)],
                )])),
        );
        let books = ctx.queryable::<Book>();
        assert_eq!(ctx.single(&books).await.unwrap(), None);
        ctx.cache().invalidate().await;
        let error = ctx.single(&books).await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "The query returned 2 rows instead of at most 1"
        );
    }

    #[tokio::test]
    async fn count() {
        let ctx = context(MockExecutor::default().respond(Ok(vec![rows(
            &["cnt"],
            vec![vec![Value::Int64(Some(3))]],
        )])));
        let books = ctx
            .queryable::<Book>()
            .filter(|b| Ok(vec![b.col("author_id")?.equal(7)]))
            .unwrap();
        assert_eq!(ctx.count(&books).await.unwrap(), 3);
        assert_eq!(
            ctx.executor().lock().await.statements(),
            [indoc! {"
                SELECT
                  COUNT(*) AS [cnt]
                FROM (
                  SELECT
                    [TBL].[id] AS [id],
                    [TBL].[title] AS [title],
                    [TBL].[authorId] AS [author_id],
                    [TBL].[published] AS [published]
                  FROM [library].[dbo].[Book] AS [TBL]
                  WHERE ([TBL].[authorId] = 7)
                ) AS [TBL]"}]
        );
    }

    #[tokio::test]
    async fn insert() {
        let ctx = context(MockExecutor::default().respond(Ok(vec![rows(
            &BOOK_LABELS,
            vec![vec![
                Value::Int64(Some(42)),
                Value::Varchar(Some("Dune".into())),
                Value::Int64(None),
                Value::Date(Some(date!(1965-08-01))),
            ]],
        )])));
        let stored = ctx
            .insert(&Book {
                title: "Dune".into(),
                published: Some(date!(1965-08-01)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(stored.id, Some(42));
        assert_eq!(stored.published, Some(date!(1965-08-01)));
        assert_eq!(
            ctx.executor().lock().await.statements(),
            [indoc! {"
                INSERT INTO [library].[dbo].[Book] ([title], [authorId], [published])
                OUTPUT INSERTED.[id] AS [id], INSERTED.[title] AS [title], INSERTED.[authorId] AS [author_id], INSERTED.[published] AS [published]
                VALUES (N'Dune', NULL, '1965-08-01')"}]
        );
    }

    #[tokio::test]
    async fn insert_many_is_one_batch() {
        let ctx = context(MockExecutor::default().respond(Ok(vec![
            rows(&BOOK_LABELS, vec![book_row(1, "Dune", None)]),
            rows(&BOOK_LABELS, vec![book_row(2, "Emma", None)]),
        ])));
        let books = [
            Book {
                title: "Dune".into(),
                ..Default::default()
            },
            Book {
                title: "Emma".into(),
                ..Default::default()
            },
        ];
        let stored = ctx.insert_many(&books).await.unwrap();
        assert_eq!(
            stored.iter().map(|b| b.id).collect::<Vec<_>>(),
            [Some(1), Some(2)]
        );
        assert_eq!(ctx.executor().lock().await.executed.len(), 2);
        assert!(ctx.insert_many::<Book>([]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_without_output() {
        let ctx = context(MockExecutor::default());
        let error = ctx.insert(&Book::default()).await.unwrap_err();
        assert_eq!(error.to_string(), "The insert returned no row");
    }

    #[tokio::test]
    async fn update_and_upsert() {
        let ctx = context(MockExecutor::default());
        let books = ctx
            .queryable::<Book>()
            .filter(|b| Ok(vec![b.col("id")?.equal(7)]))
            .unwrap();
        ctx.update(&books, |_| Ok(Assignments::new().set("title", "Dune Messiah")))
            .await
            .unwrap();
        ctx.upsert(
            &books,
            |_| Ok(Assignments::new().set("title", "Dune Messiah")),
            Some(&Assignments::new().set("author_id", 1)),
        )
        .await
        .unwrap();
        let executor = ctx.executor().lock().await;
        let statements = executor.statements();
        assert!(statements[0].starts_with("UPDATE [TBL] SET\n  [title] = N'Dune Messiah'\n"));
        assert!(statements[1].starts_with("MERGE [library].[dbo].[Book] AS [TBL]\n"));
        assert!(statements[1].contains("  INSERT ([title], [authorId])\n  VALUES (N'Dune Messiah', 1)"));
    }

    #[tokio::test]
    async fn construction_errors_skip_the_executor() {
        let ctx = context(MockExecutor::default());
        let error = ctx
            .upsert(
                &ctx.queryable::<Book>(),
                |_| Ok(Assignments::new().set("title", "x")),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(
            error.downcast_ref::<QueryError>(),
            Some(&QueryError::MissingUpsertPredicate)
        );
        assert!(ctx.executor().lock().await.executed.is_empty());
    }

    #[tokio::test]
    async fn executor_errors_carry_the_statement() {
        let ctx = context(MockExecutor::default().respond(Err(Error::msg("Login failed"))));
        let error = ctx.result(&ctx.queryable::<Author>()).await.unwrap_err();
        assert_eq!(error.root_cause().to_string(), "Login failed");
        assert!(format!("{:#}", error).starts_with("While executing:\nSELECT\n"));
        // Failures are not cached
        ctx.result(&ctx.queryable::<Author>()).await.unwrap();
        assert_eq!(ctx.executor().lock().await.executed.len(), 2);
    }

    #[tokio::test]
    async fn transaction_lifecycle() {
        let ctx = context(MockExecutor::default());
        ctx.connect().await.unwrap();
        ctx.begin_transaction().await.unwrap();
        ctx.commit().await.unwrap();
        ctx.close().await.unwrap();
        assert_eq!(
            ctx.executor().lock().await.events,
            ["connect", "begin", "commit", "close"]
        );
        assert_eq!(ctx.config().database.as_deref(), Some("library"));
    }
}
