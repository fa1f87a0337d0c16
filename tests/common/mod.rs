#![allow(dead_code)]
use log::LevelFilter;
use serde::Deserialize;
use std::{collections::VecDeque, env, sync::Arc};
use strata::{CompiledQuery, Entity, Executor, Result, ResultShape, RowLabeled, Value};
use time::Date;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

#[derive(Entity, Deserialize, Debug, Default, Clone, PartialEq)]
#[strata(name = "Author", schema = "dbo")]
pub struct Author {
    #[strata(primary_key, auto_increment)]
    pub id: Option<i32>,
    #[strata(column = "fullName")]
    pub name: String,
    #[strata(foreign_key_target(Book, author))]
    #[serde(default)]
    pub books: Vec<Book>,
}

#[derive(Entity, Deserialize, Debug, Default, Clone, PartialEq)]
#[strata(name = "Book")]
pub struct Book {
    #[strata(primary_key, auto_increment)]
    pub id: Option<i32>,
    pub title: String,
    #[strata(column = "authorId")]
    pub author_id: Option<i32>,
    pub published: Option<Date>,
    #[strata(foreign_key(author_id))]
    #[serde(default)]
    pub author: Option<Box<Author>>,
    #[strata(foreign_key_target(Review, book))]
    #[serde(default)]
    pub reviews: Vec<Review>,
}

#[derive(Entity, Deserialize, Debug, Default, Clone, PartialEq)]
#[strata(name = "Review")]
pub struct Review {
    #[strata(primary_key = 1, column = "bookId")]
    pub book_id: i32,
    #[strata(primary_key = 2)]
    pub reviewer: String,
    pub stars: u8,
    #[strata(foreign_key(book_id))]
    #[serde(default)]
    pub book: Option<Box<Book>>,
}

/// Builds rows sharing the same labels.
pub fn rows(labels: &[&str], values: Vec<Vec<Value>>) -> Vec<RowLabeled> {
    let labels: Arc<[String]> = labels.iter().map(|v| v.to_string()).collect();
    values
        .into_iter()
        .map(|v| RowLabeled::new(labels.clone(), v.into_boxed_slice()))
        .collect()
}

pub fn book_row(id: i32, title: &str, author_id: Option<i32>) -> Vec<Value> {
    vec![
        Value::Int64(Some(id.into())),
        Value::Varchar(Some(title.into())),
        Value::Int64(author_id.map(Into::into)),
        Value::Date(None),
    ]
}

pub const BOOK_LABELS: [&str; 4] = ["id", "title", "author_id", "published"];

/// Records every statement it receives and answers with queued responses, empty results
/// once the queue runs out.
#[derive(Default)]
pub struct MockExecutor {
    pub executed: Vec<CompiledQuery>,
    pub shapes: Vec<ResultShape>,
    pub responses: VecDeque<Result<Vec<Vec<RowLabeled>>>>,
    pub events: Vec<&'static str>,
}

impl MockExecutor {
    pub fn respond(mut self, response: Result<Vec<Vec<RowLabeled>>>) -> Self {
        self.responses.push_back(response);
        self
    }

    pub fn statements(&self) -> Vec<&str> {
        self.executed.iter().map(|q| q.sql.as_str()).collect()
    }
}

impl Executor for MockExecutor {
    async fn connect(&mut self) -> Result<()> {
        self.events.push("connect");
        Ok(())
    }

    async fn begin_transaction(&mut self) -> Result<()> {
        self.events.push("begin");
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.events.push("commit");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.events.push("rollback");
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.events.push("close");
        Ok(())
    }

    async fn execute_defs(
        &mut self,
        queries: &[CompiledQuery],
        shapes: Option<&[ResultShape]>,
    ) -> Result<Vec<Vec<RowLabeled>>> {
        self.executed.extend(queries.iter().cloned());
        self.shapes.extend(shapes.into_iter().flatten().cloned());
        self.responses
            .pop_front()
            .unwrap_or_else(|| Ok(queries.iter().map(|_| Vec::new()).collect()))
    }
}
