//! Common test helpers shared across integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use databam::{Driver, Model, Query, Rows, Value};
use parking_lot::Mutex;

// Common test models used across multiple test files

#[derive(Debug, Default, Clone, PartialEq, Eq, Model)]
pub struct Person {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Default, Model)]
pub struct Tenant {
    pub id: String,
    pub creator_id: String,
    pub name: String,

    #[databam(relation)]
    pub creator: Option<Box<Person>>,

    #[databam(relation)]
    pub memberships: Vec<Membership>,
}

#[derive(Debug, Default, Model)]
#[databam(table = "memberships")]
pub struct Membership {
    pub id: String,
    pub tenant_id: String,
    pub person_id: String,
    #[databam(column = "type")]
    pub kind: String,
    pub rank: i32,

    #[databam(relation)]
    pub person: Option<Box<Person>>,
}

/// Two relations onto the same table.
#[derive(Debug, Default, Model)]
pub struct Review {
    pub id: String,
    pub author_id: String,
    pub approved_by: String,

    #[databam(relation)]
    pub author: Option<Person>,

    #[databam(relation)]
    pub approver: Option<Person>,
}

/// Declares a candidate key for every `Person` field.
#[derive(Debug, Default, Model)]
pub struct Project {
    pub id: String,
    pub owner_name: String,
    pub owner_id: String,

    #[databam(relation)]
    pub owner: Option<Box<Person>>,
}

/// A relation with no key on either side.
#[derive(Debug, Default, Model)]
pub struct Orphan {
    pub id: String,

    #[databam(relation)]
    pub person: Option<Person>,
}

/// A relation held by value.
#[derive(Debug, Default, Model)]
pub struct Assignment {
    pub id: String,
    pub person_id: String,

    #[databam(relation)]
    pub person: Person,
}

/// In-memory driver returning canned rows and recording every statement.
#[derive(Clone, Default)]
pub struct Stub {
    state: Arc<Mutex<State>>,
}

#[derive(Default)]
struct State {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    failure: Option<String>,
    queries: Vec<Query>,
}

impl Stub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returning(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        let stub = Self::default();
        {
            let mut state = stub.state.lock();
            state.columns = columns.iter().map(ToString::to_string).collect();
            state.rows = rows;
        }
        stub
    }

    pub fn failing(message: &str) -> Self {
        let stub = Self::default();
        stub.state.lock().failure = Some(message.to_owned());
        stub
    }

    pub fn queries(&self) -> Vec<Query> {
        self.state.lock().queries.clone()
    }

    #[allow(clippy::missing_panics_doc)]
    pub fn last(&self) -> Query {
        self.queries().pop().expect("no query was executed")
    }
}

impl Driver for Stub {
    fn query(&self, sql: &str, params: &[Value]) -> anyhow::Result<Box<dyn Rows + '_>> {
        let mut state = self.state.lock();
        state.queries.push(Query {
            sql: sql.to_owned(),
            params: params.to_vec(),
        });
        if let Some(failure) = &state.failure {
            anyhow::bail!("{failure}");
        }

        Ok(Box::new(StubRows {
            columns: state.columns.clone(),
            rows: state.rows.clone().into_iter(),
        }))
    }
}

struct StubRows {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Vec<Value>>,
}

impl Rows for StubRows {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> anyhow::Result<Option<Vec<Value>>> {
        Ok(self.rows.next())
    }
}

/// Route `tracing` output through the test harness.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Normalize SQL by collapsing whitespace.
fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Assert that SQL contains all expected fragments in order.
///
/// Whitespace is normalized on both sides, and fragments must appear
/// sequentially in the generated SQL.
#[allow(clippy::missing_panics_doc)]
pub fn assert_sql_contains(actual: &str, fragments: &[&str]) {
    let actual_normalized = normalize_sql(actual);
    let mut search_start = 0usize;

    for fragment in fragments {
        let fragment_normalized = normalize_sql(fragment);
        if fragment_normalized.is_empty() {
            continue;
        }

        if let Some(pos) = actual_normalized[search_start..].find(&fragment_normalized) {
            search_start += pos + fragment_normalized.len();
        } else {
            panic!(
                "expected SQL fragment `{fragment_normalized}` not found in `{actual_normalized}`"
            );
        }
    }
}
