use std::sync::Arc;

use anyhow::{Context, Result};
use databam::{Driver, Rows};
use fromenv::FromEnv;
use parking_lot::Mutex;
use rusqlite::{Connection, params_from_iter};
use sea_query::Value;
use tracing::instrument;

use crate::value::{from_sql, to_sql};

/// Options used to connect to the SQLite database.
///
/// This struct is used to load connection options from environment variables.
#[derive(Debug, Clone, FromEnv)]
pub struct ConnectOptions {
    /// Database path, or `:memory:` for a private in-memory database.
    #[env(from = "SQL_DATABASE", default = ":memory:")]
    pub database: String,
}

impl ConnectOptions {
    /// Load options from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable is present but invalid.
    pub fn load() -> Result<Self> {
        Self::from_env().finalize().context("issue loading connection options")
    }
}

/// `SQLite` driver.
#[derive(Debug, Clone)]
pub struct Sqlite {
    // Mutex is necessary since rusqlite::Connection isn't `Sync`
    conn: Arc<Mutex<Connection>>,
}

impl Sqlite {
    /// Connect using options loaded from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid or the database cannot be
    /// opened.
    pub fn connect() -> Result<Self> {
        Self::connect_with(ConnectOptions::load()?)
    }

    /// Connect using `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    #[instrument]
    pub fn connect_with(options: ConnectOptions) -> Result<Self> {
        tracing::debug!("initializing SQLite connection to: {}", options.database);

        let conn = Connection::open(&options.database).context("failed to open SQLite database")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        Self::connect_with(ConnectOptions {
            database: ":memory:".to_owned(),
        })
    }

    /// Execute a statement that does not return rows (e.g., an `INSERT`,
    /// `UPDATE`, or `CREATE TABLE`), returning the number of rows changed.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter has no `SQLite` representation or the
    /// statement fails.
    pub fn execute(&self, sql: &str, params: &[Value]) -> Result<usize> {
        tracing::debug!("executing statement: {sql}");
        let params = params.iter().map(to_sql).collect::<Result<Vec<_>>>()?;

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql).context("failed to prepare statement")?;
        stmt.execute(params_from_iter(params.iter())).context("failed to execute statement")
    }

    /// Execute a batch of `;`-separated statements without parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        tracing::debug!("executing batch: {sql}");
        self.conn.lock().execute_batch(sql).context("failed to execute batch")
    }
}

impl Driver for Sqlite {
    #[allow(clippy::significant_drop_tightening)]
    fn query(&self, sql: &str, params: &[Value]) -> Result<Box<dyn Rows + '_>> {
        tracing::debug!("executing query: {sql}");
        let params = params.iter().map(to_sql).collect::<Result<Vec<_>>>()?;

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql).context("failed to prepare statement")?;
        let columns: Vec<String> = stmt.column_names().iter().map(ToString::to_string).collect();

        // rows are read eagerly so the connection is released on return
        let mut rows = stmt.query(params_from_iter(params.iter())).context("failed to execute query")?;
        let mut fetched = Vec::new();
        while let Some(row) = rows.next().context("failed to fetch row")? {
            let values = (0..columns.len())
                .map(|index| row.get_ref(index).context("failed to get column value").and_then(from_sql))
                .collect::<Result<Vec<_>>>()?;
            fetched.push(values);
        }

        Ok(Box::new(Fetched {
            columns,
            rows: fetched.into_iter(),
        }))
    }
}

struct Fetched {
    columns: Vec<String>,
    rows: std::vec::IntoIter<Vec<Value>>,
}

impl Rows for Fetched {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<Value>>> {
        Ok(self.rows.next())
    }
}
