use sea_query::Value;

/// Database drivers implement the [`Driver`] trait to let the repository
/// execute compiled statements against a backend (`SQLite`, Postgres, etc).
///
/// Statements use `?` placeholders, bound positionally from `params`.
pub trait Driver: Send + Sync {
    /// Execute a query and return a cursor over its rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the statement cannot be prepared or executed.
    fn query(&self, sql: &str, params: &[Value]) -> anyhow::Result<Box<dyn Rows + '_>>;
}

/// An open result set.
///
/// Any resources held by the result set are released when it is dropped,
/// whether or not every row was read.
pub trait Rows {
    /// Result column names, in row order.
    fn columns(&self) -> &[String];

    /// Fetch the next row, or `None` once the result set is exhausted.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be read.
    fn next_row(&mut self) -> anyhow::Result<Option<Vec<Value>>>;
}
