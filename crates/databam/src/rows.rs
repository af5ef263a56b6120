use std::sync::Arc;

use crate::driver::Rows;
use crate::error::{Error, Result};
use crate::mapper::Mapper;
use crate::model::{Model, Record};
use crate::registry::Descriptor;

/// Something a result set can be decoded into.
///
/// Implemented for a single model, `Option<M>`, `Vec<M>` and `[M; N]`.
pub trait Target {
    /// The model each row decodes into.
    type Model: Model;

    /// Row limit implied by the target's shape, if any.
    fn limit() -> Option<u64>;

    /// Decode rows from `cursor` into the target.
    ///
    /// # Errors
    ///
    /// Returns the first driver, mapping or conversion error encountered.
    fn decode(&mut self, cursor: &mut Cursor<'_>) -> Result<()>;
}

impl<M: Model> Target for M {
    type Model = M;

    fn limit() -> Option<u64> {
        Some(1)
    }

    // A missing row leaves the record untouched.
    fn decode(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        cursor.next_into(self).map(drop)
    }
}

impl<M: Model> Target for Option<M> {
    type Model = M;

    fn limit() -> Option<u64> {
        Some(1)
    }

    fn decode(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        let mut record = M::default();
        if cursor.next_into(&mut record)? {
            *self = Some(record);
        }
        Ok(())
    }
}

impl<M: Model> Target for Vec<M> {
    type Model = M;

    fn limit() -> Option<u64> {
        None
    }

    fn decode(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        loop {
            let mut record = M::default();
            if !cursor.next_into(&mut record)? {
                return Ok(());
            }
            self.push(record);
        }
    }
}

impl<M: Model, const N: usize> Target for [M; N] {
    type Model = M;

    // An empty array places no limit on the statement.
    fn limit() -> Option<u64> {
        if N == 0 { None } else { u64::try_from(N).ok() }
    }

    fn decode(&mut self, cursor: &mut Cursor<'_>) -> Result<()> {
        for slot in self.iter_mut() {
            if !cursor.next_into(slot)? {
                break;
            }
        }
        Ok(())
    }
}

/// A result set being decoded into records of one model.
///
/// Columns are matched to fields on the first row and the mapping reused for
/// the rest. The result set is released when the cursor is dropped.
pub struct Cursor<'a> {
    rows: Box<dyn Rows + 'a>,
    descriptor: Arc<Descriptor>,
    mapper: &'a dyn Mapper,
    bindings: Option<Vec<usize>>,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(
        rows: Box<dyn Rows + 'a>, descriptor: Arc<Descriptor>, mapper: &'a dyn Mapper,
    ) -> Self {
        Self {
            rows,
            descriptor,
            mapper,
            bindings: None,
        }
    }

    /// Decode the next row into `record`, returning `false` once the result
    /// set is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldUnmapped`] if a column matches no field,
    /// [`Error::Scan`] if a value cannot be converted, and [`Error::Driver`]
    /// if the row cannot be fetched.
    pub fn next_into(&mut self, record: &mut dyn Record) -> Result<bool> {
        let Some(values) = self.rows.next_row().map_err(Error::Driver)? else {
            return Ok(false);
        };

        if self.bindings.is_none() {
            self.bindings = Some(bind(&self.descriptor, self.rows.columns(), self.mapper)?);
        }
        let bindings = self.bindings.as_deref().unwrap_or_default();

        for ((value, &field), column) in values.into_iter().zip(bindings).zip(self.rows.columns()) {
            record.assign(field, value).map_err(|source| Error::Scan {
                column: column.clone(),
                source,
            })?;
        }

        Ok(true)
    }
}

// Match each column to a field index.
fn bind(descriptor: &Descriptor, columns: &[String], mapper: &dyn Mapper) -> Result<Vec<usize>> {
    columns
        .iter()
        .map(|column| {
            resolve(descriptor, column, mapper).ok_or_else(|| Error::unmapped(descriptor.name(), column.as_str()))
        })
        .collect()
}

// Precedence: column override, raw column name, converted column name, then
// either of those case-insensitively. Only mapped fields are candidates.
fn resolve(descriptor: &Descriptor, column: &str, mapper: &dyn Mapper) -> Option<usize> {
    let converted = mapper.column_to_field(column);
    let candidates = || descriptor.fields().iter().enumerate().filter(|(_, field)| field.is_mapped());

    candidates()
        .find(|(_, field)| field.column_override() == Some(column))
        .or_else(|| candidates().find(|(_, field)| field.name() == column))
        .or_else(|| candidates().find(|(_, field)| field.name() == converted))
        .or_else(|| {
            candidates().find(|(_, field)| {
                field.name().eq_ignore_ascii_case(column)
                    || field.name().eq_ignore_ascii_case(&converted)
            })
        })
        .map(|(index, _)| index)
}
