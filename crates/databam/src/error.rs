//! Errors

use thiserror::Error;

/// Result type used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while describing, compiling, executing or decoding a query.
///
/// Every operation stops at the first error: there are no partial results and
/// no retries. An empty result set is not an error.
#[derive(Error, Debug)]
pub enum Error {
    /// The type cannot be mapped onto a table.
    #[error("can't map `{type_name}`: {reason}")]
    NotMappable {
        /// Name of the offending type.
        type_name: &'static str,
        /// What made the shape unmappable.
        reason: String,
    },

    /// A result column or relation has no corresponding field.
    #[error("couldn't map field `{field}` on `{type_name}`")]
    FieldUnmapped {
        /// Name of the type that was searched.
        type_name: &'static str,
        /// The column or field name that could not be resolved.
        field: String,
    },

    /// The template's type does not match the decode target's model.
    #[error("incompatible type: expected `{expected}`, found `{found}`")]
    IncompatibleType {
        /// The model the target decodes into.
        expected: &'static str,
        /// The model the template was built from.
        found: &'static str,
    },

    /// A column value could not be written into its field.
    #[error("couldn't scan column `{column}`")]
    Scan {
        /// The result column being decoded.
        column: String,
        /// The conversion failure.
        #[source]
        source: anyhow::Error,
    },

    /// The driver failed to execute the statement or fetch a row.
    #[error(transparent)]
    Driver(anyhow::Error),
}

impl Error {
    pub(crate) fn unmapped(type_name: &'static str, field: impl Into<String>) -> Self {
        Self::FieldUnmapped {
            type_name,
            field: field.into(),
        }
    }

    pub(crate) fn not_mappable(type_name: &'static str, reason: impl Into<String>) -> Self {
        Self::NotMappable {
            type_name,
            reason: reason.into(),
        }
    }
}
