use std::any::TypeId;
use std::fmt;

use sea_query::Value;

use crate::scalar::Scalar;

/// A record type that maps onto a table.
///
/// Typically implemented with `#[derive(Model)]` rather than manually.
pub trait Model: Record + Default + 'static {
    /// The declared shape of the type: its name, fields and annotations.
    fn shape() -> Shape;
}

/// Instance-level access to a model's fields, indexed in declaration order.
///
/// This is the only place field values are read or written; everything above
/// it works on [`Descriptor`](crate::Descriptor)s.
pub trait Record {
    /// The model this record is an instance of.
    fn model(&self) -> ModelRef;

    /// Inspect the field at `field` for use as a filter.
    fn probe(&self, field: usize) -> Probe<'_>;

    /// Write a decoded column value into the field at `field`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be converted to the field's type
    /// or if the field is not mapped to a column.
    fn assign(&mut self, field: usize, value: Value) -> anyhow::Result<()>;
}

/// Declared shape of a model type.
#[derive(Debug, Clone)]
pub struct Shape {
    /// The type's name, without its module path.
    pub name: &'static str,

    /// Table override declared on the type itself.
    pub table: Option<&'static str>,

    /// Fields in declaration order.
    pub fields: Vec<FieldShape>,
}

/// Declared shape of a single field.
#[derive(Debug, Clone, Copy)]
pub struct FieldShape {
    /// In-memory field name.
    pub name: &'static str,

    /// Column name override.
    pub column: Option<&'static str>,

    /// Table override for the owning type.
    pub table: Option<&'static str>,

    /// Excluded from column mapping.
    pub skip: bool,

    /// What the field holds.
    pub kind: Kind,
}

/// The kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A plain column value.
    Scalar,
    /// An optional column value.
    Optional,
    /// A single related record.
    Entity(ModelRef),
    /// A collection of related records.
    Collection(ModelRef),
}

impl Kind {
    /// The related model, if this is a relation.
    #[must_use]
    pub const fn related(self) -> Option<ModelRef> {
        match self {
            Self::Entity(model) | Self::Collection(model) => Some(model),
            Self::Scalar | Self::Optional => None,
        }
    }

    /// Whether the field holds related records rather than a column.
    #[must_use]
    pub const fn is_relation(self) -> bool {
        self.related().is_some()
    }
}

/// Type-erased handle on a [`Model`] type.
#[derive(Clone, Copy)]
pub struct ModelRef {
    type_id: fn() -> TypeId,
    shape: fn() -> Shape,
}

impl ModelRef {
    /// Handle for `M`.
    #[must_use]
    pub fn of<M: Model>() -> Self {
        Self {
            type_id: TypeId::of::<M>,
            shape: M::shape,
        }
    }

    /// Identity of the model type.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    /// Declared shape of the model type.
    #[must_use]
    pub fn shape(&self) -> Shape {
        (self.shape)()
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id() == other.type_id()
    }
}

impl Eq for ModelRef {}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelRef").field(&self.type_id()).finish()
    }
}

/// A field's contribution to a query-by-example filter.
pub enum Probe<'a> {
    /// The field holds its zero value and contributes nothing.
    Zero,
    /// A non-zero column value.
    Value(Value),
    /// A populated relation.
    Entity(&'a dyn Record),
    /// A populated collection of related records.
    Collection(Vec<&'a dyn Record>),
}

impl<'a> Probe<'a> {
    /// Probe a column value.
    pub fn scalar<S: Scalar>(value: &S) -> Self {
        if value.is_zero() { Self::Zero } else { Self::Value(value.to_value()) }
    }

    /// Probe an optional relation.
    pub fn entity<R: Record>(value: Option<&'a R>) -> Self {
        value.map_or(Self::Zero, |record| Self::Entity(record))
    }

    /// Probe a relation held by value.
    ///
    /// The record counts as populated when any of its fields does.
    pub fn embedded<R: Record>(value: &'a R) -> Self {
        let fields = value.model().shape().fields.len();
        if (0..fields).all(|field| matches!(value.probe(field), Probe::Zero)) {
            Self::Zero
        } else {
            Self::Entity(value)
        }
    }

    /// Probe a collection relation.
    pub fn collection<R: Record + 'a>(values: impl IntoIterator<Item = &'a R>) -> Self {
        let records: Vec<&'a dyn Record> =
            values.into_iter().map(|record| record as &dyn Record).collect();
        if records.is_empty() { Self::Zero } else { Self::Collection(records) }
    }
}

impl fmt::Debug for Probe<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zero => f.write_str("Zero"),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Entity(record) => f.debug_tuple("Entity").field(&record.model()).finish(),
            Self::Collection(records) => f.debug_tuple("Collection").field(&records.len()).finish(),
        }
    }
}

#[doc(hidden)]
#[must_use]
pub fn unassignable(type_name: &str, field: usize) -> anyhow::Error {
    anyhow::anyhow!("field {field} of `{type_name}` is not mapped to a column")
}
