use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{Error, Result};
use crate::mapper::Mapper;
use crate::model::{Kind, Model, ModelRef, Shape};

/// Table and column mapping for a model type.
///
/// Built once per type and shared; never mutated after it is published.
#[derive(Debug)]
pub struct Descriptor {
    type_id: TypeId,
    name: &'static str,
    table: String,
    fields: Vec<FieldDescriptor>,
}

/// Column mapping for a single field.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: &'static str,
    column: String,
    column_override: Option<&'static str>,
    skip: bool,
    kind: Kind,
}

impl Descriptor {
    fn build(type_id: TypeId, shape: &Shape, mapper: &dyn Mapper) -> Result<Self> {
        let table = shape
            .table
            .or_else(|| shape.fields.iter().find_map(|field| field.table))
            .map_or_else(|| mapper.type_to_table(shape.name), str::to_owned);
        if table.is_empty() {
            return Err(Error::not_mappable(shape.name, "table name is empty"));
        }

        let fields: Vec<FieldDescriptor> = shape
            .fields
            .iter()
            .map(|field| FieldDescriptor {
                name: field.name,
                column: field
                    .column
                    .map_or_else(|| mapper.field_to_column(field.name), str::to_owned),
                column_override: field.column,
                skip: field.skip,
                kind: field.kind,
            })
            .collect();

        let mut columns = HashSet::new();
        for field in fields.iter().filter(|field| field.is_mapped()) {
            if !columns.insert(field.column.as_str()) {
                return Err(Error::not_mappable(
                    shape.name,
                    format!("column `{}` is mapped more than once", field.column),
                ));
            }
        }

        Ok(Self {
            type_id,
            name: shape.name,
            table,
            fields,
        })
    }

    /// Identity of the described type.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The described type's name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The table the type maps onto.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// All fields in declaration order, mapped or not.
    #[must_use]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Look up a field by its in-memory name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Look up a field by name, only if it is mapped to a column.
    #[must_use]
    pub fn mapped(&self, name: &str) -> Option<&FieldDescriptor> {
        self.field(name).filter(|field| field.is_mapped())
    }

    /// Column for the named field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldUnmapped`] if the field does not exist or is not
    /// mapped to a column.
    pub fn column(&self, name: &str) -> Result<&str> {
        self.mapped(name)
            .map(FieldDescriptor::column)
            .ok_or_else(|| Error::unmapped(self.name, name))
    }
}

impl FieldDescriptor {
    /// In-memory field name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Column name, derived or overridden.
    #[must_use]
    pub fn column(&self) -> &str {
        &self.column
    }

    /// Column name declared with `#[databam(column = "...")]`.
    #[must_use]
    pub const fn column_override(&self) -> Option<&'static str> {
        self.column_override
    }

    /// What the field holds.
    #[must_use]
    pub const fn kind(&self) -> Kind {
        self.kind
    }

    /// Declared with `#[databam(skip)]`.
    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        self.skip
    }

    /// Whether the field reads from and writes to a column. Relations and
    /// skipped fields are excluded.
    #[must_use]
    pub const fn is_mapped(&self) -> bool {
        !self.skip && !self.kind.is_relation()
    }
}

/// Per-type descriptor cache.
///
/// Descriptors are computed on first use and shared thereafter. Concurrent
/// first use of a type may compute the descriptor more than once; the first
/// insert wins and every caller receives that one.
pub struct Registry {
    mapper: Arc<dyn Mapper>,
    cache: RwLock<HashMap<TypeId, Arc<Descriptor>>>,
}

impl Registry {
    /// Creates an empty registry using `mapper` for naming.
    #[must_use]
    pub fn new(mapper: Arc<dyn Mapper>) -> Self {
        Self {
            mapper,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The naming conventions in use.
    #[must_use]
    pub fn mapper(&self) -> &dyn Mapper {
        self.mapper.as_ref()
    }

    /// Describe `M`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotMappable`] if the type's shape has no table name or
    /// maps two fields onto the same column.
    pub fn describe<M: Model>(&self) -> Result<Arc<Descriptor>> {
        self.describe_ref(ModelRef::of::<M>())
    }

    /// Describe the model behind a type-erased handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotMappable`] if the type's shape has no table name or
    /// maps two fields onto the same column.
    pub fn describe_ref(&self, model: ModelRef) -> Result<Arc<Descriptor>> {
        let type_id = model.type_id();
        if let Some(descriptor) = self.cache.read().get(&type_id) {
            return Ok(Arc::clone(descriptor));
        }

        let descriptor = Arc::new(Descriptor::build(type_id, &model.shape(), self.mapper())?);
        tracing::trace!(
            type_name = descriptor.name(),
            table = descriptor.table(),
            "described model"
        );

        let mut cache = self.cache.write();
        Ok(Arc::clone(cache.entry(type_id).or_insert(descriptor)))
    }
}
