use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::driver::Driver;
use crate::error::{Error, Result};
use crate::mapper::{DefaultMapper, Mapper};
use crate::model::{Model, Record};
use crate::query::{Query, Select};
use crate::registry::{Descriptor, Registry};
use crate::relation::{ConventionResolver, Resolver};
use crate::rows::{Cursor, Target};
use crate::walk::{Walked, walk};

/// Callback receiving each executed statement and its parameters.
pub type DebugLogger = Arc<dyn Fn(fmt::Arguments<'_>) + Send + Sync>;

/// Entry point: a driver plus the descriptor cache and naming conventions
/// used to query it.
pub struct Databam {
    driver: Box<dyn Driver>,
    registry: Registry,
    resolver: Arc<dyn Resolver>,
    debug_logger: Option<DebugLogger>,
}

impl Databam {
    /// Creates a mapper over `driver` using the default naming conventions.
    #[must_use]
    pub fn new(driver: impl Driver + 'static) -> Self {
        Self::with_mapper(driver, DefaultMapper)
    }

    /// Creates a mapper over `driver` using `mapper` for naming.
    #[must_use]
    pub fn with_mapper(driver: impl Driver + 'static, mapper: impl Mapper + 'static) -> Self {
        Self {
            driver: Box::new(driver),
            registry: Registry::new(Arc::new(mapper)),
            resolver: Arc::new(ConventionResolver),
            debug_logger: None,
        }
    }

    /// Replaces the relation resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Installs a callback that receives every statement before it runs.
    pub fn set_debug_logger(&mut self, logger: impl Fn(fmt::Arguments<'_>) + Send + Sync + 'static) {
        self.debug_logger = Some(Arc::new(logger));
    }

    /// The descriptor cache.
    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// A repository for `M`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotMappable`] if `M` cannot be mapped onto a table.
    pub fn repository<M: Model>(&self) -> Result<Repository<'_, M>> {
        Ok(Repository {
            db: self,
            descriptor: self.registry.describe::<M>()?,
            model: PhantomData,
        })
    }

    /// A repository for `M`.
    ///
    /// # Panics
    ///
    /// Panics if `M` cannot be mapped onto a table.
    #[must_use]
    pub fn must_repository<M: Model>(&self) -> Repository<'_, M> {
        self.repository().unwrap_or_else(|e| panic!("{e}"))
    }

    /// Reload `record` using its own non-zero fields as the filter.
    ///
    /// A record with no matching row is left untouched.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while describing, compiling, executing
    /// or decoding.
    pub fn load<M: Model>(&self, record: &mut M) -> Result<()> {
        self.repository::<M>()?.load(record)
    }

    /// Find rows matching `template` and decode them into `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompatibleType`] if `template` is not an instance of
    /// the target's model, or the first error raised while describing,
    /// compiling, executing or decoding.
    pub fn find<T: Target>(&self, target: &mut T, template: &dyn Record) -> Result<()> {
        self.repository::<T::Model>()?.find(target, template)
    }

    fn execute<T: Target>(
        &self, descriptor: &Arc<Descriptor>, query: &Query, target: &mut T,
    ) -> Result<()> {
        tracing::debug!(
            table = descriptor.table(),
            sql = %query.sql,
            params = ?query.params,
            "executing query"
        );
        if let Some(logger) = &self.debug_logger {
            logger(format_args!("Query: {}", query.sql));
            logger(format_args!("Parameters: {:?}", query.params));
        }

        let rows = self.driver.query(&query.sql, &query.params).map_err(Error::Driver)?;
        let mut cursor = Cursor::new(rows, Arc::clone(descriptor), self.registry.mapper());
        target.decode(&mut cursor)
    }
}

impl fmt::Debug for Databam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Databam")
            .field("debug_logger", &self.debug_logger.is_some())
            .finish_non_exhaustive()
    }
}

/// Queries for a single model.
pub struct Repository<'a, M> {
    db: &'a Databam,
    descriptor: Arc<Descriptor>,
    model: PhantomData<fn() -> M>,
}

impl<M: Model> Repository<'_, M> {
    /// The model's table mapping.
    #[must_use]
    pub const fn descriptor(&self) -> &Arc<Descriptor> {
        &self.descriptor
    }

    /// An empty `SELECT` from the model's table.
    #[must_use]
    pub fn select(&self) -> Select {
        Select::new(Arc::clone(&self.descriptor))
    }

    /// Infer joins and conditions from `template`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompatibleType`] if `template` is not an `M`, or the
    /// first error raised while resolving a relation.
    pub fn walk(&self, template: &dyn Record) -> Result<Walked> {
        walk(&self.db.registry, self.db.resolver.as_ref(), &self.descriptor, template)
    }

    /// Build the `SELECT` that [`find`](Self::find) would run for `T`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while walking `template`.
    pub fn prepare<T: Target<Model = M>>(&self, template: &dyn Record) -> Result<Select> {
        let select = self.select().filter(self.walk(template)?);
        Ok(match T::limit() {
            Some(limit) => select.limit(limit),
            None => select,
        })
    }

    /// Find rows matching `template` and decode them into `target`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while walking, compiling, executing or
    /// decoding.
    pub fn find<T: Target<Model = M>>(&self, target: &mut T, template: &dyn Record) -> Result<()> {
        let select = self.prepare::<T>(template)?;
        self.fetch(&select, target)
    }

    /// Reload `record` using its own non-zero fields as the filter.
    ///
    /// # Errors
    ///
    /// Returns the first error raised while walking, compiling, executing or
    /// decoding.
    pub fn load(&self, record: &mut M) -> Result<()> {
        let select = self.prepare::<M>(&*record)?;
        self.fetch(&select, record)
    }

    /// Run a hand-built `select` and decode the rows into `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompatibleType`] if `select` is not over `M`'s
    /// table, or the first error raised while compiling, executing or
    /// decoding.
    pub fn fetch<T: Target<Model = M>>(&self, select: &Select, target: &mut T) -> Result<()> {
        if select.root().type_id() != self.descriptor.type_id() {
            return Err(Error::IncompatibleType {
                expected: self.descriptor.name(),
                found: select.root().name(),
            });
        }

        let query = select.compile()?;
        self.db.execute(&self.descriptor, &query, target)
    }
}
