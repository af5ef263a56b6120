//! Foreign-key discovery between related models.
//!
//! Relations are not declared; they are inferred from field names. This is a
//! heuristic: when more than one field could form the key, the first in
//! declaration order wins. Use [`ExplicitRelations`] where the convention does
//! not fit.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::Model;
use crate::registry::{Descriptor, Registry};

/// Field on the source model that a back-reference points at.
const IDENTITY: &str = "id";

/// A resolved relation: join `target.remote_field = source.source_field`.
#[derive(Debug, Clone)]
pub struct Relation {
    /// The related model.
    pub target: Arc<Descriptor>,

    /// Key field on the source model.
    pub source_field: String,

    /// Key field on the related model.
    pub remote_field: String,
}

/// Determines the join keys for a relation field.
pub trait Resolver: Send + Sync {
    /// Resolve the relation held by `field` on `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldUnmapped`] if `field` does not exist or no key
    /// pair can be found, and [`Error::NotMappable`] if `field` is not a
    /// relation.
    fn resolve(&self, registry: &Registry, source: &Descriptor, field: &str) -> Result<Relation>;
}

/// Convention-based resolution.
///
/// Given relation field `creator` on `Tenant` holding a `Person`:
///
/// 1. for each mapped field `F` of `Person`, in declaration order, look for a
///    mapped field `creator_F` on `Tenant` (`creator_id` → `person.id`);
/// 2. otherwise, look for `tenant_id` on `Person` and `id` on `Tenant`;
/// 3. otherwise fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConventionResolver;

impl Resolver for ConventionResolver {
    fn resolve(&self, registry: &Registry, source: &Descriptor, field: &str) -> Result<Relation> {
        let target = related(registry, source, field)?;
        let mapper = registry.mapper();

        let forward = target.fields().iter().filter(|remote| remote.is_mapped()).find_map(|remote| {
            let key = mapper.relation_key(field, remote.name());
            source.mapped(&key).map(|_| (key, remote.name().to_owned()))
        });
        if let Some((source_field, remote_field)) = forward {
            return Ok(Relation {
                target,
                source_field,
                remote_field,
            });
        }

        let back = mapper.back_reference(source.name());
        if target.mapped(&back).is_some() && source.mapped(IDENTITY).is_some() {
            return Ok(Relation {
                target,
                source_field: IDENTITY.to_owned(),
                remote_field: back,
            });
        }

        Err(Error::unmapped(source.name(), field))
    }
}

/// Relations declared up front, falling back to another resolver for
/// everything else.
///
/// ```ignore
/// let relations = ExplicitRelations::new()
///     .relate::<Review>("approver", "approved_by", "id");
/// let db = Databam::new(driver).with_resolver(relations);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExplicitRelations<R = ConventionResolver> {
    keys: HashMap<(TypeId, String), (String, String)>,
    fallback: R,
}

impl ExplicitRelations {
    /// Creates an empty table that falls back to the naming convention.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: Resolver> ExplicitRelations<R> {
    /// Creates an empty table that falls back to `fallback`.
    #[must_use]
    pub fn with_fallback(fallback: R) -> Self {
        Self {
            keys: HashMap::new(),
            fallback,
        }
    }

    /// Declare that `relation` on `M` joins `related.remote_field = M.source_field`.
    #[must_use]
    pub fn relate<M: Model>(
        mut self, relation: &str, source_field: &str, remote_field: &str,
    ) -> Self {
        self.keys.insert(
            (TypeId::of::<M>(), relation.to_owned()),
            (source_field.to_owned(), remote_field.to_owned()),
        );
        self
    }
}

impl<R: Resolver> Resolver for ExplicitRelations<R> {
    fn resolve(&self, registry: &Registry, source: &Descriptor, field: &str) -> Result<Relation> {
        let Some((source_field, remote_field)) =
            self.keys.get(&(source.type_id(), field.to_owned()))
        else {
            return self.fallback.resolve(registry, source, field);
        };

        let target = related(registry, source, field)?;
        if source.mapped(source_field).is_none() {
            return Err(Error::unmapped(source.name(), source_field.as_str()));
        }
        if target.mapped(remote_field).is_none() {
            return Err(Error::unmapped(target.name(), remote_field.as_str()));
        }

        Ok(Relation {
            target,
            source_field: source_field.clone(),
            remote_field: remote_field.clone(),
        })
    }
}

// Describe the model held by a relation field.
fn related(registry: &Registry, source: &Descriptor, field: &str) -> Result<Arc<Descriptor>> {
    let Some(descriptor) = source.field(field) else {
        return Err(Error::unmapped(source.name(), field));
    };
    let Some(model) = descriptor.kind().related() else {
        return Err(Error::not_mappable(
            source.name(),
            format!("field `{field}` is not a relation"),
        ));
    };
    registry.describe_ref(model)
}
