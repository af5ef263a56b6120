use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{Probe, Record};
use crate::query::{Condition, FieldRef, Join, Node, Select};
use crate::registry::{Descriptor, Registry};
use crate::relation::Resolver;

/// Joins and conditions inferred from a template.
#[derive(Debug, Clone, Default)]
pub struct Walked {
    /// Joins in discovery order.
    pub joins: Vec<Join>,

    /// One conjunction per populated level of the template.
    pub conditions: Vec<Condition>,
}

impl Select {
    /// Adds the joins and conditions inferred from a template.
    ///
    /// Table occurrences introduced by `walked` are numbered after those
    /// already in the select, so composing several walks never shares an
    /// alias between two joins.
    #[must_use]
    pub fn filter(self, walked: Walked) -> Self {
        let by = self.last_node().index();
        let select = walked.joins.into_iter().map(|join| join.shifted(by)).fold(self, Self::join);
        walked
            .conditions
            .into_iter()
            .map(|condition| condition.shifted(by))
            .fold(select, Self::r#where)
    }
}

/// Walk `template`, an instance of `root`, into joins and conditions.
///
/// Every non-zero column field becomes an equality condition on its table
/// occurrence. Every populated relation, and every element of a populated
/// collection, becomes a join to a fresh occurrence of the related table and
/// is walked in turn.
///
/// # Errors
///
/// Returns [`Error::IncompatibleType`] if `template` is not an instance of
/// `root`, or the first error raised while resolving a relation.
pub fn walk(
    registry: &Registry, resolver: &dyn Resolver, root: &Arc<Descriptor>, template: &dyn Record,
) -> Result<Walked> {
    let mut walker = Walker {
        registry,
        resolver,
        last: Node::ROOT,
        walked: Walked::default(),
    };
    walker.visit(Node::ROOT, root, template)?;
    Ok(walker.walked)
}

struct Walker<'a> {
    registry: &'a Registry,
    resolver: &'a dyn Resolver,
    last: Node,
    walked: Walked,
}

impl Walker<'_> {
    fn visit(&mut self, node: Node, descriptor: &Arc<Descriptor>, record: &dyn Record) -> Result<()> {
        let model = record.model();
        if model.type_id() != descriptor.type_id() {
            return Err(Error::IncompatibleType {
                expected: descriptor.name(),
                found: model.shape().name,
            });
        }

        let mut leaves = Vec::new();
        for (index, field) in descriptor.fields().iter().enumerate() {
            if !field.is_mapped() {
                continue;
            }
            if let Probe::Value(value) = record.probe(index) {
                leaves.push(Condition::Eq(FieldRef::new(node, descriptor, field.name()), value));
            }
        }
        if !leaves.is_empty() {
            self.walked.conditions.push(Condition::And(leaves));
        }

        for (index, field) in descriptor.fields().iter().enumerate() {
            if field.is_skipped() || !field.kind().is_relation() {
                continue;
            }
            match record.probe(index) {
                Probe::Entity(nested) => self.descend(node, descriptor, field.name(), nested)?,
                Probe::Collection(nested) => {
                    for item in nested {
                        self.descend(node, descriptor, field.name(), item)?;
                    }
                }
                Probe::Zero | Probe::Value(_) => {}
            }
        }

        Ok(())
    }

    fn descend(
        &mut self, node: Node, descriptor: &Arc<Descriptor>, field: &str, nested: &dyn Record,
    ) -> Result<()> {
        let relation = self.resolver.resolve(self.registry, descriptor, field)?;

        self.last = self.last.next();
        let remote = self.last;
        self.walked.joins.push(Join {
            source: FieldRef::new(node, descriptor, relation.source_field),
            remote: FieldRef::new(remote, &relation.target, relation.remote_field),
        });

        self.visit(remote, &relation.target, nested)
    }
}
