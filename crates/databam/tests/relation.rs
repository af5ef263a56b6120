//! Integration tests for model description and relation discovery.

#![allow(missing_docs)]

mod common;

use std::sync::Arc;

use common::{Membership, Orphan, Person, Project, Review, Tenant};
use databam::{
    ConventionResolver, DefaultMapper, Error, ExplicitRelations, Kind, Mapper, ModelRef, Registry,
    Resolver,
};

fn registry() -> Registry {
    Registry::new(Arc::new(DefaultMapper))
}

#[test]
fn describe_is_idempotent() {
    let registry = registry();

    let first = registry.describe::<Tenant>().unwrap();
    let second = registry.describe::<Tenant>().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.table(), "tenant");

    let names: Vec<_> = first.fields().iter().map(|field| field.name()).collect();
    assert_eq!(names, ["id", "creator_id", "name", "creator", "memberships"]);
}

#[test]
fn concurrent_first_describe_shares_one_descriptor() {
    let registry = registry();

    let described: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> =
            (0..8).map(|_| scope.spawn(|| registry.describe::<Tenant>().unwrap())).collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    let cached = registry.describe::<Tenant>().unwrap();
    assert!(described.iter().all(|descriptor| Arc::ptr_eq(descriptor, &cached)));
}

#[test]
fn describe_ref_shares_the_cache() {
    let registry = registry();

    let typed = registry.describe::<Person>().unwrap();
    let erased = registry.describe_ref(ModelRef::of::<Person>()).unwrap();

    assert!(Arc::ptr_eq(&typed, &erased));
}

#[test]
fn field_kinds() {
    let registry = registry();
    let tenant = registry.describe::<Tenant>().unwrap();
    let person = registry.describe::<Person>().unwrap();

    assert_eq!(tenant.field("id").unwrap().kind(), Kind::Scalar);
    assert_eq!(tenant.field("creator").unwrap().kind(), Kind::Entity(ModelRef::of::<Person>()));
    assert_eq!(
        tenant.field("memberships").unwrap().kind(),
        Kind::Collection(ModelRef::of::<Membership>())
    );
    assert_eq!(person.field("email").unwrap().kind(), Kind::Optional);

    // relations are walkable but have no column
    assert!(tenant.field("creator").is_some());
    assert!(tenant.mapped("creator").is_none());
}

#[test]
fn annotations() {
    let registry = registry();
    let membership = registry.describe::<Membership>().unwrap();

    assert_eq!(membership.table(), "memberships");
    assert_eq!(membership.column("kind").unwrap(), "type");
    assert_eq!(membership.field("kind").unwrap().column_override(), Some("type"));
    assert_eq!(membership.column("tenant_id").unwrap(), "tenant_id");
}

#[test]
fn forward_key() {
    let registry = registry();
    let tenant = registry.describe::<Tenant>().unwrap();

    let relation = ConventionResolver.resolve(&registry, &tenant, "creator").unwrap();
    assert_eq!(relation.target.table(), "person");
    assert_eq!(relation.source_field, "creator_id");
    assert_eq!(relation.remote_field, "id");
}

#[test]
fn back_reference() {
    let registry = registry();
    let tenant = registry.describe::<Tenant>().unwrap();

    let relation = ConventionResolver.resolve(&registry, &tenant, "memberships").unwrap();
    assert_eq!(relation.target.table(), "memberships");
    assert_eq!(relation.source_field, "id");
    assert_eq!(relation.remote_field, "tenant_id");
}

#[test]
fn resolution_is_deterministic() {
    let registry = registry();
    let membership = registry.describe::<Membership>().unwrap();

    let first = ConventionResolver.resolve(&registry, &membership, "person").unwrap();
    let second = ConventionResolver.resolve(&registry, &membership, "person").unwrap();

    assert!(Arc::ptr_eq(&first.target, &second.target));
    assert_eq!(first.source_field, second.source_field);
    assert_eq!(first.remote_field, second.remote_field);
    assert_eq!(first.source_field, "person_id");
}

#[test]
fn remote_declaration_order_breaks_ties() {
    let registry = registry();
    let project = registry.describe::<Project>().unwrap();

    // `owner_name` is declared first, but `Person::id` is probed before `Person::name`
    let relation = ConventionResolver.resolve(&registry, &project, "owner").unwrap();
    assert_eq!(relation.source_field, "owner_id");
    assert_eq!(relation.remote_field, "id");
}

#[test]
fn no_key_is_unmapped() {
    let registry = registry();
    let orphan = registry.describe::<Orphan>().unwrap();

    let err = ConventionResolver.resolve(&registry, &orphan, "person").unwrap_err();
    assert!(matches!(err, Error::FieldUnmapped { type_name: "Orphan", ref field } if field == "person"));
}

#[test]
fn unknown_field_is_unmapped() {
    let registry = registry();
    let tenant = registry.describe::<Tenant>().unwrap();

    let err = ConventionResolver.resolve(&registry, &tenant, "owner").unwrap_err();
    assert!(matches!(err, Error::FieldUnmapped { .. }));
}

#[test]
fn scalar_field_is_not_a_relation() {
    let registry = registry();
    let tenant = registry.describe::<Tenant>().unwrap();

    let err = ConventionResolver.resolve(&registry, &tenant, "name").unwrap_err();
    assert!(matches!(err, Error::NotMappable { type_name: "Tenant", .. }));
}

#[test]
fn explicit_relations_override_convention() {
    let registry = registry();
    let review = registry.describe::<Review>().unwrap();

    // without a declaration there is no `approver_id`
    let err = ConventionResolver.resolve(&registry, &review, "approver").unwrap_err();
    assert!(matches!(err, Error::FieldUnmapped { .. }));

    let relations = ExplicitRelations::new().relate::<Review>("approver", "approved_by", "id");
    let relation = relations.resolve(&registry, &review, "approver").unwrap();
    assert_eq!(relation.source_field, "approved_by");
    assert_eq!(relation.remote_field, "id");

    // undeclared relations fall back to the convention
    let relation = relations.resolve(&registry, &review, "author").unwrap();
    assert_eq!(relation.source_field, "author_id");
}

#[test]
fn explicit_relations_fail_closed() {
    let registry = registry();
    let review = registry.describe::<Review>().unwrap();

    let relations = ExplicitRelations::new().relate::<Review>("approver", "approver_id", "id");
    let err = relations.resolve(&registry, &review, "approver").unwrap_err();
    assert!(matches!(err, Error::FieldUnmapped { type_name: "Review", ref field } if field == "approver_id"));

    let relations = ExplicitRelations::new().relate::<Review>("approver", "approved_by", "uuid");
    let err = relations.resolve(&registry, &review, "approver").unwrap_err();
    assert!(matches!(err, Error::FieldUnmapped { type_name: "Person", ref field } if field == "uuid"));
}

struct Prefixed;

impl Mapper for Prefixed {
    fn field_to_column(&self, name: &str) -> String {
        format!("f_{name}")
    }

    fn column_to_field(&self, column: &str) -> String {
        column.trim_start_matches("f_").to_owned()
    }

    fn type_to_table(&self, name: &str) -> String {
        format!("tbl_{}", name.to_lowercase())
    }
}

#[test]
fn custom_mapper() {
    let registry = Registry::new(Arc::new(Prefixed));
    let tenant = registry.describe::<Tenant>().unwrap();

    assert_eq!(tenant.table(), "tbl_tenant");
    assert_eq!(tenant.column("creator_id").unwrap(), "f_creator_id");

    // the default relation naming still applies
    let relation = ConventionResolver.resolve(&registry, &tenant, "creator").unwrap();
    assert_eq!(relation.source_field, "creator_id");
}
