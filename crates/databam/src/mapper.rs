use heck::ToSnakeCase;

/// Naming conventions between in-memory names and their SQL counterparts.
///
/// The in-memory convention is Rust's: `snake_case` fields and `UpperCamelCase`
/// type names. Implementations must be pure; the same input always yields the
/// same output.
pub trait Mapper: Send + Sync {
    /// Column name for a field.
    fn field_to_column(&self, name: &str) -> String;

    /// Candidate field name for a result column.
    fn column_to_field(&self, column: &str) -> String;

    /// Default table name for a type.
    fn type_to_table(&self, name: &str) -> String;

    /// Name of the foreign key formed by a relation field and a field on the
    /// related type, e.g. `creator` + `id` → `creator_id`.
    fn relation_key(&self, relation: &str, field: &str) -> String {
        format!("{relation}_{field}")
    }

    /// Name of the field a related type uses to point back at `type_name`,
    /// e.g. `Tenant` → `tenant_id`.
    fn back_reference(&self, type_name: &str) -> String {
        format!("{}_id", type_name.to_snake_case())
    }
}

/// Maps names onto `snake_case` tables and columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMapper;

impl Mapper for DefaultMapper {
    fn field_to_column(&self, name: &str) -> String {
        name.to_snake_case()
    }

    fn column_to_field(&self, column: &str) -> String {
        column.to_snake_case()
    }

    fn type_to_table(&self, name: &str) -> String {
        name.to_snake_case()
    }
}
