use std::collections::HashMap;
use std::sync::Arc;

use sea_query::Value;

use crate::error::Result;
use crate::registry::Descriptor;

/// Alias of the root table.
const ROOT_ALIAS: &str = "t";

/// A compiled statement ready for the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    /// SQL text with `?` placeholders.
    pub sql: String,

    /// Parameters in placeholder order.
    pub params: Vec<Value>,
}

/// One occurrence of a table within a query.
///
/// Each join introduces a new node, so the same table reached through two
/// relation paths is two nodes with two aliases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node(usize);

impl Node {
    /// The table being selected from.
    pub const ROOT: Self = Self(0);

    pub(crate) const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    // The root is shared by every walk and never moves.
    pub(crate) const fn shifted(self, by: usize) -> Self {
        if self.0 == 0 { self } else { Self(self.0 + by) }
    }

    pub(crate) const fn index(self) -> usize {
        self.0
    }
}

/// A field of a specific table occurrence.
#[derive(Debug, Clone)]
pub struct FieldRef {
    node: Node,
    descriptor: Arc<Descriptor>,
    field: String,
}

impl FieldRef {
    /// Reference `field` on the occurrence of `descriptor` at `node`.
    #[must_use]
    pub fn new(node: Node, descriptor: &Arc<Descriptor>, field: impl Into<String>) -> Self {
        Self {
            node,
            descriptor: Arc::clone(descriptor),
            field: field.into(),
        }
    }

    /// The table occurrence.
    #[must_use]
    pub const fn node(&self) -> Node {
        self.node
    }

    /// The referenced field's in-memory name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The table the field belongs to.
    #[must_use]
    pub const fn descriptor(&self) -> &Arc<Descriptor> {
        &self.descriptor
    }

    pub(crate) fn shifted(mut self, by: usize) -> Self {
        self.node = self.node.shifted(by);
        self
    }

    fn render(&self, aliases: &mut Aliases) -> Result<String> {
        let column = self.descriptor.column(&self.field)?;
        Ok(format!("{}.{column}", aliases.alias(self.node)))
    }
}

/// An inner join: `remote = source`.
#[derive(Debug, Clone)]
pub struct Join {
    /// Key on the already-joined side.
    pub source: FieldRef,

    /// Key on the table being joined.
    pub remote: FieldRef,
}

impl Join {
    pub(crate) fn shifted(self, by: usize) -> Self {
        Self {
            source: self.source.shifted(by),
            remote: self.remote.shifted(by),
        }
    }
}

/// A filter condition.
#[derive(Debug, Clone)]
pub enum Condition {
    /// `field = value`
    Eq(FieldRef, Value),
    /// Logical AND of multiple conditions
    And(Vec<Self>),
}

impl Condition {
    /// `field = value`
    #[must_use]
    pub fn eq(field: FieldRef, value: impl Into<Value>) -> Self {
        Self::Eq(field, value.into())
    }

    pub(crate) fn shifted(self, by: usize) -> Self {
        match self {
            Self::Eq(field, value) => Self::Eq(field.shifted(by), value),
            Self::And(conditions) => {
                Self::And(conditions.into_iter().map(|condition| condition.shifted(by)).collect())
            }
        }
    }

    fn last_node(&self) -> Node {
        match self {
            Self::Eq(field, _) => field.node,
            Self::And(conditions) => {
                conditions.iter().map(Self::last_node).max_by_key(|node| node.0).unwrap_or(Node::ROOT)
            }
        }
    }

    fn render(&self, aliases: &mut Aliases, params: &mut Vec<Value>) -> Result<Option<String>> {
        match self {
            Self::Eq(field, value) => {
                let column = field.render(aliases)?;
                params.push(value.clone());
                Ok(Some(format!("{column} = ?")))
            }
            Self::And(conditions) => conjunction(conditions, aliases, params),
        }
    }
}

// Empty conjunctions render nothing, single terms render bare.
fn conjunction(
    conditions: &[Condition], aliases: &mut Aliases, params: &mut Vec<Value>,
) -> Result<Option<String>> {
    let mut bits = Vec::with_capacity(conditions.len());
    for condition in conditions {
        if let Some(bit) = condition.render(aliases, params)? {
            bits.push(bit);
        }
    }

    Ok(match bits.len() {
        0 => None,
        1 => bits.pop(),
        _ => Some(format!("({})", bits.join(" AND "))),
    })
}

/// Builder for constructing SELECT queries.
///
/// Each method consumes the builder and returns the updated one.
#[derive(Debug, Clone)]
pub struct Select {
    root: Arc<Descriptor>,
    fields: Vec<FieldRef>,
    joins: Vec<Join>,
    conditions: Vec<Condition>,
    offset: Option<u64>,
    limit: Option<u64>,
}

impl Select {
    /// Creates a new SELECT from `root`'s table.
    #[must_use]
    pub const fn new(root: Arc<Descriptor>) -> Self {
        Self {
            root,
            fields: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            offset: None,
            limit: None,
        }
    }

    /// The table being selected from.
    #[must_use]
    pub const fn root(&self) -> &Arc<Descriptor> {
        &self.root
    }

    /// The highest table occurrence referenced so far.
    pub(crate) fn last_node(&self) -> Node {
        let fields = self.fields.iter().map(|field| field.node);
        let joins = self.joins.iter().flat_map(|join| [join.source.node, join.remote.node]);
        let conditions = self.conditions.iter().map(Condition::last_node);

        fields.chain(joins).chain(conditions).max_by_key(|node| node.0).unwrap_or(Node::ROOT)
    }

    /// Adds a field to the projection. Without any, every column of the root
    /// table is selected.
    #[must_use]
    pub fn field(mut self, field: FieldRef) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a JOIN clause.
    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Adds a WHERE condition, ANDed with the others.
    #[must_use]
    pub fn r#where(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Sets the number of rows to skip.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets the maximum number of rows to return.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Compile to SQL text and parameters.
    ///
    /// Aliases are minted as tables are first referenced: `t` for the root,
    /// then `j0`, `j1`, ... in join order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FieldUnmapped`](crate::Error::FieldUnmapped) if a
    /// referenced field is not mapped to a column.
    pub fn compile(&self) -> Result<Query> {
        let mut aliases = Aliases::default();
        let mut params = Vec::new();
        let mut bits = vec!["SELECT".to_owned()];

        let root = aliases.alias(Node::ROOT);
        if self.fields.is_empty() {
            bits.push(format!("{root}.*"));
        } else {
            let fields = self
                .fields
                .iter()
                .map(|field| field.render(&mut aliases))
                .collect::<Result<Vec<_>>>()?;
            bits.push(fields.join(", "));
        }

        bits.push(format!("FROM {} {root}", self.root.table()));

        for Join { source, remote } in &self.joins {
            let alias = aliases.alias(remote.node);
            let remote_column = remote.render(&mut aliases)?;
            let source_column = source.render(&mut aliases)?;
            bits.push(format!(
                "JOIN {} {alias} ON {remote_column} = {source_column}",
                remote.descriptor.table()
            ));
        }

        if let Some(condition) = conjunction(&self.conditions, &mut aliases, &mut params)? {
            bits.push(format!("WHERE {condition}"));
        }

        if let Some(limit) = self.limit {
            bits.push(format!("LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            bits.push(format!("OFFSET {offset}"));
        }

        let sql = bits.join(" ");
        tracing::debug!(
            table = self.root.table(),
            sql = %sql,
            param_count = params.len(),
            "Select generated SQL"
        );

        Ok(Query { sql, params })
    }
}

#[derive(Default)]
struct Aliases {
    assigned: HashMap<Node, String>,
    counter: usize,
}

impl Aliases {
    fn alias(&mut self, node: Node) -> String {
        if node == Node::ROOT {
            return ROOT_ALIAS.to_owned();
        }

        let counter = &mut self.counter;
        self.assigned
            .entry(node)
            .or_insert_with(|| {
                let alias = format!("j{counter}");
                *counter += 1;
                alias
            })
            .clone()
    }
}
