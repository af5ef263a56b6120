#![doc = include_str!("../README.md")]

//! # Query-by-example
//!
//! A template is a partially-populated model. Every scalar field holding a
//! non-zero value becomes an equality condition, and every populated relation
//! becomes a join to the related table, with its own non-zero fields turned
//! into conditions on the joined alias.
//!
//! ## Define Models
//!
//! ```ignore
//! #[derive(Debug, Default, Model)]
//! #[databam(table = "memberships")]
//! pub struct Membership {
//!     pub id: String,
//!     pub person_id: Option<String>,
//!     #[databam(column = "type")]
//!     pub kind: String,
//!
//!     #[databam(relation)]
//!     pub person: Option<Box<Person>>,
//! }
//! ```
//!
//! ## Find and Load
//!
//! ```ignore
//! let db = Databam::new(driver);
//!
//! // decode every matching row
//! let mut memberships: Vec<Membership> = Vec::new();
//! db.find(&mut memberships, &Membership { kind: "tenant".into(), ..Default::default() })?;
//!
//! // first three rows only
//! let mut first: [Membership; 3] = Default::default();
//! db.find(&mut first, &Membership::default())?;
//!
//! // use a record as its own filter
//! let mut person = Person { id: "9f4ad422".into(), ..Default::default() };
//! db.load(&mut person)?;
//! ```
//!
//! ## Custom Queries
//!
//! ```ignore
//! let repository = db.repository::<Membership>()?;
//! let query = repository
//!     .select()
//!     .filter(repository.walk(&template)?)
//!     .offset(20)
//!     .limit(10);
//!
//! let mut page: Vec<Membership> = Vec::new();
//! repository.fetch(&query, &mut page)?;
//! ```

#![forbid(unsafe_code)]

extern crate self as databam;

mod driver;
mod error;
mod mapper;
mod model;
mod query;
mod registry;
mod relation;
mod repository;
mod rows;
mod scalar;
mod walk;

pub use databam_macros::Model;
pub use sea_query::Value;

pub use self::driver::{Driver, Rows};
pub use self::error::{Error, Result};
pub use self::mapper::{DefaultMapper, Mapper};
pub use self::model::{FieldShape, Kind, Model, ModelRef, Probe, Record, Shape};
pub use self::query::{Condition, FieldRef, Join, Node, Query, Select};
pub use self::registry::{Descriptor, FieldDescriptor, Registry};
pub use self::relation::{ConventionResolver, ExplicitRelations, Relation, Resolver};
pub use self::repository::{Databam, DebugLogger, Repository};
pub use self::rows::{Cursor, Target};
pub use self::scalar::Scalar;
pub use self::walk::{Walked, walk};

// Re-exports for `Model` derive use only.
#[doc(hidden)]
pub mod __private {
    pub use anyhow;

    pub use crate::model::unassignable;
}
