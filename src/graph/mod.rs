//! Relationship graph: derives Item endpoints from relationship strings.
//!
//! A relationship string such as `(Book)<-[WROTE]-(Person)` names the two Item
//! kinds it connects. The store calls [`derive_endpoints`] whenever a Relationship
//! is saved and links the resulting Items to it.

mod extraction;

pub use extraction::derive_endpoints;

use serde::{Deserialize, Serialize};

/// The two Item names a relationship string connects, in textual order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub from: String,
    pub to: String,
}
