//! Domain model for GraphScopeProxy.
//!
//! Pure types and decision logic: resource classification, scope
//! membership, URL-path authorization, and collection filtering. Nothing
//! in this crate performs I/O.

#![forbid(unsafe_code)]

mod access;
mod filter;
mod resource;
mod scope;

pub use access::{AccessDecision, decide_access};
pub use filter::filter_body;
pub use resource::{AdmissionPolicy, DirectoryMember, Resource, ResourceKind, classify};
pub use scope::Scope;
