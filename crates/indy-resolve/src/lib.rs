//! Name resolution for advice method bodies and type names.
//!
//! Two small pieces:
//! - [`BodyScopes`] maps every simple name inside one method body to the
//!   parameter or local it refers to, following Java's lexical scoping.
//! - [`TypeScope`] resolves type and annotation names of a compilation unit to
//!   fully qualified names using the enclosing types, imports and a
//!   [`TypeIndex`] of known types.

mod scopes;
mod types;

pub use scopes::{BodyScopes, Resolution, ScopeData, ScopeId};
pub use types::{ImportMap, TypeIndex, TypeScope, TypeSingleImport};

#[cfg(test)]
mod tests;
