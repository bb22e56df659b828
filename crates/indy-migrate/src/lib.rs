//! Migration of ByteBuddy advice to the `@Advice.AssignReturned` style.
//!
//! Old-style advice writes back to the instrumented method by assigning to
//! parameters declared `readOnly = false`, and shares state between its enter
//! and exit methods through `@Advice.Local`. Advice that runs in its own
//! class loader can do neither: it must return every value it wants written,
//! and hand state to the exit method through its return value.
//!
//! This crate rewrites the source of such advice:
//! - writable `@Argument`, `@FieldValue` and `@Return` parameters become
//!   returned values with `@AssignReturned.To*` annotations,
//! - `@Local` parameters move into a value the enter method returns and the
//!   exit method reads through `@Advice.Enter`,
//! - assignments made redundant by the new returns are folded into them and
//!   declarations left unused are removed.
//!
//! [`migrate_source`] is the usual entry point. [`AdviceTransformationPlan`]
//! works on single classes of an already parsed tree.

mod binding;
mod driver;
mod error;
mod folding;
pub mod framework;
mod locals;
mod packing;
mod plan;
mod returns;
mod rewrite;

pub use binding::{classify_parameters, Binding, BindingRole};
pub use driver::{
    migrate_compilation_unit, migrate_source, migrate_source_with, MigrationReport,
    SourceMigration,
};
pub use error::MigrateError;
pub use folding::fold_returns;
pub use framework::{FrameworkTypes, RequiredImports};
pub use locals::{AdviceLocals, EnterParam, ExitTransform, LocalParam};
pub use packing::{emit_annotations, pack_returns, return_template, ValueToReturn, WriteTarget};
pub use plan::AdviceTransformationPlan;
pub use returns::{return_paths, scoped_returns, ScopedStatements};
pub use rewrite::{
    insert_before, prune_if_unused, remove_declaration, replace_references, usages_of, Usages,
};

#[cfg(test)]
mod tests;
