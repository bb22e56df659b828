//! Migration of whole compilation units.

use std::sync::Arc;

use indy_resolve::{TypeIndex, TypeScope};
use indy_syntax::{parse_java, print_with, CompilationUnit, Member, PrintOptions, TypeDecl};
use serde::Serialize;

use crate::framework::{FrameworkTypes, RequiredImports};
use crate::plan::AdviceTransformationPlan;
use crate::MigrateError;

const BOM: char = '\u{feff}';

/// What a migration changed in one compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Rewritten advice classes, by qualified name, innermost first.
    pub migrated_classes: Vec<String>,
    /// Imports added to the unit.
    pub imports_added: Vec<String>,
}

impl MigrationReport {
    pub fn is_changed(&self) -> bool {
        !self.migrated_classes.is_empty() || !self.imports_added.is_empty()
    }
}

/// Migrates every advice class of `unit`, nested classes included.
///
/// Either all classes of the unit are migrated or, on error, `unit` is left
/// untouched.
pub fn migrate_compilation_unit(
    unit: &mut CompilationUnit,
) -> Result<MigrationReport, MigrateError> {
    let mut working = unit.clone();
    let index: Arc<dyn TypeIndex> = Arc::new(FrameworkTypes);
    let scope = TypeScope::for_unit(&working, index);

    let mut report = MigrationReport::default();
    let mut imports = RequiredImports::default();
    for decl in &mut working.types {
        migrate_type(decl, &scope, &mut imports, &mut report)?;
    }
    for import in imports.iter() {
        if working.add_import(import) {
            report.imports_added.push(import.to_string());
        }
    }

    if report.is_changed() {
        *unit = working;
    }
    Ok(report)
}

/// Migrates `decl` and the types nested in it.
fn migrate_type(
    decl: &mut TypeDecl,
    outer: &TypeScope,
    imports: &mut RequiredImports,
    report: &mut MigrationReport,
) -> Result<(), MigrateError> {
    let scope = outer.nested(decl);
    for member in &mut decl.members {
        if let Member::Type(nested) = member {
            migrate_type(nested, &scope, imports, report)?;
        }
    }

    if let Some(plan) = AdviceTransformationPlan::create(decl, &scope)? {
        if plan.transform(decl, imports)? {
            let class = scope
                .enclosing_type()
                .map(str::to_string)
                .unwrap_or_else(|| decl.name.to_string());
            tracing::info!(target = "indy.migrate", class = %class, "migrated advice class");
            report.migrated_classes.push(class);
        }
    }
    Ok(())
}

/// Result of [`migrate_source`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceMigration {
    /// The migrated source, or the input itself when nothing changed.
    pub text: String,
    pub report: MigrationReport,
}

/// Parses, migrates and prints one Java source file.
pub fn migrate_source(text: &str) -> Result<SourceMigration, MigrateError> {
    migrate_source_with(text, &PrintOptions::default())
}

pub fn migrate_source_with(
    text: &str,
    options: &PrintOptions,
) -> Result<SourceMigration, MigrateError> {
    let (bom, source) = match text.strip_prefix(BOM) {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let mut unit = parse_java(source)?;
    let report = migrate_compilation_unit(&mut unit)?;
    if !report.is_changed() {
        return Ok(SourceMigration {
            text: text.to_string(),
            report,
        });
    }

    let mut out = String::with_capacity(text.len() + 256);
    if bom {
        out.push(BOM);
    }
    out.push_str(&print_with(&unit, options));
    Ok(SourceMigration { text: out, report })
}
