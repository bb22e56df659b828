//! Type name resolution against a compilation unit's imports.

use std::sync::Arc;

use indy_syntax::{Annotation, CompilationUnit, ImportDecl, TypeDecl};
use smol_str::SmolStr;

/// Answers whether a fully qualified type exists.
///
/// Star imports and the implicit `java.lang` import can only be resolved
/// against a set of known types, so the index decides which of them match.
pub trait TypeIndex: Send + Sync {
    fn contains_type(&self, fqn: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSingleImport {
    /// `a.b.C`
    pub path: String,
    /// `C`
    pub imported: SmolStr,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportMap {
    pub type_single: Vec<TypeSingleImport>,
    /// Packages or types whose members are imported with `.*`.
    pub type_star: Vec<String>,
    /// `import static a.B.C;` may import a member type `C`.
    pub static_single: Vec<TypeSingleImport>,
    pub static_star: Vec<String>,
}

impl ImportMap {
    #[must_use]
    pub fn from_imports(imports: &[ImportDecl]) -> Self {
        let mut out = ImportMap::default();
        for import in imports {
            if import.path.trim().is_empty() {
                continue;
            }
            match (import.is_static, import.is_wildcard) {
                (false, false) => out.type_single.push(single(&import.path)),
                (false, true) => out.type_star.push(import.path.clone()),
                (true, false) => out.static_single.push(single(&import.path)),
                (true, true) => out.static_star.push(import.path.clone()),
            }
        }
        out
    }
}

fn single(path: &str) -> TypeSingleImport {
    let imported = path.rsplit('.').next().unwrap_or(path);
    TypeSingleImport {
        path: path.to_string(),
        imported: imported.into(),
    }
}

#[derive(Debug, Clone)]
struct EnclosingType {
    fqn: String,
    name: SmolStr,
    member_types: Vec<SmolStr>,
}

/// Type names visible at some point of a compilation unit.
#[derive(Clone)]
pub struct TypeScope {
    package: Option<String>,
    imports: Arc<ImportMap>,
    top_level: Arc<Vec<SmolStr>>,
    /// Innermost last.
    enclosing: Vec<EnclosingType>,
    index: Arc<dyn TypeIndex>,
}

impl std::fmt::Debug for TypeScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeScope")
            .field("package", &self.package)
            .field("imports", &self.imports)
            .field("enclosing", &self.enclosing)
            .finish_non_exhaustive()
    }
}

impl TypeScope {
    /// Scope at the top level of `unit`.
    pub fn for_unit(unit: &CompilationUnit, index: Arc<dyn TypeIndex>) -> Self {
        Self {
            package: unit.package.as_ref().map(|p| p.name.clone()),
            imports: Arc::new(ImportMap::from_imports(&unit.imports)),
            top_level: Arc::new(unit.types.iter().map(|t| t.name.clone()).collect()),
            enclosing: Vec::new(),
            index,
        }
    }

    /// Scope inside the body of `decl`, which must be declared directly in
    /// the current scope.
    #[must_use]
    pub fn nested(&self, decl: &TypeDecl) -> Self {
        let fqn = self.qualify(&decl.name);
        let mut scope = self.clone();
        scope.enclosing.push(EnclosingType {
            fqn,
            name: decl.name.clone(),
            member_types: decl.member_type_names().cloned().collect(),
        });
        scope
    }

    /// Fully qualified name of the innermost enclosing type.
    pub fn enclosing_type(&self) -> Option<&str> {
        self.enclosing.last().map(|ty| ty.fqn.as_str())
    }

    /// Name a type called `name` gets when declared in this scope.
    pub fn qualify(&self, name: &str) -> String {
        match (self.enclosing.last(), &self.package) {
            (Some(outer), _) => format!("{}.{name}", outer.fqn),
            (None, Some(package)) => format!("{package}.{name}"),
            (None, None) => name.to_string(),
        }
    }

    /// Resolves a possibly qualified type name as written in source.
    pub fn resolve_type_name(&self, written: &str) -> Option<String> {
        let (head, rest) = match written.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (written, None),
        };
        let Some(resolved_head) = self.resolve_simple(head) else {
            // `net.bytebuddy.asm.Advice` style names start with a package.
            return head
                .starts_with(|c: char| c.is_ascii_lowercase())
                .then(|| written.to_string());
        };
        Some(match rest {
            Some(rest) => format!("{resolved_head}.{rest}"),
            None => resolved_head,
        })
    }

    pub fn resolve_annotation(&self, annotation: &Annotation) -> Option<String> {
        self.resolve_type_name(&annotation.name)
    }

    fn resolve_simple(&self, name: &str) -> Option<String> {
        for outer in self.enclosing.iter().rev() {
            if outer.member_types.iter().any(|member| member == name) {
                return Some(format!("{}.{name}", outer.fqn));
            }
            if outer.name == name {
                return Some(outer.fqn.clone());
            }
        }
        if self.top_level.iter().any(|ty| ty == name) {
            return Some(match &self.package {
                Some(package) => format!("{package}.{name}"),
                None => name.to_string(),
            });
        }
        if let Some(import) = self.imports.type_single.iter().find(|i| i.imported == name) {
            return Some(import.path.clone());
        }
        if let Some(import) = self
            .imports
            .static_single
            .iter()
            .find(|i| i.imported == name && self.index.contains_type(&i.path))
        {
            return Some(import.path.clone());
        }
        if let Some(package) = &self.package {
            let candidate = format!("{package}.{name}");
            if self.index.contains_type(&candidate) {
                return Some(candidate);
            }
        }
        let on_demand = self
            .imports
            .type_star
            .iter()
            .chain(&self.imports.static_star)
            .map(String::as_str)
            .chain(std::iter::once("java.lang"));
        for prefix in on_demand {
            let candidate = format!("{prefix}.{name}");
            if self.index.contains_type(&candidate) {
                return Some(candidate);
            }
        }
        None
    }
}
