//! Declarative type catalogs
//!
//! A catalog lists host types in TOML or JSON, chosen by file extension:
//!
//! ```toml
//! [[type]]
//! name = "acme.Account"
//! implements = ["acme.Audited"]
//!
//! [[type.constructor]]
//! params = ["String"]
//!
//! [[type.method]]
//! name = "balance"
//! returns = "double"
//! markers = ["cache"]
//! ```
//!
//! Catalog constructors and methods have no executable bodies; calling one
//! on a plain instance yields the zero value of its return type.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::runtime::{
    ConstructorBuilder, DefineError, MethodBuilder, TypeBuilder, TypeHandle, TypeRegistry,
    Visibility, ROOT_TYPE,
};

/// Errors that can occur while loading or installing a catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read a catalog file
    #[error("Failed to read catalog file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse catalog: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to parse JSON
    #[error("Failed to parse catalog: {0}")]
    JsonError(#[from] serde_json::Error),

    /// File extension is neither `.toml` nor `.json`
    #[error("Unsupported catalog format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// A supertype is neither registered nor listed
    #[error("Type {type_name} refers to unknown supertype {supertype}")]
    UnknownSupertype {
        /// Listed type
        type_name: String,
        /// Missing supertype
        supertype: String,
    },

    /// Listed types inherit from each other in a cycle
    #[error("Inheritance cycle among: {}", .0.join(", "))]
    Cycle(Vec<String>),

    /// The registry rejected a definition
    #[error("Cannot define {type_name}: {source}")]
    Define {
        /// Listed type
        type_name: String,
        /// Rejection
        #[source]
        source: DefineError,
    },
}

/// A set of type definitions
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Catalog {
    /// Listed types
    #[serde(default, rename = "type")]
    pub types: Vec<TypeSpec>,
}

/// Kind of a listed type
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum KindSpec {
    /// Class
    #[default]
    Class,
    /// Interface
    Interface,
}

/// Type modifiers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TypeModifierSpec {
    /// Cannot be extended
    Final,
    /// Cannot be instantiated
    Abstract,
}

/// Member modifiers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MemberModifierSpec {
    /// Not bound to an instance
    Static,
    /// Cannot be overridden
    Final,
    /// No body
    Abstract,
    /// Declaring type only
    Private,
    /// Subtypes only
    Protected,
}

/// Stub generation markers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MarkerSpec {
    /// Memoize the first non-null result
    Cache,
    /// Return the stub itself
    #[serde(rename = "self")]
    ReturnSelf,
}

/// One listed type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct TypeSpec {
    /// Qualified name
    pub name: String,

    /// Class or interface
    #[serde(default)]
    pub kind: KindSpec,

    /// Superclass (classes only; defaults to the root)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Implemented (or extended, for interfaces) interfaces
    #[serde(default)]
    pub implements: Vec<String>,

    /// Type modifiers
    #[serde(default)]
    pub modifiers: Vec<TypeModifierSpec>,

    /// Type parameter names
    #[serde(default)]
    pub type_params: Vec<String>,

    /// Constructors
    #[serde(default, rename = "constructor")]
    pub constructors: Vec<ConstructorSpec>,

    /// Methods
    #[serde(default, rename = "method")]
    pub methods: Vec<MethodSpec>,
}

/// One listed constructor
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConstructorSpec {
    /// Parameter types
    #[serde(default)]
    pub params: Vec<String>,

    /// `private` or `protected`
    #[serde(default)]
    pub modifiers: Vec<MemberModifierSpec>,
}

/// One listed method
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MethodSpec {
    /// Method name
    pub name: String,

    /// Parameter types
    #[serde(default)]
    pub params: Vec<String>,

    /// Return type
    #[serde(default = "default_return")]
    pub returns: String,

    /// Modifiers
    #[serde(default)]
    pub modifiers: Vec<MemberModifierSpec>,

    /// Stub generation markers
    #[serde(default)]
    pub markers: Vec<MarkerSpec>,
}

fn default_return() -> String {
    "void".to_string()
}

impl Catalog {
    /// Load a catalog, choosing the format from the extension
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let content = match format.as_deref() {
            Some("toml") | Some("json") => std::fs::read_to_string(path)?,
            _ => return Err(CatalogError::UnsupportedFormat(path.to_path_buf())),
        };
        if format.as_deref() == Some("json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Parse a TOML catalog
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse a JSON catalog
    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Append another catalog's types
    pub fn merge(&mut self, other: Catalog) {
        self.types.extend(other.types);
    }

    /// Define every listed type, supertypes before subtypes
    pub fn install(&self, registry: &TypeRegistry) -> Result<Vec<TypeHandle>, CatalogError> {
        let listed: HashSet<&str> = self.types.iter().map(|t| t.name.as_str()).collect();
        for decl in &self.types {
            for sup in decl.supertypes() {
                if !listed.contains(sup) && !registry.contains(sup) {
                    return Err(CatalogError::UnknownSupertype {
                        type_name: decl.name.clone(),
                        supertype: sup.to_string(),
                    });
                }
            }
        }

        let mut pending: Vec<&TypeSpec> = self.types.iter().collect();
        let mut installed = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let (ready, blocked): (Vec<&TypeSpec>, Vec<&TypeSpec>) = pending
                .into_iter()
                .partition(|decl| decl.supertypes().all(|s| registry.contains(s)));
            if ready.is_empty() {
                let mut names: Vec<String> = blocked.iter().map(|s| s.name.clone()).collect();
                names.sort();
                return Err(CatalogError::Cycle(names));
            }
            for decl in ready {
                let handle = registry
                    .define(decl.to_builder())
                    .map_err(|source| CatalogError::Define {
                        type_name: decl.name.clone(),
                        source,
                    })?;
                tracing::debug!(type_name = %decl.name, "installed catalog type");
                installed.push(handle);
            }
            pending = blocked;
        }
        Ok(installed)
    }
}

impl TypeSpec {
    fn supertypes(&self) -> impl Iterator<Item = &str> {
        self.extends
            .iter()
            .map(String::as_str)
            .chain(self.implements.iter().map(String::as_str))
    }

    /// Builder for this definition
    pub fn to_builder(&self) -> TypeBuilder {
        let mut builder = match self.kind {
            KindSpec::Class => {
                TypeBuilder::class(&self.name).extends(self.extends.as_deref().unwrap_or(ROOT_TYPE))
            }
            KindSpec::Interface => TypeBuilder::interface(&self.name),
        };
        for iface in &self.implements {
            builder = builder.implements(iface);
        }
        for param in &self.type_params {
            builder = builder.type_param(param);
        }
        for modifier in &self.modifiers {
            builder = match modifier {
                TypeModifierSpec::Final => builder.as_final(),
                TypeModifierSpec::Abstract => builder.as_abstract(),
            };
        }
        for ctor in &self.constructors {
            let params: Vec<&str> = ctor.params.iter().map(String::as_str).collect();
            builder = builder.constructor(
                ConstructorBuilder::new(&params).visibility(visibility(&ctor.modifiers)),
            );
        }
        for method in &self.methods {
            builder = builder.method(method.to_builder());
        }
        builder
    }
}

impl MethodSpec {
    fn to_builder(&self) -> MethodBuilder {
        let mut builder = MethodBuilder::new(&self.name)
            .returns(&self.returns)
            .visibility(visibility(&self.modifiers));
        for param in &self.params {
            builder = builder.param(param);
        }
        for modifier in &self.modifiers {
            builder = match modifier {
                MemberModifierSpec::Static => builder.as_static(),
                MemberModifierSpec::Final => builder.as_final(),
                MemberModifierSpec::Abstract => builder.as_abstract(),
                MemberModifierSpec::Private | MemberModifierSpec::Protected => builder,
            };
        }
        for marker in &self.markers {
            builder = match marker {
                MarkerSpec::Cache => builder.cached(),
                MarkerSpec::ReturnSelf => builder.returns_self(),
            };
        }
        builder
    }
}

fn visibility(modifiers: &[MemberModifierSpec]) -> Visibility {
    if modifiers.contains(&MemberModifierSpec::Private) {
        Visibility::Private
    } else if modifiers.contains(&MemberModifierSpec::Protected) {
        Visibility::Protected
    } else {
        Visibility::Public
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::TypeKind;

    const BANK: &str = r#"
[[type]]
name = "acme.Account"
implements = ["acme.Audited"]

[[type.constructor]]
params = []

[[type.constructor]]
params = ["String", "double"]

[[type.method]]
name = "balance"
returns = "double"
markers = ["cache"]

[[type.method]]
name = "id"
returns = "long"
modifiers = ["final"]

[[type.method]]
name = "audit"
returns = "String"

[[type]]
name = "acme.Audited"
kind = "interface"

[[type.method]]
name = "audit"
returns = "String"
"#;

    #[test]
    fn test_parse_toml_catalog() {
        let catalog = Catalog::from_toml_str(BANK).unwrap();
        assert_eq!(catalog.types.len(), 2);
        let account = &catalog.types[0];
        assert_eq!(account.constructors.len(), 2);
        assert_eq!(account.methods[0].markers, vec![MarkerSpec::Cache]);
        assert_eq!(account.methods[1].modifiers, vec![MemberModifierSpec::Final]);
        assert_eq!(catalog.types[1].kind, KindSpec::Interface);
    }

    #[test]
    fn test_install_in_dependency_order() {
        let registry = TypeRegistry::new();
        let catalog = Catalog::from_toml_str(BANK).unwrap();
        let installed = catalog.install(&registry).unwrap();
        assert_eq!(installed[0].name(), "acme.Audited");
        let account = registry.get("acme.Account").unwrap();
        assert_eq!(account.kind(), TypeKind::Class);
        assert!(account.is_subtype_of("acme.Audited"));
        assert!(account.no_arg_constructor().is_some());
    }

    #[test]
    fn test_parse_json_catalog() {
        let json = r#"{
            "type": [
                { "name": "acme.Shape", "kind": "interface",
                  "method": [ { "name": "area", "returns": "double" } ] },
                { "name": "acme.Square", "implements": ["acme.Shape"],
                  "type-params": [],
                  "method": [ { "name": "area", "returns": "double" },
                              { "name": "scaled", "params": ["double"], "returns": "acme.Square", "markers": ["self"] } ] }
            ]
        }"#;
        let catalog = Catalog::from_json_str(json).unwrap();
        assert_eq!(catalog.types[1].methods[1].markers, vec![MarkerSpec::ReturnSelf]);
        let registry = TypeRegistry::new();
        catalog.install(&registry).unwrap();
        assert!(registry.contains("acme.Square"));
    }

    #[test]
    fn test_unknown_supertype() {
        let catalog = Catalog::from_toml_str(
            "[[type]]\nname = \"acme.Orphan\"\nextends = \"acme.Missing\"\n",
        )
        .unwrap();
        assert!(matches!(
            catalog.install(&TypeRegistry::new()),
            Err(CatalogError::UnknownSupertype { .. })
        ));
    }

    #[test]
    fn test_inheritance_cycle() {
        let toml = r#"
[[type]]
name = "acme.A"
extends = "acme.B"

[[type]]
name = "acme.B"
extends = "acme.A"
"#;
        let catalog = Catalog::from_toml_str(toml).unwrap();
        match catalog.install(&TypeRegistry::new()) {
            Err(CatalogError::Cycle(names)) => assert_eq!(names, vec!["acme.A", "acme.B"]),
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_from_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = dir.path().join("bank.toml");
        std::fs::write(&toml_path, BANK).unwrap();
        assert_eq!(Catalog::from_file(&toml_path).unwrap().types.len(), 2);

        let yaml_path = dir.path().join("bank.yaml");
        std::fs::write(&yaml_path, BANK).unwrap();
        assert!(matches!(
            Catalog::from_file(&yaml_path),
            Err(CatalogError::UnsupportedFormat(_))
        ));
    }
}
