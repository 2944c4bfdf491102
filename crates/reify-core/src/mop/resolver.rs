//! Constructor and overload resolution
//!
//! Picks the most specific candidate whose parameters accept the actual
//! argument types. Ties are reported, never guessed.

use std::fmt;

use crate::error::{ReifyError, ReifyResult, ResolutionError};
use crate::runtime::{
    ConstructorHandle, MethodHandle, Primitive, TypeDef, TypeRegistry, Visibility, ROOT_TYPE,
};

/// Resolves overloaded constructors and methods against runtime types
pub struct Resolver<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> Resolver<'a> {
    /// Resolver over the given registry
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    /// Whether an argument of runtime type `actual` fits parameter `formal`
    ///
    /// An unknown actual (`None`, a null argument) fits any reference formal
    /// and never a primitive one. A primitive formal accepts its wrapper and
    /// wrappers of primitives that widen to it.
    pub fn accepts(&self, formal: &str, actual: Option<&str>) -> bool {
        let formal_prim = Primitive::from_name(formal);
        match (formal_prim, actual) {
            (Some(_), None) => false,
            (None, None) => true,
            (Some(p), Some(a)) => Primitive::from_wrapper(a)
                .or_else(|| Primitive::from_name(a))
                .map_or(false, |q| q != Primitive::Void && q.widens_to(p)),
            (None, Some(a)) => self.registry.is_assignable(formal, a),
        }
    }

    /// True if formal `a` is at least as specific as formal `b`
    ///
    /// A primitive formal beats any reference formal that takes its wrapper.
    fn at_least_as_specific(&self, a: &str, b: &str) -> bool {
        if a == b || self.registry.is_assignable(b, a) {
            return true;
        }
        match (Primitive::from_name(a), Primitive::from_name(b)) {
            (Some(pa), Some(pb)) => pa.widens_to(pb),
            (Some(pa), None) => pa
                .wrapper_name()
                .map_or(false, |w| self.registry.is_assignable(b, w)),
            _ => false,
        }
    }

    fn more_specific(&self, a: &[String], b: &[String]) -> bool {
        a.iter()
            .zip(b)
            .all(|(x, y)| self.at_least_as_specific(x, y))
            && a.iter().zip(b).any(|(x, y)| x != y)
    }

    /// Shared most-specific selection
    ///
    /// `params` yields the (erased) formal types of a candidate.
    pub fn select<T, F>(
        &self,
        type_name: &str,
        candidates: Vec<T>,
        params: F,
        args: &[Option<String>],
    ) -> Result<T, ResolutionError>
    where
        T: fmt::Display,
        F: Fn(&T) -> Vec<String>,
    {
        let applicable: Vec<(T, Vec<String>)> = candidates
            .into_iter()
            .map(|c| {
                let p = params(&c);
                (c, p)
            })
            .filter(|(_, formals)| {
                formals.len() == args.len()
                    && formals
                        .iter()
                        .zip(args)
                        .all(|(f, a)| self.accepts(f, a.as_deref()))
            })
            .collect();

        if applicable.is_empty() {
            return Err(ResolutionError::NoMatch {
                type_name: type_name.to_string(),
                args: args.to_vec(),
            });
        }

        let maximal: Vec<usize> = (0..applicable.len())
            .filter(|&i| {
                !applicable
                    .iter()
                    .enumerate()
                    .any(|(j, other)| j != i && self.more_specific(&other.1, &applicable[i].1))
            })
            .collect();

        if maximal.len() == 1 {
            let winner = maximal[0];
            return applicable
                .into_iter()
                .nth(winner)
                .map(|(c, _)| c)
                .ok_or_else(|| ResolutionError::NoMatch {
                    type_name: type_name.to_string(),
                    args: args.to_vec(),
                });
        }

        let candidates = maximal
            .iter()
            .map(|&i| applicable[i].0.to_string())
            .collect();
        Err(ResolutionError::Ambiguous {
            type_name: type_name.to_string(),
            candidates,
        })
    }

    /// Most specific public constructor of `class` for the actual types
    pub fn resolve_constructor(
        &self,
        class: &TypeDef,
        args: &[Option<String>],
    ) -> Result<ConstructorHandle, ResolutionError> {
        let candidates: Vec<ConstructorHandle> = class
            .constructors()
            .iter()
            .filter(|c| c.visibility == Visibility::Public)
            .cloned()
            .collect();
        self.select(class.name(), candidates, |c| c.params.clone(), args)
    }

    /// Most specific public instance method `name` visible on `class`
    ///
    /// Type-variable parameters are erased to the root type.
    pub fn resolve_method(
        &self,
        class: &TypeDef,
        name: &str,
        args: &[Option<String>],
    ) -> ReifyResult<MethodHandle> {
        let mut candidates: Vec<MethodHandle> = class
            .vtable()
            .filter(|(sig, entry)| {
                sig.name == name && entry.method.is_public() && !entry.method.modifiers.is_static
            })
            .map(|(_, entry)| entry.method.clone())
            .collect();
        if candidates.is_empty() {
            return Err(ReifyError::NoSuchMethod {
                type_name: class.name().to_string(),
                method: name.to_string(),
            });
        }
        candidates.sort_by(|a, b| a.signature.cmp(&b.signature));
        let qualified = format!("{}.{}", class.name(), name);
        let method = self.select(&qualified, candidates, |m| self.erased_params(m), args)?;
        Ok(method)
    }

    /// Parameter types with the declaring type's type variables erased
    pub fn erased_params(&self, method: &MethodHandle) -> Vec<String> {
        let type_vars = self
            .registry
            .get(&method.declaring_type)
            .map(|t| t.type_params().to_vec())
            .unwrap_or_default();
        method
            .params()
            .iter()
            .map(|p| {
                if type_vars.iter().any(|v| v == p) {
                    ROOT_TYPE.to_string()
                } else {
                    p.clone()
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ConstructorBuilder, MethodBuilder, TypeBuilder};

    fn args(types: &[Option<&str>]) -> Vec<Option<String>> {
        types.iter().map(|t| t.map(str::to_string)).collect()
    }

    #[test]
    fn test_string_beats_object() {
        let registry = TypeRegistry::new();
        let class = registry
            .define(
                TypeBuilder::class("acme.Label")
                    .constructor(ConstructorBuilder::new(&["String"]))
                    .constructor(ConstructorBuilder::new(&["Object"])),
            )
            .unwrap();
        let resolver = Resolver::new(&registry);
        let ctor = resolver
            .resolve_constructor(&class, &args(&[Some("String")]))
            .unwrap();
        assert_eq!(ctor.params, vec!["String".to_string()]);

        let ctor = resolver
            .resolve_constructor(&class, &args(&[Some("Integer")]))
            .unwrap();
        assert_eq!(ctor.params, vec!["Object".to_string()]);
    }

    #[test]
    fn test_no_match() {
        let registry = TypeRegistry::new();
        let class = registry
            .define(
                TypeBuilder::class("acme.Label")
                    .constructor(ConstructorBuilder::new(&["String"]))
                    .constructor(ConstructorBuilder::new(&["Integer"])),
            )
            .unwrap();
        let err = Resolver::new(&registry)
            .resolve_constructor(&class, &args(&[Some("Double")]))
            .unwrap_err();
        assert!(matches!(err, ResolutionError::NoMatch { .. }));
    }

    #[test]
    fn test_unrelated_interfaces_are_ambiguous() {
        let registry = TypeRegistry::new();
        registry.define(TypeBuilder::interface("acme.Readable")).unwrap();
        registry.define(TypeBuilder::interface("acme.Closeable")).unwrap();
        registry
            .define(
                TypeBuilder::class("acme.Pipe")
                    .implements("acme.Readable")
                    .implements("acme.Closeable"),
            )
            .unwrap();
        let class = registry
            .define(
                TypeBuilder::class("acme.Sink")
                    .constructor(ConstructorBuilder::new(&["acme.Readable"]))
                    .constructor(ConstructorBuilder::new(&["acme.Closeable"])),
            )
            .unwrap();
        match Resolver::new(&registry).resolve_constructor(&class, &args(&[Some("acme.Pipe")])) {
            Err(ResolutionError::Ambiguous { candidates, .. }) => {
                assert_eq!(candidates.len(), 2);
                assert!(candidates.contains(&"acme.Sink(acme.Readable)".to_string()));
                assert!(candidates.contains(&"acme.Sink(acme.Closeable)".to_string()));
            }
            other => panic!("expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_primitive_widening_and_null() {
        let registry = TypeRegistry::new();
        let resolver = Resolver::new(&registry);
        assert!(resolver.accepts("long", Some("Integer")));
        assert!(resolver.accepts("double", Some("Character")));
        assert!(resolver.accepts("int", Some("int")));
        assert!(!resolver.accepts("int", Some("Long")));
        assert!(!resolver.accepts("int", None));
        assert!(resolver.accepts("String", None));
        assert!(!resolver.accepts("int", Some("String")));
    }

    #[test]
    fn test_int_preferred_over_long() {
        let registry = TypeRegistry::new();
        let class = registry
            .define(
                TypeBuilder::class("acme.Slot")
                    .constructor(ConstructorBuilder::new(&["long"]))
                    .constructor(ConstructorBuilder::new(&["int"])),
            )
            .unwrap();
        let ctor = Resolver::new(&registry)
            .resolve_constructor(&class, &args(&[Some("Short")]))
            .unwrap();
        assert_eq!(ctor.params, vec!["int".to_string()]);
    }

    #[test]
    fn test_primitive_beats_reference_taking_its_wrapper() {
        let registry = TypeRegistry::new();
        let cell = registry
            .define(
                TypeBuilder::class("acme.Cell")
                    .constructor(ConstructorBuilder::new(&["int"]))
                    .constructor(ConstructorBuilder::new(&["Object"])),
            )
            .unwrap();
        let boxed = registry
            .define(
                TypeBuilder::class("acme.Cell2")
                    .constructor(ConstructorBuilder::new(&["int"]))
                    .constructor(ConstructorBuilder::new(&["Integer"])),
            )
            .unwrap();
        let resolver = Resolver::new(&registry);
        for class in [&cell, &boxed] {
            let ctor = resolver
                .resolve_constructor(class, &args(&[Some("Integer")]))
                .unwrap();
            assert_eq!(ctor.params, vec!["int".to_string()]);
        }

        // a null still only fits the reference overload
        let ctor = resolver.resolve_constructor(&cell, &args(&[None])).unwrap();
        assert_eq!(ctor.params, vec!["Object".to_string()]);
        // Integer does not take a Short, widening to int does
        let ctor = resolver
            .resolve_constructor(&boxed, &args(&[Some("Short")]))
            .unwrap();
        assert_eq!(ctor.params, vec!["int".to_string()]);
    }

    #[test]
    fn test_private_constructors_ignored() {
        let registry = TypeRegistry::new();
        let class = registry
            .define(
                TypeBuilder::class("acme.Hidden").constructor(
                    ConstructorBuilder::new(&["String"]).visibility(Visibility::Private),
                ),
            )
            .unwrap();
        assert!(Resolver::new(&registry)
            .resolve_constructor(&class, &args(&[Some("String")]))
            .is_err());
    }

    #[test]
    fn test_resolve_method_overloads() {
        let registry = TypeRegistry::new();
        let class = registry
            .define(
                TypeBuilder::class("acme.Printer")
                    .type_param("T")
                    .method(MethodBuilder::new("print").param("String"))
                    .method(MethodBuilder::new("print").param("int"))
                    .method(MethodBuilder::new("store").param("T")),
            )
            .unwrap();
        let resolver = Resolver::new(&registry);
        let m = resolver
            .resolve_method(&class, "print", &args(&[Some("Integer")]))
            .unwrap();
        assert_eq!(m.params(), ["int".to_string()]);
        let m = resolver
            .resolve_method(&class, "store", &args(&[Some("acme.Printer")]))
            .unwrap();
        assert_eq!(m.name(), "store");
        assert!(matches!(
            resolver.resolve_method(&class, "missing", &[]),
            Err(ReifyError::NoSuchMethod { .. })
        ));
    }
}
