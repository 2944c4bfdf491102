//! Eligible operation discovery
//!
//! Walks a target's class chain and interface graph and decides, per
//! signature, whether the generated stub intercepts it.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::runtime::{MethodHandle, Signature, TypeDef, TypeHandle, Visibility, DISPATCHER_INTERFACE};

/// Why an operation is not intercepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exclusion {
    /// Not bound to an instance
    Static,
    /// Cannot be overridden
    Final,
    /// Private or protected
    NotPublic(Visibility),
    /// `finalize()`
    Finalizer,
    /// `attachDispatcher(reify.Dispatcher)` or `getDispatcher()`
    DispatcherAccessor,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exclusion::Static => f.write_str("static"),
            Exclusion::Final => f.write_str("final"),
            Exclusion::NotPublic(Visibility::Private) => f.write_str("private"),
            Exclusion::NotPublic(_) => f.write_str("not public"),
            Exclusion::Finalizer => f.write_str("finalizer"),
            Exclusion::DispatcherAccessor => f.write_str("dispatcher accessor"),
        }
    }
}

/// Verdict for one examined operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Intercepted by the stub
    Eligible,
    /// Left to the inherited implementation
    Excluded(Exclusion),
}

/// One examined operation
#[derive(Debug, Clone)]
pub struct ExaminedMethod {
    /// Operation, attributed to its interface when one declares it
    pub method: MethodHandle,
    /// Decision
    pub verdict: Verdict,
}

impl ExaminedMethod {
    /// True if the stub intercepts this operation
    pub fn is_eligible(&self) -> bool {
        self.verdict == Verdict::Eligible
    }
}

/// Outcome of a selection: every examined operation with its verdict
#[derive(Debug, Clone)]
pub struct EligibilityReport {
    target: String,
    entries: Vec<ExaminedMethod>,
}

impl EligibilityReport {
    /// Name of the examined type
    pub fn target(&self) -> &str {
        &self.target
    }

    /// All examined operations, in discovery order
    pub fn entries(&self) -> &[ExaminedMethod] {
        &self.entries
    }

    /// Eligible operations, in discovery order
    pub fn eligible(&self) -> impl Iterator<Item = &MethodHandle> {
        self.entries
            .iter()
            .filter(|e| e.is_eligible())
            .map(|e| &e.method)
    }

    /// Number of eligible operations
    pub fn eligible_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_eligible()).count()
    }

    /// Number of examined operations
    pub fn examined_count(&self) -> usize {
        self.entries.len()
    }

    /// Find the entry for a signature
    pub fn entry(&self, signature: &Signature) -> Option<&ExaminedMethod> {
        self.entries.iter().find(|e| &e.method.signature == signature)
    }

    /// `N reified out of M`
    pub fn summary(&self) -> String {
        format!(
            "{} reified out of {}",
            self.eligible_count(),
            self.examined_count()
        )
    }
}

impl fmt::Display for EligibilityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.target, self.summary())?;
        for entry in &self.entries {
            match entry.verdict {
                Verdict::Eligible => writeln!(f, "  YES {}", entry.method.qualified())?,
                Verdict::Excluded(why) => {
                    writeln!(f, "  NO  {} ({})", entry.method.qualified(), why)?
                }
            }
        }
        Ok(())
    }
}

/// Decide interception for every operation visible on `target`
///
/// For classes the chain is walked from `target` to the root; the first
/// (most derived) declaration of a signature wins. Operations declared by any
/// transitively implemented interface then take over matching eligible
/// entries in place, and interface-only signatures are appended. Excluded
/// class entries stay excluded.
pub fn select(target: &TypeDef) -> EligibilityReport {
    let mut entries: Vec<ExaminedMethod> = Vec::new();
    let mut index: FxHashMap<Signature, usize> = FxHashMap::default();

    let mut interfaces: Vec<TypeHandle> = Vec::new();
    let mut visited: FxHashSet<String> = FxHashSet::default();

    if target.is_interface() {
        for method in target.declared_methods() {
            record(&mut entries, &mut index, method);
        }
        for iface in target.interfaces() {
            collect_interfaces(iface, &mut interfaces, &mut visited);
        }
        for iface in &interfaces {
            for method in iface.declared_methods() {
                record(&mut entries, &mut index, method);
            }
        }
    } else {
        for iface in target.interfaces() {
            collect_interfaces(iface, &mut interfaces, &mut visited);
        }
        for method in target.declared_methods() {
            record(&mut entries, &mut index, method);
        }
        let mut current = target.superclass().cloned();
        while let Some(class) = current {
            for method in class.declared_methods() {
                record(&mut entries, &mut index, method);
            }
            for iface in class.interfaces() {
                collect_interfaces(iface, &mut interfaces, &mut visited);
            }
            current = class.superclass().cloned();
        }

        let mut replaced: FxHashSet<Signature> = FxHashSet::default();
        for iface in &interfaces {
            for method in iface.declared_methods() {
                match index.get(&method.signature) {
                    Some(&i) => {
                        if entries[i].is_eligible() && replaced.insert(method.signature.clone()) {
                            entries[i] = examine(method);
                        }
                    }
                    None => {
                        replaced.insert(method.signature.clone());
                        record(&mut entries, &mut index, method);
                    }
                }
            }
        }
    }

    let report = EligibilityReport {
        target: target.name().to_string(),
        entries,
    };
    tracing::debug!(target_type = target.name(), "{}", report.summary());
    report
}

fn record(
    entries: &mut Vec<ExaminedMethod>,
    index: &mut FxHashMap<Signature, usize>,
    method: &MethodHandle,
) {
    if index.contains_key(&method.signature) {
        return;
    }
    index.insert(method.signature.clone(), entries.len());
    entries.push(examine(method));
}

fn examine(method: &MethodHandle) -> ExaminedMethod {
    ExaminedMethod {
        method: method.clone(),
        verdict: match exclusion(method) {
            Some(why) => Verdict::Excluded(why),
            None => Verdict::Eligible,
        },
    }
}

fn exclusion(method: &MethodHandle) -> Option<Exclusion> {
    let m = &method.modifiers;
    let sig = &method.signature;
    if m.is_static {
        Some(Exclusion::Static)
    } else if sig.name == "finalize" && sig.params.is_empty() {
        Some(Exclusion::Finalizer)
    } else if (sig.name == "attachDispatcher" && sig.params == [DISPATCHER_INTERFACE])
        || (sig.name == "getDispatcher" && sig.params.is_empty())
    {
        Some(Exclusion::DispatcherAccessor)
    } else if m.is_final {
        Some(Exclusion::Final)
    } else if m.visibility != Visibility::Public {
        Some(Exclusion::NotPublic(m.visibility))
    } else {
        None
    }
}

/// Depth-first, each interface once, declaration order
fn collect_interfaces(
    iface: &TypeHandle,
    out: &mut Vec<TypeHandle>,
    visited: &mut FxHashSet<String>,
) {
    if !visited.insert(iface.name().to_string()) {
        return;
    }
    out.push(iface.clone());
    for parent in iface.interfaces() {
        collect_interfaces(parent, out, visited);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MethodBuilder, TypeBuilder, TypeRegistry};

    fn registry() -> TypeRegistry {
        let registry = TypeRegistry::new();
        registry
            .define(
                TypeBuilder::interface("acme.Audited")
                    .method(MethodBuilder::new("audit").returns("String")),
            )
            .unwrap();
        registry
            .define(
                TypeBuilder::interface("acme.Ledger")
                    .implements("acme.Audited")
                    .method(MethodBuilder::new("balance").returns("double")),
            )
            .unwrap();
        registry
            .define(
                TypeBuilder::class("acme.Base")
                    .method(MethodBuilder::new("id").returns("long").as_final())
                    .method(MethodBuilder::new("describe").returns("String"))
                    .method(MethodBuilder::new("create").returns("acme.Base").as_static())
                    .method(
                        MethodBuilder::new("secret")
                            .returns("int")
                            .visibility(Visibility::Private),
                    ),
            )
            .unwrap();
        registry
            .define(
                TypeBuilder::class("acme.Account")
                    .extends("acme.Base")
                    .implements("acme.Ledger")
                    .method(MethodBuilder::new("balance").returns("double"))
                    .method(MethodBuilder::new("audit").returns("String"))
                    .method(MethodBuilder::new("describe").returns("String"))
                    .method(MethodBuilder::new("deposit").param("double")),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_exclusions() {
        let registry = registry();
        let report = select(&registry.get("acme.Account").unwrap());
        let verdict = |name: &str| {
            report
                .entries()
                .iter()
                .find(|e| e.method.name() == name)
                .map(|e| e.verdict)
                .unwrap()
        };
        assert_eq!(verdict("id"), Verdict::Excluded(Exclusion::Final));
        assert_eq!(verdict("create"), Verdict::Excluded(Exclusion::Static));
        assert_eq!(
            verdict("secret"),
            Verdict::Excluded(Exclusion::NotPublic(Visibility::Private))
        );
        assert_eq!(verdict("finalize"), Verdict::Excluded(Exclusion::Finalizer));
        assert_eq!(verdict("deposit"), Verdict::Eligible);
        assert_eq!(verdict("toString"), Verdict::Eligible);
    }

    #[test]
    fn test_interface_declaration_takes_over() {
        let registry = registry();
        let report = select(&registry.get("acme.Account").unwrap());
        let balance: Vec<_> = report
            .entries()
            .iter()
            .filter(|e| e.method.name() == "balance")
            .collect();
        assert_eq!(balance.len(), 1);
        assert_eq!(balance[0].method.declaring_type, "acme.Ledger");

        let audit = report.entry(&Signature::new("audit", &[])).unwrap();
        assert_eq!(audit.method.declaring_type, "acme.Audited");

        let describe = report.entry(&Signature::new("describe", &[])).unwrap();
        assert_eq!(describe.method.declaring_type, "acme.Account");
    }

    #[test]
    fn test_interface_target_unions_inherited_operations() {
        let registry = registry();
        let report = select(&registry.get("acme.Ledger").unwrap());
        let names: Vec<_> = report.eligible().map(|m| m.name().to_string()).collect();
        assert_eq!(names, vec!["balance".to_string(), "audit".to_string()]);
        assert_eq!(report.summary(), "2 reified out of 2");
    }

    #[test]
    fn test_final_class_entry_not_revived_by_interface() {
        let registry = registry();
        registry
            .define(
                TypeBuilder::interface("acme.Identified")
                    .method(MethodBuilder::new("id").returns("long")),
            )
            .unwrap();
        registry
            .define(
                TypeBuilder::class("acme.Tagged")
                    .extends("acme.Base")
                    .implements("acme.Identified"),
            )
            .unwrap();
        let report = select(&registry.get("acme.Tagged").unwrap());
        let id = report.entry(&Signature::new("id", &[])).unwrap();
        assert_eq!(id.verdict, Verdict::Excluded(Exclusion::Final));
        assert_eq!(id.method.declaring_type, "acme.Base");
    }

    #[test]
    fn test_dispatcher_accessors_excluded() {
        let registry = TypeRegistry::new();
        registry
            .define(
                TypeBuilder::interface("acme.Remote")
                    .implements(crate::runtime::STUB_OBJECT_INTERFACE)
                    .method(MethodBuilder::new("ping")),
            )
            .unwrap();
        let report = select(&registry.get("acme.Remote").unwrap());
        assert_eq!(report.eligible_count(), 1);
        assert_eq!(report.examined_count(), 3);
        let rendered = report.to_string();
        assert!(rendered.contains("NO  reify.StubObject.getDispatcher() (dispatcher accessor)"));
    }
}
