//! Stub name codec
//!
//! Maps a [`TargetType`] to the name its stub is registered under, and back.
//!
//! ## Format
//!
//! - stubs live under `reify.stub.`; parameterized stubs under
//!   `reify.stub.generic.`; the target's package follows verbatim
//! - the simple name is `_Stub` followed by the escaped target simple name
//! - generic parameters follow `_Generics`, separated by `_D`
//! - inside escaped segments `_` is written `__` and `.` is written `_P`
//!
//! ```text
//! acme.Account           -> reify.stub.acme._StubAccount
//! acme.Box<String, a.B>  -> reify.stub.generic.acme._StubBox_GenericsString_Da_PB
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{ReifyError, ReifyResult};

/// Namespace every stub name starts with
pub const STUB_NAMESPACE: &str = "reify.stub.";

const GENERIC_SEGMENT: &str = "generic";
const ESCAPE: char = '_';
const STUB_MARKER: &str = "_Stub";
const GENERICS_MARKER: &str = "_Generics";

/// Identity of a reification target: qualified name plus generic parameters
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetType {
    name: String,
    generics: Vec<String>,
}

impl TargetType {
    /// Target with generic parameters
    pub fn new<S: AsRef<str>>(name: impl Into<String>, generics: &[S]) -> Self {
        Self {
            name: name.into(),
            generics: generics.iter().map(|g| g.as_ref().to_string()).collect(),
        }
    }

    /// Target without generic parameters
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            generics: Vec::new(),
        }
    }

    /// Qualified type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Generic parameter names, in order
    pub fn generics(&self) -> &[String] {
        &self.generics
    }

    /// True if generic parameters are present
    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }

    fn split_name(&self) -> (&str, &str) {
        match self.name.rfind('.') {
            Some(idx) => (&self.name[..idx], &self.name[idx + 1..]),
            None => ("", &self.name),
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.is_generic() {
            write!(f, "<{}>", self.generics.join(", "))?;
        }
        Ok(())
    }
}

impl FromStr for TargetType {
    type Err = ReifyError;

    /// Parse `pkg.Name` or `pkg.Name<A, b.C>`; nested generics are rejected
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, generics) = match s.find('<') {
            None => (s, Vec::new()),
            Some(open) => {
                let inner = s[open + 1..]
                    .strip_suffix('>')
                    .ok_or_else(|| ReifyError::format(s, "unterminated generic parameter list"))?;
                if inner.contains('<') || inner.contains('>') {
                    return Err(ReifyError::format(s, "nested generic parameters are not supported"));
                }
                let generics = inner
                    .split(',')
                    .map(|g| g.trim().to_string())
                    .collect::<Vec<_>>();
                if generics.iter().any(String::is_empty) {
                    return Err(ReifyError::format(s, "empty generic parameter"));
                }
                (s[..open].trim(), generics)
            }
        };
        if name.is_empty() || name.contains('>') || name.split('.').any(str::is_empty) {
            return Err(ReifyError::format(s, "invalid type name"));
        }
        Ok(TargetType {
            name: name.to_string(),
            generics,
        })
    }
}

/// Stub name for a target
pub fn encode(target: &TargetType) -> String {
    let (package, simple) = target.split_name();
    let mut out = String::with_capacity(STUB_NAMESPACE.len() + target.name.len() + 16);
    out.push_str(STUB_NAMESPACE);
    if target.is_generic() {
        out.push_str(GENERIC_SEGMENT);
        out.push('.');
    }
    if !package.is_empty() {
        out.push_str(package);
        out.push('.');
    }
    out.push_str(STUB_MARKER);
    escape_into(simple, &mut out);
    if target.is_generic() {
        out.push_str(GENERICS_MARKER);
        for (i, g) in target.generics.iter().enumerate() {
            if i > 0 {
                out.push_str("_D");
            }
            escape_into(g, &mut out);
        }
    }
    out
}

/// True if `name` lies in the stub namespace
pub fn is_stub_name(name: &str) -> bool {
    name.starts_with(STUB_NAMESPACE)
}

/// Target a stub name was produced from
pub fn decode(stub_name: &str) -> ReifyResult<TargetType> {
    let rest = stub_name
        .strip_prefix(STUB_NAMESPACE)
        .ok_or_else(|| ReifyError::format(stub_name, "not in the stub namespace"))?;
    let (package, simple) = match rest.rfind('.') {
        Some(idx) => (&rest[..idx], &rest[idx + 1..]),
        None => ("", rest),
    };
    let encoded = simple
        .strip_prefix(STUB_MARKER)
        .ok_or_else(|| ReifyError::format(stub_name, "missing _Stub marker"))?;

    let mut base = String::new();
    let mut generics: Option<Vec<String>> = None;
    let mut chars = encoded.char_indices();
    while let Some((idx, c)) = chars.next() {
        if c != ESCAPE {
            push_current(&mut base, &mut generics, c);
            continue;
        }
        let Some((_, next)) = chars.next() else {
            return Err(ReifyError::format(stub_name, "dangling escape character"));
        };
        match next {
            '_' => push_current(&mut base, &mut generics, '_'),
            'P' => {
                if generics.is_none() {
                    return Err(ReifyError::format(
                        stub_name,
                        "package separator escape in simple name",
                    ));
                }
                push_current(&mut base, &mut generics, '.');
            }
            'D' => match generics.as_mut() {
                Some(list) => list.push(String::new()),
                None => {
                    return Err(ReifyError::format(
                        stub_name,
                        "generic separator before _Generics",
                    ))
                }
            },
            'G' if encoded[idx..].starts_with(GENERICS_MARKER) => {
                if generics.is_some() {
                    return Err(ReifyError::format(stub_name, "duplicated _Generics marker"));
                }
                generics = Some(vec![String::new()]);
                skip(&mut chars, GENERICS_MARKER.len() - 2);
            }
            'S' if encoded[idx..].starts_with(STUB_MARKER) => {
                return Err(ReifyError::format(stub_name, "duplicated _Stub marker"));
            }
            other => {
                return Err(ReifyError::format(
                    stub_name,
                    format!("unknown escape sequence _{}", other),
                ))
            }
        }
    }

    if base.is_empty() {
        return Err(ReifyError::format(stub_name, "empty type name"));
    }

    let (package, generics) = match generics {
        None => (package, Vec::new()),
        Some(list) => {
            let package = strip_generic_segment(package).ok_or_else(|| {
                ReifyError::format(stub_name, "_Generics outside the generic namespace")
            })?;
            if list.iter().any(String::is_empty) {
                return Err(ReifyError::format(stub_name, "empty generic parameter name"));
            }
            (package, list)
        }
    };

    let name = if package.is_empty() {
        base
    } else {
        format!("{}.{}", package, base)
    };
    Ok(TargetType { name, generics })
}

/// Generic parameter names carried by a stub name
pub fn generic_parameter_names(stub_name: &str) -> ReifyResult<Vec<String>> {
    decode(stub_name).map(|t| t.generics)
}

fn escape_into(segment: &str, out: &mut String) {
    for c in segment.chars() {
        match c {
            '_' => out.push_str("__"),
            '.' => out.push_str("_P"),
            other => out.push(other),
        }
    }
}

fn push_current(base: &mut String, generics: &mut Option<Vec<String>>, c: char) {
    match generics.as_mut().and_then(|list| list.last_mut()) {
        Some(current) => current.push(c),
        None => base.push(c),
    }
}

fn skip<I: Iterator>(iter: &mut I, n: usize) {
    for _ in 0..n {
        iter.next();
    }
}

/// Package with the leading `generic` segment removed
fn strip_generic_segment(package: &str) -> Option<&str> {
    if package == GENERIC_SEGMENT {
        return Some("");
    }
    package
        .strip_prefix(GENERIC_SEGMENT)
        .and_then(|rest| rest.strip_prefix('.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_plain() {
        let t = TargetType::plain("acme.Account");
        assert_eq!(encode(&t), "reify.stub.acme._StubAccount");
    }

    #[test]
    fn test_encode_generic() {
        let t = TargetType::new("pkg.Box", &["String", "a.B"]);
        assert_eq!(
            encode(&t),
            "reify.stub.generic.pkg._StubBox_GenericsString_Da_PB"
        );
    }

    #[test]
    fn test_encode_escapes_underscores() {
        let t = TargetType::new("my_pkg.Snake_Case", &["x_y.Z"]);
        let name = encode(&t);
        assert_eq!(name, "reify.stub.generic.my_pkg._StubSnake__Case_Genericsx__y_PZ");
        assert_eq!(decode(&name).unwrap(), t);
    }

    #[test]
    fn test_round_trip() {
        let targets = [
            TargetType::plain("Account"),
            TargetType::plain("a.b.c.Deep"),
            TargetType::plain("generic.Tricky"),
            TargetType::new("Box", &["Integer"]),
            TargetType::new("generic.Box", &["generic.Thing", "_"]),
            TargetType::new("acme.Map", &["String", "acme.Value_Type"]),
        ];
        for t in targets {
            let name = encode(&t);
            assert!(is_stub_name(&name));
            assert_eq!(decode(&name).unwrap(), t, "round trip of {}", name);
        }
    }

    #[test]
    fn test_generic_and_plain_never_collide() {
        let plain = encode(&TargetType::plain("acme.Box"));
        let one = encode(&TargetType::new("acme.Box", &["String"]));
        let two = encode(&TargetType::new("acme.Box", &["Str", "ing"]));
        assert_ne!(plain, one);
        assert_ne!(one, two);
    }

    #[test]
    fn test_is_stub_name() {
        assert!(!is_stub_name("acme.Account"));
        assert!(!is_stub_name("reify.Dispatcher"));
        assert!(!is_stub_name("reify.stubs.Thing"));
    }

    #[test]
    fn test_generic_parameter_names() {
        let names =
            generic_parameter_names("reify.stub.generic.pkg._StubBox_GenericsString_Da_PB").unwrap();
        assert_eq!(names, vec!["String".to_string(), "a.B".to_string()]);
        assert!(generic_parameter_names("reify.stub.pkg._StubBox").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let bad = [
            "acme.Account",
            "reify.stub.acme.Account",
            "reify.stub.acme._StubAcc_Stubount",
            "reify.stub.acme._StubAcc_Xount",
            "reify.stub.acme._StubAccount_",
            "reify.stub.acme._StubBox_GenericsString",
            "reify.stub.generic.acme._StubBox_GenericsA_GenericsB",
            "reify.stub.generic.acme._StubBox_GenericsA_D",
            "reify.stub.generic.acme._StubBox_Generics",
            "reify.stub.acme._Stub",
            "reify.stub.acme._StubA_PB",
        ];
        for name in bad {
            assert!(
                matches!(decode(name), Err(ReifyError::Format { .. })),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_parse_target_type() {
        let t: TargetType = "acme.Box<String, a.B>".parse().unwrap();
        assert_eq!(t, TargetType::new("acme.Box", &["String", "a.B"]));
        assert_eq!(t.to_string(), "acme.Box<String, a.B>");

        let t: TargetType = " acme.Account ".parse().unwrap();
        assert!(!t.is_generic());

        assert!("acme.Box<List<String>>".parse::<TargetType>().is_err());
        assert!("acme.Box<String".parse::<TargetType>().is_err());
        assert!("acme.Box<>".parse::<TargetType>().is_err());
        assert!("acme..Box".parse::<TargetType>().is_err());
    }
}
