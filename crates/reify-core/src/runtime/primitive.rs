//! Primitive types and their wrapper classes
//!
//! The host runtime keeps primitive values boxed inside [`Value`](super::Value);
//! this table links each primitive type name (`int`) to the wrapper class
//! (`Integer`) that a boxed value reports as its runtime type.

/// Primitive type kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `boolean`
    Boolean,
    /// `byte`
    Byte,
    /// `char`
    Char,
    /// `short`
    Short,
    /// `int`
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `void`
    Void,
}

impl Primitive {
    /// All primitive kinds, in declaration order
    pub const ALL: [Primitive; 9] = [
        Primitive::Boolean,
        Primitive::Byte,
        Primitive::Char,
        Primitive::Short,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
        Primitive::Void,
    ];

    /// Primitive type name
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Byte => "byte",
            Primitive::Char => "char",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
            Primitive::Void => "void",
        }
    }

    /// Wrapper class name (`None` for `void`)
    pub fn wrapper_name(self) -> Option<&'static str> {
        match self {
            Primitive::Boolean => Some("Boolean"),
            Primitive::Byte => Some("Byte"),
            Primitive::Char => Some("Character"),
            Primitive::Short => Some("Short"),
            Primitive::Int => Some("Integer"),
            Primitive::Long => Some("Long"),
            Primitive::Float => Some("Float"),
            Primitive::Double => Some("Double"),
            Primitive::Void => None,
        }
    }

    /// Look up a primitive by its type name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }

    /// Look up the primitive a wrapper class boxes
    pub fn from_wrapper(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.wrapper_name() == Some(name))
    }

    /// Whether a value of `self` converts to `target` without loss of range
    ///
    /// Identity counts as widening.
    pub fn widens_to(self, target: Primitive) -> bool {
        use Primitive::*;
        if self == target {
            return true;
        }
        matches!(
            (self, target),
            (Byte, Short | Int | Long | Float | Double)
                | (Short, Int | Long | Float | Double)
                | (Char, Int | Long | Float | Double)
                | (Int, Long | Float | Double)
                | (Long, Float | Double)
                | (Float, Double)
        )
    }
}

/// True if `name` is a primitive type name
pub fn is_primitive_name(name: &str) -> bool {
    Primitive::from_name(name).is_some()
}

/// True if `name` is one of the wrapper classes
pub fn is_wrapper_name(name: &str) -> bool {
    Primitive::from_wrapper(name).is_some()
}
