//! Tagged values stored in pool slots
//!
//! A value slot holds exactly one `Value`. Composite values (objects and arrays) keep their
//! children in an AVL tree whose root index is the payload. Object keys are interned symbols
//! offset by one, array keys are element indices offset by one, so key 0 never occurs.

use crate::pool::TreeRef;

/// Key stored in a tree node
pub type TreeKey = u16;

/// Symbol produced by an interner for a property name
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(pub u16);

impl Symbol {
    /// Largest symbol that still fits in a tree key after the +1 offset
    pub const MAX: Symbol = Symbol(u16::MAX - 1);

    /// The tree key used for this symbol, if it fits
    #[inline]
    pub fn to_key(self) -> Option<TreeKey> {
        self.0.checked_add(1)
    }

    /// Inverse of `to_key`
    #[inline]
    pub fn from_key(key: TreeKey) -> Option<Symbol> {
        key.checked_sub(1).map(Symbol)
    }
}

/// Opaque handle to string bytes owned by the runtime's text table.
///
/// The heap never dereferences it; it is handed back through `GcContext::released` when the
/// string value is reclaimed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextRef(pub u16);

/// Index of a native action handler in the runtime's dispatch table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FunctionId(pub u16);

/// Index of a registered thing record
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThingId(pub u8);

/// Index of a registered proxy record
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProxyId(pub u8);

/// Discriminant of a slot's payload. `Unused` marks a free slot and is never the tag of a
/// live value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    Unused = 0,
    Object,
    Array,
    String,
    UnsignedInt,
    SignedInt,
    Float,
    Boolean,
    Null,
    Function,
    Proxy,
    Thing,
}

impl Tag {
    /// Objects and arrays own a child tree and may be shared, everything else is a leaf
    #[inline]
    pub fn is_composite(self) -> bool {
        matches!(self, Tag::Object | Tag::Array)
    }
}

/// The payload of a value slot
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Object(Option<TreeRef>),
    Array(Option<TreeRef>),
    String(TextRef),
    UnsignedInt(u32),
    SignedInt(i32),
    Float(f32),
    Boolean(bool),
    Null,
    Function(FunctionId),
    Proxy(ProxyId),
    Thing(ThingId),
}

impl Value {
    pub fn tag(&self) -> Tag {
        match self {
            Value::Object(_) => Tag::Object,
            Value::Array(_) => Tag::Array,
            Value::String(_) => Tag::String,
            Value::UnsignedInt(_) => Tag::UnsignedInt,
            Value::SignedInt(_) => Tag::SignedInt,
            Value::Float(_) => Tag::Float,
            Value::Boolean(_) => Tag::Boolean,
            Value::Null => Tag::Null,
            Value::Function(_) => Tag::Function,
            Value::Proxy(_) => Tag::Proxy,
            Value::Thing(_) => Tag::Thing,
        }
    }

    #[inline]
    pub fn is_composite(&self) -> bool {
        self.tag().is_composite()
    }

    /// Root of the child tree for objects and arrays
    #[inline]
    pub fn child_root(&self) -> Option<TreeRef> {
        match self {
            Value::Object(root) | Value::Array(root) => *root,
            _ => None,
        }
    }

    /// Numeric payload widened to f64, for any of the three number tags
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::UnsignedInt(n) => Some(n as f64),
            Value::SignedInt(n) => Some(n as f64),
            Value::Float(x) => Some(x as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_key_offset() {
        assert_eq!(Symbol(0).to_key(), Some(1));
        assert_eq!(Symbol::from_key(1), Some(Symbol(0)));
        assert_eq!(Symbol::from_key(0), None);
        assert_eq!(Symbol::MAX.to_key(), Some(u16::MAX));
        assert_eq!(Symbol(u16::MAX).to_key(), None);
    }

    #[test]
    fn test_composite_tags() {
        assert!(Value::Object(None).is_composite());
        assert!(Value::Array(None).is_composite());
        assert!(!Value::Thing(ThingId(0)).is_composite());
        assert!(!Value::Null.is_composite());
        assert!(!Tag::Unused.is_composite());
    }

    #[test]
    fn test_numeric_widening() {
        assert_eq!(Value::SignedInt(-3).as_f64(), Some(-3.0));
        assert_eq!(Value::UnsignedInt(7).as_f64(), Some(7.0));
        assert_eq!(Value::Boolean(true).as_f64(), None);
    }
}
