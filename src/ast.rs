//! This module defines the core value type shared by the reader, evaluator and
//! printer. The main enum, [`Value`], is a closed set of variants covering every
//! runtime datum, including code-as-data: a parsed program is just a `Value`
//! tree. Ergonomic helper functions such as [`val`], [`sym`], [`kw`] and
//! [`list`] are provided for convenient construction in code and tests, and
//! conversion traits make it easy to build Values from Rust literals, arrays
//! and vectors. Equality is structural, with the single cross-type rule that a
//! list and a vector with equal elements compare equal.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use crate::env::Env;
use crate::{Error, ensure_sufficient_stack};
use crate::evaluator::intooperation::OperationFn;

/// Type alias for integer values in the interpreter
pub(crate) type NumberType = i64;

/// Composite hash-map key: a discriminant plus its text.
///
/// Only keywords and strings can be keys; other values are rejected when the
/// key is built, so lookups never need to re-check.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Keyword(String),
    String(String),
}

impl TryFrom<&Value> for MapKey {
    type Error = Value;

    /// Returns the rejected value on failure so callers can report it
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Keyword(k) => Ok(MapKey::Keyword(k.clone())),
            Value::String(s) => Ok(MapKey::String(s.clone())),
            other => Err(other.clone()),
        }
    }
}

impl From<MapKey> for Value {
    fn from(key: MapKey) -> Self {
        match key {
            MapKey::Keyword(k) => Value::Keyword(k),
            MapKey::String(s) => Value::String(s),
        }
    }
}

/// Immutable, reference-counted payload of a collection value.
///
/// Cloning a collection shares its elements. Releasing the last handle to a
/// deeply nested tree happens on a grown stack.
pub struct Shared<T: Default>(Rc<T>);

impl<T: Default> Shared<T> {
    pub fn new(inner: T) -> Self {
        Shared(Rc::new(inner))
    }

    /// Whether both handles point at the same allocation
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }
}

impl<T: Default> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Shared(Rc::clone(&self.0))
    }
}

impl<T: Default> std::ops::Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: Default> Drop for Shared<T> {
    fn drop(&mut self) {
        if let Some(inner) = Rc::get_mut(&mut self.0) {
            let inner = std::mem::take(inner);
            ensure_sufficient_stack(move || drop(inner));
        }
    }
}

/// Callable values: native builtins and user-defined closures
pub enum Function {
    /// Native function, compared by `id`
    Builtin { id: String, func: Arc<OperationFn> },
    /// `fn*` closure over the scope it was created in
    Closure {
        params: Vec<Value>,
        body: Value,
        env: Env,
    },
}

impl std::fmt::Debug for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Function::Builtin { id, .. } => write!(f, "Builtin({id})"),
            Function::Closure { params, body, .. } => {
                write!(f, "Closure(params={params:?}, body={body:?})")
            }
        }
    }
}

/// Core value type in the interpreter
///
/// To build values, use the ergonomic helper functions:
/// - `val(42)` for integers, strings and booleans, `sym("name")` for symbols
/// - `kw("name")` for keywords, `list(...)` / `vector(...)` for sequences
/// - `val([1, 2, 3])` for homogeneous lists
#[derive(Clone)]
pub enum Value {
    /// Integers (the only numeric type)
    Integer(NumberType),
    /// Symbols (identifiers)
    Symbol(String),
    /// Keywords, stored without the leading `:`
    Keyword(String),
    /// String literals, already unescaped
    String(String),
    /// Boolean values
    Bool(bool),
    /// The nil value; distinct from the empty list
    Nil,
    /// Lists, evaluated as applications
    List(Shared<Vec<Value>>),
    /// Vectors, evaluated element-wise
    Vector(Shared<Vec<Value>>),
    /// Hash-maps with keyword or string keys
    Hashmap(Shared<BTreeMap<MapKey, Value>>),
    /// Builtins and closures
    Function(Rc<Function>),
    /// A `;` comment read at top level; prints as nothing
    Comment(String),
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn write_seq(
            f: &mut std::fmt::Formatter<'_>,
            name: &str,
            items: &[Value],
        ) -> std::fmt::Result {
            write!(f, "{name}(")?;
            for (i, v) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{v:?}")?;
            }
            write!(f, ")")
        }

        match self {
            Value::Integer(n) => write!(f, "Integer({n})"),
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::Keyword(k) => write!(f, "Keyword({k})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Nil => write!(f, "Nil"),
            Value::List(items) => write_seq(f, "List", items),
            Value::Vector(items) => write_seq(f, "Vector", items),
            Value::Hashmap(map) => f.debug_map().entries(map.iter()).finish(),
            Value::Function(func) => write!(f, "{func:?}"),
            Value::Comment(text) => write!(f, "Comment({text:?})"),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&crate::printer::print_str(self, true))
    }
}

// From trait implementations for Value - enables .into() conversion
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Integer(NumberType::from(n))
            }
        }
    };
}

impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(NumberType);
impl_from_integer!(u8);
impl_from_integer!(u16);
impl_from_integer!(u32);

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        list(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        list(arr.into_iter().map(Into::into).collect())
    }
}

// Fallible conversions from `Value` back into primitive Rust types.

impl TryFrom<Value> for NumberType {
    type Error = Error;

    fn try_from(value: Value) -> Result<NumberType, Error> {
        if let Value::Integer(n) = value {
            Ok(n)
        } else {
            Err(Error::TypeError(format!("expected integer, got {value}")))
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = Error;

    fn try_from(value: Value) -> Result<bool, Error> {
        if let Value::Bool(b) = value {
            Ok(b)
        } else {
            Err(Error::TypeError(format!("expected boolean, got {value}")))
        }
    }
}

/// Helper function for creating symbols
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating keywords (without the leading `:`)
pub fn kw<S: AsRef<str>>(name: S) -> Value {
    Value::Keyword(name.as_ref().to_owned())
}

/// Helper function for creating Values from anything convertible
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for creating nil values
pub fn nil() -> Value {
    Value::Nil
}

/// Helper for mixed-type lists
pub fn list(items: Vec<Value>) -> Value {
    Value::List(Shared::new(items))
}

/// Helper for mixed-type vectors
pub fn vector(items: Vec<Value>) -> Value {
    Value::Vector(Shared::new(items))
}

/// Helper for hash-maps
pub fn hashmap(entries: BTreeMap<MapKey, Value>) -> Value {
    Value::Hashmap(Shared::new(entries))
}

impl Value {
    /// Only `nil` and `false` are falsey
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Elements of a list or vector
    pub(crate) fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Vector(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Name of a symbol value
    pub(crate) fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(name) => Some(name),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            // Lists and vectors are interchangeable for equality; no other
            // cross-type pair is (nil is not the empty list)
            (
                Value::List(a) | Value::Vector(a),
                Value::List(b) | Value::Vector(b),
            ) => {
                Shared::ptr_eq(a, b) || ensure_sufficient_stack(|| a.as_slice() == b.as_slice())
            }
            (Value::Hashmap(a), Value::Hashmap(b)) => {
                Shared::ptr_eq(a, b) || ensure_sufficient_stack(|| **a == **b)
            }
            (Value::Function(a), Value::Function(b)) => match (a.as_ref(), b.as_ref()) {
                (Function::Builtin { id: id1, .. }, Function::Builtin { id: id2, .. }) => {
                    id1 == id2
                }
                (Function::Closure { .. }, Function::Closure { .. }) => Rc::ptr_eq(a, b),
                _ => false,
            },
            (Value::Comment(a), Value::Comment(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod helper_function_tests {
    use super::*;

    #[test]
    fn test_helper_functions_data_driven() {
        let test_cases = vec![
            (val(42), Value::Integer(42)),
            (val(-17), Value::Integer(-17)),
            (val(255u8), Value::Integer(255)),
            (val(-32768i16), Value::Integer(-32768)),
            (val(NumberType::MAX), Value::Integer(NumberType::MAX)),
            (val(true), Value::Bool(true)),
            (val("hello"), Value::String("hello".to_owned())),
            (sym("def!"), Value::Symbol("def!".to_owned())),
            (kw("key"), Value::Keyword("key".to_owned())),
            (
                val([1, 2, 3]),
                list(vec![Value::Integer(1), Value::Integer(2), Value::Integer(3)]),
            ),
            (
                vector(vec![sym("a"), val("b")]),
                Value::Vector(Shared::new(vec![
                    Value::Symbol("a".to_owned()),
                    Value::String("b".to_owned()),
                ])),
            ),
        ];

        for (i, (actual, expected)) in test_cases.iter().enumerate() {
            assert_eq!(actual, expected, "Test case {} failed", i + 1);
        }
    }

    #[test]
    fn test_structural_equality() {
        // list/vector cross-type equality
        assert_eq!(val([1, 2]), vector(vec![val(1), val(2)]));
        assert_eq!(
            list(vec![vector(vec![val(1)])]),
            vector(vec![list(vec![val(1)])])
        );
        assert_ne!(val([1, 2]), vector(vec![val(2), val(1)]));

        // nil and the empty list stay distinct
        assert_ne!(Value::Nil, list(vec![]));
        assert_ne!(Value::Nil, Value::Bool(false));
        assert_eq!(Value::Nil, Value::Nil);

        // no coercion between scalar kinds
        assert_ne!(kw("a"), val("a"));
        assert_ne!(sym("a"), val("a"));
        assert_ne!(val(0), val(false));

        let mut a = BTreeMap::new();
        a.insert(MapKey::Keyword("k".into()), val(1));
        let mut b = a.clone();
        assert_eq!(hashmap(a.clone()), hashmap(b.clone()));
        b.insert(MapKey::String("k".into()), val(1));
        assert_ne!(hashmap(a), hashmap(b));
    }

    #[test]
    fn test_map_key_construction() {
        assert_eq!(MapKey::try_from(&kw("a")), Ok(MapKey::Keyword("a".into())));
        assert_eq!(MapKey::try_from(&val("a")), Ok(MapKey::String("a".into())));
        assert_eq!(MapKey::try_from(&val(1)), Err(val(1)));
        assert_eq!(MapKey::try_from(&sym("a")), Err(sym("a")));

        // keywords and strings with the same text are different keys
        assert_ne!(MapKey::Keyword("a".into()), MapKey::String("a".into()));
        assert_eq!(Value::from(MapKey::Keyword("a".into())), kw("a"));
    }

    #[test]
    fn test_collections_share_elements() {
        let inner = list(vec![val(1), val(2)]);
        let outer = vector(vec![inner.clone(), inner.clone()]);
        let copy = outer.clone();

        let (Value::Vector(a), Value::Vector(b)) = (&outer, &copy) else {
            panic!("expected vectors");
        };
        assert!(Shared::ptr_eq(a, b));
        assert_eq!(outer, copy);

        // a tree far deeper than the native stack allows for recursive drop
        let mut deep = nil();
        for _ in 0..50_000 {
            deep = list(vec![deep]);
        }
        let alias = deep.clone();
        drop(deep);
        drop(alias);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!val(false).is_truthy());
        assert!(val(true).is_truthy());
        assert!(val(0).is_truthy());
        assert!(val("").is_truthy());
        assert!(list(vec![]).is_truthy());
    }
}
