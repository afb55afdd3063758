use crate::Error;
use crate::ast::{NumberType, Value};
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::sync::Arc;

// Adapter layer that turns strongly-typed Rust functions into the erased
// `OperationFn` stored in `Function::Builtin`. Registration goes through
// `Env::register_builtin_operation` and friends or the static registry in
// `builtinops.rs`; nothing here touches scopes or evaluation.

/// Canonical erased builtin function type.
///
/// Builtins receive ownership of their argument vector so that they can
/// consume arguments without cloning.
pub type OperationFn = dyn Fn(Vec<Value>) -> Result<Value, Error> + Send + Sync;

// =====================================================================
// Fixed-position argument conversion
// =====================================================================

/// Turns one argument slot into a typed parameter.
///
/// `Param<'a>` is the type the builtin sees; it may borrow from the slot
/// (`&str`, sequence iterators) or take it by value (`Value`, `i64`).
pub trait FromParam {
    type Param<'a>;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error>;
}

impl FromParam for Value {
    type Param<'a> = Value;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        Ok(std::mem::replace(value, Value::Nil))
    }
}

// Scalars with a `TryFrom<Value>` impl in `ast.rs` (`i64`, `bool`)
impl<T> FromParam for T
where
    Value: TryInto<T, Error = Error>,
{
    type Param<'a> = T;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        std::mem::replace(value, Value::Nil).try_into()
    }
}

impl FromParam for &str {
    type Param<'a> = &'a str;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        if let Value::String(s) = value {
            Ok(s.as_str())
        } else {
            Err(Error::TypeError(format!("expected string, got {value}")))
        }
    }
}

/// A list or vector argument viewed as a typed iterator
impl<'b, K> FromParam for TypedValueIter<'b, K>
where
    K: ValueElementKind,
{
    type Param<'a> = TypedValueIter<'a, K>;

    fn from_arg<'a>(value: &'a mut Value) -> Result<Self::Param<'a>, Error> {
        match value {
            Value::List(items) | Value::Vector(items) => TypedValueIter::<K>::new(items),
            other => Err(Error::TypeError(format!("expected list or vector, got {other}"))),
        }
    }
}

// =====================================================================
// Typed iteration over value slices
// =====================================================================

/// How to view each element of a `Value` slice.
///
/// `precheck` validates the whole slice up front so that `project` never
/// sees an element of the wrong kind.
#[doc(hidden)]
pub trait ValueElementKind {
    type Item<'a>;

    fn precheck(slice: &[Value]) -> Result<(), Error>;
    fn project<'a>(v: &'a Value) -> Option<Self::Item<'a>>;
}

#[doc(hidden)]
pub struct TypedValueIter<'a, K: ValueElementKind> {
    inner: std::slice::Iter<'a, Value>,
    _marker: PhantomData<K>,
}

impl<'a, K> TypedValueIter<'a, K>
where
    K: ValueElementKind,
{
    pub(crate) fn new(values: &'a [Value]) -> Result<Self, Error> {
        K::precheck(values)?;
        Ok(TypedValueIter {
            inner: values.iter(),
            _marker: PhantomData,
        })
    }
}

impl<'a, K> Iterator for TypedValueIter<'a, K>
where
    K: ValueElementKind,
{
    type Item = K::Item<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().and_then(K::project)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K> ExactSizeIterator for TypedValueIter<'_, K> where K: ValueElementKind {}
impl<K> FusedIterator for TypedValueIter<'_, K> where K: ValueElementKind {}

#[doc(hidden)]
pub struct ValueKind;

impl ValueElementKind for ValueKind {
    type Item<'a> = &'a Value;

    fn precheck(_slice: &[Value]) -> Result<(), Error> {
        Ok(())
    }

    fn project<'a>(v: &'a Value) -> Option<Self::Item<'a>> {
        Some(v)
    }
}

#[doc(hidden)]
pub struct NumberKind;

impl ValueElementKind for NumberKind {
    type Item<'a> = NumberType;

    fn precheck(slice: &[Value]) -> Result<(), Error> {
        match slice.iter().find(|v| !matches!(v, Value::Integer(_))) {
            Some(bad) => Err(Error::TypeError(format!("expected integer, got {bad}"))),
            None => Ok(()),
        }
    }

    fn project<'a>(v: &'a Value) -> Option<Self::Item<'a>> {
        if let Value::Integer(n) = v {
            Some(*n)
        } else {
            debug_assert!(false, "NumberKind::project saw a non-integer after precheck");
            None
        }
    }
}

#[doc(hidden)]
pub struct StringKind;

impl ValueElementKind for StringKind {
    type Item<'a> = &'a str;

    fn precheck(slice: &[Value]) -> Result<(), Error> {
        match slice.iter().find(|v| !matches!(v, Value::String(_))) {
            Some(bad) => Err(Error::TypeError(format!("expected string, got {bad}"))),
            None => Ok(()),
        }
    }

    fn project<'a>(v: &'a Value) -> Option<Self::Item<'a>> {
        if let Value::String(s) = v {
            Some(s.as_str())
        } else {
            debug_assert!(false, "StringKind::project saw a non-string after precheck");
            None
        }
    }
}

/// Borrowed iterator over raw values
pub type ValueIter<'a> = TypedValueIter<'a, ValueKind>;

/// Borrowed iterator over integer values, type-checked before the first element
pub type NumIter<'a> = TypedValueIter<'a, NumberKind>;

/// Borrowed iterator over string values, type-checked before the first element
pub type StringIter<'a> = TypedValueIter<'a, StringKind>;

// =====================================================================
// Rest parameters
// =====================================================================

/// Builds the trailing rest parameter from the unconsumed arguments
pub trait FromRest {
    type Param<'a>;

    fn from_rest<'a>(slice: &'a [Value]) -> Result<Self::Param<'a>, Error>;
}

impl<K> FromRest for TypedValueIter<'static, K>
where
    K: ValueElementKind,
{
    type Param<'a> = TypedValueIter<'a, K>;

    fn from_rest<'a>(slice: &'a [Value]) -> Result<Self::Param<'a>, Error> {
        TypedValueIter::<K>::new(slice)
    }
}

// =====================================================================
// Return values
// =====================================================================

/// Normalizes builtin return types to `Result<Value, Error>`
pub trait IntoValueResult {
    fn into_value_result(self) -> Result<Value, Error>;
}

impl<T> IntoValueResult for Result<T, Error>
where
    T: Into<Value>,
{
    fn into_value_result(self) -> Result<Value, Error> {
        self.map(Into::into)
    }
}

impl<T> IntoValueResult for T
where
    T: Into<Value>,
{
    fn into_value_result(self) -> Result<Value, Error> {
        Ok(self.into())
    }
}

/// Converts a fixed-arity Rust function into an [`OperationFn`].
///
/// The argument count is checked against the function's parameter count
/// before any conversion happens.
pub trait IntoOperation<Args> {
    fn into_operation(self) -> Arc<OperationFn>;
}

/// Converts a function whose last parameter is a rest iterator
/// (`ValueIter`, `NumIter` or `StringIter`), optionally after a fixed
/// prefix of [`FromParam`] parameters, into an [`OperationFn`].
pub trait IntoVariadicOperation<Args> {
    fn into_variadic_operation(self) -> Arc<OperationFn>;
}

// =====================================================================
// Variadic adapters
// =====================================================================

impl<F, I, R> IntoVariadicOperation<(I,)> for F
where
    I: FromRest,
    F: for<'a> Fn(<I as FromRest>::Param<'a>) -> R + Send + Sync + 'static,
    R: IntoValueResult,
{
    fn into_variadic_operation(self) -> Arc<OperationFn> {
        Arc::new(move |args: Vec<Value>| {
            let rest = <I as FromRest>::from_rest(&args)?;
            (self)(rest).into_value_result()
        })
    }
}

macro_rules! impl_into_variadic_operation_for_prefix_and_rest {
    ($prefix:expr, $( $v:ident, $p:ident : $A:ident ),+ ) => {
        impl<F, I, R, $( $A ),+> IntoVariadicOperation<( $( $A, )+ I, )> for F
        where
            I: FromRest,
            $( $A: FromParam, )+
            F: for<'a> Fn(
                    $( <$A as FromParam>::Param<'a> ),+,
                    <I as FromRest>::Param<'a>,
                ) -> R
                + Send
                + Sync
                + 'static,
            R: IntoValueResult,
        {
            fn into_variadic_operation(self) -> Arc<OperationFn> {
                Arc::new(move |mut args: Vec<Value>| {
                    let len = args.len();
                    match args.as_mut_slice() {
                        &mut [ $( ref mut $v ),+, ref mut rest @ .. ] => {
                            $(
                                let $p: <$A as FromParam>::Param<'_> =
                                    <$A as FromParam>::from_arg($v)?;
                            )+
                            let rest_param: <I as FromRest>::Param<'_> =
                                <I as FromRest>::from_rest(&*rest)?;

                            (self)( $( $p ),+, rest_param ).into_value_result()
                        }
                        _ => Err(Error::arity_error($prefix, len)),
                    }
                })
            }
        }
    };
}

impl_into_variadic_operation_for_prefix_and_rest!(1, v0, p0: A1);
impl_into_variadic_operation_for_prefix_and_rest!(2, v0, p0: A1, v1, p1: A2);

// =====================================================================
// Fixed-arity adapters
// =====================================================================

// 0-arg functions / closures
impl<F, R> IntoOperation<()> for F
where
    F: Fn() -> R + Send + Sync + 'static,
    R: IntoValueResult,
{
    fn into_operation(self) -> Arc<OperationFn> {
        Arc::new(move |args: Vec<Value>| {
            if !args.is_empty() {
                return Err(Error::arity_error(0, args.len()));
            }
            (self)().into_value_result()
        })
    }
}

/// Destructures the owned argument vector into local slots so that each
/// `FromParam` can borrow from or consume its slot.
macro_rules! impl_into_operation_for_arity {
    ($arity:expr, $( $v:ident, $p:ident : $A:ident ),+ ) => {
        impl<F, R, $( $A ),+> IntoOperation<( $( $A, )+ )> for F
        where
            F: for<'a> Fn( $( <$A as FromParam>::Param<'a> ),+ ) -> R
                + Send
                + Sync
                + 'static,
            $( $A: FromParam, )+
            R: IntoValueResult,
        {
            fn into_operation(self) -> Arc<OperationFn> {
                Arc::new(move |mut args: Vec<Value>| {
                    let len = args.len();
                    match args.as_mut_slice() {
                        &mut [ $( ref mut $v ),+ ] => {
                            $(
                                let $p: <$A as FromParam>::Param<'_> =
                                    <$A as FromParam>::from_arg($v)?;
                            )+
                            (self)( $( $p ),+ ).into_value_result()
                        }
                        _ => Err(Error::arity_error($arity, len)),
                    }
                })
            }
        }
    };
}

impl_into_operation_for_arity!(1, v0, p0: A1);
impl_into_operation_for_arity!(2, v0, p0: A1, v1, p1: A2);
impl_into_operation_for_arity!(3, v0, p0: A1, v1, p1: A2, v2, p2: A3);
