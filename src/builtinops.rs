//! Registry of the native functions bound in every global environment.
//!
//! Each builtin is a plain, strongly-typed Rust function wired through the
//! adapter layer in `evaluator::intooperation` once, when the registry is
//! first touched. Special forms (`def!`, `let*`, `do`, `if`, `fn*`, `quote`)
//! control evaluation of their arguments and live in the evaluator instead.
//!
//! ```lisp
//! (+ 1 2 3)          ; => 6
//! (< 1 2 3)          ; => true, comparisons chain
//! (count [1 2])      ; => 2
//! (pr-str "a" :b)    ; => "\"a\" :b"
//! ```
//!
//! ## Error Handling
//!
//! - **Type Safety**: arithmetic and comparison reject non-integers with `TypeError`
//! - **Overflow Detection**: arithmetic reports overflow as `EvalError`
//! - **Arity Checking**: every call is validated against the op's [`Arity`]
//!
//! ## Adding New Operations
//!
//! 1. Write the function with typed parameters (`i64`, `&str`, `Value`, or a
//!    rest iterator such as `NumIter<'_>`)
//! 2. Add a `BuiltinOp` entry to `BUILTIN_OPS` with its arity
//! 3. Add rows to the data-driven tests below

use std::sync::{Arc, LazyLock};

use crate::Error;
use crate::ast::{NumberType, Value, list, vector};
use crate::evaluator::intooperation::{IntoOperation, IntoVariadicOperation, OperationFn};
use crate::evaluator::{Arity, NumIter, ValueIter};
use crate::printer::print_str;

/// Definition of a built-in function
#[derive(Clone)]
pub struct BuiltinOp {
    /// The name the function is bound to
    pub id: &'static str,
    /// The adapted implementation; arity is not checked here
    pub func: Arc<OperationFn>,
    /// Expected number of arguments
    pub arity: Arity,
}

impl std::fmt::Debug for BuiltinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuiltinOp")
            .field("id", &self.id)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl PartialEq for BuiltinOp {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl BuiltinOp {
    /// Check if the given number of arguments is valid for this operation
    pub(crate) fn validate_arity(&self, arg_count: usize) -> Result<(), Error> {
        self.arity.validate(arg_count)
    }

    /// The implementation wrapped with this op's arity check, ready to bind
    pub fn checked_function(&self) -> Arc<OperationFn> {
        let op = self.clone();
        Arc::new(move |args: Vec<Value>| {
            op.validate_arity(args.len())?;
            (op.func)(args)
        })
    }
}

//
// Builtin Function Implementations
//

// Chained comparison: every adjacent pair must satisfy the operator
macro_rules! numeric_comparison {
    ($name:ident, $op:tt) => {
        fn $name(first: NumberType, rest: NumIter<'_>) -> bool {
            let mut prev = first;
            for current in rest {
                if !(prev $op current) {
                    return false;
                }
                prev = current;
            }
            true
        }
    };
}

numeric_comparison!(builtin_lt, <);
numeric_comparison!(builtin_gt, >);
numeric_comparison!(builtin_le, <=);
numeric_comparison!(builtin_ge, >=);

fn overflow(operation: &str) -> Error {
    Error::EvalError(format!("Integer overflow in {operation}"))
}

fn builtin_add(args: NumIter<'_>) -> Result<NumberType, Error> {
    let mut sum: NumberType = 0;
    for arg in args {
        sum = sum.checked_add(arg).ok_or_else(|| overflow("addition"))?;
    }
    Ok(sum)
}

fn builtin_sub(first: NumberType, rest: NumIter<'_>) -> Result<NumberType, Error> {
    let mut iter = rest.peekable();

    if iter.peek().is_none() {
        return first.checked_neg().ok_or_else(|| overflow("negation"));
    }

    let mut result = first;
    for n in iter {
        result = result.checked_sub(n).ok_or_else(|| overflow("subtraction"))?;
    }
    Ok(result)
}

fn builtin_mul(first: NumberType, rest: NumIter<'_>) -> Result<NumberType, Error> {
    let mut product = first;
    for n in rest {
        product = product
            .checked_mul(n)
            .ok_or_else(|| overflow("multiplication"))?;
    }
    Ok(product)
}

/// Division rounding toward negative infinity
fn floor_div(a: NumberType, b: NumberType) -> Result<NumberType, Error> {
    if b == 0 {
        return Err(Error::EvalError("Division by zero".into()));
    }
    let quotient = a.checked_div(b).ok_or_else(|| overflow("division"))?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

fn builtin_div(first: NumberType, rest: NumIter<'_>) -> Result<NumberType, Error> {
    let mut result = first;
    for n in rest {
        result = floor_div(result, n)?;
    }
    Ok(result)
}

fn builtin_equal(first: Value, second: Value) -> bool {
    first == second
}

fn builtin_list(args: ValueIter<'_>) -> Value {
    list(args.cloned().collect())
}

fn builtin_is_list(value: Value) -> bool {
    matches!(value, Value::List(_))
}

fn builtin_vector(args: ValueIter<'_>) -> Value {
    vector(args.cloned().collect())
}

fn builtin_is_vector(value: Value) -> bool {
    matches!(value, Value::Vector(_))
}

/// Element count of a list or vector; nil counts as empty
fn sequence_len(value: &Value, op: &str) -> Result<usize, Error> {
    match value {
        Value::Nil => Ok(0),
        Value::List(items) | Value::Vector(items) => Ok(items.len()),
        other => Err(Error::TypeError(format!(
            "{op} expects a list, vector or nil, got {other}"
        ))),
    }
}

fn builtin_is_empty(value: Value) -> Result<bool, Error> {
    sequence_len(&value, "empty?").map(|len| len == 0)
}

fn builtin_count(value: Value) -> Result<NumberType, Error> {
    let len = sequence_len(&value, "count")?;
    NumberType::try_from(len).map_err(|_| overflow("count"))
}

fn print_joined(args: ValueIter<'_>, readable: bool, separator: &str) -> String {
    args.map(|arg| print_str(arg, readable))
        .collect::<Vec<_>>()
        .join(separator)
}

fn builtin_str(args: ValueIter<'_>) -> String {
    print_joined(args, false, "")
}

fn builtin_pr_str(args: ValueIter<'_>) -> String {
    print_joined(args, true, " ")
}

fn builtin_prn(args: ValueIter<'_>) -> Value {
    println!("{}", print_joined(args, true, " "));
    Value::Nil
}

fn builtin_println(args: ValueIter<'_>) -> Value {
    println!("{}", print_joined(args, false, " "));
    Value::Nil
}

/// Global registry of all built-in functions.
///
/// Every implementation goes through the same adapter layer used for custom
/// registration on `Env`; this happens once, on first access.
static BUILTIN_OPS: LazyLock<Vec<BuiltinOp>> = LazyLock::new(|| {
    fn builtin_fixed<Args, F>(f: F) -> Arc<OperationFn>
    where
        F: IntoOperation<Args>,
    {
        <F as IntoOperation<Args>>::into_operation(f)
    }

    fn builtin_variadic<Args, F>(f: F) -> Arc<OperationFn>
    where
        F: IntoVariadicOperation<Args>,
    {
        <F as IntoVariadicOperation<Args>>::into_variadic_operation(f)
    }

    type Rest = NumIter<'static>;
    type Values = ValueIter<'static>;

    vec![
        // Arithmetic
        BuiltinOp {
            id: "+",
            func: builtin_variadic::<(Rest,), _>(builtin_add),
            arity: Arity::AtLeast(0),
        },
        BuiltinOp {
            id: "-",
            func: builtin_variadic::<(NumberType, Rest), _>(builtin_sub),
            arity: Arity::AtLeast(1),
        },
        BuiltinOp {
            id: "*",
            func: builtin_variadic::<(NumberType, Rest), _>(builtin_mul),
            arity: Arity::AtLeast(1),
        },
        BuiltinOp {
            id: "/",
            func: builtin_variadic::<(NumberType, Rest), _>(builtin_div),
            arity: Arity::AtLeast(2),
        },
        // Comparison
        BuiltinOp {
            id: "=",
            func: builtin_fixed::<(Value, Value), _>(builtin_equal),
            arity: Arity::Exact(2),
        },
        BuiltinOp {
            id: "<",
            func: builtin_variadic::<(NumberType, Rest), _>(builtin_lt),
            arity: Arity::AtLeast(2),
        },
        BuiltinOp {
            id: ">",
            func: builtin_variadic::<(NumberType, Rest), _>(builtin_gt),
            arity: Arity::AtLeast(2),
        },
        BuiltinOp {
            id: "<=",
            func: builtin_variadic::<(NumberType, Rest), _>(builtin_le),
            arity: Arity::AtLeast(2),
        },
        BuiltinOp {
            id: ">=",
            func: builtin_variadic::<(NumberType, Rest), _>(builtin_ge),
            arity: Arity::AtLeast(2),
        },
        // Sequences
        BuiltinOp {
            id: "list",
            func: builtin_variadic::<(Values,), _>(builtin_list),
            arity: Arity::Any,
        },
        BuiltinOp {
            id: "list?",
            func: builtin_fixed::<(Value,), _>(builtin_is_list),
            arity: Arity::Exact(1),
        },
        BuiltinOp {
            id: "vector",
            func: builtin_variadic::<(Values,), _>(builtin_vector),
            arity: Arity::Any,
        },
        BuiltinOp {
            id: "vector?",
            func: builtin_fixed::<(Value,), _>(builtin_is_vector),
            arity: Arity::Exact(1),
        },
        BuiltinOp {
            id: "empty?",
            func: builtin_fixed::<(Value,), _>(builtin_is_empty),
            arity: Arity::Exact(1),
        },
        BuiltinOp {
            id: "count",
            func: builtin_fixed::<(Value,), _>(builtin_count),
            arity: Arity::Exact(1),
        },
        // Printing
        BuiltinOp {
            id: "str",
            func: builtin_variadic::<(Values,), _>(builtin_str),
            arity: Arity::Any,
        },
        BuiltinOp {
            id: "pr-str",
            func: builtin_variadic::<(Values,), _>(builtin_pr_str),
            arity: Arity::Any,
        },
        BuiltinOp {
            id: "prn",
            func: builtin_variadic::<(Values,), _>(builtin_prn),
            arity: Arity::Any,
        },
        BuiltinOp {
            id: "println",
            func: builtin_variadic::<(Values,), _>(builtin_println),
            arity: Arity::Any,
        },
    ]
});

/// Get all builtin operations
pub fn get_builtin_ops() -> &'static [BuiltinOp] {
    BUILTIN_OPS.as_slice()
}

/// Find a builtin operation by name
pub fn find_builtin_op(id: &str) -> Option<&'static BuiltinOp> {
    get_builtin_ops().iter().find(|op| op.id == id)
}
