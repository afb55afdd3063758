//! Lexical scopes.
//!
//! An [`Env`] is a cheap handle to one scope node. Scopes link outward to the
//! scope they were created in; closures keep their defining scope alive by
//! holding a handle to it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use tracing::trace;

use crate::Error;
use crate::ast::{Function, Value, list};
use crate::evaluator::Arity;
use crate::evaluator::intooperation::{IntoOperation, IntoVariadicOperation, OperationFn};

/// Symbol that collects the remaining call arguments into one parameter
pub(crate) const REST_MARKER: &str = "&";

#[derive(Debug, Default)]
struct Scope {
    data: HashMap<String, Value>,
    outer: Option<Env>,
}

/// Shared handle to a scope; clones refer to the same bindings
#[derive(Clone, Default)]
pub struct Env(Rc<RefCell<Scope>>);

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Closures stored in a scope point back at it, so only the local
        // names are shown
        let scope = self.0.borrow();
        let mut names: Vec<_> = scope.data.keys().collect();
        names.sort();
        f.debug_struct("Env")
            .field("names", &names)
            .field("has_outer", &scope.outer.is_some())
            .finish()
    }
}

fn symbol_name<'v>(key: &'v Value, err: fn(String) -> Error) -> Result<&'v str, Error> {
    key.as_symbol().ok_or_else(|| err(key.to_string()))
}

impl Env {
    /// A root scope with no bindings
    pub fn new() -> Self {
        Env::default()
    }

    /// An empty scope nested inside `outer`
    pub fn with_outer(outer: &Env) -> Self {
        Env(Rc::new(RefCell::new(Scope {
            data: HashMap::new(),
            outer: Some(outer.clone()),
        })))
    }

    /// Create a child of `outer` binding `params` to `args` positionally.
    ///
    /// `&` binds the next name to a list of the remaining arguments and ends
    /// the parameter list.
    pub fn bind(outer: &Env, params: &[Value], args: Vec<Value>) -> Result<Env, Error> {
        let env = Env::with_outer(outer);
        let arg_count = args.len();
        let positional = params
            .iter()
            .position(|p| p.as_symbol() == Some(REST_MARKER))
            .unwrap_or(params.len());
        let mut args = args.into_iter();
        let mut params_iter = params.iter().enumerate();

        while let Some((i, param)) = params_iter.next() {
            let name = symbol_name(param, Error::NonSymbolBinding)?;
            if name == REST_MARKER {
                let (_, rest_name) = params_iter.next().ok_or(Error::UnnamedRestArg)?;
                let rest = list(args.by_ref().collect());
                trace!(rest_name = %rest_name, rest = %rest, "bind rest");
                env.set(rest_name, rest)?;
                return Ok(env);
            }
            let arg = args
                .next()
                .ok_or_else(|| Error::arity_error(positional, arg_count))?;
            trace!(param = name, position = i, arg = %arg, "bind");
            env.set(param, arg)?;
        }

        if args.next().is_some() {
            return Err(Error::arity_error(positional, arg_count));
        }
        Ok(env)
    }

    /// The innermost scope, starting here, that binds `key`
    pub fn lookup(&self, key: &Value) -> Result<Env, Error> {
        let name = symbol_name(key, Error::NonSymbolLookup)?;
        let mut current = self.clone();
        loop {
            if current.0.borrow().data.contains_key(name) {
                return Ok(current);
            }
            let outer = current.0.borrow().outer.clone();
            match outer {
                Some(next) => current = next,
                None => return Err(Error::SymbolNotFound(name.to_owned())),
            }
        }
    }

    /// Value bound to `key` in the innermost scope that binds it
    pub fn get(&self, key: &Value) -> Result<Value, Error> {
        let name = symbol_name(key, Error::NonSymbolLookup)?;
        let owner = self.lookup(key)?;
        let scope = owner.0.borrow();
        scope
            .data
            .get(name)
            .cloned()
            .ok_or_else(|| Error::SymbolNotFound(name.to_owned()))
    }

    /// Bind `key` in this scope only, shadowing any outer binding
    pub fn set(&self, key: &Value, value: Value) -> Result<(), Error> {
        let name = symbol_name(key, Error::NonSymbolBinding)?;
        self.define(name, value);
        Ok(())
    }

    /// Bind a name directly, without symbol checks
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().data.insert(name.into(), value);
    }

    /// Register a builtin that works on the raw argument slice.
    ///
    /// ```
    /// use malrs::Error;
    /// use malrs::ast::Value;
    /// use malrs::evaluator::create_global_env;
    ///
    /// fn first_or_nil(args: &[Value]) -> Result<Value, Error> {
    ///     Ok(args.first().cloned().unwrap_or(Value::Nil))
    /// }
    ///
    /// let env = create_global_env()?;
    /// env.register_builtin_function("first-arg", first_or_nil);
    /// assert_eq!(malrs::rep("(first-arg 7 8)", &env)?, "7");
    /// # Ok::<(), Error>(())
    /// ```
    pub fn register_builtin_function(&self, name: &str, func: fn(&[Value]) -> Result<Value, Error>) {
        let wrapped: Arc<OperationFn> = Arc::new(move |args: Vec<Value>| func(&args));
        self.define_builtin(name, wrapped);
    }

    /// Register a strongly-typed Rust function as a builtin.
    ///
    /// Parameters may be `i64`, `bool`, `&str`, `Value` or one of the
    /// sequence iterators (`ValueIter`, `NumIter`, `StringIter`) taking a list
    /// or vector argument. The return type is anything convertible into a
    /// `Value`, or a `Result` of one.
    ///
    /// Arity is checked from the Rust signature; conversion failures are
    /// `TypeError`s.
    ///
    /// ```rust,ignore
    /// fn add(a: i64, b: i64) -> i64 { a + b }
    /// env.register_builtin_operation::<(i64, i64), _>("add", add);
    /// ```
    pub fn register_builtin_operation<Args, F>(&self, name: &str, func: F)
    where
        F: IntoOperation<Args>,
    {
        self.define_builtin(name, func.into_operation());
    }

    /// Register a builtin whose last parameter collects the remaining
    /// arguments (`ValueIter`, `NumIter` or `StringIter`), optionally after a
    /// fixed prefix.
    ///
    /// The minimum and maximum argument counts of a variadic function are not
    /// derivable from its signature, so `arity` is checked on every call.
    pub fn register_variadic_builtin_operation<Args, F>(&self, name: &str, arity: Arity, func: F)
    where
        F: IntoVariadicOperation<Args>,
    {
        let inner = func.into_variadic_operation();
        let wrapped: Arc<OperationFn> = Arc::new(move |args: Vec<Value>| {
            arity.validate(args.len())?;
            inner(args)
        });
        self.define_builtin(name, wrapped);
    }

    fn define_builtin(&self, name: &str, func: Arc<OperationFn>) {
        self.define(
            name,
            Value::Function(Rc::new(Function::Builtin {
                id: name.to_owned(),
                func,
            })),
        );
    }

    /// Every visible binding sorted by name, inner scopes shadowing outer ones
    pub fn get_all_bindings(&self) -> Vec<(String, Value)> {
        let mut bindings = HashMap::new();

        let scope = self.0.borrow();
        if let Some(outer) = &scope.outer {
            bindings.extend(outer.get_all_bindings());
        }
        for (name, value) in &scope.data {
            bindings.insert(name.clone(), value.clone());
        }

        let mut result: Vec<_> = bindings.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }

    /// Whether two handles refer to the same scope
    pub fn same_scope(&self, other: &Env) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
