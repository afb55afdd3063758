use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::ast::{Function, Value, hashmap, list, vector};
use crate::{Error, MAX_EVAL_DEPTH, ensure_sufficient_stack};
use crate::builtinops::get_builtin_ops;
use crate::env::Env;
use crate::reader;

pub mod intooperation;

pub use intooperation::{NumIter, OperationFn, StringIter, ValueIter};

/// Source evaluated into every global environment after the builtins are bound
pub const STANDARD_BOOTSTRAP: &str = "(def! not (fn* (a) (if a false true)))";

/// Expected argument count for a builtin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly n arguments
    Exact(usize),
    /// n or more arguments
    AtLeast(usize),
    /// Between min and max arguments, inclusive
    Range(usize, usize),
    /// Any number of arguments
    Any,
}

impl Arity {
    /// Check a call's argument count, reporting the violated bound
    pub fn validate(&self, arg_count: usize) -> Result<(), Error> {
        match *self {
            Arity::Exact(n) if arg_count != n => Err(Error::arity_error(n, arg_count)),
            Arity::AtLeast(min) | Arity::Range(min, _) if arg_count < min => {
                Err(Error::arity_error(min, arg_count))
            }
            Arity::Range(_, max) if arg_count > max => Err(Error::arity_error(max, arg_count)),
            _ => Ok(()),
        }
    }
}

/// Handler for a special form: unevaluated arguments, current scope, depth
type SpecialForm = fn(&[Value], &Env, usize) -> Result<Value, Error>;

/// Special forms by head symbol, checked in order before ordinary application
const SPECIAL_FORMS: &[(&str, SpecialForm)] = &[
    ("def!", eval_define),
    ("let*", eval_let),
    ("do", eval_do),
    ("if", eval_if),
    ("fn*", eval_lambda),
    ("quote", eval_quote),
];

/// Evaluate a form against `env`
pub fn eval(expr: &Value, env: &Env) -> Result<Value, Error> {
    eval_with_depth_tracking(expr, env, 0)
}

/// Evaluate with depth tracking so runaway recursion becomes a
/// `StackOverflow` error rather than a crash
fn eval_with_depth_tracking(expr: &Value, env: &Env, depth: usize) -> Result<Value, Error> {
    if depth >= MAX_EVAL_DEPTH {
        return Err(Error::StackOverflow {
            limit: MAX_EVAL_DEPTH,
        });
    }
    ensure_sufficient_stack(|| match expr {
        Value::List(elements) if !elements.is_empty() => eval_list(elements, env, depth),
        _ => eval_ast(expr, env, depth),
    })
}

/// Evaluate a form that is not an application: symbols are looked up,
/// collections are evaluated element-wise, everything else evaluates to itself
fn eval_ast(expr: &Value, env: &Env, depth: usize) -> Result<Value, Error> {
    match expr {
        Value::Symbol(_) => env.get(expr),
        Value::List(items) => Ok(list(eval_args(items, env, depth)?)),
        Value::Vector(items) => Ok(vector(eval_args(items, env, depth)?)),
        Value::Hashmap(map) => {
            let evaluated = map
                .iter()
                .map(|(key, value)| {
                    eval_with_depth_tracking(value, env, depth + 1).map(|v| (key.clone(), v))
                })
                .collect::<Result<BTreeMap<_, _>, Error>>()?;
            Ok(hashmap(evaluated))
        }
        Value::Integer(_)
        | Value::Keyword(_)
        | Value::String(_)
        | Value::Bool(_)
        | Value::Nil
        | Value::Function(_)
        | Value::Comment(_) => Ok(expr.clone()),
    }
}

/// Evaluate argument expressions left to right
fn eval_args(args: &[Value], env: &Env, depth: usize) -> Result<Vec<Value>, Error> {
    args.iter()
        .map(|arg| eval_with_depth_tracking(arg, env, depth + 1))
        .collect()
}

/// Evaluate a non-empty list: a special form or a function application
fn eval_list(elements: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let [head, arg_exprs @ ..] = elements else {
        return Ok(list(Vec::new()));
    };

    if let Some(name) = head.as_symbol()
        && let Some((_, handler)) = SPECIAL_FORMS.iter().find(|(form, _)| *form == name)
    {
        trace!(form = name, depth, "special form");
        return handler(arg_exprs, env, depth);
    }

    let func = eval_with_depth_tracking(head, env, depth + 1)?;
    let args = eval_args(arg_exprs, env, depth)?;
    apply(&func, args, depth)
}

/// Call `func` with already-evaluated arguments
pub(crate) fn apply(func: &Value, args: Vec<Value>, depth: usize) -> Result<Value, Error> {
    let Value::Function(function) = func else {
        return Err(Error::CalledNonFunction(func.to_string()));
    };

    match function.as_ref() {
        Function::Builtin { id, func } => {
            trace!(id = id.as_str(), args = args.len(), "apply builtin");
            func(args)
        }
        Function::Closure { params, body, env } => {
            let call_env = Env::bind(env, params, args)?;
            trace!(depth, "apply closure");
            eval_with_depth_tracking(body, &call_env, depth + 1)
        }
    }
}

/// `(quote form)`
pub(crate) fn eval_quote(args: &[Value], _env: &Env, _depth: usize) -> Result<Value, Error> {
    match args {
        [expr] => Ok(expr.clone()),
        _ => Err(Error::arity_error(1, args.len())),
    }
}

/// `(def! name expr)`: binds in the current scope and returns the value
pub(crate) fn eval_define(args: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    match args {
        [name, expr] => {
            let value = eval_with_depth_tracking(expr, env, depth + 1)?;
            env.set(name, value.clone())?;
            debug!(name = %name, value = %value, "def!");
            Ok(value)
        }
        _ => Err(Error::arity_error(2, args.len())),
    }
}

/// `(let* (name expr ...) body)`: each binding sees the ones before it
pub(crate) fn eval_let(args: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let [bindings, body] = args else {
        return Err(Error::arity_error(2, args.len()));
    };
    let Some(pairs) = bindings.as_seq() else {
        return Err(Error::TypeError(format!(
            "let* bindings must be a list or vector, got {bindings}"
        )));
    };
    if pairs.len() % 2 != 0 {
        return Err(Error::TypeError(format!(
            "let* bindings must come in name/value pairs, got {bindings}"
        )));
    }

    let let_env = Env::with_outer(env);
    let mut pairs = pairs.iter();
    while let (Some(name), Some(expr)) = (pairs.next(), pairs.next()) {
        let value = eval_with_depth_tracking(expr, &let_env, depth + 1)?;
        let_env.set(name, value)?;
    }
    eval_with_depth_tracking(body, &let_env, depth + 1)
}

/// `(do expr ...)`: the last value, or nil when empty
pub(crate) fn eval_do(args: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    let mut result = Value::Nil;
    for expr in args {
        result = eval_with_depth_tracking(expr, env, depth + 1)?;
    }
    Ok(result)
}

/// `(if cond then? else?)`: only nil and false select the else branch
pub(crate) fn eval_if(args: &[Value], env: &Env, depth: usize) -> Result<Value, Error> {
    match args {
        [condition_expr, branches @ ..] if branches.len() <= 2 => {
            let condition = eval_with_depth_tracking(condition_expr, env, depth + 1)?;
            let branch = if condition.is_truthy() {
                branches.first()
            } else {
                branches.get(1)
            };
            match branch {
                Some(expr) => eval_with_depth_tracking(expr, env, depth + 1),
                None => Ok(Value::Nil),
            }
        }
        [] => Err(Error::arity_error(1, 0)),
        _ => Err(Error::arity_error(3, args.len())),
    }
}

/// `(fn* (param ...) body)`: a closure over the current scope
pub(crate) fn eval_lambda(args: &[Value], env: &Env, _depth: usize) -> Result<Value, Error> {
    let [param_list, body] = args else {
        return Err(Error::arity_error(2, args.len()));
    };
    let params = param_list
        .as_seq()
        .ok_or_else(|| Error::BadArgList(param_list.to_string()))?;
    if let Some(bad) = params.iter().find(|p| p.as_symbol().is_none()) {
        return Err(Error::NonSymbolArgName(bad.to_string()));
    }

    Ok(Value::Function(Rc::new(Function::Closure {
        params: params.to_vec(),
        body: body.clone(),
        env: env.clone(),
    })))
}

/// Build a root scope from `builtins`, then evaluate `bootstrap` in it
pub fn create_root_env<I, S>(builtins: I, bootstrap: Option<&str>) -> Result<Env, Error>
where
    I: IntoIterator<Item = (S, Arc<OperationFn>)>,
    S: Into<String>,
{
    let env = Env::new();
    for (name, func) in builtins {
        let id: String = name.into();
        env.define(id.clone(), Value::Function(Rc::new(Function::Builtin { id, func })));
    }

    if let Some(source) = bootstrap {
        for form in reader::read_all(source)? {
            eval(&form, &env)?;
        }
    }
    Ok(env)
}

/// Create a global environment with every registered builtin and the
/// standard bootstrap definitions
pub fn create_global_env() -> Result<Env, Error> {
    create_root_env(
        get_builtin_ops()
            .iter()
            .map(|op| (op.id, op.checked_function())),
        Some(STANDARD_BOOTSTRAP),
    )
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::MAX_EVAL_DEPTH;
    use crate::ast::{MapKey, Shared, kw, list, nil, sym, val, vector};
    use crate::reader::read_str;

    #[test]
    fn test_arity_validate() {
        let test_cases = vec![
            (Arity::Exact(2), 2, Ok(())),
            (Arity::Exact(2), 1, Err(Error::arity_error(2, 1))),
            (Arity::AtLeast(1), 5, Ok(())),
            (Arity::AtLeast(1), 0, Err(Error::arity_error(1, 0))),
            (Arity::Range(1, 3), 3, Ok(())),
            (Arity::Range(1, 3), 0, Err(Error::arity_error(1, 0))),
            (Arity::Range(1, 3), 4, Err(Error::arity_error(3, 4))),
            (Arity::Any, 0, Ok(())),
        ];

        for (arity, count, expected) in test_cases {
            assert_eq!(arity.validate(count), expected, "{arity:?} with {count}");
        }
    }

    /// Test result variants for evaluation tests
    #[derive(Debug)]
    enum TestResult {
        EvalResult(Value),           // Evaluation should succeed with this value
        EvalOk,                      // Evaluation should succeed (value not compared)
        SpecificError(&'static str), // Evaluation should fail with error containing this string
        AnyError,                    // Evaluation should fail (any error)
    }
    use TestResult::*;

    /// Test cases that share one environment
    struct TestEnvironment(Vec<(&'static str, TestResult)>);

    fn success<T: Into<Value>>(value: T) -> TestResult {
        EvalResult(val(value))
    }

    fn map_of(entries: Vec<(MapKey, Value)>) -> Value {
        hashmap(entries.into_iter().collect())
    }

    fn run_tests_in_environment(test_environments: Vec<TestEnvironment>) {
        for (env_idx, TestEnvironment(test_cases)) in test_environments.iter().enumerate() {
            let env = create_global_env().unwrap();
            for (test_idx, (input, expected)) in test_cases.iter().enumerate() {
                let test_id = format!("Environment #{} test #{}", env_idx + 1, test_idx + 1);
                execute_test_case(input, expected, &env, &test_id);
            }
        }
    }

    fn execute_test_case(input: &str, expected: &TestResult, env: &Env, test_id: &str) {
        let expr = read_str(input)
            .unwrap_or_else(|e| panic!("{test_id}: unexpected read error for '{input}': {e:?}"));

        match (eval(&expr, env), expected) {
            (Ok(actual), EvalResult(expected_val)) => {
                assert_eq!(actual, *expected_val, "{test_id}: '{input}'");
            }
            (Ok(_), EvalOk) | (Err(_), AnyError) => {}
            (Err(e), SpecificError(expected_text)) => {
                let error_msg = e.to_string();
                assert!(
                    error_msg.contains(expected_text),
                    "{test_id}: error for '{input}' should contain '{expected_text}', got: {error_msg}"
                );
            }
            (Ok(actual), AnyError | SpecificError(_)) => {
                panic!("{test_id}: expected error for '{input}', got {actual:?}");
            }
            (Err(err), EvalResult(_) | EvalOk) => {
                panic!("{test_id}: expected success for '{input}', got error {err:?}");
            }
        }
    }

    fn run_comprehensive_tests(test_cases: Vec<(&'static str, TestResult)>) {
        for (i, (input, expected)) in test_cases.iter().enumerate() {
            let env = create_global_env().unwrap();
            execute_test_case(input, expected, &env, &format!("#{}", i + 1));
        }
    }

    #[test]
    fn test_self_evaluating_and_collections() {
        let test_cases = vec![
            ("42", success(42)),
            ("-9223372036854775808", success(i64::MIN)),
            ("\"hello\"", success("hello")),
            (":k", EvalResult(kw("k"))),
            ("nil", EvalResult(nil())),
            ("true", success(true)),
            ("()", EvalResult(list(vec![]))),
            ("[]", EvalResult(vector(vec![]))),
            ("[1 (+ 1 1) \"x\"]", EvalResult(vector(vec![val(1), val(2), val("x")]))),
            ("[[(* 2 2)]]", EvalResult(vector(vec![vector(vec![val(4)])]))),
            (
                "{:a (+ 1 2) \"b\" [nil]}",
                EvalResult(map_of(vec![
                    (MapKey::Keyword("a".into()), val(3)),
                    (MapKey::String("b".into()), vector(vec![nil()])),
                ])),
            ),
            ("; just a comment", EvalResult(Value::Comment("; just a comment".into()))),
            ("undefined-sym", SpecificError("There was no variable value for the symbol 'undefined-sym'")),
            ("[1 undefined-sym]", SpecificError("undefined-sym")),
            ("{:a undefined-sym}", SpecificError("undefined-sym")),
        ];

        run_comprehensive_tests(test_cases);
    }

    #[test]
    fn test_special_forms_data_driven() {
        let test_cases = vec![
            // def!
            ("(def! x 5)", success(5)),
            ("(def! x (+ 1 2))", success(3)),
            ("(def! 1 2)", SpecificError("Cannot bind the non-symbol 1")),
            ("(def! x)", SpecificError("expected 2 arguments, got 1")),
            ("(def! x 1 2)", SpecificError("expected 2 arguments, got 3")),
            // let*
            ("(let* (a 1 b (+ a 1)) b)", success(2)),
            ("(let* [a 1] a)", success(1)),
            ("(let* () 7)", success(7)),
            ("(let* (a 1 b) a)", SpecificError("pairs")),
            ("(let* 5 1)", SpecificError("must be a list or vector")),
            ("(let* (1 2) 3)", SpecificError("non-symbol")),
            ("(let* (a 1))", SpecificError("expected 2 arguments, got 1")),
            // do
            ("(do 1 2 3)", success(3)),
            ("(do)", EvalResult(nil())),
            ("(do (def! y 7) (+ y 1))", success(8)),
            // if
            ("(if true 1 2)", success(1)),
            ("(if false 1 2)", success(2)),
            ("(if nil 1 2)", success(2)),
            ("(if 0 1 2)", success(1)),
            ("(if \"\" 1 2)", success(1)),
            ("(if () 1 2)", success(1)),
            ("(if [] 1 2)", success(1)),
            ("(if false 1)", EvalResult(nil())),
            ("(if true)", EvalResult(nil())),
            ("(if true 1 undefined-sym)", success(1)),
            ("(if)", SpecificError("expected 1 arguments, got 0")),
            ("(if 1 2 3 4)", SpecificError("expected 3 arguments, got 4")),
            // fn*
            ("((fn* (a b) (+ a b)) 2 3)", success(5)),
            ("((fn* [a] a) 1)", success(1)),
            ("((fn* () 9))", success(9)),
            ("((fn* (& xs) xs) 1 2 3)", success([1, 2, 3])),
            ("((fn* (& xs) xs))", EvalResult(list(vec![]))),
            ("((fn* (a & xs) (count xs)) 1 2 3)", success(2)),
            ("(fn* x 1)", SpecificError("non-vector and non-list arglist: 'x'")),
            ("(fn* (a 1) a)", SpecificError("non-symbol arg name: '1'")),
            ("((fn* (a &) a) 1)", SpecificError("must be followed by a parameter name")),
            ("((fn* (a) a))", SpecificError("expected 1 arguments, got 0")),
            ("((fn* (a) a) 1 2)", SpecificError("expected 1 arguments, got 2")),
            ("((fn* (a b & r) a) 1)", SpecificError("expected 2 arguments, got 1")),
            ("(fn* (a))", AnyError),
            // quote
            ("(quote (1 b))", EvalResult(list(vec![val(1), sym("b")]))),
            ("'x", EvalResult(sym("x"))),
            ("'(+ 1 2)", EvalResult(list(vec![sym("+"), val(1), val(2)]))),
            ("(quote)", SpecificError("expected 1 arguments, got 0")),
            // application
            ("(1 2)", SpecificError("Tried to call the non-function: '1'")),
            ("(\"f\")", SpecificError("Tried to call the non-function: '\"f\"'")),
            ("(nil)", SpecificError("non-function: 'nil'")),
            ("((list 1 2))", SpecificError("non-function: '(1 2)'")),
            ("(+ 1 (undefined))", SpecificError("no variable value for the symbol 'undefined'")),
            // unimplemented reader-macro targets are ordinary unbound symbols
            ("`a", SpecificError("'quasiquote'")),
            ("@a", SpecificError("'deref'")),
            // not (bootstrap)
            ("(not false)", success(true)),
            ("(not nil)", success(true)),
            ("(not 1)", success(false)),
            ("(not)", AnyError),
        ];

        run_comprehensive_tests(test_cases);
    }

    #[test]
    fn test_shared_environment_behaviour() {
        let environments = vec![
            // shadowing
            TestEnvironment(vec![
                ("(def! x 1)", success(1)),
                ("(let* (x 2) x)", success(2)),
                ("(let* (x 2) (let* (x 3) x))", success(3)),
                ("x", success(1)),
                ("(def! x 4)", success(4)),
                ("x", success(4)),
            ]),
            // closure capture: the defining scope wins over the caller's
            TestEnvironment(vec![
                ("(def! f (let* (x 1) (fn* () x)))", EvalOk),
                ("(let* (x 2) (f))", success(1)),
                ("(def! make-adder (fn* (n) (fn* (m) (+ n m))))", EvalOk),
                ("(def! add5 (make-adder 5))", EvalOk),
                ("(add5 10)", success(15)),
                ("((make-adder 1) 1)", success(2)),
            ]),
            // def! inside let* binds in the let* scope, not the root
            TestEnvironment(vec![
                ("(let* (x 1) (def! f (fn* () x)))", EvalOk),
                ("f", SpecificError("There was no variable value for the symbol 'f'")),
                ("(let* (x 1) (do (def! g (fn* () x)) (g)))", success(1)),
                ("(let* (x 1) (do (def! h (fn* () x)) (let* (x 2) (h))))", success(1)),
                ("g", SpecificError("'g'")),
            ]),
            // special forms are matched before lookup, so a binding cannot shadow them
            TestEnvironment(vec![
                ("(def! quote (fn* (a) 99))", EvalOk),
                ("(quote a)", EvalResult(sym("a"))),
                ("'(1 2)", EvalResult(list(vec![val(1), val(2)]))),
                ("(def! if 5)", success(5)),
                ("(if false 1 2)", success(2)),
            ]),
            // closures see later definitions in their scope
            TestEnvironment(vec![
                ("(def! g (fn* () later))", EvalOk),
                ("(g)", SpecificError("'later'")),
                ("(def! later 3)", success(3)),
                ("(g)", success(3)),
            ]),
            // recursion
            TestEnvironment(vec![
                ("(def! fact (fn* (n) (if (<= n 1) 1 (* n (fact (- n 1))))))", EvalOk),
                ("(fact 10)", success(3_628_800)),
                ("(def! sum-to (fn* (n) (if (= n 0) 0 (+ n (sum-to (- n 1))))))", EvalOk),
                ("(sum-to 100)", success(5050)),
                ("(def! fib (fn* (n) (if (< n 2) n (+ (fib (- n 1)) (fib (- n 2))))))", EvalOk),
                ("(fib 15)", success(610)),
            ]),
            // function equality
            TestEnvironment(vec![
                ("(= + +)", success(true)),
                ("(= + -)", success(false)),
                ("(def! h (fn* () 1))", EvalOk),
                ("(= h h)", success(true)),
                ("(= (fn* () 1) (fn* () 1))", success(false)),
            ]),
            // errors inside closures propagate unchanged
            TestEnvironment(vec![
                ("(def! bad (fn* (a) (+ a missing)))", EvalOk),
                ("(bad 1)", SpecificError("There was no variable value for the symbol 'missing'")),
                ("(def! partial-def (do (def! before 1) (undefined) (def! after 2)))", AnyError),
                ("before", success(1)),
                ("after", AnyError),
            ]),
        ];

        run_tests_in_environment(environments);
    }

    #[test]
    fn test_evaluation_depth_limit() {
        let environments = vec![TestEnvironment(vec![
            ("(def! deep (fn* (n) (if (= n 0) 0 (+ 1 (deep (- n 1))))))", EvalOk),
            ("(deep 100)", success(100)),
            ("(deep 100000)", SpecificError("Evaluation depth limit exceeded")),
            ("(def! forever (fn* () (forever)))", EvalOk),
            ("(forever)", SpecificError("Evaluation depth limit exceeded")),
            // the environment stays usable afterwards
            ("(deep 5)", success(5)),
        ])];

        run_tests_in_environment(environments);

        let env = create_global_env().unwrap();
        let expr = read_str("((fn* (f) (f f)) (fn* (f) (f f)))").unwrap();
        assert_eq!(
            eval(&expr, &env),
            Err(crate::Error::StackOverflow {
                limit: MAX_EVAL_DEPTH
            })
        );
    }

    #[test]
    fn test_deeply_nested_values() {
        let environments = vec![TestEnvironment(vec![
            ("(def! nest (fn* (n acc) (if (= n 0) acc (nest (- n 1) (list acc)))))", EvalOk),
            ("(def! big (nest 2000 1))", EvalOk),
            ("(count big)", success(1)),
            ("(list? big)", success(true)),
            ("(= big big)", success(true)),
            ("(= big (nest 2000 1))", success(true)),
            ("(= big (nest 1999 1))", success(false)),
            ("(def! nest-vec (fn* (n acc) (if (= n 0) acc (nest-vec (- n 1) [acc]))))", EvalOk),
            ("(count (nest-vec 2000 nil))", success(1)),
            ("(def! nest-map (fn* (n acc) (if (= n 0) acc (nest-map (- n 1) {:k acc}))))", EvalOk),
            ("(empty? [(nest-map 2000 nil)])", success(false)),
        ])];

        run_tests_in_environment(environments);

        let env = create_global_env().unwrap();
        crate::rep(
            "(def! nest (fn* (n acc) (if (= n 0) acc (nest (- n 1) (list acc)))))",
            &env,
        )
        .unwrap();
        let printed = crate::rep("(nest 2000 1)", &env).unwrap();
        assert_eq!(printed.len(), 2 * 2000 + 1);
        assert!(printed.starts_with("((((") && printed.ends_with("1))))"));

        // clones share the elements instead of copying them
        let big = eval(&read_str("(nest 50 1)").unwrap(), &env).unwrap();
        let copy = big.clone();
        match (&big, &copy) {
            (Value::List(a), Value::List(b)) => assert!(Shared::ptr_eq(a, b)),
            other => panic!("expected lists, got {other:?}"),
        }
    }

    #[test]
    fn test_create_root_env_with_custom_builtins() {
        fn triple(n: i64) -> i64 {
            n * 3
        }

        let builtins = vec![(
            "triple",
            intooperation::IntoOperation::<(i64,)>::into_operation(triple),
        )];
        let env = create_root_env(builtins, Some("(def! nine (triple 3))")).unwrap();
        assert_eq!(env.get(&sym("nine")).unwrap(), val(9));
        // no other builtins are present
        assert!(env.get(&sym("+")).is_err());

        let err = create_root_env(Vec::<(&str, Arc<OperationFn>)>::new(), Some("(oops")).unwrap_err();
        assert_eq!(err.name(), "UnbalancedParensError");

        let empty = create_root_env(Vec::<(String, Arc<OperationFn>)>::new(), None).unwrap();
        assert!(empty.get_all_bindings().is_empty());
    }

    #[test]
    fn test_global_env_contents() {
        let env = create_global_env().unwrap();
        let names: Vec<String> = env.get_all_bindings().into_iter().map(|(n, _)| n).collect();
        for expected in ["+", "-", "*", "/", "=", "<", "count", "list", "not", "prn", "str"] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
        // the registry builds a fresh handle each time
        let other = create_global_env().unwrap();
        assert!(!env.same_scope(&other));
    }
}
