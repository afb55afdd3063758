//! malrs - a small Lisp engine
//!
//! This crate reads textual s-expressions into a [`Value`](ast::Value) tree,
//! evaluates that tree against a chain of lexical scopes and prints results
//! back to text:
//!
//! ```lisp
//! (+ 1 (* 2 3))                    ; => 7
//! (def! double (fn* (n) (* n 2)))  ; => #<function>
//! (let* (x 1 y (+ x 1)) [x y])     ; => [1 2]
//! {:a (+ 1 1) "b" nil}             ; => {:a 2 "b" nil}
//! ```
//!
//! ## Modules
//!
//! - `ast`: the closed [`Value`](ast::Value) sum type and hash-map keys
//! - `reader`: tokenizer and recursive-descent reader with reader macros
//! - `printer`: value to text, readable or raw
//! - `env`: chained scopes with rest-argument binding
//! - `evaluator`: special forms and function application
//! - `builtinops`: the native function registry installed in the root scope
//!
//! The top-level entry point used by an interactive loop is [`rep`].

use thiserror::Error;

/// Maximum reader nesting depth before input is rejected
pub const MAX_PARSE_DEPTH: usize = 512;

/// Maximum evaluation depth before a `StackOverflow` error is raised.
/// Each nested call costs a few levels (application, body, argument evaluation).
pub const MAX_EVAL_DEPTH: usize = 10_000;

/// Remaining stack below which recursion switches to a freshly allocated segment
const RED_ZONE: usize = 100 * 1024;

/// Size of each additional stack segment
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// Run `f`, first moving to a new stack segment if the current one is low.
///
/// Wraps every recursion over value trees (evaluation, printing, equality).
#[inline]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// Categorizes the different kinds of reader failures.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ParseErrorKind {
    /// The reader was asked for a token past the end of input
    NoMoreInput,
    /// A list, vector or hash-map was not closed before the input ended
    UnbalancedParens,
    /// A hash-map key was neither a keyword nor a string
    BadHashmapKey,
    /// A hash-map literal had a key without a value
    UnbalancedHashmap,
    /// A token matched no atom rule (or was a stray closing delimiter)
    InvalidToken,
    /// Nesting exceeded [`MAX_PARSE_DEPTH`]
    TooDeeplyNested,
}

/// A structured error describing a reader failure.
#[derive(Debug, PartialEq, Eq, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// The offending token, if identifiable
    pub found: Option<String>,
}

impl ParseError {
    /// Create a ParseError with all fields
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, found: Option<String>) -> Self {
        ParseError {
            kind,
            message: message.into(),
            found,
        }
    }

    /// Create a ParseError with a kind and message but no token
    pub fn from_message(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None)
    }
}

/// Error types for the interpreter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Cannot lookup the non-symbol {0}")]
    NonSymbolLookup(String),
    #[error("Cannot bind the non-symbol {0}")]
    NonSymbolBinding(String),
    #[error("There was no variable value for the symbol '{0}'")]
    SymbolNotFound(String),
    #[error("Attempted to create a function with the non-vector and non-list arglist: '{0}'")]
    BadArgList(String),
    #[error("Attempted to create a function with the non-symbol arg name: '{0}'")]
    NonSymbolArgName(String),
    #[error("Tried to call the non-function: '{0}'")]
    CalledNonFunction(String),
    #[error("Rest marker '&' must be followed by a parameter name")]
    UnnamedRestArg,
    #[error("expected {expected} arguments, got {got}")]
    ArityError { expected: usize, got: usize },
    #[error("{0}")]
    TypeError(String),
    #[error("{0}")]
    EvalError(String),
    #[error("Evaluation depth limit exceeded (max: {limit})")]
    StackOverflow { limit: usize },
}

impl Error {
    /// Create an ArityError
    pub fn arity_error(expected: usize, got: usize) -> Self {
        Error::ArityError { expected, got }
    }

    /// Shorthand for a parse error without a token
    pub(crate) fn parse(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Error::Parse(ParseError::from_message(kind, message))
    }

    /// The condition name reported alongside the message at the top level
    pub fn name(&self) -> &'static str {
        match self {
            Error::Parse(e) => match e.kind {
                ParseErrorKind::NoMoreInput => "NoMoreInputError",
                ParseErrorKind::UnbalancedParens => "UnbalancedParensError",
                ParseErrorKind::BadHashmapKey => "BadHashmapKeyError",
                ParseErrorKind::UnbalancedHashmap => "UnbalancedHashmapError",
                ParseErrorKind::InvalidToken => "ParseError",
                ParseErrorKind::TooDeeplyNested => "TooDeeplyNestedError",
            },
            Error::NonSymbolLookup(_) => "NonSymbolLookupError",
            Error::NonSymbolBinding(_) => "NonSymbolBindingError",
            Error::SymbolNotFound(_) => "SymbolNotFoundError",
            Error::BadArgList(_) => "BadArgListError",
            Error::NonSymbolArgName(_) => "NonSymbolArgNameError",
            Error::CalledNonFunction(_) => "CalledNonFunctionError",
            Error::UnnamedRestArg => "UnnamedRestArgError",
            Error::ArityError { .. } => "ArityError",
            Error::TypeError(_) => "InvalidArgumentTypeError",
            Error::EvalError(_) => "EvaluationError",
            Error::StackOverflow { .. } => "StackOverflowError",
        }
    }
}

pub mod ast;
pub mod builtinops;
pub mod env;
pub mod evaluator;
pub mod printer;
pub mod reader;

use ast::Value;
use env::Env;

/// Read every form in `line`, evaluate them in order against `env` and
/// return the readable prints of the results joined by a space.
///
/// Comment forms produce no output. The first error aborts the line; forms
/// evaluated before it keep their effects on `env`.
pub fn rep(line: &str, env: &Env) -> Result<String, Error> {
    let forms = reader::read_all(line)?;
    let mut printed = Vec::with_capacity(forms.len());
    for form in &forms {
        let result = evaluator::eval(form, env)?;
        if !matches!(result, Value::Comment(_)) {
            printed.push(printer::print_str(&result, true));
        }
    }
    Ok(printed.join(" "))
}
