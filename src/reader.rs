//! Text to [`Value`] trees.
//!
//! Reading happens in two passes. [`tokenize`] splits the source into borrowed
//! tokens with `nom` combinators, without checking balance. A [`Reader`] then
//! walks the token vector forward-only and builds forms, expanding reader
//! macros (`'x` becomes `(quote x)` and so on) as it goes.

use std::collections::BTreeMap;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, opt, recognize},
    sequence::pair,
};
use tracing::trace;

use crate::ast::{MapKey, NumberType, Value, hashmap, list, sym, vector};
use crate::{Error, MAX_PARSE_DEPTH, ParseError, ParseErrorKind};

/// Characters that always stand alone as one-character tokens
const SINGLE_CHAR_TOKENS: &str = "[]{}()'`~^@";

/// Characters that end an atom token
const ATOM_DELIMITERS: &str = "[]{}()'\"`,;";

fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == ','
}

/// Whitespace and commas between tokens
fn separator(input: &str) -> IResult<&str, &str> {
    take_while(is_separator).parse(input)
}

/// A double-quoted string, escapes left in place.
///
/// An unterminated string runs to the end of input; `read_atom` rejects it.
fn string_token(input: &str) -> IResult<&str, &str> {
    let (body, _) = char('"').parse(input)?;
    let mut chars = body.char_indices();
    let mut end = body.len();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '"' => {
                end = i + 1;
                break;
            }
            _ => {}
        }
    }
    let consumed = 1 + end;
    Ok((&input[consumed..], &input[..consumed]))
}

/// `;` up to (not including) the end of line
fn comment_token(input: &str) -> IResult<&str, &str> {
    recognize(pair(char(';'), take_while(|c: char| c != '\n'))).parse(input)
}

fn atom_token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && !ATOM_DELIMITERS.contains(c)).parse(input)
}

fn token(input: &str) -> IResult<&str, &str> {
    alt((
        tag("~@"),
        recognize(one_of(SINGLE_CHAR_TOKENS)),
        string_token,
        comment_token,
        atom_token,
    ))
    .parse(input)
}

/// Convert nom errors to a reader error with the position of the failure
fn token_error(input: &str, error: nom::Err<nom::error::Error<&str>>) -> Error {
    let message = match error {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let position = input.len().saturating_sub(e.input.len());
            let near: String = e.input.chars().take(10).collect();
            format!("could not tokenize input at position {position} near '{near}'")
        }
        nom::Err::Incomplete(_) => "incomplete input".into(),
    };
    Error::parse(ParseErrorKind::InvalidToken, message)
}

/// Split source text into tokens.
///
/// Separators (whitespace and commas) are dropped; every other character
/// belongs to exactly one token.
pub fn tokenize(input: &str) -> Result<Vec<&str>, Error> {
    let mut tokens = Vec::new();
    let mut rest = input;
    loop {
        let (after_separator, _) = separator(rest).map_err(|e| token_error(input, e))?;
        if after_separator.is_empty() {
            break;
        }
        let (remaining, tok) = token(after_separator).map_err(|e| token_error(input, e))?;
        if !tok.is_empty() {
            tokens.push(tok);
        }
        rest = remaining;
    }
    trace!(?tokens, "tokenize");
    Ok(tokens)
}

/// Forward-only cursor over a token vector
#[derive(Debug)]
pub struct Reader<'a> {
    tokens: Vec<&'a str>,
    position: usize,
}

impl<'a> Reader<'a> {
    pub fn new(tokens: Vec<&'a str>) -> Self {
        Reader {
            tokens,
            position: 0,
        }
    }

    /// The current token, if any
    pub fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.position).copied()
    }

    /// The current token; advances past it
    pub fn next_token(&mut self) -> Result<&'a str, Error> {
        let tok = self.peek().ok_or_else(no_more_input)?;
        self.position += 1;
        Ok(tok)
    }
}

fn no_more_input() -> Error {
    Error::parse(
        ParseErrorKind::NoMoreInput,
        "Reader has passed the end of the input. There are probably unbalanced parens present in the input.",
    )
}

fn invalid_token(token: &str) -> Error {
    Error::Parse(ParseError::new(
        ParseErrorKind::InvalidToken,
        format!("could not parse token: \"{token}\""),
        Some(token.to_owned()),
    ))
}

/// Read one form starting at the reader's current token
pub fn read_form(reader: &mut Reader<'_>, depth: usize) -> Result<Value, Error> {
    if depth > MAX_PARSE_DEPTH {
        return Err(Error::parse(
            ParseErrorKind::TooDeeplyNested,
            format!("Expression too deeply nested (max depth: {MAX_PARSE_DEPTH})"),
        ));
    }

    let form = match reader.peek().ok_or_else(no_more_input)? {
        "(" => list(read_seq(reader, ')', depth)?),
        "[" => vector(read_seq(reader, ']', depth)?),
        "{" => read_hashmap(reader, depth)?,
        tok @ (")" | "]" | "}") => return Err(invalid_token(tok)),
        _ => read_atom(reader, depth)?,
    };
    trace!(depth, %form, "read_form");
    Ok(form)
}

/// Elements between the current opening token and `close`.
///
/// Comments inside the brackets are dropped. Any other closer before `close`
/// leaves the set unbalanced.
fn read_seq(reader: &mut Reader<'_>, close: char, depth: usize) -> Result<Vec<Value>, Error> {
    reader.next_token()?;
    let mut items = Vec::new();
    loop {
        match reader.peek() {
            None => {
                return Err(Error::parse(
                    ParseErrorKind::UnbalancedParens,
                    format!("expected '{close}', got EOF"),
                ));
            }
            Some(tok) if tok.len() == 1 && tok.starts_with(close) => {
                reader.next_token()?;
                return Ok(items);
            }
            Some(tok @ (")" | "]" | "}")) => {
                return Err(Error::Parse(ParseError::new(
                    ParseErrorKind::UnbalancedParens,
                    format!("expected '{close}', got '{tok}'"),
                    Some(tok.to_owned()),
                )));
            }
            Some(tok) if tok.starts_with(';') => {
                reader.next_token()?;
            }
            Some(_) => items.push(read_form(reader, depth + 1)?),
        }
    }
}

fn read_hashmap(reader: &mut Reader<'_>, depth: usize) -> Result<Value, Error> {
    let mut elements = read_seq(reader, '}', depth)?.into_iter();
    let mut map = BTreeMap::new();
    while let Some(element) = elements.next() {
        let key = MapKey::try_from(&element).map_err(|bad| {
            Error::Parse(ParseError::new(
                ParseErrorKind::BadHashmapKey,
                format!("Hashmap key must be a keyword or string, got '{bad}'"),
                Some(bad.to_string()),
            ))
        })?;
        let value = elements.next().ok_or_else(|| {
            Error::Parse(ParseError::new(
                ParseErrorKind::UnbalancedHashmap,
                format!(
                    "Hashmap did not have a value for each key. Key without value was '{element}'."
                ),
                Some(element.to_string()),
            ))
        })?;
        map.insert(key, value);
    }
    Ok(hashmap(map))
}

/// `(name form)` for the single-form reader macros
fn reader_macro(name: &str, reader: &mut Reader<'_>, depth: usize) -> Result<Value, Error> {
    let form = read_form(reader, depth + 1)?;
    Ok(list(vec![sym(name), form]))
}

fn is_integer(token: &str) -> bool {
    all_consuming(recognize(pair(opt(char::<&str, ()>('-')), digit1)))
        .parse(token)
        .is_ok()
}

/// Strip the quotes of a string token and decode `\n`, `\\` and `\"`.
///
/// Any other escaped character stands for itself.
fn read_string(token: &str) -> Result<Value, Error> {
    let mut chars = token.chars().skip(1);
    let mut decoded = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => decoded.push('\n'),
                Some(escaped) => decoded.push(escaped),
                None => break,
            },
            '"' => return Ok(Value::String(decoded)),
            c => decoded.push(c),
        }
    }
    Err(Error::Parse(ParseError::new(
        ParseErrorKind::InvalidToken,
        "expected '\"', got EOF",
        Some(token.to_owned()),
    )))
}

/// Read a reader macro or a single atom
pub fn read_atom(reader: &mut Reader<'_>, depth: usize) -> Result<Value, Error> {
    let token = reader.next_token()?;

    let atom = match token {
        "'" => reader_macro("quote", reader, depth)?,
        "`" => reader_macro("quasiquote", reader, depth)?,
        "~@" => reader_macro("splice-unquote", reader, depth)?,
        "~" => reader_macro("unquote", reader, depth)?,
        "@" => reader_macro("deref", reader, depth)?,
        "^" => {
            let meta = read_form(reader, depth + 1)?;
            let form = read_form(reader, depth + 1)?;
            list(vec![sym("with-meta"), form, meta])
        }
        _ if is_integer(token) => token
            .parse::<NumberType>()
            .map(Value::Integer)
            .map_err(|_| invalid_token(token))?,
        _ if token.starts_with('"') => read_string(token)?,
        _ if token.len() > 1
            && token.starts_with(':')
            && !token[1..].starts_with(|c: char| c.is_ascii_digit()) =>
        {
            Value::Keyword(token[1..].to_owned())
        }
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "nil" => Value::Nil,
        _ if token.starts_with(';') => Value::Comment(token.to_owned()),
        _ if !token.starts_with(|c: char| c.is_ascii_digit()) => Value::Symbol(token.to_owned()),
        _ => return Err(invalid_token(token)),
    };
    trace!(token, ?atom, "read_atom");
    Ok(atom)
}

/// Read the first form of `input`; any trailing tokens are ignored
pub fn read_str(input: &str) -> Result<Value, Error> {
    let mut reader = Reader::new(tokenize(input)?);
    read_form(&mut reader, 0)
}

/// Read every top-level form of `input` in order
pub fn read_all(input: &str) -> Result<Vec<Value>, Error> {
    let mut reader = Reader::new(tokenize(input)?);
    let mut forms = Vec::new();
    while reader.peek().is_some() {
        forms.push(read_form(&mut reader, 0)?);
    }
    Ok(forms)
}
