//! Value to text.
//!
//! `readable` printing produces text the reader accepts back (strings are
//! quoted and escaped); raw printing emits string contents verbatim and is
//! what `str` and `println` use.

use crate::ast::{MapKey, Value};
use crate::ensure_sufficient_stack;

/// Render `value` as text
pub fn print_str(value: &Value, readable: bool) -> String {
    let mut out = String::new();
    write_value(&mut out, value, readable);
    out
}

fn write_value(out: &mut String, value: &Value, readable: bool) {
    ensure_sufficient_stack(|| match value {
        Value::Integer(n) => out.push_str(&n.to_string()),
        Value::Symbol(name) => out.push_str(name),
        Value::Keyword(name) => {
            out.push(':');
            out.push_str(name);
        }
        Value::String(s) => write_string(out, s, readable),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Nil => out.push_str("nil"),
        Value::List(items) => write_seq(out, items, readable, '(', ')'),
        Value::Vector(items) => write_seq(out, items, readable, '[', ']'),
        Value::Hashmap(map) => {
            out.push('{');
            for (i, (key, v)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                match key {
                    MapKey::Keyword(k) => {
                        out.push(':');
                        out.push_str(k);
                    }
                    MapKey::String(s) => write_string(out, s, readable),
                }
                out.push(' ');
                write_value(out, v, readable);
            }
            out.push('}');
        }
        Value::Function(_) => out.push_str("#<function>"),
        Value::Comment(_) => {}
    })
}

fn write_seq(out: &mut String, items: &[Value], readable: bool, open: char, close: char) {
    out.push(open);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        write_value(out, item, readable);
    }
    out.push(close);
}

fn write_string(out: &mut String, s: &str, readable: bool) {
    if !readable {
        out.push_str(s);
        return;
    }
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
}
