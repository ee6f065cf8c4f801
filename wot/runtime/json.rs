//! Deterministic printing of values
//!
//! Objects print their properties in symbol order and arrays their elements in index order, so
//! the same graph always prints the same way. Output is JSON apart from a few placeholders:
//! - Functions print as `"[Function]"`
//! - Things and proxies print as `"thing:<uri>"` and `"proxy:<uri>"`
//! - A composite already being printed prints as `"[Circular]"`
//! - A composite nested deeper than `MAX_PRINT_DEPTH` prints as `"[Deep]"`
//! - Non-finite floats and dangling references print as `null`

use core::fmt::{self, Write};

use wot_gc::{Symbol, TextRef, Value, ValueRef};

use super::{engine::Runtime, registry::RecordId};

/// Composites nested deeper than this are not descended into
pub const MAX_PRINT_DEPTH: usize = 64;

impl Runtime {
    /// Print a value and everything reachable from it
    pub fn stringify(&self, value: ValueRef) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail
        let _ = self.write_json(&mut out, value);
        out
    }

    pub fn write_json(&self, out: &mut impl Write, value: ValueRef) -> fmt::Result {
        Printer {
            rt: self,
            out,
            path: Vec::new(),
        }
        .print(value)
    }
}

struct Printer<'a, W: Write> {
    rt: &'a Runtime,
    out: &'a mut W,

    /// Composites on the way from the printed root to the current value
    path: Vec<ValueRef>,
}

impl<W: Write> Printer<'_, W> {
    fn print(&mut self, value: ValueRef) -> fmt::Result {
        let Some(payload) = self.rt.value(value) else {
            return self.out.write_str("null");
        };

        match payload {
            Value::Object(_) | Value::Array(_) if self.path.contains(&value) => {
                self.out.write_str("\"[Circular]\"")
            }
            Value::Object(_) | Value::Array(_) if self.path.len() >= MAX_PRINT_DEPTH => {
                self.out.write_str("\"[Deep]\"")
            }
            Value::Object(_) => {
                self.path.push(value);
                let result = self.print_object(value);
                self.path.pop();
                result
            }
            Value::Array(_) => {
                self.path.push(value);
                let result = self.print_array(value);
                self.path.pop();
                result
            }
            Value::String(text) => self.print_text(text),
            Value::UnsignedInt(n) => write!(self.out, "{}", n),
            Value::SignedInt(n) => write!(self.out, "{}", n),
            Value::Float(x) if x.is_finite() => write!(self.out, "{}", x),
            Value::Float(_) | Value::Null => self.out.write_str("null"),
            Value::Boolean(b) => write!(self.out, "{}", b),
            Value::Function(_) => self.out.write_str("\"[Function]\""),
            Value::Thing(thing) => self.print_record("thing", thing.into()),
            Value::Proxy(proxy) => self.print_record("proxy", proxy.into()),
        }
    }

    fn print_object(&mut self, object: ValueRef) -> fmt::Result {
        let rt = self.rt;
        self.out.write_char('{')?;
        for (i, (symbol, child)) in rt.heap().properties(object).enumerate() {
            if i > 0 {
                self.out.write_char(',')?;
            }
            self.print_name(symbol)?;
            self.out.write_char(':')?;
            self.print(child)?;
        }
        self.out.write_char('}')
    }

    /// Elements missing below the largest index print as `null`
    fn print_array(&mut self, array: ValueRef) -> fmt::Result {
        let rt = self.rt;
        self.out.write_char('[')?;
        let mut next = 0;
        for entry in rt.heap().entries(array) {
            let index = entry.key as usize - 1;
            while next < index {
                self.out.write_str(if next > 0 { ",null" } else { "null" })?;
                next += 1;
            }
            if index > 0 {
                self.out.write_char(',')?;
            }
            self.print(entry.value)?;
            next = index + 1;
        }
        self.out.write_char(']')
    }

    fn print_name(&mut self, symbol: Symbol) -> fmt::Result {
        match self.rt.names().name(symbol) {
            Some(name) => write_escaped(self.out, name),
            None => write!(self.out, "\"#{}\"", symbol.0),
        }
    }

    fn print_text(&mut self, text: TextRef) -> fmt::Result {
        match self.rt.context().texts.get(text) {
            Some(text) => write_escaped(self.out, text),
            None => self.out.write_str("null"),
        }
    }

    fn print_record(&mut self, kind: &str, id: RecordId) -> fmt::Result {
        match self.rt.registry().record(id) {
            Some(record) => write_escaped(self.out, &format!("{}:{}", kind, record.uri())),
            None => self.out.write_str("null"),
        }
    }
}

fn write_escaped(out: &mut impl Write, text: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in text.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\r' => out.write_str("\\r")?,
            '\t' => out.write_str("\\t")?,
            c if (c as u32) < 0x20 => write!(out, "\\u{:04x}", c as u32)?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}
