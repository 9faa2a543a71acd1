// elastic - command line tool to query the Elasticsearch REST API
// Copyright (C) 2024 Mathias Uhl <mathiasuhl@gmx.de>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Terminal rendering: the colour capability and the pretty JSON printer.

use colored::{ColoredString, Colorize};
use serde_json::Value;

const INDENT: &str = "  ";

/// Decides whether output is coloured.
///
/// Both the JSON renderer and the table views take a `Painter`; a disabled
/// painter returns every string untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Painter {
    enabled: bool,
}

impl Painter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    #[cfg(test)]
    pub fn plain() -> Self {
        Self::new(false)
    }

    /// Colours a cluster/index health value. Unknown values pass through.
    pub fn status(&self, status: &str) -> String {
        match status {
            "red" => self.paint(status, |s| s.red()),
            "green" => self.paint(status, |s| s.green()),
            "yellow" => self.paint(status, |s| s.yellow()),
            _ => status.to_string(),
        }
    }

    fn paint(&self, text: &str, style: impl FnOnce(&str) -> ColoredString) -> String {
        if self.enabled {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn key(&self, text: &str) -> String {
        self.paint(text, |s| s.blue().bold())
    }

    fn string(&self, text: &str) -> String {
        self.paint(text, |s| s.green().bold())
    }

    fn number(&self, text: &str) -> String {
        self.paint(text, |s| s.cyan().bold())
    }

    fn boolean(&self, text: &str) -> String {
        self.paint(text, |s| s.yellow().bold())
    }

    fn null(&self) -> String {
        self.paint("null", |s| s.black().bold())
    }
}

/// Renders `value` as indented JSON, two spaces per level.
pub fn render_json(value: &Value, painter: &Painter) -> String {
    let mut out = String::new();
    write_value(&mut out, value, painter, 0);
    out
}

fn write_value(out: &mut String, value: &Value, painter: &Painter, depth: usize) {
    match value {
        Value::Null => out.push_str(&painter.null()),
        Value::Bool(b) => out.push_str(&painter.boolean(&b.to_string())),
        Value::Number(n) => out.push_str(&painter.number(&n.to_string())),
        Value::String(s) => out.push_str(&painter.string(&quote(s))),
        Value::Array(items) => {
            if items.is_empty() {
                out.push_str("[]");
                return;
            }
            out.push_str("[\n");
            for (i, item) in items.iter().enumerate() {
                push_indent(out, depth + 1);
                write_value(out, item, painter, depth + 1);
                if i + 1 < items.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            push_indent(out, depth);
            out.push(']');
        }
        Value::Object(map) => {
            if map.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push_str("{\n");
            for (i, (key, item)) in map.iter().enumerate() {
                push_indent(out, depth + 1);
                out.push_str(&painter.key(&quote(key)));
                out.push_str(": ");
                write_value(out, item, painter, depth + 1);
                if i + 1 < map.len() {
                    out.push(',');
                }
                out.push('\n');
            }
            push_indent(out, depth);
            out.push('}');
        }
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

fn quote(s: &str) -> String {
    Value::String(s.to_string()).to_string()
}
