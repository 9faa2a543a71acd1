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

//! Column views over the `_cat/indices?v` text table.
//!
//! Field positions follow the `_cat/indices` layout:
//! `health status index [uuid] pri rep docs.count docs.deleted store.size pri.store.size`.
//! They are positional only; nothing checks them against the header names.

use crate::render::Painter;

const HEALTH: usize = 0;
const INDEX: usize = 2;
const DOCS_COUNT: usize = 5;
const STORE_SIZE: usize = 7;

/// Output modes of the `index` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    DocsCount,
    List,
    Size,
    Status,
    Verbose,
}

impl View {
    /// Fewest fields a row needs to appear in this view.
    pub fn min_fields(self) -> usize {
        match self {
            View::List | View::Status => INDEX + 1,
            View::DocsCount => DOCS_COUNT + 1,
            View::Size => STORE_SIZE + 1,
            View::Verbose => 0,
        }
    }

    /// Applies the view to a `_cat/indices?v` body, one output line per row.
    ///
    /// The header line is skipped. Rows shorter than [`View::min_fields`]
    /// are dropped. `Verbose` returns the body unchanged as a single item.
    pub fn apply(self, body: &str, painter: &Painter) -> Vec<String> {
        if self == View::Verbose {
            return vec![body.to_string()];
        }

        body.lines()
            .skip(1)
            .filter_map(|line| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                if fields.len() < self.min_fields() {
                    return None;
                }
                Some(self.format_row(&fields, painter))
            })
            .collect()
    }

    fn format_row(self, fields: &[&str], painter: &Painter) -> String {
        match self {
            View::List => fields[INDEX].to_string(),
            View::Size => format!("{:>10} {}", fields[STORE_SIZE], fields[INDEX]),
            View::Status => format!("{:>22} {}", painter.status(fields[HEALTH]), fields[INDEX]),
            View::DocsCount => {
                format!("{:>10} {}", painter.status(fields[DOCS_COUNT]), fields[INDEX])
            }
            View::Verbose => fields.join(" "),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::{coloured, strip_ansi};

    const HEADER: &str = "health status index     pri rep docs.count docs.deleted store.size pri.store.size";

    fn body(rows: &[&str]) -> String {
        let mut lines = vec![HEADER];
        lines.extend_from_slice(rows);
        lines.join("\n")
    }

    #[test]
    fn list_prints_index_names() {
        let text = body(&[
            "yellow open myindex 5 1 1000 0 512kb 512kb",
            "green  open logs-2024 1 0 42 0 8.1mb 8.1mb",
        ]);
        assert_eq!(
            View::List.apply(&text, &Painter::plain()),
            vec!["myindex", "logs-2024"]
        );
    }

    #[test]
    fn size_right_aligns_store_size() {
        let text = body(&[
            "yellow open myindex 5 1 1000 0 512kb 512kb",
            "green open big 1 0 9 0 1.2gb 1.2gb",
            "green open medium 1 0 9 0 30mb 30mb",
        ]);
        let out = View::Size.apply(&text, &Painter::plain());
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], "     512kb myindex");
        assert_eq!(out[1], "     1.2gb big");
        for line in &out {
            let (size, _) = line.split_at(10);
            assert_eq!(size.len(), 10);
            assert_eq!(&line[10..11], " ");
        }
    }

    #[test]
    fn short_rows_are_dropped_without_stopping() {
        let text = body(&[
            "yellow open first 5 1 1000 0 512kb 512kb",
            "red open broken 5",
            "",
            "green open last 1 0 7 0 3kb 3kb",
        ]);
        let out = View::Size.apply(&text, &Painter::plain());
        assert_eq!(out, vec!["     512kb first", "       3kb last"]);

        let listed = View::List.apply(&text, &Painter::plain());
        assert_eq!(listed, vec!["first", "broken", "last"]);
    }

    #[test]
    fn each_view_checks_its_own_minimum() {
        let text = body(&["green open a 1 0 5", "green open b"]);
        let plain = Painter::plain();
        assert_eq!(View::Status.apply(&text, &plain).len(), 2);
        assert_eq!(View::DocsCount.apply(&text, &plain).len(), 1);
        assert!(View::Size.apply(&text, &plain).is_empty());
    }

    #[test]
    fn status_pads_to_twenty_two() {
        let text = body(&["yellow open myindex 5 1 1000 0 512kb 512kb"]);
        let out = View::Status.apply(&text, &Painter::plain());
        assert_eq!(out, vec![format!("{:>22} myindex", "yellow")]);
    }

    #[test]
    fn status_colours_health_column() {
        let text = body(&[
            "red open a 1 0 1 0 1kb 1kb",
            "closed-ish open b 1 0 1 0 1kb 1kb",
        ]);
        let out = View::Status.apply(&text, &coloured());
        assert!(out[0].contains('\x1b'));
        assert!(strip_ansi(&out[0]).trim_start().starts_with("red a"));
        assert_eq!(out[1], format!("{:>22} b", "closed-ish"));
    }

    #[test]
    fn docs_count_prints_count_and_name() {
        let text = body(&["yellow open myindex 5 1 1000 0 512kb 512kb"]);
        let out = View::DocsCount.apply(&text, &coloured());
        assert_eq!(out, vec!["      1000 myindex"]);
    }

    #[test]
    fn verbose_returns_body_verbatim() {
        let text = body(&["yellow open myindex 5 1 1000 0 512kb 512kb", "x"]);
        assert_eq!(View::Verbose.apply(&text, &Painter::plain()), vec![text.clone()]);
    }

    #[test]
    fn empty_body_yields_nothing() {
        assert!(View::List.apply("", &Painter::plain()).is_empty());
        assert!(View::List.apply(HEADER, &Painter::plain()).is_empty());
    }
}
