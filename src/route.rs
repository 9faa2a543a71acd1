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

//! Route table mapping `(family, subcommand)` pairs to API paths.
//!
//! Every entry carries two function values: one that turns the positional
//! arguments into the path appended to the base URL, and one that picks the
//! renderer for the response. The dispatcher checks the table against the
//! clap command tree at startup, so every subcommand the CLI exposes has a
//! route.

use crate::table::View;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "http://localhost:9200/";

/// Top-level command families that map onto API routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Cluster,
    Index,
    Node,
    Query,
    Stats,
}

impl Family {
    pub const ALL: [Family; 5] = [
        Family::Cluster,
        Family::Index,
        Family::Node,
        Family::Query,
        Family::Stats,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Family::Cluster => "cluster",
            Family::Index => "index",
            Family::Node => "node",
            Family::Query => "query",
            Family::Stats => "stats",
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Family {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Family::ALL
            .into_iter()
            .find(|family| family.name() == s)
            .ok_or_else(|| RouteError::UnknownFamily(s.to_string()))
    }
}

/// How the body behind a route is turned into output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Render {
    /// Decode as JSON and pretty-print.
    Json,
    /// Print the body verbatim.
    Raw,
    /// Project `_cat/indices` columns through a view.
    Table(View),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("unknown command family '{0}'")]
    UnknownFamily(String),
    #[error("no route defined for '{family} {subcommand}'")]
    MissingRoute { family: Family, subcommand: String },
}

/// A fully-qualified request URL plus the renderer for its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub url: String,
    pub render: Render,
}

type PathFn = fn(&[String]) -> String;
type RenderFn = fn(&[String]) -> Render;

#[derive(Clone, Copy)]
struct Entry {
    family: Family,
    subcommand: &'static str,
    path: PathFn,
    render: RenderFn,
}

/// Subcommand name used for families that take no subcommand (`query`).
pub const BARE: &str = "";

static ENTRIES: &[Entry] = &[
    Entry {
        family: Family::Cluster,
        subcommand: "health",
        path: |_| "_cluster/health".to_string(),
        render: |_| Render::Json,
    },
    Entry {
        family: Family::Cluster,
        subcommand: "state",
        path: |args| format!("_cluster/state/{}", args.join(",")),
        render: |_| Render::Json,
    },
    Entry {
        family: Family::Cluster,
        subcommand: "stats",
        path: |_| "_cluster/stats/".to_string(),
        render: |_| Render::Json,
    },
    Entry {
        family: Family::Index,
        subcommand: "docs-count",
        path: |_| CAT_INDICES.to_string(),
        render: |_| Render::Table(View::DocsCount),
    },
    Entry {
        family: Family::Index,
        subcommand: "list",
        path: |_| CAT_INDICES.to_string(),
        render: |_| Render::Table(View::List),
    },
    Entry {
        family: Family::Index,
        subcommand: "size",
        path: |_| CAT_INDICES.to_string(),
        render: |_| Render::Table(View::Size),
    },
    Entry {
        family: Family::Index,
        subcommand: "status",
        path: |_| CAT_INDICES.to_string(),
        render: |_| Render::Table(View::Status),
    },
    Entry {
        family: Family::Index,
        subcommand: "verbose",
        path: |_| CAT_INDICES.to_string(),
        render: |_| Render::Table(View::Verbose),
    },
    Entry {
        family: Family::Node,
        subcommand: "list",
        path: |_| "_nodes/_all/host,ip".to_string(),
        render: |_| Render::Json,
    },
    Entry {
        family: Family::Node,
        subcommand: "stats",
        path: |args| format!("_nodes/_all/stats/{}", args.join(",")),
        render: |_| Render::Json,
    },
    Entry {
        family: Family::Query,
        subcommand: BARE,
        path: |args| args.first().cloned().unwrap_or_default(),
        render: |args| query_render(args.first().map(String::as_str).unwrap_or_default()),
    },
    Entry {
        family: Family::Stats,
        subcommand: "size",
        path: |_| "_stats/index,store".to_string(),
        render: |_| Render::Json,
    },
];

const CAT_INDICES: &str = "_cat/indices?v";

/// `_cat` endpoints answer in text, everything else in JSON.
pub fn is_cat_path(path: &str) -> bool {
    path.contains("_cat/")
}

fn query_render(path: &str) -> Render {
    if is_cat_path(path) {
        Render::Raw
    } else {
        Render::Json
    }
}

/// Builds the route for a command.
///
/// The base URL is prefixed verbatim. A pair with no entry resolves to the
/// base URL alone with the JSON renderer; the CLI never reaches that branch
/// because [`validate`] rejects a command tree with uncovered subcommands.
pub fn build(base_url: &str, family: Family, subcommand: &str, args: &[String]) -> Route {
    match lookup(family, subcommand) {
        Some(entry) => Route {
            url: format!("{base_url}{}", (entry.path)(args)),
            render: (entry.render)(args),
        },
        None => {
            tracing::warn!(%family, subcommand, "no route defined, falling back to base URL");
            Route {
                url: base_url.to_string(),
                render: Render::Json,
            }
        }
    }
}

pub fn has_route(family: Family, subcommand: &str) -> bool {
    lookup(family, subcommand).is_some()
}

fn lookup(family: Family, subcommand: &str) -> Option<&'static Entry> {
    ENTRIES
        .iter()
        .find(|entry| entry.family == family && entry.subcommand == subcommand)
}

/// Checks that every subcommand of every route family in `cmd` has an entry.
///
/// Families without subcommands (such as `query`) must have a [`BARE`] entry.
/// Commands that are not route families (`configure`, `completion`, ...)
/// are ignored.
pub fn validate(cmd: &clap::Command) -> Result<(), RouteError> {
    for family_cmd in cmd.get_subcommands() {
        let Ok(family) = family_cmd.get_name().parse::<Family>() else {
            continue;
        };

        if family_cmd.has_subcommands() {
            for sub in family_cmd.get_subcommands() {
                let name = sub.get_name();
                if !has_route(family, name) {
                    return Err(RouteError::MissingRoute {
                        family,
                        subcommand: name.to_string(),
                    });
                }
            }
        } else if !has_route(family, BARE) {
            return Err(RouteError::MissingRoute {
                family,
                subcommand: BARE.to_string(),
            });
        }
    }
    Ok(())
}
