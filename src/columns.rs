// 🧭 Column Resolver
// Maps whatever headers a feed ships with onto the five canonical roles

use std::fmt;

use crate::error::{EtlError, Result};

// ============================================================================
// ROLES
// ============================================================================

/// Semantic purpose of an input column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRole {
    Country,
    Pathogen,
    YearWeek,
    Indicator,
    Value,
}

impl ColumnRole {
    /// All roles, in the order they are resolved.
    pub const ALL: [ColumnRole; 5] = [
        ColumnRole::Country,
        ColumnRole::Pathogen,
        ColumnRole::YearWeek,
        ColumnRole::Indicator,
        ColumnRole::Value,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ColumnRole::Country => "country",
            ColumnRole::Pathogen => "pathogen",
            ColumnRole::YearWeek => "yearweek",
            ColumnRole::Indicator => "indicator",
            ColumnRole::Value => "value",
        }
    }

    fn index(&self) -> usize {
        match self {
            ColumnRole::Country => 0,
            ColumnRole::Pathogen => 1,
            ColumnRole::YearWeek => 2,
            ColumnRole::Indicator => 3,
            ColumnRole::Value => 4,
        }
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// ALIAS TABLE
// ============================================================================

/// Acceptable header names per role, highest priority first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTable {
    pub country: Vec<String>,
    pub pathogen: Vec<String>,
    pub yearweek: Vec<String>,
    pub indicator: Vec<String>,
    pub value: Vec<String>,
}

impl AliasTable {
    pub fn aliases(&self, role: ColumnRole) -> &[String] {
        match role {
            ColumnRole::Country => &self.country,
            ColumnRole::Pathogen => &self.pathogen,
            ColumnRole::YearWeek => &self.yearweek,
            ColumnRole::Indicator => &self.indicator,
            ColumnRole::Value => &self.value,
        }
    }
}

fn owned(aliases: &[&str]) -> Vec<String> {
    aliases.iter().map(|a| a.to_string()).collect()
}

impl Default for AliasTable {
    /// The ECDC ERVISS naming plus the looser fallbacks seen in mirrors of it.
    fn default() -> Self {
        AliasTable {
            country: owned(&["countryname", "country_name", "country", "countrycode"]),
            pathogen: owned(&["pathogen", "virus", "organism"]),
            yearweek: owned(&["yearweek", "year_week", "iso_week", "week", "date"]),
            indicator: owned(&["indicator", "metric", "measure"]),
            value: owned(&["value", "val", "number"]),
        }
    }
}

// ============================================================================
// COLUMN MAP
// ============================================================================

/// A resolved input column: the header as written and its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub header: String,
    pub position: usize,
}

/// Role → header indirection table, built once per input document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    // indexed by ColumnRole::index
    columns: Vec<ResolvedColumn>,
}

impl ColumnMap {
    pub fn column(&self, role: ColumnRole) -> &ResolvedColumn {
        &self.columns[role.index()]
    }

    /// Original header name chosen for `role`.
    pub fn header(&self, role: ColumnRole) -> &str {
        &self.column(role).header
    }

    pub fn position(&self, role: ColumnRole) -> usize {
        self.column(role).position
    }
}

fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Resolve every role against `headers`.
///
/// For each role the aliases are tried in priority order and the first alias that
/// matches any header (case and surrounding whitespace ignored) wins, so a preferred
/// name such as `countryname` beats a looser `country` wherever it appears.
/// When several headers normalise to the same alias the leftmost one is used.
pub fn resolve_columns<S: AsRef<str>>(headers: &[S], aliases: &AliasTable) -> Result<ColumnMap> {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| normalize_header(h.as_ref()))
        .collect();

    let mut resolved = Vec::with_capacity(ColumnRole::ALL.len());

    for role in ColumnRole::ALL {
        let role_aliases = aliases.aliases(role);
        let found = role_aliases.iter().find_map(|alias| {
            let alias = normalize_header(alias);
            normalized.iter().position(|h| *h == alias)
        });

        match found {
            Some(position) => resolved.push(ResolvedColumn {
                header: headers[position].as_ref().to_string(),
                position,
            }),
            None => {
                return Err(EtlError::MissingColumn {
                    role,
                    aliases: role_aliases.to_vec(),
                    headers: headers.iter().map(|h| h.as_ref().to_string()).collect(),
                })
            }
        }
    }

    Ok(ColumnMap { columns: resolved })
}

// ============================================================================
// TESTS
// ============================================================================
