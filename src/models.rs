//! Parsed search results.
//!
//! Everything here is produced once from the upstream JSON and never mutated.

use serde::Serialize;

/// Whether the article is open access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Access {
    Open,
    Closed,
}

impl Access {
    pub fn from_flag(open: bool) -> Self {
        if open {
            Access::Open
        } else {
            Access::Closed
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Access::Open => "Open",
            Access::Closed => "Closed",
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, Access::Open)
    }
}

/// Author field as resolved at parse time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Authors {
    Absent,
    Single(String),
    Many(Vec<String>),
}

impl Authors {
    /// Build from a list of names, collapsing 0 and 1 element lists
    pub fn from_names(mut names: Vec<String>) -> Self {
        names.retain(|n| !n.trim().is_empty());
        match names.len() {
            0 => Authors::Absent,
            1 => Authors::Single(names.remove(0)),
            _ => Authors::Many(names),
        }
    }

    /// Names in source order
    pub fn names(&self) -> Vec<&str> {
        match self {
            Authors::Absent => Vec::new(),
            Authors::Single(name) => vec![name.as_str()],
            Authors::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }

    /// Semicolon-joined names, empty when absent
    pub fn joined(&self) -> String {
        self.names().join("; ")
    }
}

/// One `link` element of an entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    /// Relation, e.g. `self` or `scidir`
    pub rel: String,
    pub href: String,
}

/// Relations tried, in order, when picking the title link
pub const TITLE_LINK_RELATIONS: &[&str] = &["scidir", "self"];

/// A single search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchEntry {
    /// `dc:identifier`, unique per result
    pub identifier: String,
    pub access: Access,
    pub title: String,
    pub authors: Authors,
    pub publication_name: String,
    pub volume: Option<String>,
    pub cover_date: String,
    pub starting_page: Option<String>,
    pub ending_page: Option<String>,
    pub doi: String,
    pub pii: String,
    /// `prism:url`, the API self reference
    pub api_url: Option<String>,
    pub links: Vec<Link>,
}

impl SearchEntry {
    /// Link with the given relation, if present
    pub fn link(&self, rel: &str) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel == rel && !l.href.is_empty())
            .map(|l| l.href.as_str())
    }

    /// Target for the title hyperlink: the article page, then the API self
    /// link, then `prism:url`.
    pub fn title_link(&self) -> Option<&str> {
        TITLE_LINK_RELATIONS
            .iter()
            .find_map(|rel| self.link(rel))
            .or_else(|| self.api_url.as_deref().filter(|u| !u.is_empty()))
    }

    /// `start-end` page range when both ends are known
    pub fn page_range(&self) -> Option<String> {
        match (&self.starting_page, &self.ending_page) {
            (Some(start), Some(end)) => Some(format!("{}-{}", start, end)),
            (Some(start), None) => Some(start.clone()),
            _ => None,
        }
    }
}

/// One page of results plus the overall hit count
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchPage {
    pub total: u64,
    pub entries: Vec<SearchEntry>,
}

#[cfg(test)]
pub(crate) fn sample_entry(id: &str, open: bool) -> SearchEntry {
    SearchEntry {
        identifier: format!("SCOPUS_ID:{}", id),
        access: Access::from_flag(open),
        title: format!("Article {}", id),
        authors: Authors::from_names(vec!["A. Author".to_string()]),
        publication_name: "Journal of Tests".to_string(),
        volume: Some("12".to_string()),
        cover_date: "2023-05-01".to_string(),
        starting_page: None,
        ending_page: None,
        doi: format!("10.1016/j.test.{}", id),
        pii: format!("S0000{}", id),
        api_url: None,
        links: vec![
            Link {
                rel: "self".to_string(),
                href: format!("https://api.elsevier.com/content/article/pii/S0000{}", id),
            },
            Link {
                rel: "scidir".to_string(),
                href: format!("https://www.sciencedirect.com/science/article/pii/S0000{}", id),
            },
        ],
    }
}
