//! Search form state.
//!
//! Holds the five user-editable fields and the few checks applied before a
//! request goes out. Anything beyond those checks (an inverted year range,
//! for example) is passed to the API untouched.

use crate::error::{FetcherError, Result};
use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Allowed results-per-page values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PageSize {
    Ten,
    #[default]
    Twenty,
    Fifty,
    Hundred,
}

impl PageSize {
    pub const ALL: [PageSize; 4] = [
        PageSize::Ten,
        PageSize::Twenty,
        PageSize::Fifty,
        PageSize::Hundred,
    ];

    pub fn get(self) -> u32 {
        match self {
            PageSize::Ten => 10,
            PageSize::Twenty => 20,
            PageSize::Fifty => 50,
            PageSize::Hundred => 100,
        }
    }
}

impl TryFrom<u32> for PageSize {
    type Error = FetcherError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            10 => Ok(PageSize::Ten),
            20 => Ok(PageSize::Twenty),
            50 => Ok(PageSize::Fifty),
            100 => Ok(PageSize::Hundred),
            other => Err(FetcherError::Validation(format!(
                "page size must be one of 10, 20, 50, 100 (got {})",
                other
            ))),
        }
    }
}

impl From<PageSize> for u32 {
    fn from(size: PageSize) -> Self {
        size.get()
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// A single field edit coming from the form
#[derive(Debug, Clone, PartialEq)]
pub enum FormField {
    Query(String),
    YearFrom(i32),
    YearTo(i32),
    Page(u32),
    PageSize(PageSize),
}

/// Current values of the search form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryForm {
    pub query: String,
    pub year_from: i32,
    pub year_to: i32,
    /// 1-based page number, sent upstream as `start`
    pub page: u32,
    pub page_size: PageSize,
}

impl Default for QueryForm {
    fn default() -> Self {
        Self {
            query: String::new(),
            year_from: 2022,
            year_to: 2024,
            page: 1,
            page_size: PageSize::default(),
        }
    }
}

impl QueryForm {
    /// Apply one field edit. A different page size moves back to page 1.
    pub fn update(&mut self, field: FormField) {
        match field {
            FormField::Query(query) => self.query = query,
            FormField::YearFrom(year) => self.year_from = year,
            FormField::YearTo(year) => self.year_to = year,
            FormField::Page(page) => self.page = page.max(1),
            FormField::PageSize(size) => {
                if size != self.page_size {
                    self.page = 1;
                }
                self.page_size = size;
            }
        }
    }

    /// Combined `date` parameter, e.g. `2022-2024`
    pub fn date_range(&self) -> String {
        format!("{}-{}", self.year_from, self.year_to)
    }

    /// Check the form against the given calendar year.
    pub fn validate_for_year(&self, current_year: i32) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(FetcherError::Validation("query is required".to_string()));
        }
        if self.year_to > current_year {
            return Err(FetcherError::Validation(format!(
                "year to must not be after {}",
                current_year
            )));
        }
        if self.page == 0 {
            return Err(FetcherError::Validation("page starts at 1".to_string()));
        }
        Ok(())
    }

    /// Check the form against today's date
    pub fn validate(&self) -> Result<()> {
        self.validate_for_year(current_year())
    }
}

/// Calendar year in local time; upper bound for the year-to field
pub fn current_year() -> i32 {
    Local::now().year()
}
