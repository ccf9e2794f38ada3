//! HTML rendering for the search page.
//!
//! Everything here is a pure function of a [`SearchSession`] snapshot.

use crate::models::{Authors, SearchEntry};
use crate::pagination::PageWindow;
use crate::query::{current_year, PageSize, QueryForm};
use crate::session::SearchSession;

/// When the results table collapses to a single "nothing found" row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaceholderPolicy {
    /// Fewer than two results (a lone result is hidden too)
    #[default]
    BelowTwo,
    /// Only an empty result list
    EmptyOnly,
}

impl PlaceholderPolicy {
    pub fn shows_placeholder(self, count: usize) -> bool {
        match self {
            PlaceholderPolicy::BelowTwo => count < 2,
            PlaceholderPolicy::EmptyOnly => count == 0,
        }
    }
}

/// Page-level render settings
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub placeholder: PlaceholderPolicy,
    /// Upper bound for the year-to input
    pub max_year: i32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            placeholder: PlaceholderPolicy::default(),
            max_year: current_year(),
        }
    }
}

/// Column headers of the results table
pub const COLUMNS: &[&str] = &[
    "Access",
    "Title",
    "Authors",
    "Publication",
    "Volume",
    "Cover date",
    "DOI",
    "PII",
];

const PLACEHOLDER_TEXT: &str = "Nothing found";

/// Full HTML document for the current session state.
pub fn render_page(session: &SearchSession, options: &RenderOptions) -> String {
    let status = render_status(session);
    let pagination = session
        .page_window()
        .map(|window| render_pagination(&window, session.is_busy()))
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>ScienceDirect Fetcher</title>
    <style>{css}</style>
</head>
<body>
    <h1>ScienceDirect Fetcher</h1>
    <form method="post" action="/search">
        {form}
        {pagination}
    </form>
    {status}
    <table>
        <thead><tr>{headers}</tr></thead>
        <tbody>{rows}</tbody>
    </table>
</body>
</html>"#,
        css = CSS,
        form = render_form(session.form(), session.is_busy(), options.max_year),
        pagination = pagination,
        status = status,
        headers = COLUMNS
            .iter()
            .map(|c| format!("<th>{}</th>", c))
            .collect::<String>(),
        rows = render_rows(session.results(), options.placeholder),
    )
}

/// Query, year range, page size and the submit button.
pub fn render_form(form: &QueryForm, busy: bool, max_year: i32) -> String {
    let options: String = PageSize::ALL
        .iter()
        .map(|size| {
            let selected = if *size == form.page_size { " selected" } else { "" };
            format!(r#"<option value="{0}"{1}>{0}</option>"#, size, selected)
        })
        .collect();

    let (disabled, label) = if busy {
        (" disabled", "Searching…")
    } else {
        ("", "Search")
    };

    format!(
        r#"<div class="card">
            <label for="query">Query</label>
            <input id="query" name="query" type="text" required placeholder="Enter query" value="{query}">
            <div class="fields">
                <div>
                    <label for="year_from">From</label>
                    <input id="year_from" name="year_from" type="number" value="{year_from}">
                </div>
                <div>
                    <label for="year_to">To</label>
                    <input id="year_to" name="year_to" type="number" max="{max_year}" value="{year_to}">
                </div>
                <div>
                    <label for="page_size">Count per page</label>
                    <select id="page_size" name="page_size" onchange="this.form.action='/page-size'; this.form.submit()">{options}</select>
                </div>
                <button id="search" type="submit"{disabled}>{label}</button>
            </div>
        </div>"#,
        query = html_escape(&form.query),
        year_from = form.year_from,
        year_to = form.year_to,
        max_year = max_year,
        options = options,
        disabled = disabled,
        label = label,
    )
}

/// Prev / page summary / Next bar.
pub fn render_pagination(window: &PageWindow, busy: bool) -> String {
    let prev_disabled = if busy || !window.has_previous() {
        " disabled"
    } else {
        ""
    };
    let next_disabled = if busy { " disabled" } else { "" };

    format!(
        r#"<div class="pagination">
            <button id="prev" type="submit" formaction="/prev" formnovalidate{prev_disabled}>Prev</button>
            <span id="page-info">Page: {page} of {pages} | {range} of {total}</span>
            <button id="next" type="submit" formaction="/next" formnovalidate{next_disabled}>Next</button>
        </div>"#,
        prev_disabled = prev_disabled,
        page = window.page,
        pages = window.total_pages,
        range = window.range_label(),
        total = window.total,
        next_disabled = next_disabled,
    )
}

fn render_status(session: &SearchSession) -> String {
    if session.is_busy() {
        r#"<p class="status">Searching…</p>"#.to_string()
    } else if let Some(message) = session.last_error() {
        format!(
            r#"<p class="status status-error">{}</p>"#,
            html_escape(message)
        )
    } else {
        String::new()
    }
}

/// Table body rows for a result list.
pub fn render_rows(entries: &[SearchEntry], policy: PlaceholderPolicy) -> String {
    if policy.shows_placeholder(entries.len()) {
        return format!(
            r#"<tr class="placeholder"><td colspan="{}">{}</td></tr>"#,
            COLUMNS.len(),
            PLACEHOLDER_TEXT
        );
    }
    entries.iter().map(render_row).collect()
}

/// One result row, keyed by the entry identifier.
pub fn render_row(entry: &SearchEntry) -> String {
    let access = entry.access;
    let class = if access.is_open() { "open" } else { "closed" };

    let title = match entry.title_link() {
        Some(href) => format!(
            r#"<a class="title" href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
            html_escape(href),
            html_escape(&entry.title)
        ),
        None => format!(r#"<span class="title">{}</span>"#, html_escape(&entry.title)),
    };

    format!(
        r#"<tr class="row-{class}" data-key="{key}">
            <td><span class="tag tag-{class}">{label}</span></td>
            <td>{title}</td>
            <td>{authors}</td>
            <td><span class="venue">{venue}</span></td>
            <td>{volume}</td>
            <td>{date}</td>
            <td>{doi}</td>
            <td>{pii}</td>
        </tr>"#,
        class = class,
        key = html_escape(&entry.identifier),
        label = access.label(),
        title = title,
        authors = render_authors(&entry.authors),
        venue = html_escape(&entry.publication_name),
        volume = html_escape(entry.volume.as_deref().unwrap_or_default()),
        date = html_escape(&entry.cover_date),
        doi = html_escape(&entry.doi),
        pii = html_escape(&entry.pii),
    )
}

fn render_authors(authors: &Authors) -> String {
    match authors {
        Authors::Absent => "None".to_string(),
        _ => authors
            .names()
            .iter()
            .map(|name| format!(r#"<span class="author">{}</span>"#, html_escape(name)))
            .collect(),
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Page styles
pub const CSS: &str = r#"
body { font-family: Arial, sans-serif; margin: 2rem; color: #1d1d1f; }
h1 { margin-bottom: 1.5rem; }
.card { border: 1px solid gray; border-radius: 8px; padding: 1rem; }
.fields { display: flex; gap: 1rem; align-items: flex-end; margin-top: 1rem; }
.fields > div { flex: 1; }
label { display: block; font-weight: 600; margin-bottom: 0.25rem; }
input, select { width: 100%; padding: 0.5rem; box-sizing: border-box; }
button { padding: 0.6rem 1rem; }
.pagination { display: flex; gap: 1rem; align-items: center; margin-top: 1rem; }
.status { color: #666; }
.status-error { color: #9b2c2c; }
table { border-collapse: collapse; margin-top: 1rem; width: 100%; font-size: 0.9rem; }
th, td { text-align: left; padding: 0.4rem; vertical-align: top; }
tr.row-open { background: #f0fff4; }
tr.row-closed { background: #fff5f5; }
.tag { border-radius: 4px; padding: 0.1rem 0.4rem; font-size: 0.8rem; }
.tag-open { background: #c6f6d5; color: #22543d; }
.tag-closed { background: #fed7d7; color: #822727; }
a.title { color: #3182ce; font-size: 1.1rem; line-height: 1.3; }
.author { display: block; }
.venue { display: inline-block; max-width: 200px; }
"#;
