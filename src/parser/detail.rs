use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

// Day may drop its leading zero; month and year may not.
static LODGEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}/\d{2}/\d{4}$").unwrap());

/// Raw field values lifted from one application detail page. Empty
/// strings stand in for absent structure; nothing here is fatal.
#[derive(Debug, Default, PartialEq)]
pub struct Detail {
    pub address: String,
    pub description: String,
    pub received_raw: String,
}

pub fn extract_detail(html: &Html) -> Detail {
    Detail {
        address: first_data_row_text(html, "Address"),
        description: label_sibling_text(html, "Description"),
        received_raw: label_sibling_text(html, "Lodgement Date"),
    }
}

/// Joined cell text of the first data row of the table headed by `label`.
fn first_data_row_text(html: &Html, label: &str) -> String {
    let table_sel = Selector::parse("table").unwrap();
    let th_sel = Selector::parse("th").unwrap();
    let row_sel = Selector::parse("tr.normalRow").unwrap();
    let td_sel = Selector::parse("td").unwrap();

    for table in html.select(&table_sel) {
        if !table.select(&th_sel).any(|th| element_text(th).contains(label)) {
            continue;
        }
        if let Some(row) = table.select(&row_sel).next() {
            let cells: Vec<String> = row
                .select(&td_sel)
                .map(element_text)
                .filter(|t| !t.is_empty())
                .collect();
            return cells.join(" ");
        }
    }
    String::new()
}

/// Text of the cell immediately following the header cell whose label
/// contains `label`.
fn label_sibling_text(html: &Html, label: &str) -> String {
    let header_sel = Selector::parse("td.headerColumn").unwrap();
    for td in html.select(&header_sel) {
        if !element_text(td).contains(label) {
            continue;
        }
        if let Some(next) = td.next_siblings().filter_map(ElementRef::wrap).next() {
            return element_text(next);
        }
    }
    String::new()
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Normalize a portal lodgement date ("5/03/2019" or "05/03/2019") to
/// ISO. Unparseable input yields an empty string, not an error; the
/// record is still worth keeping without it.
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    if !LODGEMENT_RE.is_match(raw) {
        return String::new();
    }
    NaiveDate::parse_from_str(raw, "%d/%m/%Y")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

// ── Tests ──
