use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

static REFERENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{3}/\d{4}/\d{2}$").unwrap());

/// True iff `s` is a council reference number like "123/4567/18".
/// The results grid mixes references with other link text; anything
/// else is skipped without comment.
pub fn is_valid_reference(s: &str) -> bool {
    REFERENCE_RE.is_match(s)
}

/// Number of result pages implied by the grid's pager row.
///
/// The pager's trailing cell is the "next" control, so the page count is
/// the cell count minus one, floored at 1. No pager row means the results
/// fit on a single page.
pub fn count_pages(html: &Html) -> usize {
    let row_sel = Selector::parse("tr.pagerRow").unwrap();
    let td_sel = Selector::parse("td").unwrap();
    match html.select(&row_sel).next() {
        Some(row) => row.select(&td_sel).count().saturating_sub(1).max(1),
        None => 1,
    }
}

/// Trimmed text of every grid cell link on the current page, in document
/// order. Produced fresh per fetched page; nothing is carried across pages.
pub fn extract_candidates(html: &Html) -> Vec<String> {
    let link_sel = Selector::parse("table.grid td a").unwrap();
    html.select(&link_sel)
        .map(|a| a.text().collect::<String>().trim().to_string())
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_reference_format() {
        assert!(is_valid_reference("123/4567/89"));
        assert!(is_valid_reference("000/0000/00"));
    }

    #[test]
    fn invalid_reference_formats() {
        assert!(!is_valid_reference("12/4567/89"));
        assert!(!is_valid_reference("123/4567/890"));
        assert!(!is_valid_reference("abc/4567/89"));
        assert!(!is_valid_reference("123/4567/89 "));
        assert!(!is_valid_reference("123-4567-89"));
        assert!(!is_valid_reference(""));
    }

    #[test]
    fn page_count_is_pager_cells_minus_one() {
        let html = Html::parse_document(
            r#"<table class="grid">
                <tr class="pagerRow"><td>1</td><td>2</td><td>3</td><td>&gt;</td></tr>
            </table>"#,
        );
        assert_eq!(count_pages(&html), 3);
    }

    #[test]
    fn page_count_floors_at_one() {
        let html = Html::parse_document(
            r#"<table class="grid"><tr class="pagerRow"><td>1</td></tr></table>"#,
        );
        assert_eq!(count_pages(&html), 1);
    }

    #[test]
    fn no_pager_means_single_page() {
        let html = Html::parse_document("<table class=\"grid\"><tr><td>no pager</td></tr></table>");
        assert_eq!(count_pages(&html), 1);
    }

    #[test]
    fn candidates_are_trimmed_grid_link_text() {
        let html = Html::parse_document(
            r##"<table class="grid">
                <tr><td><a href="#"> 123/4567/18 </a></td></tr>
                <tr><td><a href="#">More details</a></td></tr>
                <tr><td>no link here</td></tr>
            </table>"##,
        );
        assert_eq!(extract_candidates(&html), vec!["123/4567/18", "More details"]);
    }

    #[test]
    fn candidates_outside_the_grid_are_ignored() {
        let html = Html::parse_document(
            r##"<a href="#">999/9999/99</a><table class="grid"></table>"##,
        );
        assert!(extract_candidates(&html).is_empty());
    }
}
