use anyhow::{bail, Result};
use scraper::{Html, Selector};

/// Grid control that owns the pager; its postback event target is fixed
/// for this portal.
const EVENT_TARGET: &str = "ctl00$Content$cusResultsGrid$repWebGrid$ctl00$grdWebGridTabularView";

const EVENT_VALIDATION: &str = "__EVENTVALIDATION";
const VIEW_STATE: &str = "__VIEWSTATE";

/// Opaque WebForms continuation tokens from the first results page.
///
/// The portal pages its grid server-side: the tokens captured from page 1
/// are replayed verbatim for every later page request and never refreshed.
#[derive(Debug, Clone)]
pub struct PostbackState {
    event_validation: String,
    view_state: String,
}

impl PostbackState {
    pub fn capture(html: &Html) -> Result<Self> {
        Ok(Self {
            event_validation: hidden_field(html, EVENT_VALIDATION)?,
            view_state: hidden_field(html, VIEW_STATE)?,
        })
    }

    /// Form body requesting result page `page_index` (2..=page count).
    pub fn page_request(&self, page_index: usize) -> Vec<(String, String)> {
        vec![
            ("__EVENTTARGET".to_string(), EVENT_TARGET.to_string()),
            ("__EVENTARGUMENT".to_string(), format!("Page${}", page_index)),
            (EVENT_VALIDATION.to_string(), self.event_validation.clone()),
            (VIEW_STATE.to_string(), self.view_state.clone()),
        ]
    }
}

/// Value of a named hidden input. The tokens are blobs; they are carried,
/// never parsed.
fn hidden_field(html: &Html, name: &str) -> Result<String> {
    let input_sel = Selector::parse("input").unwrap();
    for input in html.select(&input_sel) {
        if input.attr("name") == Some(name) {
            return Ok(input.attr("value").unwrap_or_default().to_string());
        }
    }
    bail!("no {} hidden field in page", name)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body><form>
            <input type="hidden" name="__VIEWSTATE" value="vs-blob" />
            <input type="hidden" name="__EVENTVALIDATION" value="ev-blob" />
            <input type="submit" name="search" value="Search" />
        </form></body></html>
    "#;

    #[test]
    fn captures_both_tokens() {
        let html = Html::parse_document(PAGE);
        let state = PostbackState::capture(&html).unwrap();
        assert_eq!(state.view_state, "vs-blob");
        assert_eq!(state.event_validation, "ev-blob");
    }

    #[test]
    fn missing_token_is_an_error() {
        let html = Html::parse_document("<html><body><form></form></body></html>");
        assert!(PostbackState::capture(&html).is_err());
    }

    #[test]
    fn page_request_carries_tokens_and_page_argument() {
        let html = Html::parse_document(PAGE);
        let state = PostbackState::capture(&html).unwrap();
        let fields = state.page_request(3);

        let get = |name: &str| {
            fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("__EVENTARGUMENT"), Some("Page$3"));
        assert_eq!(get("__EVENTTARGET"), Some(EVENT_TARGET));
        assert_eq!(get("__VIEWSTATE"), Some("vs-blob"));
        assert_eq!(get("__EVENTVALIDATION"), Some("ev-blob"));
    }
}
