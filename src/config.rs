const LISTING_URL: &str = "https://eproperty.mitchamcouncil.sa.gov.au/T1PRProd/WebApps/eProperty/P1/eTrack/eTrackApplicationSearchResults.aspx?Field=S&Period=L28&r=P1.WEBGUEST&f=%24P1.ETR.SEARCH.SL28";
const DETAIL_BASE_URL: &str = "https://eproperty.mitchamcouncil.sa.gov.au/T1PRProd/WebApps/eProperty/P1/eTrack/eTrackApplicationDetails.aspx?r=P1.WEBGUEST&f=%24P1.ETR.APPDET.VIW&ApplicationId=";
const COMMENT_URL: &str = "mailto:mitcham@mitchamcouncil.sa.gov.au";
const DB_PATH: &str = "data.sqlite";
const FETCH_DELAY_MS: u64 = 300;

/// Endpoints and tunables for one scrape run, injected into the pipeline
/// so tests can point it at stub documents and a scratch database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Search-results page: GET for page 1, postback POST for later pages.
    pub listing_url: String,
    /// Detail page prefix; the encoded reference number is appended.
    pub detail_base_url: String,
    /// Fixed contact address stored with every record.
    pub comment_url: String,
    pub db_path: String,
    /// Pause between consecutive fetches, in milliseconds.
    pub delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listing_url: LISTING_URL.to_string(),
            detail_base_url: DETAIL_BASE_URL.to_string(),
            comment_url: COMMENT_URL.to_string(),
            db_path: DB_PATH.to_string(),
            delay_ms: FETCH_DELAY_MS,
        }
    }
}

impl Config {
    /// Absolute detail-page URL for a reference number. Slashes in the
    /// reference must survive as %2F, so the whole value is encoded.
    pub fn detail_url(&self, reference: &str) -> String {
        format!("{}{}", self.detail_base_url, urlencoding::encode(reference))
    }
}

// ── Tests ──
