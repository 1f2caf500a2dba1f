use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use scraper::Html;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::db::{self, DevelopmentApplication, UpsertOutcome};
use crate::fetcher::Fetch;
use crate::parser::{detail, listing};
use crate::postback::PostbackState;

/// Counters for one completed run. Pages and candidates that fail are
/// counted and skipped; they never abort the run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub pages: usize,
    pub pages_failed: usize,
    pub candidates: usize,
    pub saved: usize,
    pub no_address: usize,
    pub failed: usize,
}

/// Per-candidate outcome, kept as an explicit tag so policy skips stay
/// distinguishable from fetch failures in the counters.
enum CandidateOutcome {
    Saved(UpsertOutcome),
    NoAddress,
}

/// Walk every result page of the portal and upsert each application with
/// a usable address.
///
/// Pages are fetched strictly in order: the pager is stateful server-side
/// and every page past the first is requested by replaying page 1's
/// postback tokens. Only schema initialization and the first-page fetch
/// are fatal; later failures are logged and skipped.
pub async fn run<F: Fetch>(
    cfg: &Config,
    fetcher: &F,
    conn: &Connection,
    max_pages: Option<usize>,
) -> Result<RunStats> {
    db::init_schema(conn).context("failed to initialize application store")?;

    let first_body = fetcher
        .get(&cfg.listing_url)
        .await
        .with_context(|| format!("failed to fetch first listing page {}", cfg.listing_url))?;

    let (mut page_count, state, first_candidates) = {
        let doc = Html::parse_document(&first_body);
        (
            listing::count_pages(&doc),
            PostbackState::capture(&doc),
            listing::extract_candidates(&doc),
        )
    };
    if let Some(cap) = max_pages {
        page_count = page_count.min(cap.max(1));
    }

    let state = match state {
        Ok(state) => Some(state),
        Err(e) => {
            if page_count > 1 {
                warn!("no postback tokens on first page, processing page 1 only: {e:#}");
            }
            None
        }
    };

    info!(pages = page_count, "scanning result pages");
    let pb = ProgressBar::new(page_count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} page {pos}/{len}")?
            .progress_chars("=> "),
    );

    let scrape_date = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
    let mut stats = RunStats::default();

    for page_index in 1..=page_count {
        let candidates = if page_index == 1 {
            first_candidates.clone()
        } else {
            let Some(state) = &state else {
                stats.pages_failed += 1;
                pb.inc(1);
                continue;
            };
            pause(cfg).await;
            match fetcher
                .post_form(&cfg.listing_url, &state.page_request(page_index))
                .await
            {
                Ok(body) => {
                    let doc = Html::parse_document(&body);
                    listing::extract_candidates(&doc)
                }
                Err(e) => {
                    // This page's candidates are lost for this run.
                    warn!(page = page_index, "postback fetch failed, skipping page: {e:#}");
                    stats.pages_failed += 1;
                    pb.inc(1);
                    continue;
                }
            }
        };
        stats.pages += 1;

        for candidate in candidates {
            if !listing::is_valid_reference(&candidate) {
                debug!(text = %candidate, "grid link is not a reference number");
                continue;
            }
            stats.candidates += 1;

            pause(cfg).await;
            match process_candidate(cfg, fetcher, conn, &candidate, &scrape_date).await {
                Ok(CandidateOutcome::Saved(outcome)) => {
                    stats.saved += 1;
                    if outcome == UpsertOutcome::Inserted {
                        info!(reference = %candidate, "inserted new application");
                    }
                }
                Ok(CandidateOutcome::NoAddress) => {
                    debug!(reference = %candidate, "no address on detail page, not persisting");
                    stats.no_address += 1;
                }
                Err(e) => {
                    warn!(reference = %candidate, "skipping candidate: {e:#}");
                    stats.failed += 1;
                }
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();
    info!(
        pages = stats.pages,
        saved = stats.saved,
        failed = stats.failed,
        "run complete"
    );
    Ok(stats)
}

/// Fetch and parse one detail page, upserting when the address is usable.
/// A record is written whole or not at all.
async fn process_candidate<F: Fetch>(
    cfg: &Config,
    fetcher: &F,
    conn: &Connection,
    reference: &str,
    scrape_date: &str,
) -> Result<CandidateOutcome> {
    let url = cfg.detail_url(reference);
    let body = fetcher
        .get(&url)
        .await
        .with_context(|| format!("failed to fetch detail page {}", url))?;

    let detail = {
        let doc = Html::parse_document(&body);
        detail::extract_detail(&doc)
    };
    if detail.address.is_empty() {
        return Ok(CandidateOutcome::NoAddress);
    }

    let app = DevelopmentApplication {
        council_reference: reference.to_string(),
        address: detail.address,
        description: detail.description,
        info_url: url,
        comment_url: cfg.comment_url.clone(),
        date_scraped: scrape_date.to_string(),
        date_received: detail::normalize_date(&detail.received_raw),
        on_notice_from: None,
        on_notice_to: None,
    };
    let outcome = db::upsert_application(conn, &app)?;
    Ok(CandidateOutcome::Saved(outcome))
}

async fn pause(cfg: &Config) {
    if cfg.delay_ms > 0 {
        sleep(Duration::from_millis(cfg.delay_ms)).await;
    }
}

// ── Tests ──
