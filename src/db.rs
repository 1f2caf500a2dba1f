use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;

pub fn connect(path: &str) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

/// Idempotent schema creation, safe to call at the start of every run.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS data (
            council_reference TEXT PRIMARY KEY,
            address           TEXT,
            description       TEXT,
            info_url          TEXT,
            comment_url       TEXT,
            date_scraped      TEXT,
            date_received     TEXT,
            on_notice_from    TEXT,
            on_notice_to      TEXT
        );
        ",
    )?;
    Ok(())
}

/// One development application, keyed by its council reference number.
#[derive(Debug, Clone, Serialize)]
pub struct DevelopmentApplication {
    pub council_reference: String,
    pub address: String,
    pub description: String,
    pub info_url: String,
    pub comment_url: String,
    pub date_scraped: String,
    /// ISO lodgement date, or empty when the portal's value did not parse.
    pub date_received: String,
    pub on_notice_from: Option<String>,
    pub on_notice_to: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
}

/// Replace-on-conflict write: a row with the same reference number is
/// overwritten in full. The outcome is informational, for logging.
pub fn upsert_application(
    conn: &Connection,
    app: &DevelopmentApplication,
) -> Result<UpsertOutcome> {
    let existed: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM data WHERE council_reference = ?1)",
        [&app.council_reference],
        |row| row.get(0),
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO data
         (council_reference, address, description, info_url, comment_url,
          date_scraped, date_received, on_notice_from, on_notice_to)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        rusqlite::params![
            app.council_reference,
            app.address,
            app.description,
            app.info_url,
            app.comment_url,
            app.date_scraped,
            app.date_received,
            app.on_notice_from,
            app.on_notice_to,
        ],
    )?;

    Ok(if existed {
        UpsertOutcome::Replaced
    } else {
        UpsertOutcome::Inserted
    })
}

pub fn fetch_applications(
    conn: &Connection,
    limit: usize,
) -> Result<Vec<DevelopmentApplication>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT council_reference, address, description, info_url, comment_url,
                date_scraped, date_received, on_notice_from, on_notice_to
         FROM data
         ORDER BY date_scraped DESC, council_reference
         LIMIT {}",
        limit
    ))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(DevelopmentApplication {
                council_reference: row.get(0)?,
                address: row.get(1)?,
                description: row.get(2)?,
                info_url: row.get(3)?,
                comment_url: row.get(4)?,
                date_scraped: row.get(5)?,
                date_received: row.get(6)?,
                on_notice_from: row.get(7)?,
                on_notice_to: row.get(8)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub with_received_date: usize,
    pub last_scraped: Option<String>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let total: usize = conn.query_row("SELECT COUNT(*) FROM data", [], |r| r.get(0))?;
    let with_received_date: usize = conn.query_row(
        "SELECT COUNT(*) FROM data WHERE date_received != ''",
        [],
        |r| r.get(0),
    )?;
    let last_scraped: Option<String> =
        conn.query_row("SELECT MAX(date_scraped) FROM data", [], |r| r.get(0))?;
    Ok(Stats {
        total,
        with_received_date,
        last_scraped,
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn app(reference: &str, address: &str) -> DevelopmentApplication {
        DevelopmentApplication {
            council_reference: reference.to_string(),
            address: address.to_string(),
            description: "Carport".to_string(),
            info_url: format!("http://portal.test/detail?ApplicationId={}", reference),
            comment_url: "mailto:planning@example.test".to_string(),
            date_scraped: "2019-03-05".to_string(),
            date_received: "2019-03-01".to_string(),
            on_notice_from: None,
            on_notice_to: None,
        }
    }

    #[test]
    fn init_schema_is_idempotent() {
        let conn = test_conn();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }

    #[test]
    fn upsert_reports_insert_then_replace() {
        let conn = test_conn();
        let a = app("123/4567/18", "1 Smith St");
        assert_eq!(upsert_application(&conn, &a).unwrap(), UpsertOutcome::Inserted);
        assert_eq!(upsert_application(&conn, &a).unwrap(), UpsertOutcome::Replaced);
    }

    #[test]
    fn upsert_same_key_keeps_one_row_with_latest_values() {
        let conn = test_conn();
        upsert_application(&conn, &app("123/4567/18", "1 Smith St")).unwrap();

        let mut updated = app("123/4567/18", "2 Brown Ave");
        updated.description = "Verandah".to_string();
        upsert_application(&conn, &updated).unwrap();

        let rows = fetch_applications(&conn, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].address, "2 Brown Ave");
        assert_eq!(rows[0].description, "Verandah");
    }

    #[test]
    fn distinct_keys_are_distinct_rows() {
        let conn = test_conn();
        upsert_application(&conn, &app("123/4567/18", "1 Smith St")).unwrap();
        upsert_application(&conn, &app("456/7890/18", "9 North Tce")).unwrap();
        assert_eq!(get_stats(&conn).unwrap().total, 2);
    }

    #[test]
    fn stats_track_received_dates_and_last_scrape() {
        let conn = test_conn();
        let mut a = app("123/4567/18", "1 Smith St");
        a.date_received = String::new();
        upsert_application(&conn, &a).unwrap();
        upsert_application(&conn, &app("456/7890/18", "9 North Tce")).unwrap();

        let stats = get_stats(&conn).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.with_received_date, 1);
        assert_eq!(stats.last_scraped.as_deref(), Some("2019-03-05"));
    }
}
