// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-decision-point ad metrics backed by SQLite.
//
// Schema:
//   ad_metrics(
//     decision_point TEXT    PRIMARY KEY,
//     last_shown     TEXT,                -- RFC 3339, UTC
//     session_count  INTEGER NOT NULL,
//     daily_count    INTEGER NOT NULL
//   )
//
// Day boundaries are UTC calendar days.  A daily count belonging to an
// earlier day reads as zero even before the next session resets it.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info, instrument};

use smartads_core::error::{Result, SmartAdsError};
use smartads_core::types::DecisionPoint;

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS ad_metrics (
        decision_point TEXT PRIMARY KEY,
        last_shown TEXT,
        session_count INTEGER NOT NULL DEFAULT 0,
        daily_count INTEGER NOT NULL DEFAULT 0
    )
"#;

/// Convert a `rusqlite::Error` into a `SmartAdsError::Database`.
fn db_err(e: rusqlite::Error) -> SmartAdsError {
    SmartAdsError::Database(e.to_string())
}

/// `true` when `current` falls on a later UTC calendar day than `last`.
pub fn started_new_day(last: DateTime<Utc>, current: DateTime<Utc>) -> bool {
    current.date_naive() > last.date_naive()
}

/// Stored counters for one decision point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MetricsRow {
    last_shown: Option<DateTime<Utc>>,
    session_count: i64,
    daily_count: i64,
}

/// Counters read by the show policy and reported to the scripting runtime.
pub struct AdMetrics {
    conn: Connection,
}

impl AdMetrics {
    /// Open (or create) the metrics database at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).map_err(db_err)?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        info!("ad metrics database opened");
        Ok(Self { conn })
    }

    /// Open an in-memory database (tests, or when the data dir is unusable).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("in-memory ad metrics database opened");
        Ok(Self { conn })
    }

    /// When an ad was last closed at `decision_point`.
    pub fn last_shown(&self, decision_point: &DecisionPoint) -> Result<Option<DateTime<Utc>>> {
        Ok(self.row(decision_point)?.and_then(|r| r.last_shown))
    }

    /// Ads shown at `decision_point` during the current session.
    pub fn session_count(&self, decision_point: &DecisionPoint) -> Result<i64> {
        Ok(self.row(decision_point)?.map_or(0, |r| r.session_count))
    }

    /// Ads shown at `decision_point` on the UTC day of `now`.
    pub fn daily_count(&self, decision_point: &DecisionPoint, now: DateTime<Utc>) -> Result<i64> {
        Ok(match self.row(decision_point)? {
            Some(MetricsRow {
                last_shown: Some(last),
                daily_count,
                ..
            }) if !started_new_day(last, now) => daily_count,
            _ => 0,
        })
    }

    /// Stored daily count without the day rollover check. Equals
    /// [`daily_count`](Self::daily_count) until the UTC day changes.
    pub fn recorded_daily_count(&self, decision_point: &DecisionPoint) -> Result<i64> {
        Ok(self.row(decision_point)?.map_or(0, |r| r.daily_count))
    }

    /// Count a completed show at `decision_point`.
    #[instrument(skip(self), fields(decision_point = %decision_point))]
    pub fn record_ad_shown(&self, decision_point: &DecisionPoint, at: DateTime<Utc>) -> Result<()> {
        let previous = self.row(decision_point)?;

        let session_count = previous.map_or(0, |r| r.session_count) + 1;
        let daily_count = match previous {
            Some(MetricsRow {
                last_shown: Some(last),
                daily_count,
                ..
            }) if !started_new_day(last, at) => daily_count + 1,
            _ => 1,
        };

        self.conn
            .execute(
                "INSERT INTO ad_metrics (decision_point, last_shown, session_count, daily_count)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(decision_point) DO UPDATE SET
                     last_shown = excluded.last_shown,
                     session_count = excluded.session_count,
                     daily_count = excluded.daily_count",
                params![
                    decision_point.as_str(),
                    at.to_rfc3339_opts(SecondsFormat::Millis, true),
                    session_count,
                    daily_count,
                ],
            )
            .map_err(db_err)?;

        debug!(session_count, daily_count, "ad show recorded");
        Ok(())
    }

    /// Reset session counters, and daily counters that belong to an earlier
    /// day than `now`.  Returns the number of decision points touched.
    #[instrument(skip(self))]
    pub fn new_session(&self, now: DateTime<Utc>) -> Result<usize> {
        let stale: Vec<String> = {
            let mut stmt = self
                .conn
                .prepare("SELECT decision_point, last_shown FROM ad_metrics")
                .map_err(db_err)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
                })
                .map_err(db_err)?;

            let mut stale = Vec::new();
            for row in rows {
                let (decision_point, last_shown) = row.map_err(db_err)?;
                let is_stale = match last_shown.as_deref().map(parse_timestamp).transpose()? {
                    Some(last) => started_new_day(last, now),
                    None => true,
                };
                if is_stale {
                    stale.push(decision_point);
                }
            }
            stale
        };

        let tx = self.conn.unchecked_transaction().map_err(db_err)?;
        let touched = tx
            .execute("UPDATE ad_metrics SET session_count = 0", [])
            .map_err(db_err)?;
        for decision_point in &stale {
            tx.execute(
                "UPDATE ad_metrics SET daily_count = 0 WHERE decision_point = ?1",
                params![decision_point],
            )
            .map_err(db_err)?;
        }
        tx.commit().map_err(db_err)?;

        info!(touched, daily_resets = stale.len(), "ad metrics reset for new session");
        Ok(touched)
    }

    fn row(&self, decision_point: &DecisionPoint) -> Result<Option<MetricsRow>> {
        let raw = self
            .conn
            .query_row(
                "SELECT last_shown, session_count, daily_count
                 FROM ad_metrics WHERE decision_point = ?1",
                params![decision_point.as_str()],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;

        raw.map(|(last_shown, session_count, daily_count)| -> Result<MetricsRow> {
            Ok(MetricsRow {
                last_shown: last_shown.as_deref().map(parse_timestamp).transpose()?,
                session_count,
                daily_count,
            })
        })
        .transpose()
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SmartAdsError::Database(format!("bad last_shown timestamp {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn dp(name: &str) -> DecisionPoint {
        DecisionPoint::new(name).expect("valid decision point")
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap()
    }

    #[test]
    fn unknown_decision_point_reads_zero() {
        let metrics = AdMetrics::open_in_memory().expect("open");
        assert_eq!(metrics.last_shown(&dp("menu")).unwrap(), None);
        assert_eq!(metrics.session_count(&dp("menu")).unwrap(), 0);
        assert_eq!(metrics.daily_count(&dp("menu"), noon()).unwrap(), 0);
    }

    #[test]
    fn record_increments_counters() {
        let metrics = AdMetrics::open_in_memory().expect("open");
        let point = dp("levelEnd");

        metrics.record_ad_shown(&point, noon()).unwrap();
        metrics
            .record_ad_shown(&point, noon() + Duration::minutes(5))
            .unwrap();

        assert_eq!(metrics.session_count(&point).unwrap(), 2);
        assert_eq!(metrics.daily_count(&point, noon() + Duration::hours(1)).unwrap(), 2);
        assert_eq!(
            metrics.last_shown(&point).unwrap(),
            Some(noon() + Duration::minutes(5))
        );
        // Other decision points are independent.
        assert_eq!(metrics.session_count(&dp("shop")).unwrap(), 0);
    }

    #[test]
    fn new_session_keeps_same_day_daily_count() {
        let metrics = AdMetrics::open_in_memory().expect("open");
        let point = dp("levelEnd");
        metrics.record_ad_shown(&point, noon()).unwrap();

        let touched = metrics.new_session(noon() + Duration::hours(2)).unwrap();
        assert_eq!(touched, 1);
        assert_eq!(metrics.session_count(&point).unwrap(), 0);
        assert_eq!(metrics.daily_count(&point, noon() + Duration::hours(2)).unwrap(), 1);
    }

    #[test]
    fn daily_count_rolls_over_at_utc_midnight() {
        let metrics = AdMetrics::open_in_memory().expect("open");
        let point = dp("levelEnd");
        let late = Utc.with_ymd_and_hms(2026, 3, 14, 23, 59, 0).unwrap();
        metrics.record_ad_shown(&point, late).unwrap();

        let next_day = late + Duration::minutes(2);
        assert_eq!(metrics.daily_count(&point, next_day).unwrap(), 0);
        assert_eq!(metrics.recorded_daily_count(&point).unwrap(), 1);
        // Session counts are untouched until a new session starts.
        assert_eq!(metrics.session_count(&point).unwrap(), 1);

        metrics.record_ad_shown(&point, next_day).unwrap();
        assert_eq!(metrics.daily_count(&point, next_day).unwrap(), 1);
        assert_eq!(metrics.session_count(&point).unwrap(), 2);

        metrics.new_session(next_day + Duration::days(1)).unwrap();
        assert_eq!(metrics.session_count(&point).unwrap(), 0);
        assert_eq!(metrics.daily_count(&point, next_day).unwrap(), 0);
    }

    #[test]
    fn counters_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("metrics.db");
        let point = dp("shop");

        {
            let metrics = AdMetrics::open(&path).expect("open");
            metrics.record_ad_shown(&point, noon()).unwrap();
        }

        let metrics = AdMetrics::open(&path).expect("reopen");
        assert_eq!(metrics.session_count(&point).unwrap(), 1);
        assert_eq!(metrics.last_shown(&point).unwrap(), Some(noon()));
    }
}
