//! Aggregate read queries over feedback records.

use std::sync::Arc;

use sym_core::error::{Result, SymError};
use sym_core::types::{Sentiment, SentimentTrendPoint, UnitCount, UnitSentimentCount};

use crate::db::Database;

/// Read-side aggregates consumed by the dashboard and report synthesis.
pub trait AggregateStore: Send + Sync {
    /// Comment counts grouped by unit.
    fn comments_by_unit(&self) -> Result<Vec<UnitCount>>;

    /// Comment counts grouped by unit and sentiment.
    fn sentiment_by_unit(&self) -> Result<Vec<UnitSentimentCount>>;

    /// Comment counts grouped by calendar day and sentiment, oldest first.
    fn sentiment_trend(&self) -> Result<Vec<SentimentTrendPoint>>;
}

/// SQLite implementation of [`AggregateStore`].
pub struct AggregateQueries {
    db: Arc<Database>,
}

impl AggregateQueries {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

impl AggregateStore for AggregateQueries {
    fn comments_by_unit(&self) -> Result<Vec<UnitCount>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT unit, COUNT(*) FROM feedback_records
                     GROUP BY unit
                     ORDER BY unit",
                )
                .map_err(|e| SymError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok(UnitCount {
                        unit: row.get(0)?,
                        count: row.get(1)?,
                    })
                })
                .map_err(|e| SymError::Storage(e.to_string()))?;

            rows.collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| SymError::Storage(format!("Failed to aggregate by unit: {}", e)))
        })
    }

    fn sentiment_by_unit(&self) -> Result<Vec<UnitSentimentCount>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT unit, sentiment, COUNT(*) FROM feedback_records
                     GROUP BY unit, sentiment
                     ORDER BY unit, sentiment",
                )
                .map_err(|e| SymError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })
                .map_err(|e| SymError::Storage(e.to_string()))?;

            let mut out = Vec::new();
            for row in rows {
                let (unit, sentiment, count) = row.map_err(|e| {
                    SymError::Storage(format!("Failed to aggregate by unit and sentiment: {}", e))
                })?;
                out.push(UnitSentimentCount {
                    unit,
                    sentiment: parse_sentiment(sentiment)?,
                    count,
                });
            }
            Ok(out)
        })
    }

    fn sentiment_trend(&self) -> Result<Vec<SentimentTrendPoint>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT DATE(created_at) AS day, sentiment, COUNT(*) FROM feedback_records
                     WHERE DATE(created_at) IS NOT NULL
                     GROUP BY day, sentiment
                     ORDER BY day ASC, sentiment",
                )
                .map_err(|e| SymError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                })
                .map_err(|e| SymError::Storage(e.to_string()))?;

            let mut out = Vec::new();
            for row in rows {
                let (date, sentiment, count) = row
                    .map_err(|e| SymError::Storage(format!("Failed to compute trend: {}", e)))?;
                out.push(SentimentTrendPoint {
                    date,
                    sentiment: parse_sentiment(sentiment)?,
                    count,
                });
            }
            Ok(out)
        })
    }
}

fn parse_sentiment(raw: Option<String>) -> Result<Option<Sentiment>> {
    raw.as_deref()
        .map(str::parse::<Sentiment>)
        .transpose()
        .map_err(|e| SymError::Storage(format!("Corrupt sentiment column: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{FeedbackRepository, RecordStore};
    use sym_core::types::CustomerDetails;

    fn make_db() -> Arc<Database> {
        Arc::new(Database::in_memory().unwrap())
    }

    fn insert(
        db: &Arc<Database>,
        text: &str,
        sentiment: Option<Sentiment>,
        unit: Option<&str>,
        created_at: &str,
    ) -> i64 {
        let repo = FeedbackRepository::new(db.clone());
        let id = repo.create_comment(text).unwrap();
        if let Some(s) = sentiment {
            repo.set_sentiment(id, s).unwrap();
        }
        if let Some(u) = unit {
            repo.set_customer_details(
                id,
                &CustomerDetails {
                    name: "n".into(),
                    email: "e@x.com".into(),
                    unit: u.into(),
                },
            )
            .unwrap();
        }
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE feedback_records SET created_at = ?1 WHERE id = ?2",
                rusqlite::params![created_at, id],
            )
            .map_err(|e| SymError::Storage(e.to_string()))?;
            Ok(())
        })
        .unwrap();
        id
    }

    fn seed(db: &Arc<Database>) {
        insert(db, "a", Some(Sentiment::Positive), Some("Centro"), "2024-03-02 09:00:00");
        insert(db, "b", Some(Sentiment::Positive), Some("Centro"), "2024-03-01 18:30:00");
        insert(db, "c", Some(Sentiment::Negative), Some("Centro"), "2024-03-01 08:00:00");
        insert(db, "d", Some(Sentiment::Neutral), Some("Savassi"), "2024-03-02 11:00:00");
        insert(db, "e", None, None, "2024-03-03 12:00:00");
    }

    #[test]
    fn test_comments_by_unit() {
        let db = make_db();
        seed(&db);
        let rows = AggregateQueries::new(db).comments_by_unit().unwrap();
        assert_eq!(
            rows,
            vec![
                UnitCount { unit: None, count: 1 },
                UnitCount { unit: Some("Centro".into()), count: 3 },
                UnitCount { unit: Some("Savassi".into()), count: 1 },
            ]
        );
    }

    #[test]
    fn test_sentiment_by_unit() {
        let db = make_db();
        seed(&db);
        let rows = AggregateQueries::new(db).sentiment_by_unit().unwrap();
        assert_eq!(rows.len(), 4);
        let centro_positive = rows
            .iter()
            .find(|r| r.unit.as_deref() == Some("Centro") && r.sentiment == Some(Sentiment::Positive))
            .unwrap();
        assert_eq!(centro_positive.count, 2);
        assert!(rows.iter().any(|r| r.unit.is_none() && r.sentiment.is_none()));
    }

    #[test]
    fn test_sentiment_trend_dates_and_order() {
        let db = make_db();
        seed(&db);
        let rows = AggregateQueries::new(db).sentiment_trend().unwrap();

        let dates: Vec<&str> = rows.iter().map(|r| r.date.as_str()).collect();
        let mut sorted = dates.clone();
        sorted.sort();
        assert_eq!(dates, sorted);
        assert!(rows.iter().all(|r| r.date.len() == 10 && !r.date.contains(' ')));

        let march_first_positive = rows
            .iter()
            .find(|r| r.date == "2024-03-01" && r.sentiment == Some(Sentiment::Positive))
            .unwrap();
        assert_eq!(march_first_positive.count, 1);
        let march_second_positive = rows
            .iter()
            .find(|r| r.date == "2024-03-02" && r.sentiment == Some(Sentiment::Positive))
            .unwrap();
        assert_eq!(march_second_positive.count, 1);
    }

    #[test]
    fn test_aggregates_on_empty_db() {
        let queries = AggregateQueries::new(make_db());
        assert!(queries.comments_by_unit().unwrap().is_empty());
        assert!(queries.sentiment_by_unit().unwrap().is_empty());
        assert!(queries.sentiment_trend().unwrap().is_empty());
    }
}
