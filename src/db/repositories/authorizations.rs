use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::db::connection::Database;
use crate::health::Category;

impl Database {
    /// Records read grants; re-granting refreshes the timestamp.
    pub async fn record_grants(
        &self,
        categories: &BTreeSet<Category>,
        granted_at: DateTime<Utc>,
    ) -> Result<()> {
        let categories: Vec<Category> = categories.iter().copied().collect();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            for category in &categories {
                tx.execute(
                    "INSERT INTO authorizations (category, granted_at)
                     VALUES (?1, ?2)
                     ON CONFLICT(category) DO UPDATE SET granted_at = excluded.granted_at",
                    params![category.as_str(), granted_at.to_rfc3339()],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn granted_categories(&self) -> Result<BTreeSet<Category>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare("SELECT category FROM authorizations")?;
            let mut rows = stmt.query([])?;
            let mut granted = BTreeSet::new();
            while let Some(row) = rows.next()? {
                let name: String = row.get(0)?;
                granted.insert(Category::parse(&name)?);
            }
            Ok(granted)
        })
        .await
    }
}
