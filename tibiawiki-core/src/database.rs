use crate::article::Article;
use crate::error::Result;
use crate::models::{Record, RecordKind, parse_articles};
use crate::record::TitleIndex;
use crate::schema;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite_migration::{M, Migrations};
use std::collections::BTreeMap;
use std::path::Path;

/// Outcome of writing a batch of records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub inserted: BTreeMap<RecordKind, usize>,
    /// Records rolled back because the store rejected them.
    pub failed: usize,
}

impl LoadSummary {
    pub fn total(&self) -> usize {
        self.inserted.values().sum()
    }
}

pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    pub fn new(path: &Path) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        });
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self { pool };
        db.run_migrations()?;
        tracing::debug!("Opened database {}", path.display());
        Ok(db)
    }

    /// A private database living as long as this value.
    ///
    /// Every in-memory connection is its own database, so the pool holds a
    /// single connection that is never recycled.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            Ok(())
        });
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)?;

        let db = Self { pool };
        db.run_migrations()?;
        Ok(db)
    }

    pub fn connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let mut conn = self.connection()?;
        let schema = schema::create_statements();
        let migrations = Migrations::new(vec![M::up(&schema)]);
        migrations.to_latest(&mut conn)?;
        Ok(())
    }

    /// Delete every row, dependents first.
    pub fn clear(&self) -> Result<()> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        for table in schema::all_tables().iter().rev() {
            let deleted = tx.execute(&format!("DELETE FROM {}", table.name), [])?;
            tracing::debug!("Deleted {} rows from {}", deleted, table.name);
        }
        tx.commit()?;
        Ok(())
    }

    /// Write one record and its dependents atomically.
    pub fn insert_record(&self, record: &Record) -> Result<()> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        record.insert(&tx)?;
        tx.commit()?;
        Ok(())
    }

    /// Write a batch of records inside one transaction.
    ///
    /// Items are written first so drops and keys resolve their item titles
    /// from memory. Each record is written under its own savepoint: a record
    /// the store rejects is rolled back with its dependents, logged and
    /// counted, and the rest of the batch goes on.
    pub fn insert_records(&self, records: &[Record]) -> Result<LoadSummary> {
        self.insert_records_with_progress(records, |_| {})
    }

    /// Like [`Database::insert_records`], calling `progress` after each record.
    pub fn insert_records_with_progress<F>(
        &self,
        records: &[Record],
        mut progress: F,
    ) -> Result<LoadSummary>
    where
        F: FnMut(&Record),
    {
        let mut ordered: Vec<&Record> = records.iter().collect();
        ordered.sort_by_key(|record| record.kind());

        let mut conn = self.connection()?;
        let mut tx = conn.transaction()?;
        let mut items = TitleIndex::new(&schema::ITEM);
        let mut summary = LoadSummary::default();

        for record in ordered {
            let savepoint = tx.savepoint()?;
            match record.insert_with(&savepoint, &mut items) {
                Ok(()) => {
                    savepoint.commit()?;
                    *summary.inserted.entry(record.kind()).or_default() += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to insert {} {}: {}", record.kind(), record.title(), e);
                    summary.failed += 1;
                }
            }
            progress(record);
        }
        tx.commit()?;

        tracing::info!(
            "Inserted {} records, {} failed, {} item titles indexed",
            summary.total(),
            summary.failed,
            items.len()
        );
        Ok(summary)
    }

    /// Parse articles and write the resulting records.
    pub fn load_articles(&self, articles: &[Article]) -> Result<LoadSummary> {
        let records = parse_articles(articles, None);
        self.insert_records(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Creature, Item, Key, Spell};

    fn article(article_id: i64, title: &str, content: &str) -> Article {
        Article::new(article_id, title, "2018-08-20T04:33:15Z", content).unwrap()
    }

    fn sample_articles() -> Vec<Article> {
        vec![
            // Creatures before the items they drop, to check write ordering.
            article(
                10,
                "Demon",
                "{{Infobox Creature|name=Demon|hp=8200|loot={{Loot Table|{{Loot Item|0-100|Gold Coin}}|{{Loot Item|Fire Sword|rare}}|{{Loot Item|Demonic Essence}}}}}}",
            ),
            article(11, "Key 3940", "{{Infobox Key|number=3940|primarytype=Silver}}"),
            article(1, "Gold Coin", "{{Infobox Item|actualname=gold coin|stackable=yes}}"),
            article(2, "Fire Sword", "{{Infobox Item|actualname=fire sword|attack=24}}"),
            article(3, "Silver Key", "{{Infobox Item|actualname=silver key}}"),
            article(
                20,
                "Light",
                "{{Infobox Spell|name=Light|words=utevo lux|voc=[[Knight]]s and [[Paladin]]s}}",
            ),
            article(30, "Thais", "{{Infobox City|name=Thais}}"),
        ]
    }

    #[test]
    fn test_load_articles_resolves_names() {
        let db = Database::open_in_memory().unwrap();
        let summary = db.load_articles(&sample_articles()).unwrap();
        assert_eq!(summary.total(), 6);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.inserted[&RecordKind::Item], 3);

        let conn = db.connection().unwrap();
        let demon = Creature::get_by_name(&conn, "demon").unwrap().unwrap();
        let item_ids: Vec<Option<i64>> = demon.loot.iter().map(|d| d.item_id).collect();
        assert_eq!(item_ids, [Some(1), Some(2), None]);

        let key = Key::get_by_number(&conn, 3940).unwrap().unwrap();
        assert_eq!(key.item_id, Some(3));

        let sword = Item::get_by_article_id(&conn, 2).unwrap().unwrap();
        assert_eq!(sword.dropped_by.len(), 1);
        assert_eq!(sword.attributes.len(), 1);
        assert!(Spell::get_by_name(&conn, "light").unwrap().unwrap().knight);
    }

    #[test]
    fn test_rejected_record_is_rolled_back() {
        let db = Database::open_in_memory().unwrap();
        let mut articles = sample_articles();
        // Same title as the first creature: violates the unique title column.
        articles.push(article(
            12,
            "Demon",
            "{{Infobox Creature|name=Other|loot={{Loot Table|{{Loot Item|Gold Coin}}}}}}",
        ));
        let summary = db.load_articles(&articles).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.inserted[&RecordKind::Creature], 1);

        let conn = db.connection().unwrap();
        let drops: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM creature_drop WHERE creature_id = 12",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(drops, 0);
    }

    #[test]
    fn test_insert_record_propagates_store_errors() {
        let db = Database::open_in_memory().unwrap();
        let gold = article(1, "Gold Coin", "{{Infobox Item|actualname=gold coin}}");
        let record = Record::from_article(&gold).unwrap();
        db.insert_record(&record).unwrap();
        assert!(db.insert_record(&record).is_err());
    }

    #[test]
    fn test_clear() {
        let db = Database::open_in_memory().unwrap();
        db.load_articles(&sample_articles()).unwrap();
        db.clear().unwrap();
        let conn = db.connection().unwrap();
        for table in schema::all_tables() {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table.name), [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, 0, "{}", table.name);
        }
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tibiawiki.db");
        {
            let db = Database::new(&path).unwrap();
            db.load_articles(&sample_articles()).unwrap();
        }
        // Reopening must not reapply the schema or lose rows.
        let db = Database::new(&path).unwrap();
        let conn = db.connection().unwrap();
        assert!(Creature::get_by_article_id(&conn, 10).unwrap().is_some());
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection().unwrap();
        let result = conn.execute(
            "INSERT INTO creature_drop (creature_id, min, max) VALUES (999, 0, 1)",
            [],
        );
        assert!(result.is_err());
    }
}
