//! Record kinds and the dispatcher over them.

pub mod creature;
pub mod item;
pub mod spell;

pub use creature::{Creature, CreatureDrop};
pub use item::{Item, ItemAttribute, Key};
pub use spell::Spell;

use crate::article::Article;
use crate::error::Result;
use crate::record::{Parseable, RawAttributes, Row, TitleIndex};
use rayon::prelude::*;
use rusqlite::Connection;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// The record kinds an article can be parsed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    Item,
    Key,
    Creature,
    Spell,
}

impl RecordKind {
    /// Every kind, in the order batches are written.
    pub const ALL: [RecordKind; 4] = [
        RecordKind::Item,
        RecordKind::Key,
        RecordKind::Creature,
        RecordKind::Spell,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Item => "item",
            RecordKind::Key => "key",
            RecordKind::Creature => "creature",
            RecordKind::Spell => "spell",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        RecordKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown record kind: {}", s))
    }
}

/// A record of any kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Item(Item),
    Key(Key),
    Creature(Creature),
    Spell(Spell),
}

impl Record {
    /// Parse an article as the first kind whose marker it contains.
    pub fn from_article(article: &Article) -> Option<Self> {
        let record = Item::from_article(article)
            .map(Record::Item)
            .or_else(|| Key::from_article(article).map(Record::Key))
            .or_else(|| Creature::from_article(article).map(Record::Creature))
            .or_else(|| Spell::from_article(article).map(Record::Spell));
        if record.is_none() {
            tracing::debug!(
                "Article {} ({}) is not a known record kind",
                article.title,
                article.article_id
            );
        }
        record
    }

    /// Parse an article as one specific kind.
    pub fn from_article_as(article: &Article, kind: RecordKind) -> Option<Self> {
        let record = match kind {
            RecordKind::Item => Item::from_article(article).map(Record::Item),
            RecordKind::Key => Key::from_article(article).map(Record::Key),
            RecordKind::Creature => Creature::from_article(article).map(Record::Creature),
            RecordKind::Spell => Spell::from_article(article).map(Record::Spell),
        };
        if record.is_none() {
            tracing::debug!("Article {} is not a {}", article.title, kind);
        }
        record
    }

    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Item(_) => RecordKind::Item,
            Record::Key(_) => RecordKind::Key,
            Record::Creature(_) => RecordKind::Creature,
            Record::Spell(_) => RecordKind::Spell,
        }
    }

    pub fn article_id(&self) -> i64 {
        match self {
            Record::Item(r) => r.article_id,
            Record::Key(r) => r.article_id,
            Record::Creature(r) => r.article_id,
            Record::Spell(r) => r.article_id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Record::Item(r) => &r.title,
            Record::Key(r) => &r.title,
            Record::Creature(r) => &r.title,
            Record::Spell(r) => &r.title,
        }
    }

    pub fn raw_attributes(&self) -> &RawAttributes {
        match self {
            Record::Item(r) => &r.raw_attributes,
            Record::Key(r) => &r.raw_attributes,
            Record::Creature(r) => &r.raw_attributes,
            Record::Spell(r) => &r.raw_attributes,
        }
    }

    pub fn insert(&self, conn: &Connection) -> Result<()> {
        match self {
            Record::Item(r) => r.insert(conn),
            Record::Key(r) => r.insert(conn),
            Record::Creature(r) => r.insert(conn),
            Record::Spell(r) => r.insert(conn),
        }
    }

    /// Insert, resolving item names through a shared index.
    pub fn insert_with(&self, conn: &Connection, items: &mut TitleIndex) -> Result<()> {
        match self {
            Record::Item(r) => {
                r.insert(conn)?;
                items.insert(&r.title, r.article_id);
                Ok(())
            }
            Record::Key(r) => r.insert_with(conn, items),
            Record::Creature(r) => r.insert_with(conn, items),
            Record::Spell(r) => r.insert(conn),
        }
    }
}

/// Parse articles in parallel, skipping those that match no kind.
///
/// The result keeps the order of `articles`.
pub fn parse_articles(articles: &[Article], kind: Option<RecordKind>) -> Vec<Record> {
    let records: Vec<Record> = articles
        .par_iter()
        .filter_map(|article| match kind {
            Some(kind) => Record::from_article_as(article, kind),
            None => Record::from_article(article),
        })
        .collect();
    tracing::info!("Parsed {} records out of {} articles", records.len(), articles.len());
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(article_id: i64, title: &str, content: &str) -> Article {
        Article::new(article_id, title, "2018-08-20T04:33:15Z", content).unwrap()
    }

    #[test]
    fn test_record_kind_from_str() {
        assert_eq!("creature".parse::<RecordKind>().unwrap(), RecordKind::Creature);
        assert_eq!("Spell".parse::<RecordKind>().unwrap(), RecordKind::Spell);
        assert!("npc".parse::<RecordKind>().is_err());
    }

    #[test]
    fn test_dispatch_by_marker() {
        let records = parse_articles(
            &[
                article(1, "Fire Sword", "{{Infobox Item|actualname=fire sword}}"),
                article(2, "Rat", "{{Infobox_Creature|name=Rat|hp=20}}"),
                article(3, "Thais", "{{Infobox City|name=Thais}}"),
                article(4, "Light", "{{Infobox Spell|name=Light|voc=all}}"),
                article(5, "Key 0001", "{{Infobox Key|number=1}}"),
            ],
            None,
        );
        let kinds: Vec<RecordKind> = records.iter().map(Record::kind).collect();
        assert_eq!(
            kinds,
            [RecordKind::Item, RecordKind::Creature, RecordKind::Spell, RecordKind::Key]
        );
        assert_eq!(records[1].title(), "Rat");
        assert_eq!(records[1].article_id(), 2);
    }

    #[test]
    fn test_parse_single_kind() {
        let articles = [
            article(1, "Fire Sword", "{{Infobox Item|actualname=fire sword}}"),
            article(2, "Rat", "{{Infobox Creature|name=Rat|hp=20}}"),
        ];
        let records = parse_articles(&articles, Some(RecordKind::Creature));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind(), RecordKind::Creature);
    }

    #[test]
    fn test_record_serializes_with_kind_tag() {
        let rat = article(2, "Rat", "{{Infobox Creature|name=Rat|hp=20|colour=grey}}");
        let record = Record::from_article(&rat).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "creature");
        assert_eq!(json["hitpoints"], 20);
        assert_eq!(json["raw_attributes"]["colour"], "grey");
        assert_eq!(record.raw_attributes().len(), 1);
    }
}
