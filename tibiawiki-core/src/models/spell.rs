//! Spells.

use crate::article::Article;
use crate::error::Result;
use crate::parsers::{parse_boolean, parse_integer};
use crate::record::{FieldMapping, MatchMode, Parseable, RawAttributes, Row};
use crate::schema::{self, Table, Value};
use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;

lazy_static! {
    static ref SPELL_PATTERN: Regex = Regex::new(r"Infobox[\s_]Spell").unwrap();
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Spell {
    pub article_id: i64,
    pub title: String,
    pub timestamp: i64,
    pub raw_attributes: RawAttributes,
    pub name: Option<String>,
    /// Words spoken to cast the spell.
    pub words: Option<String>,
    /// Instant, rune or conjure.
    pub spell_type: Option<String>,
    pub class: Option<String>,
    pub element: Option<String>,
    pub level: Option<i64>,
    /// Mana cost, -1 when the infobox omits it or gives something unusable.
    pub mana: Option<i64>,
    pub soul: i64,
    pub price: Option<i64>,
    /// Cooldown in seconds.
    pub cooldown: Option<i64>,
    pub premium: bool,
    pub knight: bool,
    pub paladin: bool,
    pub druid: bool,
    pub sorcerer: bool,
    pub version: Option<String>,
}

static SPELL_MAP: &[FieldMapping<Spell>] = &[
    FieldMapping {
        key: "name",
        field: "name",
        apply: |s, v| s.name = Some(v.to_string()),
    },
    FieldMapping {
        key: "words",
        field: "words",
        apply: |s, v| s.words = Some(v.to_string()),
    },
    FieldMapping {
        key: "type",
        field: "type",
        apply: |s, v| s.spell_type = Some(v.to_string()),
    },
    FieldMapping {
        key: "subclass",
        field: "class",
        apply: |s, v| s.class = Some(v.to_string()),
    },
    FieldMapping {
        key: "damagetype",
        field: "element",
        apply: |s, v| s.element = Some(v.to_string()),
    },
    FieldMapping {
        key: "levelrequired",
        field: "level",
        apply: |s, v| s.level = parse_integer(v),
    },
    FieldMapping {
        key: "mana",
        field: "mana",
        apply: |s, v| s.mana = Some(parse_integer(v).unwrap_or(-1)),
    },
    FieldMapping {
        key: "soul",
        field: "soul",
        apply: |s, v| s.soul = parse_integer(v).unwrap_or(0),
    },
    FieldMapping {
        key: "spellcost",
        field: "price",
        apply: |s, v| s.price = parse_integer(v),
    },
    FieldMapping {
        key: "cooldown",
        field: "cooldown",
        apply: |s, v| s.cooldown = parse_integer(v),
    },
    FieldMapping {
        key: "premium",
        field: "premium",
        apply: |s, v| s.premium = parse_boolean(v, false),
    },
    FieldMapping {
        key: "implemented",
        field: "version",
        apply: |s, v| s.version = Some(v.to_string()),
    },
];

impl Spell {
    pub fn get_by_article_id(conn: &Connection, article_id: i64) -> Result<Option<Self>> {
        Self::get_by_field(conn, "article_id", article_id, MatchMode::Exact)
    }

    /// Look a spell up by name, ignoring case.
    pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        Self::get_by_field(conn, "name", name, MatchMode::IgnoreCase)
    }

    /// Look a spell up by the words that cast it, ignoring case.
    pub fn get_by_words(conn: &Connection, words: &str) -> Result<Option<Self>> {
        Self::get_by_field(conn, "words", words, MatchMode::IgnoreCase)
    }
}

impl Parseable for Spell {
    fn pattern() -> &'static Regex {
        &SPELL_PATTERN
    }

    fn mappings() -> &'static [FieldMapping<Self>] {
        SPELL_MAP
    }

    fn set_article(&mut self, article: &Article) {
        self.article_id = article.article_id;
        self.title = article.title.clone();
        self.timestamp = article.timestamp;
    }

    fn raw_attributes_mut(&mut self) -> &mut RawAttributes {
        &mut self.raw_attributes
    }

    fn parse_raw_attributes(&mut self) {
        if self.mana.is_none() {
            self.mana = Some(-1);
        }
        let Some(vocations) = self.raw_attributes.remove("voc") else {
            return;
        };
        let vocations = vocations.to_lowercase();
        self.knight = vocations.contains("knight");
        self.paladin = vocations.contains("paladin");
        self.druid = vocations.contains("druid");
        self.sorcerer = vocations.contains("sorcerer");
    }
}

impl Row for Spell {
    fn table() -> &'static Table {
        &schema::SPELL
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.article_id.into(),
            self.title.clone().into(),
            self.name.clone().into(),
            self.words.clone().into(),
            self.spell_type.clone().into(),
            self.class.clone().into(),
            self.element.clone().into(),
            self.level.into(),
            self.mana.into(),
            self.soul.into(),
            self.price.into(),
            self.cooldown.into(),
            self.premium.into(),
            self.knight.into(),
            self.paladin.into(),
            self.druid.into(),
            self.sorcerer.into(),
            self.version.clone().into(),
            self.timestamp.into(),
        ]
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            article_id: row.get("article_id")?,
            title: row.get("title")?,
            timestamp: row.get::<_, Option<i64>>("timestamp")?.unwrap_or_default(),
            raw_attributes: RawAttributes::new(),
            name: row.get("name")?,
            words: row.get("words")?,
            spell_type: row.get("type")?,
            class: row.get("class")?,
            element: row.get("element")?,
            level: row.get("level")?,
            mana: row.get("mana")?,
            soul: row.get("soul")?,
            price: row.get("price")?,
            cooldown: row.get("cooldown")?,
            premium: row.get("premium")?,
            knight: row.get("knight")?,
            paladin: row.get("paladin")?,
            druid: row.get("druid")?,
            sorcerer: row.get("sorcerer")?,
            version: row.get("version")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::create_tables;

    const LIGHT_HEALING: &str = "{{Infobox Spell|List={{{1|}}}|GetValue={{{GetValue|}}}
| name          = Light Healing
| type          = Instant
| subclass      = Healing
| damagetype    = Healing
| words         = exura
| levelrequired = 8
| mana          = 20
| premium       = no
| spellcost     = 0
| cooldown      = 1
| voc           = [[Paladin]]s, [[Druid]]s and [[Sorcerer]]s
| implemented   = 6.4
}}";

    fn light_healing() -> Spell {
        let article =
            Article::new(3, "Light Healing", "2018-08-20T04:33:15Z", LIGHT_HEALING).unwrap();
        Spell::from_article(&article).unwrap()
    }

    #[test]
    fn test_spell_from_article() {
        let spell = light_healing();
        assert_eq!(spell.words.as_deref(), Some("exura"));
        assert_eq!(spell.level, Some(8));
        assert_eq!(spell.mana, Some(20));
        assert_eq!(spell.soul, 0);
        assert_eq!(spell.class.as_deref(), Some("Healing"));
        assert!(!spell.premium);
        assert!(!spell.knight);
        assert!(spell.paladin && spell.druid && spell.sorcerer);
        assert!(!spell.raw_attributes.contains_key("voc"));
    }

    #[test]
    fn test_unusable_mana_is_negative() {
        let content = "{{Infobox Spell|mana=varies}}";
        let article = Article::new(4, "Odd", "2018-08-20T04:33:15Z", content).unwrap();
        let spell = Spell::from_article(&article).unwrap();
        assert_eq!(spell.mana, Some(-1));
    }

    #[test]
    fn test_missing_mana_is_negative() {
        let content = "{{Infobox Spell|name=Find Person|words=exiva}}";
        let article = Article::new(5, "Find Person", "2018-08-20T04:33:15Z", content).unwrap();
        let spell = Spell::from_article(&article).unwrap();
        assert_eq!(spell.mana, Some(-1));
        assert!(!spell.knight && !spell.paladin && !spell.druid && !spell.sorcerer);
    }

    #[test]
    fn test_mapped_fields_are_declared_columns() {
        for mapping in Spell::mappings() {
            assert!(Spell::table().column(mapping.field).is_some(), "{}", mapping.field);
        }
        assert_eq!(Spell::default().values().len(), Spell::table().columns.len());
    }

    #[test]
    fn test_spell_roundtrip() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        let spell = light_healing();
        spell.insert(&conn).unwrap();

        let stored = Spell::get_by_words(&conn, "EXURA").unwrap().unwrap();
        assert_eq!(stored.values(), spell.values());
        assert_eq!(Spell::get_by_name(&conn, "light healing").unwrap().unwrap().article_id, 3);
        assert!(Spell::get_by_article_id(&conn, 4).unwrap().is_none());
    }
}
