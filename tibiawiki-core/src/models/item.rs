//! Items, their attributes, and keys.

use crate::article::Article;
use crate::error::Result;
use crate::models::creature::CreatureDrop;
use crate::parsers::{clean_links, parse_boolean, parse_float, parse_integer};
use crate::record::{
    FieldMapping, MatchMode, Parseable, RawAttributes, Row, TitleIndex, insert_values, select_all,
    select_one,
};
use crate::schema::{self, Table, Value};
use lazy_static::lazy_static;
use regex::Regex;
use rusqlite::Connection;
use serde::Serialize;

lazy_static! {
    static ref ITEM_PATTERN: Regex = Regex::new(r"Infobox[\s_]Item").unwrap();
    static ref KEY_PATTERN: Regex = Regex::new(r"Infobox[\s_]Key").unwrap();
}

/// Attributes stored as name/value rows, as `(attribute name, infobox key)`.
const ITEM_ATTRIBUTE_KEYS: &[(&str, &str)] = &[
    ("level", "levelrequired"),
    ("attack", "attack"),
    ("elemental_attack", "elementattack"),
    ("defense", "defense"),
    ("defense_modifier", "defensemod"),
    ("armor", "armor"),
    ("hands", "hands"),
    ("imbue_slots", "imbueslots"),
    ("attack+", "atk_mod"),
    ("hit%+", "hit_mod"),
    ("range", "range"),
    ("damage_type", "damagetype"),
    ("damage", "damage"),
    ("mana", "mana"),
    ("magic_level", "mlrequired"),
    ("words", "words"),
    ("critical_chance", "crithit_ch"),
    ("critical%", "critextra_dmg"),
    ("hpleech_chance", "hpleech_ch"),
    ("hpleech%", "hpleech_am"),
    ("manaleech_chance", "manaleech_ch"),
    ("manaleech%", "manaleech_am"),
    ("volume", "volume"),
    ("charges", "charges"),
    ("food_time", "regenseconds"),
    ("duration", "duration"),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Item {
    pub article_id: i64,
    pub title: String,
    pub timestamp: i64,
    pub raw_attributes: RawAttributes,
    /// In-game name.
    pub name: Option<String>,
    /// Article shown before the name when looking at the item.
    pub article: Option<String>,
    pub stackable: bool,
    /// Highest price an NPC buys the item for.
    pub value_sell: Option<i64>,
    /// Lowest price an NPC sells the item for.
    pub value_buy: Option<i64>,
    pub weight: Option<f64>,
    pub class: Option<String>,
    pub item_type: Option<String>,
    pub flavor_text: Option<String>,
    pub client_id: Option<i64>,
    pub version: Option<String>,
    #[serde(skip)]
    pub image: Option<Vec<u8>>,
    pub attributes: Vec<ItemAttribute>,
    /// Creatures dropping this item. Only filled in when read back.
    pub dropped_by: Vec<CreatureDrop>,
}

static ITEM_MAP: &[FieldMapping<Item>] = &[
    FieldMapping {
        key: "article",
        field: "article",
        apply: |i, v| i.article = Some(v.to_string()),
    },
    FieldMapping {
        key: "actualname",
        field: "name",
        apply: |i, v| i.name = Some(v.to_string()),
    },
    FieldMapping {
        key: "weight",
        field: "weight",
        apply: |i, v| i.weight = parse_float(v),
    },
    FieldMapping {
        key: "stackable",
        field: "stackable",
        apply: |i, v| i.stackable = parse_boolean(v, false),
    },
    FieldMapping {
        key: "npcvalue",
        field: "value_sell",
        apply: |i, v| i.value_sell = parse_integer(v),
    },
    FieldMapping {
        key: "npcprice",
        field: "value_buy",
        apply: |i, v| i.value_buy = parse_integer(v),
    },
    FieldMapping {
        key: "flavortext",
        field: "flavor_text",
        apply: |i, v| i.flavor_text = Some(v.to_string()),
    },
    FieldMapping {
        key: "itemclass",
        field: "class",
        apply: |i, v| i.class = Some(v.to_string()),
    },
    FieldMapping {
        key: "primarytype",
        field: "type",
        apply: |i, v| i.item_type = Some(v.to_string()),
    },
    FieldMapping {
        key: "implemented",
        field: "version",
        apply: |i, v| i.version = Some(v.to_string()),
    },
    FieldMapping {
        key: "itemid",
        field: "client_id",
        apply: |i, v| i.client_id = parse_integer(v),
    },
];

impl Item {
    pub fn get_by_article_id(conn: &Connection, article_id: i64) -> Result<Option<Self>> {
        Self::get_by_field(conn, "article_id", article_id, MatchMode::Exact)
    }

    /// Look an item up by name, ignoring case.
    pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        Self::get_by_field(conn, "name", name, MatchMode::IgnoreCase)
    }

    fn load_dependents(mut self, conn: &Connection) -> Result<Self> {
        self.attributes = ItemAttribute::get_by_item_id(conn, self.article_id)?;
        self.dropped_by = CreatureDrop::get_by_item_id(conn, self.article_id)?;
        Ok(self)
    }
}

impl Parseable for Item {
    fn pattern() -> &'static Regex {
        &ITEM_PATTERN
    }

    fn mappings() -> &'static [FieldMapping<Self>] {
        ITEM_MAP
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
        for (name, key) in ITEM_ATTRIBUTE_KEYS {
            if let Some(value) = self.raw_attributes.remove(*key) {
                self.attributes.push(ItemAttribute {
                    item_id: self.article_id,
                    name: name.to_string(),
                    value: Some(value),
                });
            }
        }
    }
}

impl Row for Item {
    fn table() -> &'static Table {
        &schema::ITEM
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.article_id.into(),
            self.title.clone().into(),
            self.name.clone().into(),
            self.article.clone().into(),
            self.stackable.into(),
            self.value_sell.into(),
            self.value_buy.into(),
            self.weight.into(),
            self.class.clone().into(),
            self.item_type.clone().into(),
            self.flavor_text.clone().into(),
            self.client_id.into(),
            self.version.clone().into(),
            self.image.clone().into(),
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
            article: row.get("article")?,
            stackable: row.get("stackable")?,
            value_sell: row.get("value_sell")?,
            value_buy: row.get("value_buy")?,
            weight: row.get("weight")?,
            class: row.get("class")?,
            item_type: row.get("type")?,
            flavor_text: row.get("flavor_text")?,
            client_id: row.get("client_id")?,
            version: row.get("version")?,
            image: row.get("image")?,
            attributes: Vec::new(),
            dropped_by: Vec::new(),
        })
    }

    fn insert(&self, conn: &Connection) -> Result<()> {
        insert_values(conn, Self::table(), self.values())?;
        for attribute in &self.attributes {
            attribute.insert(conn)?;
        }
        Ok(())
    }

    fn get_by_field<V: Into<Value>>(
        conn: &Connection,
        field: &str,
        value: V,
        mode: MatchMode,
    ) -> Result<Option<Self>> {
        select_one::<Self>(conn, field, value.into(), mode)?
            .map(|item| item.load_dependents(conn))
            .transpose()
    }

    fn get_all_by_field<V: Into<Value>>(
        conn: &Connection,
        field: &str,
        value: V,
        mode: MatchMode,
    ) -> Result<Vec<Self>> {
        select_all::<Self>(conn, field, value.into(), mode)?
            .into_iter()
            .map(|item| item.load_dependents(conn))
            .collect()
    }
}

/// A named attribute of an item, such as its attack or required level.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemAttribute {
    pub item_id: i64,
    pub name: String,
    pub value: Option<String>,
}

impl ItemAttribute {
    pub fn get_by_item_id(conn: &Connection, item_id: i64) -> Result<Vec<Self>> {
        Self::get_all_by_field(conn, "item_id", item_id, MatchMode::Exact)
    }
}

impl Row for ItemAttribute {
    fn table() -> &'static Table {
        &schema::ITEM_ATTRIBUTE
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.item_id.into(),
            self.name.clone().into(),
            self.value.clone().into(),
        ]
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            item_id: row.get("item_id")?,
            name: row.get("name")?,
            value: row.get("value")?,
        })
    }
}

/// A key item, identified by its number.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Key {
    pub article_id: i64,
    pub title: String,
    pub timestamp: i64,
    pub raw_attributes: RawAttributes,
    pub number: Option<i64>,
    /// Article id of the item the key is based on.
    pub item_id: Option<i64>,
    /// Name the key is known by.
    pub name: Option<String>,
    pub material: Option<String>,
    pub location: Option<String>,
    pub origin: Option<String>,
    pub notes: Option<String>,
    pub version: Option<String>,
}

static KEY_MAP: &[FieldMapping<Key>] = &[
    FieldMapping {
        key: "aka",
        field: "name",
        apply: |k, v| k.name = Some(clean_links(v)),
    },
    FieldMapping {
        key: "number",
        field: "number",
        apply: |k, v| k.number = parse_integer(v),
    },
    FieldMapping {
        key: "primarytype",
        field: "material",
        apply: |k, v| k.material = Some(v.to_string()),
    },
    FieldMapping {
        key: "location",
        field: "location",
        apply: |k, v| k.location = Some(clean_links(v)),
    },
    FieldMapping {
        key: "origin",
        field: "origin",
        apply: |k, v| k.origin = Some(clean_links(v)),
    },
    FieldMapping {
        key: "shortnotes",
        field: "notes",
        apply: |k, v| k.notes = Some(clean_links(v)),
    },
    FieldMapping {
        key: "implemented",
        field: "version",
        apply: |k, v| k.version = Some(v.to_string()),
    },
];

impl Key {
    pub fn get_by_article_id(conn: &Connection, article_id: i64) -> Result<Option<Self>> {
        Self::get_by_field(conn, "article_id", article_id, MatchMode::Exact)
    }

    pub fn get_by_number(conn: &Connection, number: i64) -> Result<Option<Self>> {
        Self::get_by_field(conn, "number", number, MatchMode::Exact)
    }

    /// Title of the item this key is based on, e.g. `Silver Key`.
    pub fn item_title(&self) -> Option<String> {
        self.material.as_ref().map(|material| format!("{} Key", material))
    }

    /// Insert the key, resolving its base item through `items`.
    pub fn insert_with(&self, conn: &Connection, items: &mut TitleIndex) -> Result<()> {
        let item_id = match (self.item_id, self.item_title()) {
            (Some(id), _) => Some(id),
            (None, Some(title)) => items.resolve(conn, &title)?,
            (None, None) => None,
        };
        let resolved = Self {
            item_id,
            ..self.clone()
        };
        insert_values(conn, Self::table(), resolved.values())
    }
}

impl Parseable for Key {
    fn pattern() -> &'static Regex {
        &KEY_PATTERN
    }

    fn mappings() -> &'static [FieldMapping<Self>] {
        KEY_MAP
    }

    fn set_article(&mut self, article: &Article) {
        self.article_id = article.article_id;
        self.title = article.title.clone();
        self.timestamp = article.timestamp;
    }

    fn raw_attributes_mut(&mut self) -> &mut RawAttributes {
        &mut self.raw_attributes
    }
}

impl Row for Key {
    fn table() -> &'static Table {
        &schema::ITEM_KEY
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.article_id.into(),
            self.title.clone().into(),
            self.number.into(),
            self.item_id.into(),
            self.name.clone().into(),
            self.material.clone().into(),
            self.location.clone().into(),
            self.origin.clone().into(),
            self.notes.clone().into(),
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
            number: row.get("number")?,
            item_id: row.get("item_id")?,
            name: row.get("name")?,
            material: row.get("material")?,
            location: row.get("location")?,
            origin: row.get("origin")?,
            notes: row.get("notes")?,
            version: row.get("version")?,
        })
    }

    fn insert(&self, conn: &Connection) -> Result<()> {
        self.insert_with(conn, &mut TitleIndex::new(&schema::ITEM))
    }
}
