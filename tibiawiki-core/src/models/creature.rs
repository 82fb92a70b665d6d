//! Creatures and the items they drop.

use crate::article::Article;
use crate::error::Result;
use crate::parsers::{
    clean_links, parse_boolean, parse_integer, parse_loot, parse_maximum_integer, parse_min_max,
    parse_monster_walks,
};
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
    static ref CREATURE_PATTERN: Regex = Regex::new(r"Infobox[\s_]Creature").unwrap();
}

/// A creature, as described by its infobox.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Creature {
    pub article_id: i64,
    pub title: String,
    /// Last edit of the article, as unix seconds.
    pub timestamp: i64,
    /// Infobox attributes that were not mapped to any field.
    pub raw_attributes: RawAttributes,
    pub article: Option<String>,
    pub name: Option<String>,
    pub class: Option<String>,
    pub creature_type: Option<String>,
    pub bestiary_class: Option<String>,
    pub bestiary_level: Option<String>,
    pub bestiary_occurrence: Option<String>,
    pub hitpoints: Option<i64>,
    pub experience: Option<i64>,
    pub armor: Option<i64>,
    pub speed: Option<i64>,
    /// Most damage the creature can deal in a single turn.
    pub max_damage: Option<i64>,
    /// Mana needed to summon it, 0 if it can't be summoned.
    pub summon_cost: i64,
    /// Mana needed to convince it, 0 if it can't be convinced.
    pub convince_cost: i64,
    pub illusionable: bool,
    pub pushable: bool,
    pub sees_invisible: bool,
    pub paralysable: bool,
    pub boss: bool,
    /// Percentage of each damage type the creature receives.
    pub modifier_physical: Option<i64>,
    pub modifier_earth: Option<i64>,
    pub modifier_fire: Option<i64>,
    pub modifier_ice: Option<i64>,
    pub modifier_energy: Option<i64>,
    pub modifier_death: Option<i64>,
    pub modifier_holy: Option<i64>,
    pub modifier_drown: Option<i64>,
    pub modifier_hpdrain: Option<i64>,
    pub abilities: Option<String>,
    /// Field types walked through, comma separated.
    pub walks_through: Option<String>,
    /// Field types walked around, comma separated.
    pub walks_around: Option<String>,
    /// Client version the creature was added in.
    pub version: Option<String>,
    #[serde(skip)]
    pub image: Option<Vec<u8>>,
    pub loot: Vec<CreatureDrop>,
}

static CREATURE_MAP: &[FieldMapping<Creature>] = &[
    FieldMapping {
        key: "article",
        field: "article",
        apply: |c, v| c.article = Some(v.to_string()),
    },
    FieldMapping {
        key: "name",
        field: "name",
        apply: |c, v| c.name = Some(v.to_string()),
    },
    FieldMapping {
        key: "actualname",
        field: "name",
        apply: |c, v| c.name = Some(v.to_string()),
    },
    FieldMapping {
        key: "creatureclass",
        field: "class",
        apply: |c, v| c.class = Some(v.to_string()),
    },
    FieldMapping {
        key: "primarytype",
        field: "type",
        apply: |c, v| c.creature_type = Some(v.to_string()),
    },
    FieldMapping {
        key: "bestiaryclass",
        field: "bestiary_class",
        apply: |c, v| c.bestiary_class = Some(v.to_string()),
    },
    FieldMapping {
        key: "bestiarylevel",
        field: "bestiary_level",
        apply: |c, v| c.bestiary_level = Some(v.to_string()),
    },
    FieldMapping {
        key: "occurrence",
        field: "bestiary_occurrence",
        apply: |c, v| c.bestiary_occurrence = Some(v.to_string()),
    },
    FieldMapping {
        key: "hp",
        field: "hitpoints",
        apply: |c, v| c.hitpoints = parse_integer(v),
    },
    FieldMapping {
        key: "exp",
        field: "experience",
        apply: |c, v| c.experience = parse_integer(v),
    },
    FieldMapping {
        key: "armor",
        field: "armor",
        apply: |c, v| c.armor = parse_integer(v),
    },
    FieldMapping {
        key: "speed",
        field: "speed",
        apply: |c, v| c.speed = parse_integer(v),
    },
    FieldMapping {
        key: "maxdmg",
        field: "max_damage",
        apply: |c, v| c.max_damage = parse_maximum_integer(v),
    },
    FieldMapping {
        key: "summon",
        field: "summon_cost",
        apply: |c, v| c.summon_cost = parse_integer(v).unwrap_or(0),
    },
    FieldMapping {
        key: "convince",
        field: "convince_cost",
        apply: |c, v| c.convince_cost = parse_integer(v).unwrap_or(0),
    },
    FieldMapping {
        key: "illusionable",
        field: "illusionable",
        apply: |c, v| c.illusionable = parse_boolean(v, false),
    },
    FieldMapping {
        key: "pushable",
        field: "pushable",
        apply: |c, v| c.pushable = parse_boolean(v, false),
    },
    FieldMapping {
        key: "senseinvis",
        field: "sees_invisible",
        apply: |c, v| c.sees_invisible = parse_boolean(v, false),
    },
    FieldMapping {
        key: "paraimmune",
        field: "paralysable",
        apply: |c, v| c.paralysable = !parse_boolean(v, false),
    },
    FieldMapping {
        key: "isboss",
        field: "boss",
        apply: |c, v| c.boss = parse_boolean(v, false),
    },
    FieldMapping {
        key: "physicalDmgMod",
        field: "modifier_physical",
        apply: |c, v| c.modifier_physical = parse_integer(v),
    },
    FieldMapping {
        key: "earthDmgMod",
        field: "modifier_earth",
        apply: |c, v| c.modifier_earth = parse_integer(v),
    },
    FieldMapping {
        key: "fireDmgMod",
        field: "modifier_fire",
        apply: |c, v| c.modifier_fire = parse_integer(v),
    },
    FieldMapping {
        key: "iceDmgMod",
        field: "modifier_ice",
        apply: |c, v| c.modifier_ice = parse_integer(v),
    },
    FieldMapping {
        key: "energyDmgMod",
        field: "modifier_energy",
        apply: |c, v| c.modifier_energy = parse_integer(v),
    },
    FieldMapping {
        key: "deathDmgMod",
        field: "modifier_death",
        apply: |c, v| c.modifier_death = parse_integer(v),
    },
    FieldMapping {
        key: "holyDmgMod",
        field: "modifier_holy",
        apply: |c, v| c.modifier_holy = parse_integer(v),
    },
    FieldMapping {
        key: "drownDmgMod",
        field: "modifier_drown",
        apply: |c, v| c.modifier_drown = parse_integer(v),
    },
    FieldMapping {
        key: "hpDrainDmgMod",
        field: "modifier_hpdrain",
        apply: |c, v| c.modifier_hpdrain = parse_integer(v),
    },
    FieldMapping {
        key: "abilities",
        field: "abilities",
        apply: |c, v| c.abilities = Some(clean_links(v)),
    },
    FieldMapping {
        key: "walksthrough",
        field: "walks_through",
        apply: |c, v| c.walks_through = parse_monster_walks(v),
    },
    FieldMapping {
        key: "walksaround",
        field: "walks_around",
        apply: |c, v| c.walks_around = parse_monster_walks(v),
    },
    FieldMapping {
        key: "implemented",
        field: "version",
        apply: |c, v| c.version = Some(v.to_string()),
    },
];

impl Creature {
    pub fn get_by_article_id(conn: &Connection, article_id: i64) -> Result<Option<Self>> {
        Self::get_by_field(conn, "article_id", article_id, MatchMode::Exact)
    }

    /// Look a creature up by name, ignoring case.
    pub fn get_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        Self::get_by_field(conn, "name", name, MatchMode::IgnoreCase)
    }

    /// Insert the creature and its loot, resolving item names through `items`.
    pub fn insert_with(&self, conn: &Connection, items: &mut TitleIndex) -> Result<()> {
        insert_values(conn, Self::table(), self.values())?;
        for drop in &self.loot {
            drop.insert_with(conn, items)?;
        }
        Ok(())
    }

    fn load_loot(mut self, conn: &Connection) -> Result<Self> {
        self.loot = CreatureDrop::get_by_creature_id(conn, self.article_id)?;
        Ok(self)
    }
}

impl Parseable for Creature {
    fn pattern() -> &'static Regex {
        &CREATURE_PATTERN
    }

    fn mappings() -> &'static [FieldMapping<Self>] {
        CREATURE_MAP
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
        let Some(loot) = self.raw_attributes.remove("loot") else {
            return;
        };
        self.loot = parse_loot(&loot)
            .into_iter()
            .map(|(amounts, item)| {
                let (min, max) = match amounts {
                    Some(amounts) => parse_min_max(amounts),
                    None => (0, 1),
                };
                CreatureDrop {
                    creature_id: self.article_id,
                    item_name: Some(item.to_string()),
                    min,
                    max,
                    ..Default::default()
                }
            })
            .collect();
    }
}

impl Row for Creature {
    fn table() -> &'static Table {
        &schema::CREATURE
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.article_id.into(),
            self.title.clone().into(),
            self.name.clone().into(),
            self.article.clone().into(),
            self.class.clone().into(),
            self.creature_type.clone().into(),
            self.bestiary_class.clone().into(),
            self.bestiary_level.clone().into(),
            self.bestiary_occurrence.clone().into(),
            self.hitpoints.into(),
            self.experience.into(),
            self.armor.into(),
            self.speed.into(),
            self.max_damage.into(),
            self.summon_cost.into(),
            self.convince_cost.into(),
            self.illusionable.into(),
            self.pushable.into(),
            self.sees_invisible.into(),
            self.paralysable.into(),
            self.boss.into(),
            self.modifier_physical.into(),
            self.modifier_earth.into(),
            self.modifier_fire.into(),
            self.modifier_ice.into(),
            self.modifier_energy.into(),
            self.modifier_death.into(),
            self.modifier_holy.into(),
            self.modifier_drown.into(),
            self.modifier_hpdrain.into(),
            self.abilities.clone().into(),
            self.walks_through.clone().into(),
            self.walks_around.clone().into(),
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
            article: row.get("article")?,
            name: row.get("name")?,
            class: row.get("class")?,
            creature_type: row.get("type")?,
            bestiary_class: row.get("bestiary_class")?,
            bestiary_level: row.get("bestiary_level")?,
            bestiary_occurrence: row.get("bestiary_occurrence")?,
            hitpoints: row.get("hitpoints")?,
            experience: row.get("experience")?,
            armor: row.get("armor")?,
            speed: row.get("speed")?,
            max_damage: row.get("max_damage")?,
            summon_cost: row.get("summon_cost")?,
            convince_cost: row.get("convince_cost")?,
            illusionable: row.get("illusionable")?,
            pushable: row.get("pushable")?,
            sees_invisible: row.get("sees_invisible")?,
            paralysable: row.get("paralysable")?,
            boss: row.get("boss")?,
            modifier_physical: row.get("modifier_physical")?,
            modifier_earth: row.get("modifier_earth")?,
            modifier_fire: row.get("modifier_fire")?,
            modifier_ice: row.get("modifier_ice")?,
            modifier_energy: row.get("modifier_energy")?,
            modifier_death: row.get("modifier_death")?,
            modifier_holy: row.get("modifier_holy")?,
            modifier_drown: row.get("modifier_drown")?,
            modifier_hpdrain: row.get("modifier_hpdrain")?,
            abilities: row.get("abilities")?,
            walks_through: row.get("walks_through")?,
            walks_around: row.get("walks_around")?,
            version: row.get("version")?,
            image: row.get("image")?,
            loot: Vec::new(),
        })
    }

    fn insert(&self, conn: &Connection) -> Result<()> {
        self.insert_with(conn, &mut TitleIndex::new(&schema::ITEM))
    }

    fn get_by_field<V: Into<Value>>(
        conn: &Connection,
        field: &str,
        value: V,
        mode: MatchMode,
    ) -> Result<Option<Self>> {
        select_one::<Self>(conn, field, value.into(), mode)?
            .map(|creature| creature.load_loot(conn))
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
            .map(|creature| creature.load_loot(conn))
            .collect()
    }
}

/// An item dropped by a creature.
///
/// Parsed drops know the item only by title; the id is resolved when the
/// drop is written, and stays NULL if no item has that title.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreatureDrop {
    pub creature_id: i64,
    pub item_id: Option<i64>,
    pub min: i64,
    pub max: i64,
    /// Drop chance, as a percentage.
    pub chance: Option<f64>,
    /// Display only, filled in when read back.
    pub creature_name: Option<String>,
    /// Title of the item when parsed, its display name when read back.
    pub item_name: Option<String>,
}

impl CreatureDrop {
    pub fn get_by_creature_id(conn: &Connection, creature_id: i64) -> Result<Vec<Self>> {
        Self::get_all_by_field(conn, "creature_id", creature_id, MatchMode::Exact)
    }

    pub fn get_by_item_id(conn: &Connection, item_id: i64) -> Result<Vec<Self>> {
        Self::get_all_by_field(conn, "item_id", item_id, MatchMode::Exact)
    }

    /// Insert the drop, resolving its item title to an id through `items`.
    pub fn insert_with(&self, conn: &Connection, items: &mut TitleIndex) -> Result<()> {
        let item_id = match (self.item_id, self.item_name.as_deref()) {
            (Some(id), _) => Some(id),
            (None, Some(title)) => items.resolve(conn, title)?,
            (None, None) => None,
        };
        if item_id.is_none() {
            tracing::debug!(
                "Drop {:?} of creature {} stored without item id",
                self.item_name,
                self.creature_id
            );
        }
        let resolved = Self {
            item_id,
            ..self.clone()
        };
        insert_values(conn, Self::table(), resolved.values())
    }
}

impl Row for CreatureDrop {
    fn table() -> &'static Table {
        &schema::CREATURE_DROP
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.creature_id.into(),
            self.item_id.into(),
            self.min.into(),
            self.max.into(),
            self.chance.into(),
        ]
    }

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            creature_id: row.get("creature_id")?,
            item_id: row.get("item_id")?,
            min: row.get("min")?,
            max: row.get("max")?,
            chance: row.get("chance")?,
            creature_name: row.get("creature_name")?,
            item_name: row.get("item_name")?,
        })
    }

    fn select_clause() -> String {
        "SELECT creature_drop.*, \
                COALESCE(item.name, item.title) AS item_name, \
                COALESCE(creature.name, creature.title) AS creature_name \
         FROM creature_drop \
         LEFT JOIN creature ON creature.article_id = creature_drop.creature_id \
         LEFT JOIN item ON item.article_id = creature_drop.item_id"
            .to_string()
    }

    fn insert(&self, conn: &Connection) -> Result<()> {
        self.insert_with(conn, &mut TitleIndex::new(&schema::ITEM))
    }
}
