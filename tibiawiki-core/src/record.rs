//! The contract shared by every record kind: building a record from an
//! article through a field mapping table, and writing/reading it as a row.

use crate::article::Article;
use crate::error::Result;
use crate::parsers::parse_attributes;
use crate::schema::{Table, Value};
use regex::Regex;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;

/// Infobox attributes no mapping claimed, kept for diagnostics only.
pub type RawAttributes = HashMap<String, String>;

/// Maps one infobox attribute onto a record field.
pub struct FieldMapping<T> {
    /// Attribute name as written in the infobox.
    pub key: &'static str,
    /// Column the attribute ends up in.
    pub field: &'static str,
    /// Converts the raw value and assigns it. Must not fail: an unusable
    /// value leaves the field at its default.
    pub apply: fn(&mut T, &str),
}

/// Apply a mapping table to a record, returning the unmapped attributes.
///
/// Mappings run in table order, so when two keys target the same field the
/// later entry wins.
pub fn apply_mappings<T>(
    record: &mut T,
    mappings: &[FieldMapping<T>],
    mut attributes: RawAttributes,
) -> RawAttributes {
    for mapping in mappings {
        if let Some(value) = attributes.get(mapping.key) {
            (mapping.apply)(record, value);
        }
    }
    attributes.retain(|key, _| !mappings.iter().any(|m| m.key == key.as_str()));
    attributes
}

/// How a lookup compares the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    #[default]
    Exact,
    /// Whole value, ignoring ASCII case.
    IgnoreCase,
    /// Substring, ignoring ASCII case.
    Partial,
}

impl MatchMode {
    fn condition(self, column: &str) -> String {
        match self {
            MatchMode::Exact => format!("{} = ?1", column),
            MatchMode::IgnoreCase | MatchMode::Partial => format!("{} LIKE ?1 ESCAPE '\\'", column),
        }
    }

    fn bind(self, value: Value) -> Value {
        match (self, value) {
            (MatchMode::IgnoreCase, Value::Text(text)) => Value::Text(escape_like(&text)),
            (MatchMode::Partial, Value::Text(text)) => {
                Value::Text(format!("%{}%", escape_like(&text)))
            }
            (_, value) => value,
        }
    }
}

fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// A record kind stored as one row of its table.
pub trait Row: Sized {
    fn table() -> &'static Table;

    /// Declared field values, in the table's column order.
    fn values(&self) -> Vec<Value>;

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self>;

    /// Statement prefix used to read rows back. Kinds with display-only
    /// fields join the tables those come from.
    fn select_clause() -> String {
        format!("SELECT * FROM {}", Self::table().name)
    }

    /// Write this record, and the records it owns.
    fn insert(&self, conn: &Connection) -> Result<()> {
        insert_values(conn, Self::table(), self.values())
    }

    /// First row whose `field` matches `value`.
    fn get_by_field<V: Into<Value>>(
        conn: &Connection,
        field: &str,
        value: V,
        mode: MatchMode,
    ) -> Result<Option<Self>> {
        select_one(conn, field, value.into(), mode)
    }

    /// Every row whose `field` matches `value`, in insertion order.
    fn get_all_by_field<V: Into<Value>>(
        conn: &Connection,
        field: &str,
        value: V,
        mode: MatchMode,
    ) -> Result<Vec<Self>> {
        select_all(conn, field, value.into(), mode)
    }
}

/// A record kind parsed out of an article's infobox.
pub trait Parseable: Default + 'static {
    /// Marker the article content must contain for this kind to apply.
    fn pattern() -> &'static Regex;

    fn mappings() -> &'static [FieldMapping<Self>];

    /// Copy the article identity into the record.
    fn set_article(&mut self, article: &Article);

    fn raw_attributes_mut(&mut self) -> &mut RawAttributes;

    /// Second pass over the attributes the mapping table left unclaimed,
    /// e.g. to build dependent records. Attributes consumed here are removed.
    fn parse_raw_attributes(&mut self) {}

    /// Parse an article, or `None` when it is not about this kind.
    fn from_article(article: &Article) -> Option<Self> {
        if !Self::pattern().is_match(&article.content) {
            tracing::trace!("{} does not match {}", article.title, Self::pattern().as_str());
            return None;
        }
        let mut record = Self::default();
        record.set_article(article);
        let attributes = parse_attributes(&article.content);
        let raw = apply_mappings(&mut record, Self::mappings(), attributes);
        *record.raw_attributes_mut() = raw;
        record.parse_raw_attributes();
        Some(record)
    }
}

/// Insert a row, leaving out every value equal to its column default.
pub fn insert_values(conn: &Connection, table: &Table, values: Vec<Value>) -> Result<()> {
    debug_assert_eq!(values.len(), table.columns.len(), "values of {}", table.name);
    let row: Vec<(&str, Value)> = table
        .columns
        .iter()
        .zip(values)
        .filter(|(column, value)| *value != column.default)
        .map(|(column, value)| (column.name, value))
        .collect();
    table.insert(conn, &row)
}

fn lookup_query<R: Row>(field: &str, mode: MatchMode) -> Result<String> {
    let table = R::table();
    let column = table.require_column(field)?;
    Ok(format!(
        "{} WHERE {} ORDER BY {}.rowid",
        R::select_clause(),
        mode.condition(&format!("{}.{}", table.name, column.name)),
        table.name
    ))
}

pub fn select_one<R: Row>(
    conn: &Connection,
    field: &str,
    value: Value,
    mode: MatchMode,
) -> Result<Option<R>> {
    let query = format!("{} LIMIT 1", lookup_query::<R>(field, mode)?);
    let row = conn
        .query_row(&query, [mode.bind(value)], R::from_row)
        .optional()?;
    Ok(row)
}

pub fn select_all<R: Row>(
    conn: &Connection,
    field: &str,
    value: Value,
    mode: MatchMode,
) -> Result<Vec<R>> {
    let query = lookup_query::<R>(field, mode)?;
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt
        .query_map([mode.bind(value)], R::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Resolves article titles of one table to article ids.
///
/// Titles can be seeded from records already written in the same batch;
/// anything else is looked up in the table and remembered once found.
#[derive(Debug)]
pub struct TitleIndex {
    table: &'static Table,
    ids: HashMap<String, i64>,
}

impl TitleIndex {
    pub fn new(table: &'static Table) -> Self {
        Self {
            table,
            ids: HashMap::new(),
        }
    }

    pub fn from_titles<'a>(
        table: &'static Table,
        titles: impl IntoIterator<Item = (&'a str, i64)>,
    ) -> Self {
        let mut index = Self::new(table);
        for (title, id) in titles {
            index.insert(title, id);
        }
        index
    }

    pub fn insert(&mut self, title: &str, id: i64) {
        self.ids.insert(title.to_string(), id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// The id of the article titled `title`, if there is one.
    pub fn resolve(&mut self, conn: &Connection, title: &str) -> Result<Option<i64>> {
        if let Some(id) = self.ids.get(title) {
            return Ok(Some(*id));
        }
        let query = format!("SELECT article_id FROM {} WHERE title = ?1", self.table.name);
        let id: Option<i64> = conn
            .query_row(&query, [title], |row| row.get(0))
            .optional()?;
        match id {
            Some(id) => self.insert(title, id),
            None => tracing::debug!("No {} titled {:?}", self.table.name, title),
        }
        Ok(id)
    }
}
