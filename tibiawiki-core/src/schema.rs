//! Table descriptors: the declared columns of every record kind.
//!
//! Each record kind's fields are exactly the columns listed here, in this
//! order. The descriptors also generate the DDL applied by the database
//! migrations and verify values before they are inserted.

use crate::error::{Result, TibiaWikiError};
use lazy_static::lazy_static;
use rusqlite::types::{ToSql, ToSqlOutput};
use rusqlite::{Connection, params_from_iter};

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
    Blob,
    /// Stored by SQLite as 0 or 1.
    Boolean,
}

impl ColumnType {
    pub fn to_sql(self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
            ColumnType::Blob => "BLOB",
            ColumnType::Boolean => "BOOLEAN",
        }
    }
}

/// A typed column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
    Boolean(bool),
}

impl Value {
    /// Whether this value can be stored in a column of the given type.
    fn fits(&self, column_type: ColumnType) -> bool {
        matches!(
            (self, column_type),
            (Value::Null, _)
                | (Value::Integer(_), ColumnType::Integer)
                | (Value::Real(_), ColumnType::Real)
                | (Value::Text(_), ColumnType::Text)
                | (Value::Blob(_), ColumnType::Blob)
                | (Value::Boolean(_), ColumnType::Boolean)
        )
    }

    fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Real(_) => "REAL",
            Value::Text(_) => "TEXT",
            Value::Blob(_) => "BLOB",
            Value::Boolean(_) => "BOOLEAN",
        }
    }

    /// SQL literal, used for DEFAULT clauses.
    fn to_literal(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(v) => v.to_string(),
            Value::Real(v) => v.to_string(),
            Value::Text(v) => format!("'{}'", v.replace('\'', "''")),
            Value::Blob(_) => "NULL".to_string(),
            Value::Boolean(v) => (*v as i32).to_string(),
        }
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Null => ToSqlOutput::from(rusqlite::types::Null),
            Value::Integer(v) => ToSqlOutput::from(*v),
            Value::Real(v) => ToSqlOutput::from(*v),
            Value::Text(v) => ToSqlOutput::from(v.as_str()),
            Value::Blob(v) => ToSqlOutput::from(v.as_slice()),
            Value::Boolean(v) => ToSqlOutput::from(*v),
        })
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// A declared column.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: &'static str,
    pub column_type: ColumnType,
    /// Value the store supplies when the column is omitted on insert.
    pub default: Value,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    /// Referenced `(table, column)`, for foreign keys.
    pub references: Option<(&'static str, &'static str)>,
}

impl Column {
    pub fn new(name: &'static str, column_type: ColumnType) -> Self {
        Self {
            name,
            column_type,
            default: Value::Null,
            nullable: true,
            primary_key: false,
            unique: false,
            references: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    pub fn references(mut self, table: &'static str, column: &'static str) -> Self {
        self.references = Some((table, column));
        self
    }

    fn definition(&self) -> String {
        let mut builder = vec![self.name.to_string(), self.column_type.to_sql().to_string()];
        if self.default != Value::Null {
            builder.push(format!("DEFAULT {}", self.default.to_literal()));
        }
        if self.primary_key {
            builder.push("PRIMARY KEY".to_string());
        } else if self.unique {
            builder.push("UNIQUE".to_string());
        }
        if !self.nullable && !self.primary_key {
            builder.push("NOT NULL".to_string());
        }
        if let Some((table, column)) = self.references {
            builder.push(format!("REFERENCES {}({})", table, column));
        }
        builder.join(" ")
    }
}

/// A table: its name and ordered columns.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: &'static str,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(name: &'static str, columns: Vec<Column>) -> Self {
        Self { name, columns }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Resolve a column name, failing for names this table does not declare.
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name).ok_or_else(|| {
            TibiaWikiError::Schema(format!("Table {} has no column {}", self.name, name))
        })
    }

    /// The `CREATE TABLE` statement for this table.
    pub fn create_table(&self) -> String {
        let columns: Vec<String> = self.columns.iter().map(Column::definition).collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({});",
            self.name,
            columns.join(", ")
        )
    }

    /// Insert one row made of the given `(column, value)` pairs.
    ///
    /// Columns left out take their store default. Every value is checked
    /// against its column before anything is written.
    pub fn insert(&self, conn: &Connection, values: &[(&str, Value)]) -> Result<()> {
        for (name, value) in values {
            let column = self.require_column(name)?;
            if *value == Value::Null && !column.nullable {
                return Err(TibiaWikiError::Schema(format!(
                    "Cannot pass NULL to non-nullable column {}.{}",
                    self.name, column.name
                )));
            }
            if !value.fits(column.column_type) {
                return Err(TibiaWikiError::Schema(format!(
                    "Column {}.{} expected {}, received {}",
                    self.name,
                    column.name,
                    column.column_type.to_sql(),
                    value.type_name()
                )));
            }
        }

        let sql = if values.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", self.name)
        } else {
            let names: Vec<&str> = values.iter().map(|(name, _)| *name).collect();
            let placeholders: Vec<String> = (1..=values.len()).map(|i| format!("?{}", i)).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.name,
                names.join(", "),
                placeholders.join(", ")
            )
        };
        conn.execute(&sql, params_from_iter(values.iter().map(|(_, value)| value)))?;
        Ok(())
    }
}

lazy_static! {
    pub static ref CREATURE: Table = Table::new(
        "creature",
        vec![
            Column::new("article_id", ColumnType::Integer).primary_key(),
            Column::new("title", ColumnType::Text).unique(),
            Column::new("name", ColumnType::Text),
            Column::new("article", ColumnType::Text),
            Column::new("class", ColumnType::Text),
            Column::new("type", ColumnType::Text),
            Column::new("bestiary_class", ColumnType::Text),
            Column::new("bestiary_level", ColumnType::Text),
            Column::new("bestiary_occurrence", ColumnType::Text),
            Column::new("hitpoints", ColumnType::Integer),
            Column::new("experience", ColumnType::Integer),
            Column::new("armor", ColumnType::Integer),
            Column::new("speed", ColumnType::Integer),
            Column::new("max_damage", ColumnType::Integer),
            Column::new("summon_cost", ColumnType::Integer).default(0i64),
            Column::new("convince_cost", ColumnType::Integer).default(0i64),
            Column::new("illusionable", ColumnType::Boolean).default(false),
            Column::new("pushable", ColumnType::Boolean).default(false),
            Column::new("sees_invisible", ColumnType::Boolean).default(false),
            Column::new("paralysable", ColumnType::Boolean).default(false),
            Column::new("boss", ColumnType::Boolean).default(false),
            Column::new("modifier_physical", ColumnType::Integer),
            Column::new("modifier_earth", ColumnType::Integer),
            Column::new("modifier_fire", ColumnType::Integer),
            Column::new("modifier_ice", ColumnType::Integer),
            Column::new("modifier_energy", ColumnType::Integer),
            Column::new("modifier_death", ColumnType::Integer),
            Column::new("modifier_holy", ColumnType::Integer),
            Column::new("modifier_drown", ColumnType::Integer),
            Column::new("modifier_hpdrain", ColumnType::Integer),
            Column::new("abilities", ColumnType::Text),
            Column::new("walks_through", ColumnType::Text),
            Column::new("walks_around", ColumnType::Text),
            Column::new("version", ColumnType::Text),
            Column::new("image", ColumnType::Blob),
            Column::new("timestamp", ColumnType::Integer),
        ],
    );

    pub static ref CREATURE_DROP: Table = Table::new(
        "creature_drop",
        vec![
            Column::new("creature_id", ColumnType::Integer)
                .not_null()
                .references("creature", "article_id"),
            Column::new("item_id", ColumnType::Integer).references("item", "article_id"),
            Column::new("min", ColumnType::Integer).not_null(),
            Column::new("max", ColumnType::Integer).not_null(),
            Column::new("chance", ColumnType::Real),
        ],
    );

    pub static ref ITEM: Table = Table::new(
        "item",
        vec![
            Column::new("article_id", ColumnType::Integer).primary_key(),
            Column::new("title", ColumnType::Text).unique(),
            Column::new("name", ColumnType::Text),
            Column::new("article", ColumnType::Text),
            Column::new("stackable", ColumnType::Boolean).default(false),
            Column::new("value_sell", ColumnType::Integer),
            Column::new("value_buy", ColumnType::Integer),
            Column::new("weight", ColumnType::Real),
            Column::new("class", ColumnType::Text),
            Column::new("type", ColumnType::Text),
            Column::new("flavor_text", ColumnType::Text),
            Column::new("client_id", ColumnType::Integer),
            Column::new("version", ColumnType::Text),
            Column::new("image", ColumnType::Blob),
            Column::new("timestamp", ColumnType::Integer),
        ],
    );

    pub static ref ITEM_ATTRIBUTE: Table = Table::new(
        "item_attribute",
        vec![
            Column::new("item_id", ColumnType::Integer)
                .not_null()
                .references("item", "article_id"),
            Column::new("name", ColumnType::Text).not_null(),
            Column::new("value", ColumnType::Text),
        ],
    );

    pub static ref ITEM_KEY: Table = Table::new(
        "item_key",
        vec![
            Column::new("article_id", ColumnType::Integer).primary_key(),
            Column::new("title", ColumnType::Text).unique(),
            Column::new("number", ColumnType::Integer),
            Column::new("item_id", ColumnType::Integer).references("item", "article_id"),
            Column::new("name", ColumnType::Text),
            Column::new("material", ColumnType::Text),
            Column::new("location", ColumnType::Text),
            Column::new("origin", ColumnType::Text),
            Column::new("notes", ColumnType::Text),
            Column::new("version", ColumnType::Text),
            Column::new("timestamp", ColumnType::Integer),
        ],
    );

    pub static ref SPELL: Table = Table::new(
        "spell",
        vec![
            Column::new("article_id", ColumnType::Integer).primary_key(),
            Column::new("title", ColumnType::Text).unique(),
            Column::new("name", ColumnType::Text),
            Column::new("words", ColumnType::Text),
            Column::new("type", ColumnType::Text),
            Column::new("class", ColumnType::Text),
            Column::new("element", ColumnType::Text),
            Column::new("level", ColumnType::Integer),
            Column::new("mana", ColumnType::Integer),
            Column::new("soul", ColumnType::Integer).default(0i64),
            Column::new("price", ColumnType::Integer),
            Column::new("cooldown", ColumnType::Integer),
            Column::new("premium", ColumnType::Boolean).default(false),
            Column::new("knight", ColumnType::Boolean).default(false),
            Column::new("paladin", ColumnType::Boolean).default(false),
            Column::new("druid", ColumnType::Boolean).default(false),
            Column::new("sorcerer", ColumnType::Boolean).default(false),
            Column::new("version", ColumnType::Text),
            Column::new("timestamp", ColumnType::Integer),
        ],
    );
}

/// Every table, parents before the tables that reference them.
pub fn all_tables() -> [&'static Table; 6] {
    [&*ITEM, &*ITEM_ATTRIBUTE, &*ITEM_KEY, &*CREATURE, &*CREATURE_DROP, &*SPELL]
}

/// DDL for the whole schema.
pub fn create_statements() -> String {
    all_tables()
        .iter()
        .map(|table| table.create_table())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Create every table on a bare connection.
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(&create_statements())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_definition() {
        let column = Column::new("creature_id", ColumnType::Integer)
            .not_null()
            .references("creature", "article_id");
        assert_eq!(
            column.definition(),
            "creature_id INTEGER NOT NULL REFERENCES creature(article_id)"
        );
        assert_eq!(
            Column::new("boss", ColumnType::Boolean).default(false).definition(),
            "boss BOOLEAN DEFAULT 0"
        );
        assert_eq!(
            Column::new("article_id", ColumnType::Integer).primary_key().definition(),
            "article_id INTEGER PRIMARY KEY"
        );
    }

    #[test]
    fn test_create_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        // Idempotent.
        create_tables(&conn).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 6);
    }

    #[test]
    fn test_insert_applies_store_defaults() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        SPELL
            .insert(&conn, &[("article_id", Value::Integer(1)), ("title", "Light".into())])
            .unwrap();
        let (soul, premium): (i64, bool) = conn
            .query_row("SELECT soul, premium FROM spell WHERE article_id = 1", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(soul, 0);
        assert!(!premium);
    }

    #[test]
    fn test_insert_rejects_wrong_type() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        let err = ITEM
            .insert(&conn, &[("article_id", Value::Integer(1)), ("weight", "heavy".into())])
            .unwrap_err();
        assert!(matches!(err, TibiaWikiError::Schema(_)));
    }

    #[test]
    fn test_insert_rejects_null_in_not_null_column() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        let err = CREATURE_DROP
            .insert(
                &conn,
                &[
                    ("creature_id", Value::Null),
                    ("min", 0i64.into()),
                    ("max", 1i64.into()),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, TibiaWikiError::Schema(_)));
    }

    #[test]
    fn test_insert_rejects_unknown_column() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();
        let err = ITEM
            .insert(&conn, &[("article_id", Value::Integer(1)), ("colour", "red".into())])
            .unwrap_err();
        assert!(matches!(err, TibiaWikiError::Schema(_)));
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("Demon")), Value::Text("Demon".to_string()));
    }
}
