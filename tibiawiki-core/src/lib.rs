//! Core library turning TibiaWiki articles into relational records.

pub mod article;
pub mod database;
pub mod error;
pub mod file_utils;
pub mod models;
pub mod parsers;
pub mod record;
pub mod schema;
pub mod settings;

pub use article::Article;
pub use database::{Database, LoadSummary};
pub use error::{Result, TibiaWikiError};
pub use models::{Record, RecordKind, parse_articles};
pub use record::{MatchMode, Parseable, Row};
pub use settings::Settings;
