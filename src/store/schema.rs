//! Declarative table definitions for the catalog database.

use rusqlite::{params, Connection};

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            // Allow unused_mut because the variable is only mutated when optional
            // field assignments are passed to the macro (e.g., `is_primary_key = true`)
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                foreign_key: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

pub struct ForeignKey {
    pub foreign_table: &'static str,
    pub foreign_column: &'static str,
}

pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub foreign_key: Option<&'static ForeignKey>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column],
    pub indices: &'static [(&'static str, &'static str)],
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier)
}

impl Table {
    pub fn create_sql(&self) -> String {
        let mut create_sql = format!("CREATE TABLE IF NOT EXISTS {} (", quote(self.name));
        for (column_index, column) in self.columns.iter().enumerate() {
            if column_index > 0 {
                create_sql.push_str(", ");
            }
            create_sql.push_str(&format!(
                "{} {}",
                quote(column.name),
                match column.sql_type {
                    SqlType::Text => "TEXT",
                    SqlType::Integer => "INTEGER",
                    SqlType::Real => "REAL",
                }
            ));
            if column.is_primary_key {
                create_sql.push_str(" PRIMARY KEY");
            }
            if column.non_null {
                create_sql.push_str(" NOT NULL");
            }
            if let Some(foreign_key) = column.foreign_key {
                create_sql.push_str(&format!(
                    " REFERENCES {}({})",
                    quote(foreign_key.foreign_table),
                    quote(foreign_key.foreign_column)
                ));
            }
        }
        create_sql.push_str(");");
        create_sql
    }

    /// Create the table and its indices unless they already exist.
    pub fn create_if_missing(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute(&self.create_sql(), params![])?;
        for (index_name, column_name) in self.indices {
            conn.execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS {} ON {}({});",
                    quote(index_name),
                    quote(self.name),
                    quote(column_name)
                ),
                params![],
            )?;
        }
        Ok(())
    }
}

const ARTIST_REFERENCE: ForeignKey = ForeignKey {
    foreign_table: "artist",
    foreign_column: "id",
};

pub const ARTIST_TABLE: Table = Table {
    name: "artist",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("popularity", &SqlType::Integer),
        sqlite_column!("genre", &SqlType::Text),
        sqlite_column!("followers", &SqlType::Integer),
        sqlite_column!("update", &SqlType::Text),
    ],
    indices: &[],
};

pub const TRACK_TABLE: Table = Table {
    name: "track",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!(
            "artist_id",
            &SqlType::Text,
            foreign_key = Some(&ARTIST_REFERENCE)
        ),
        sqlite_column!("popularity", &SqlType::Integer),
        sqlite_column!("release_date", &SqlType::Text),
        sqlite_column!("update", &SqlType::Text),
        sqlite_column!("danceability", &SqlType::Real),
        sqlite_column!("energy", &SqlType::Real),
        sqlite_column!("key", &SqlType::Integer),
        sqlite_column!("loudness", &SqlType::Real),
        sqlite_column!("mode", &SqlType::Integer),
        sqlite_column!("speechiness", &SqlType::Real),
        sqlite_column!("acousticness", &SqlType::Real),
        sqlite_column!("instrumentalness", &SqlType::Real),
        sqlite_column!("liveness", &SqlType::Real),
        sqlite_column!("valence", &SqlType::Real),
        sqlite_column!("tempo", &SqlType::Real),
        sqlite_column!("duration_ms", &SqlType::Integer),
        sqlite_column!("time_signature", &SqlType::Integer),
    ],
    indices: &[("idx_track_artist_id", "artist_id")],
};

/// Tables in dependency order.
pub const TABLES: &[&Table] = &[&ARTIST_TABLE, &TRACK_TABLE];
