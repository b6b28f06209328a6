//! Single-file migration format
//!
//! Implements a sqlx migration source that reads all migrations from one
//! embedded sql script. A migration starts at a marker comment:
//! ```
//! --##1 initial schema
//! ```
//! The marker carries the version (1) and a description. Versions must
//! increase by one per migration.
use std::{borrow::Cow, future::Future, pin::Pin};

use sqlx::{
    error::BoxDynError,
    migrate::{Migration, MigrationSource, MigrationType},
};

#[derive(Debug)]
pub struct MigrationScript<'s> {
    data: &'s str,
}

impl<'s> MigrationSource<'s> for MigrationScript<'s> {
    fn resolve(self) -> Pin<Box<dyn Future<Output = Result<Vec<Migration>, BoxDynError>> + Send + 's>> {
        Box::pin(async move {
            let mut result = Vec::new();

            for line in self.data.lines() {
                if line.trim().is_empty() {
                    continue;
                }

                if let Some(marker) = line.strip_prefix("--##") {
                    let version_end = marker.find(' ').unwrap_or(marker.len());
                    let version = match marker[..version_end].parse() {
                        Ok(v) => v,
                        Err(e) => Err(format!(
                            "cannot parse migration version, got '{}': {}",
                            &marker[..version_end],
                            e
                        ))?,
                    };
                    result.push(Migration::new(
                        version,
                        Cow::Owned(marker[version_end..].trim().to_string()),
                        MigrationType::Simple,
                        Cow::Owned(String::new()),
                    ));
                    continue;
                }

                let migration = match result.last_mut() {
                    Some(v) => v,
                    None => {
                        // allow comments before the first marker
                        if line.starts_with("--") {
                            continue;
                        }
                        Err(format!(
                            "migration script does not start with a migration marker, got: {}",
                            line
                        ))?
                    }
                };
                migration.sql.to_mut().push_str(line);
                migration.sql.to_mut().push('\n');
            }

            Ok(result)
        })
    }
}

pub fn postgresql_migrations() -> MigrationScript<'static> {
    MigrationScript {
        data: include_str!("./sql/migrations.pg.sql"),
    }
}
