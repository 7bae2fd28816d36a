//! Persisted region directory over SQLite.
//!
//! One row per region, keyed by region id; hyperlink rows carry the
//! `HYPERLINK | NO_DIRECT_LOGIN | REGION_ONLINE` flag set. Writes are
//! single statements, so a concurrent lookup never observes a
//! half-written record; between concurrent link and unlink of the same
//! target, last write wins.

use hypergate_db::DbPool;
use hypergate_types::{region_flags, GridRegion};
use rusqlite::{params, OptionalExtension, Row};
use thiserror::Error;
use uuid::Uuid;

/// Errors from the region directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to get database connection: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
}

/// Query and mutation access to the persisted region directory.
#[derive(Clone)]
pub struct RegionDirectory {
    pool: DbPool,
}

const REGION_COLUMNS: &str =
    "region_id, scope_id, name, loc_x, loc_y, external_host, http_port, internal_port, map_image, flags";

impl RegionDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces a region row. A region id maps to at most one
    /// row.
    pub fn store(&self, region: &GridRegion, flags: u32) -> Result<(), DirectoryError> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT OR REPLACE INTO regions (
                region_id, scope_id, name, loc_x, loc_y,
                external_host, http_port, internal_port, map_image, flags
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                region.region_id.to_string(),
                region.scope_id.to_string(),
                region.name,
                region.loc_x,
                region.loc_y,
                region.external_host,
                region.http_port,
                region.internal_port,
                region.map_image.to_string(),
                flags,
            ],
        )?;
        Ok(())
    }

    /// Deletes a region row. Returns whether a row existed.
    pub fn delete(&self, region_id: Uuid) -> Result<bool, DirectoryError> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM regions WHERE region_id = ?1",
            params![region_id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    pub fn get_by_uuid(
        &self,
        scope_id: Uuid,
        region_id: Uuid,
    ) -> Result<Option<GridRegion>, DirectoryError> {
        let conn = self.pool.get()?;
        let region = conn
            .query_row(
                &format!(
                    "SELECT {REGION_COLUMNS} FROM regions
                     WHERE region_id = ?1 AND scope_id = ?2"
                ),
                params![region_id.to_string(), scope_id.to_string()],
                row_to_region,
            )
            .optional()?;
        Ok(region)
    }

    /// The grid's authoritative default region, if one is flagged.
    pub fn default_region(&self, scope_id: Uuid) -> Result<Option<GridRegion>, DirectoryError> {
        let conn = self.pool.get()?;
        let region = conn
            .query_row(
                &format!(
                    "SELECT {REGION_COLUMNS} FROM regions
                     WHERE scope_id = ?1 AND (flags & ?2) != 0
                     ORDER BY created_at LIMIT 1"
                ),
                params![scope_id.to_string(), region_flags::DEFAULT_REGION],
                row_to_region,
            )
            .optional()?;
        Ok(region)
    }

    /// All currently linked (hyperlink-flagged) regions.
    pub fn hyperlinks(&self, scope_id: Uuid) -> Result<Vec<GridRegion>, DirectoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {REGION_COLUMNS} FROM regions
             WHERE scope_id = ?1 AND (flags & ?2) != 0
             ORDER BY name"
        ))?;
        let rows = stmt.query_map(
            params![scope_id.to_string(), region_flags::HYPERLINK],
            row_to_region,
        )?;
        let mut regions = Vec::new();
        for region in rows {
            regions.push(region?);
        }
        Ok(regions)
    }

    /// Finds a linked region by its external host and port.
    pub fn hyperlink_by_host_port(
        &self,
        scope_id: Uuid,
        host: &str,
        port: u16,
    ) -> Result<Option<GridRegion>, DirectoryError> {
        let conn = self.pool.get()?;
        let region = conn
            .query_row(
                &format!(
                    "SELECT {REGION_COLUMNS} FROM regions
                     WHERE scope_id = ?1 AND (flags & ?2) != 0
                       AND external_host = ?3 AND http_port = ?4"
                ),
                params![
                    scope_id.to_string(),
                    region_flags::HYPERLINK,
                    host,
                    port
                ],
                row_to_region,
            )
            .optional()?;
        Ok(region)
    }

    /// Finds a linked region by its local display name.
    pub fn hyperlink_by_name(
        &self,
        scope_id: Uuid,
        name: &str,
    ) -> Result<Option<GridRegion>, DirectoryError> {
        let conn = self.pool.get()?;
        let region = conn
            .query_row(
                &format!(
                    "SELECT {REGION_COLUMNS} FROM regions
                     WHERE scope_id = ?1 AND (flags & ?2) != 0 AND name = ?3"
                ),
                params![scope_id.to_string(), region_flags::HYPERLINK, name],
                row_to_region,
            )
            .optional()?;
        Ok(region)
    }
}

fn row_to_region(row: &Row<'_>) -> rusqlite::Result<GridRegion> {
    let region_id: String = row.get(0)?;
    let scope_id: String = row.get(1)?;
    let map_image: String = row.get(8)?;
    Ok(GridRegion {
        region_id: Uuid::parse_str(&region_id).unwrap_or_default(),
        scope_id: Uuid::parse_str(&scope_id).unwrap_or_default(),
        name: row.get(2)?,
        loc_x: row.get(3)?,
        loc_y: row.get(4)?,
        external_host: row.get(5)?,
        http_port: row.get(6)?,
        internal_port: row.get(7)?,
        map_image: Uuid::parse_str(&map_image).unwrap_or_default(),
    })
}
