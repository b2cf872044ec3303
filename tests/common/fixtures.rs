//! Test fixture creation for the catalog database and catalog configs

use anyhow::Result;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const CATALOGS_TOML: &str = r#"
[catalogs.stars]
description = "Bright stars"
max_radius = 1.0
query = """
SELECT name, ra, dec, vmag, spectral_type
FROM stars
WHERE angular_distance(ra, dec, :ra, :dec) <= :sr
ORDER BY name
"""

[[catalogs.stars.columns]]
name = "name"

[[catalogs.stars.columns]]
name = "ra"
unit = "deg"

[[catalogs.stars.columns]]
name = "dec"
unit = "deg"

[[catalogs.stars.columns]]
name = "vmag"
ucd = "phot.mag;em.opt.V"
datatype = "double"
unit = "mag"
verb = 2

[[catalogs.stars.columns]]
name = "spectral_type"
ucd = "src.spType"
datatype = "char"
verb = 3

[catalogs.raw]
max_radius = 1.0
query = "SELECT * FROM stars WHERE angular_distance(ra, dec, ?, ?) <= ? ORDER BY name"

[catalogs.broken]
max_radius = 1.0
query = "SELECT * FROM missing_table WHERE angular_distance(ra, dec, :ra, :dec) <= :sr"
"#;

/// Creates a temporary SQLite catalog database and the catalog configs
/// describing it.
/// Returns (temp_dir, db_path, catalog_configs_path)
pub fn create_test_catalogs() -> Result<(TempDir, PathBuf, PathBuf)> {
    let dir = TempDir::new()?;

    let db_path = dir.path().join("catalogs.db");
    let conn = Connection::open(&db_path)?;
    conn.execute_batch(
        "CREATE TABLE stars (
            name TEXT NOT NULL,
            ra REAL NOT NULL,
            dec REAL NOT NULL,
            vmag REAL,
            spectral_type TEXT
         );
         INSERT INTO stars VALUES ('alpha', 10.0, 20.0, 1.5, 'A0V');
         INSERT INTO stars VALUES ('beta', 10.2, 20.1, 2.5, 'G2V');
         INSERT INTO stars VALUES ('gamma', 9.9, 19.8, NULL, 'K1III & M');
         INSERT INTO stars VALUES ('delta', 12.0, 20.0, 3.0, 'B5');
         INSERT INTO stars VALUES ('far', 200.0, -40.0, 4.0, NULL);",
    )?;
    drop(conn);

    let catalog_configs_path = dir.path().join("catalogs.toml");
    fs::write(&catalog_configs_path, CATALOGS_TOML)?;

    Ok((dir, db_path, catalog_configs_path))
}
