use crate::error::Result;
use crate::models::{parse_fecha, LineItem, Material, Project};
use crate::store::{CatalogStore, ProjectStore};
use chrono::Local;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use std::path::Path;
use tracing::debug;

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // ==========================================================================
    // Catalog
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS materiales (
            id INTEGER PRIMARY KEY,
            nombre TEXT NOT NULL,
            categoria TEXT NOT NULL,
            precio REAL NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Projects
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS proyectos (
            id INTEGER PRIMARY KEY,
            nombre TEXT,
            cliente TEXT,
            descripcion TEXT,
            ancho REAL,
            largo REAL,
            fecha TEXT
        )",
        [],
    )?;

    // ==========================================================================
    // Line items (surrogate key only orders rows, never referenced)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS proyecto_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            proyecto_id INTEGER,
            material_id INTEGER,
            cantidad REAL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_items_proyecto ON proyecto_items(proyecto_id)",
        [],
    )?;

    Ok(())
}

/// SQLite-backed catalog and project store
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        setup_database(&conn)?;
        debug!(path = %path.display(), "database opened");
        Ok(SqliteStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

// Columns are REAL for compatibility with existing databases; the domain
// works in Decimal.
fn to_real(value: Decimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

fn decimal_column(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let value: Option<f64> = row.get(idx)?;
    let value = value.unwrap_or_default();
    Decimal::from_f64(value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Real,
            format!("{} is not a representable decimal", value).into(),
        )
    })
}

fn project_from_row(row: &Row) -> rusqlite::Result<Project> {
    let fecha: Option<String> = row.get(6)?;

    Ok(Project {
        id: row.get(0)?,
        nombre: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        cliente: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        descripcion: row.get(3)?,
        ancho: decimal_column(row, 4)?,
        largo: decimal_column(row, 5)?,
        // Rows written by older tools may carry an unparseable date
        fecha: fecha
            .as_deref()
            .and_then(parse_fecha)
            .unwrap_or_else(|| Local::now().date_naive()),
    })
}

impl CatalogStore for SqliteStore {
    fn list_materials(&self) -> Result<Vec<Material>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, nombre, categoria, precio
             FROM materiales
             ORDER BY id",
        )?;

        let materials = stmt
            .query_map([], |row| {
                Ok(Material {
                    id: row.get(0)?,
                    nombre: row.get(1)?,
                    categoria: row.get(2)?,
                    precio: decimal_column(row, 3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(materials)
    }

    fn upsert_material(&self, material: &Material) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO materiales (id, nombre, categoria, precio)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                material.id,
                material.nombre,
                material.categoria,
                to_real(material.precio),
            ],
        )?;
        debug!(id = material.id, precio = %material.precio, "material saved");
        Ok(())
    }
}

impl ProjectStore for SqliteStore {
    fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, nombre, cliente, descripcion, ancho, largo, fecha
             FROM proyectos
             ORDER BY id",
        )?;

        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(projects)
    }

    fn upsert_project(&self, project: &Project) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO proyectos (id, nombre, cliente, descripcion, ancho, largo, fecha)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                project.id,
                project.nombre,
                project.cliente,
                project.descripcion,
                to_real(project.ancho),
                to_real(project.largo),
                project.fecha_text(),
            ],
        )?;
        debug!(id = project.id, "project saved");
        Ok(())
    }

    fn delete_project(&self, id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM proyectos WHERE id = ?1", params![id])?;
        debug!(id, "project deleted");
        Ok(())
    }

    fn list_items(&self, proyecto_id: i64) -> Result<Vec<LineItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT proyecto_id, material_id, cantidad
             FROM proyecto_items
             WHERE proyecto_id = ?1
             ORDER BY id",
        )?;

        let items = stmt
            .query_map(params![proyecto_id], |row| {
                Ok(LineItem {
                    proyecto_id: row.get(0)?,
                    material_id: row.get(1)?,
                    cantidad: decimal_column(row, 2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(items)
    }

    fn add_item(&self, item: &LineItem) -> Result<()> {
        self.conn.execute(
            "INSERT INTO proyecto_items (proyecto_id, material_id, cantidad)
             VALUES (?1, ?2, ?3)",
            params![item.proyecto_id, item.material_id, to_real(item.cantidad)],
        )?;
        Ok(())
    }

    fn clear_items(&self, proyecto_id: i64) -> Result<()> {
        let removed = self.conn.execute(
            "DELETE FROM proyecto_items WHERE proyecto_id = ?1",
            params![proyecto_id],
        )?;
        debug!(proyecto_id, removed, "line items cleared");
        Ok(())
    }
}
