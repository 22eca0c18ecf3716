// 🗄️ Persistence seams
//
// The core only ever talks to storage through these two traits. Every call is
// a single request/response; nothing here is transactional beyond one
// statement.

use crate::error::Result;
use crate::models::{LineItem, Material, Project};

/// Material catalog. No delete: materials referenced by historical line
/// items are never removed.
pub trait CatalogStore {
    fn list_materials(&self) -> Result<Vec<Material>>;

    /// Insert, or fully replace the row with the same id
    fn upsert_material(&self, material: &Material) -> Result<()>;
}

/// Projects and their line items
pub trait ProjectStore {
    fn list_projects(&self) -> Result<Vec<Project>>;

    /// Insert, or fully replace the row with the same id (descripcion included)
    fn upsert_project(&self, project: &Project) -> Result<()>;

    /// Hard delete. Does not touch line items: clear them first.
    fn delete_project(&self, id: i64) -> Result<()>;

    /// Items of one project in insertion order
    fn list_items(&self, proyecto_id: i64) -> Result<Vec<LineItem>>;

    /// Always inserts a new row; uniqueness per material is the aggregate's job
    fn add_item(&self, item: &LineItem) -> Result<()>;

    fn clear_items(&self, proyecto_id: i64) -> Result<()>;
}

/// Everything the session needs from storage
pub trait Store: CatalogStore + ProjectStore {}

impl<T: CatalogStore + ProjectStore> Store for T {}
