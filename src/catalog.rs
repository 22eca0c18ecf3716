// 🧾 Catalog operations on top of CatalogStore
//
// The store only lists and upserts; id assignment, price validation and CSV
// price lists live here.

use crate::error::{Error, Result};
use crate::models::{parse_decimal, validate_price, Material, DEFAULT_CATEGORY};
use crate::store::CatalogStore;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// Next free material id: one past the largest, or 1 for an empty catalog
pub fn next_material_id(materials: &[Material]) -> i64 {
    materials.iter().map(|m| m.id).max().map_or(1, |max| max + 1)
}

/// Create a material with the next free id
pub fn create_material<S: CatalogStore + ?Sized>(
    store: &S,
    nombre: &str,
    categoria: &str,
    precio: Decimal,
) -> Result<Material> {
    let nombre = nombre.trim();
    if nombre.is_empty() {
        return Err(Error::validation("material name is required"));
    }
    let precio = validate_price(precio)?;

    let categoria = match categoria.trim() {
        "" => DEFAULT_CATEGORY,
        other => other,
    };

    let materials = store.list_materials()?;
    let material = Material::new(next_material_id(&materials), nombre, categoria, precio);
    store.upsert_material(&material)?;

    info!(id = material.id, nombre = %material.nombre, "material created");
    Ok(material)
}

/// Replace the unit price of one material
pub fn set_unit_price<S: CatalogStore + ?Sized>(store: &S, id: i64, precio: Decimal) -> Result<Material> {
    let precio = validate_price(precio)?;

    let mut material = store
        .list_materials()?
        .into_iter()
        .find(|m| m.id == id)
        .ok_or(Error::NotFound {
            entity: "material",
            id,
        })?;

    material.precio = precio;
    store.upsert_material(&material)?;

    info!(id, %precio, "unit price updated");
    Ok(material)
}

/// Distinct categories, sorted
pub fn categories(materials: &[Material]) -> Vec<String> {
    materials
        .iter()
        .map(|m| m.categoria.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Deserialize)]
struct PriceListRow {
    nombre: String,
    #[serde(default)]
    categoria: String,
    precio: String,
}

/// Import a price list (`nombre,categoria,precio` with headers).
/// Stops at the first invalid row; rows before it stay imported.
pub fn import_csv<S: CatalogStore + ?Sized>(store: &S, csv_path: &Path) -> Result<usize> {
    let mut rdr = csv::Reader::from_path(csv_path)?;
    let mut imported = 0;

    for (line, result) in rdr.deserialize::<PriceListRow>().enumerate() {
        // Header is line 1
        let row_number = line + 2;
        let row = result?;
        let at_row = |e: Error| match e {
            Error::Validation(msg) => Error::validation(format!("row {}: {}", row_number, msg)),
            other => other,
        };

        let precio = parse_decimal(&row.precio).map_err(at_row)?;
        create_material(store, &row.nombre, &row.categoria, precio).map_err(at_row)?;
        imported += 1;
    }

    info!(imported, path = %csv_path.display(), "price list imported");
    Ok(imported)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_next_material_id() {
        assert_eq!(next_material_id(&[]), 1);

        let materials = vec![
            Material::new(3, "Cal", "Obra gruesa", dec!(10)),
            Material::new(7, "Yeso", "Terminaciones", dec!(12)),
        ];
        assert_eq!(next_material_id(&materials), 8);
    }

    #[test]
    fn test_create_material_assigns_ids() {
        let store = SqliteStore::open_in_memory().unwrap();

        let first = create_material(&store, "Cemento", "Obra gruesa", dec!(100)).unwrap();
        let second = create_material(&store, " Arena ", "", dec!(50)).unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(second.nombre, "Arena");
        assert_eq!(second.categoria, DEFAULT_CATEGORY);
        assert_eq!(store.list_materials().unwrap().len(), 2);
    }

    #[test]
    fn test_create_material_validation() {
        let store = SqliteStore::open_in_memory().unwrap();

        assert!(matches!(
            create_material(&store, "  ", "Varios", dec!(1)),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            create_material(&store, "Arena", "Varios", dec!(-1)),
            Err(Error::Validation(_))
        ));
        assert!(store.list_materials().unwrap().is_empty());
    }

    #[test]
    fn test_set_unit_price() {
        let store = SqliteStore::open_in_memory().unwrap();
        let material = create_material(&store, "Cemento", "Obra gruesa", dec!(100)).unwrap();

        let updated = set_unit_price(&store, material.id, dec!(125.75)).unwrap();
        assert_eq!(updated.precio, dec!(125.75));
        assert_eq!(store.list_materials().unwrap()[0].precio, dec!(125.75));

        assert!(matches!(
            set_unit_price(&store, 99, dec!(1)),
            Err(Error::NotFound { entity: "material", id: 99 })
        ));
        assert!(matches!(
            set_unit_price(&store, material.id, dec!(-5)),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_categories_are_distinct_and_sorted() {
        let materials = vec![
            Material::new(1, "Cemento", "Obra gruesa", dec!(1)),
            Material::new(2, "Pintura", "Terminaciones", dec!(1)),
            Material::new(3, "Arena", "Obra gruesa", dec!(1)),
        ];
        assert_eq!(categories(&materials), vec!["Obra gruesa", "Terminaciones"]);
    }

    #[test]
    fn test_import_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "nombre,categoria,precio").unwrap();
        writeln!(file, "Cemento,Obra gruesa,100").unwrap();
        writeln!(file, "Arena,Obra gruesa,\"50,5\"").unwrap();
        writeln!(file, "Clavos,,3.2").unwrap();
        file.flush().unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        let imported = import_csv(&store, file.path()).unwrap();

        assert_eq!(imported, 3);
        let materials = store.list_materials().unwrap();
        assert_eq!(materials[1].precio, dec!(50.5));
        assert_eq!(materials[2].categoria, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_import_csv_reports_bad_row() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "nombre,categoria,precio").unwrap();
        writeln!(file, "Cemento,Obra gruesa,100").unwrap();
        writeln!(file, "Arena,Obra gruesa,mucho").unwrap();
        file.flush().unwrap();

        let store = SqliteStore::open_in_memory().unwrap();
        let err = import_csv(&store, file.path()).unwrap_err();

        match err {
            Error::Validation(msg) => assert!(msg.starts_with("row 3:"), "{}", msg),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(store.list_materials().unwrap().len(), 1);
    }
}
