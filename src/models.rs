// 🧱 Domain records: Material, Project, LineItem
//
// Identity is an integer id for materials and projects. Line items have no
// identity of their own beyond (proyecto_id, material_id).

use crate::error::{Error, Result};
use chrono::{Local, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Category assigned when a material is created without one
pub const DEFAULT_CATEGORY: &str = "General";

/// Persisted date format (`es-AR` short date)
pub const FECHA_FORMAT: &str = "%d/%m/%Y";

// ============================================================================
// MATERIAL
// ============================================================================

/// Catalog entry with a unit price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub id: i64,
    pub nombre: String,
    pub categoria: String,
    pub precio: Decimal,
}

impl Material {
    pub fn new(id: i64, nombre: &str, categoria: &str, precio: Decimal) -> Self {
        Material {
            id,
            nombre: nombre.to_string(),
            categoria: categoria.to_string(),
            precio,
        }
    }
}

// ============================================================================
// PROJECT
// ============================================================================

/// A client job with dimensions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub nombre: String,
    pub cliente: String,
    pub descripcion: Option<String>,
    pub ancho: Decimal,
    pub largo: Decimal,
    pub fecha: NaiveDate,
}

impl Project {
    /// Build a project from validated fields, dated today
    pub fn new(id: i64, fields: ProjectFields) -> Self {
        Project {
            id,
            nombre: fields.nombre,
            cliente: fields.cliente,
            descripcion: fields.descripcion,
            ancho: fields.ancho,
            largo: fields.largo,
            fecha: Local::now().date_naive(),
        }
    }

    /// Floor area: ancho × largo, rounded to 2 decimals. Never stored.
    pub fn superficie(&self) -> Decimal {
        round2(self.ancho * self.largo)
    }

    /// Overwrite the editable fields; id and fecha are kept
    pub fn apply(&mut self, fields: ProjectFields) {
        self.nombre = fields.nombre;
        self.cliente = fields.cliente;
        self.descripcion = fields.descripcion;
        self.ancho = fields.ancho;
        self.largo = fields.largo;
    }

    pub fn fecha_text(&self) -> String {
        self.fecha.format(FECHA_FORMAT).to_string()
    }
}

/// Editable project fields, as entered by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFields {
    pub nombre: String,
    pub cliente: String,
    pub descripcion: Option<String>,
    pub ancho: Decimal,
    pub largo: Decimal,
}

impl ProjectFields {
    /// Trim text, drop a blank description, and reject missing names or
    /// non-positive dimensions.
    pub fn validated(self) -> Result<Self> {
        let nombre = self.nombre.trim().to_string();
        let cliente = self.cliente.trim().to_string();

        if nombre.is_empty() {
            return Err(Error::validation("project name is required"));
        }
        if cliente.is_empty() {
            return Err(Error::validation("client name is required"));
        }
        if self.ancho <= Decimal::ZERO || self.largo <= Decimal::ZERO {
            return Err(Error::validation("width and length must be greater than zero"));
        }

        let descripcion = self
            .descripcion
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        Ok(ProjectFields {
            nombre,
            cliente,
            descripcion,
            ancho: self.ancho,
            largo: self.largo,
        })
    }
}

/// Time-based project id: milliseconds since the epoch, bumped past `last`
/// so two projects created within the same millisecond stay distinct.
pub fn next_project_id(now_millis: i64, last: Option<i64>) -> i64 {
    match last {
        Some(last) if last >= now_millis => last + 1,
        _ => now_millis,
    }
}

/// Parse a persisted fecha. Accepts `dd/mm/yyyy` and ISO dates.
pub fn parse_fecha(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, FECHA_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y-%m-%d"))
        .ok()
}

// ============================================================================
// LINE ITEM
// ============================================================================

/// One (material, quantity) pairing within a project's bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub proyecto_id: i64,
    pub material_id: i64,
    pub cantidad: Decimal,
}

impl LineItem {
    pub fn new(proyecto_id: i64, material_id: i64, cantidad: Decimal) -> Self {
        LineItem {
            proyecto_id,
            material_id,
            cantidad,
        }
    }
}

// ============================================================================
// NUMBERS
// ============================================================================

/// Round to cents, midpoint away from zero
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Parse a user-entered number. Accepts `.` or `,` as decimal separator.
pub fn parse_decimal(text: &str) -> Result<Decimal> {
    let normalized = text.trim().replace(',', ".");
    if normalized.is_empty() {
        return Err(Error::validation("a number is required"));
    }
    Decimal::from_str(&normalized)
        .map_err(|_| Error::validation(format!("'{}' is not a valid number", text.trim())))
}

/// Largest accepted unit price or quantity. Keeps price × quantity and
/// budget totals far below `Decimal::MAX`.
pub fn max_amount() -> Decimal {
    Decimal::new(1_000_000_000_000, 0)
}

/// Unit prices must be non-negative and at most `max_amount()`
pub fn validate_price(precio: Decimal) -> Result<Decimal> {
    if precio.is_sign_negative() && !precio.is_zero() {
        return Err(Error::validation("price cannot be negative"));
    }
    if precio > max_amount() {
        return Err(Error::validation(format!("price cannot exceed {}", max_amount())));
    }
    Ok(precio)
}

/// Quantities must be positive and at most `max_amount()`
pub fn validate_quantity(cantidad: Decimal) -> Result<Decimal> {
    if cantidad <= Decimal::ZERO {
        return Err(Error::validation("quantity must be greater than zero"));
    }
    if cantidad > max_amount() {
        return Err(Error::validation(format!("quantity cannot exceed {}", max_amount())));
    }
    Ok(cantidad)
}
