// 📈 Bulk Price Adjuster - percentage increase over a category filter
//
// Only touches the catalog. A loaded budget resolves prices by reference, so
// callers recompute totals afterwards; nothing is cached in line items.

use crate::error::{Error, Result};
use crate::models::{parse_decimal, round2, validate_price};
use crate::store::CatalogStore;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Text sentinel meaning "every category"
pub const ALL_CATEGORIES: &str = "TODOS";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CategoryFilter {
    All,
    /// Exact, case-sensitive category match
    Category(String),
}

impl CategoryFilter {
    pub fn matches(&self, categoria: &str) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Category(c) => c == categoria,
        }
    }
}

impl FromStr for CategoryFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" | ALL_CATEGORIES => Ok(CategoryFilter::All),
            other => Ok(CategoryFilter::Category(other.to_string())),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str(ALL_CATEGORIES),
            CategoryFilter::Category(c) => f.write_str(c),
        }
    }
}

/// Parse a user-entered percent. Zero, -100 or less, and garbage are rejected.
pub fn parse_percent(text: &str) -> Result<Decimal> {
    let percent = parse_decimal(text.trim().trim_end_matches('%'))
        .map_err(|_| Error::validation(format!("'{}' is not a valid percentage", text.trim())))?;
    validate_percent(percent)
}

fn validate_percent(percent: Decimal) -> Result<Decimal> {
    if percent.is_zero() {
        return Err(Error::validation("percentage must not be zero"));
    }
    if percent <= -Decimal::ONE_HUNDRED {
        return Err(Error::validation("a decrease must be smaller than 100%"));
    }
    Ok(percent)
}

/// New price after a percent change, rounded to cents.
/// Out-of-range results are validation errors, never overflow.
pub fn adjusted_price(precio: Decimal, percent: Decimal) -> Result<Decimal> {
    let factor = Decimal::ONE
        .checked_add(percent / Decimal::ONE_HUNDRED)
        .ok_or_else(|| Error::validation("percentage is too large"))?;
    let adjusted = precio
        .checked_mul(factor)
        .ok_or_else(|| Error::validation("adjusted price is too large"))?;
    validate_price(round2(adjusted))
}

/// Apply `percent` to every material matching `filter`.
/// Every new price is checked before the first write.
/// Returns how many materials were updated.
pub fn apply_increase<S: CatalogStore + ?Sized>(
    store: &S,
    percent: Decimal,
    filter: &CategoryFilter,
) -> Result<usize> {
    let percent = validate_percent(percent)?;

    let adjusted = store
        .list_materials()?
        .into_iter()
        .filter(|m| filter.matches(&m.categoria))
        .map(|mut material| {
            material.precio = adjusted_price(material.precio, percent)?;
            Ok(material)
        })
        .collect::<Result<Vec<_>>>()?;

    for material in &adjusted {
        store.upsert_material(material)?;
    }
    let updated = adjusted.len();

    info!(%percent, filter = %filter, updated, "prices adjusted");
    Ok(updated)
}
