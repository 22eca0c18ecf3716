// 📊 Budget Aggregate - one project's bill of materials
//
// Empty → Loaded(project + items) → Empty on deselect or delete.
//
// The aggregate owns the line items of the active project. The catalog is
// never owned: prices are resolved by reference every time totals are
// computed, so a price change only needs a recompute.
//
// Every edit rewrites the whole item list to the store (clear, then insert
// all in order). A write that failed half-way is repaired by the next edit.

use crate::error::{Error, Result};
use crate::models::{validate_quantity, LineItem, Material, Project, ProjectFields};
use crate::store::ProjectStore;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedBudget {
    pub project: Project,
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum BudgetState {
    #[default]
    Empty,
    Loaded(LoadedBudget),
}

#[derive(Debug, Clone, Default)]
pub struct BudgetAggregate {
    state: BudgetState,
}

impl BudgetAggregate {
    pub fn new() -> Self {
        BudgetAggregate {
            state: BudgetState::Empty,
        }
    }

    pub fn state(&self) -> &BudgetState {
        &self.state
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.state, BudgetState::Loaded(_))
    }

    pub fn project(&self) -> Option<&Project> {
        match &self.state {
            BudgetState::Loaded(budget) => Some(&budget.project),
            BudgetState::Empty => None,
        }
    }

    pub fn items(&self) -> &[LineItem] {
        match &self.state {
            BudgetState::Loaded(budget) => &budget.items,
            BudgetState::Empty => &[],
        }
    }

    fn loaded_mut(&mut self) -> Result<&mut LoadedBudget> {
        match &mut self.state {
            BudgetState::Loaded(budget) => Ok(budget),
            BudgetState::Empty => Err(Error::NoActiveProject),
        }
    }

    /// Load a project and its items. `None` (or id 0) clears the selection.
    pub fn select<S: ProjectStore + ?Sized>(&mut self, store: &S, id: Option<i64>) -> Result<()> {
        let id = match id {
            Some(id) if id != 0 => id,
            _ => {
                self.deselect();
                return Ok(());
            }
        };

        let project = store.list_projects()?.into_iter().find(|p| p.id == id);
        let Some(project) = project else {
            self.deselect();
            return Err(Error::NotFound {
                entity: "project",
                id,
            });
        };

        let items = store.list_items(id)?;
        info!(id, items = items.len(), "project selected");
        self.state = BudgetState::Loaded(LoadedBudget { project, items });
        Ok(())
    }

    /// Start from an already persisted, item-less project
    pub fn load_new(&mut self, project: Project) {
        self.state = BudgetState::Loaded(LoadedBudget {
            project,
            items: Vec::new(),
        });
    }

    pub fn deselect(&mut self) {
        self.state = BudgetState::Empty;
    }

    /// Add a quantity of a material. A material already in the budget has
    /// its quantity increased; otherwise a new item goes to the end.
    pub fn add_material<S: ProjectStore + ?Sized>(
        &mut self,
        store: &S,
        material_id: i64,
        cantidad: Decimal,
    ) -> Result<()> {
        let cantidad = validate_quantity(cantidad)?;

        let budget = self.loaded_mut()?;
        match budget
            .items
            .iter_mut()
            .find(|item| item.material_id == material_id)
        {
            Some(existing) => {
                let total = existing
                    .cantidad
                    .checked_add(cantidad)
                    .ok_or_else(|| Error::validation("quantity is too large"))
                    .and_then(validate_quantity)?;
                existing.cantidad = total;
            }
            None => budget
                .items
                .push(LineItem::new(budget.project.id, material_id, cantidad)),
        }

        info!(proyecto_id = budget.project.id, material_id, %cantidad, "material added");
        sync_items(store, budget)
    }

    /// Remove the item at `index` and return it
    pub fn remove_item<S: ProjectStore + ?Sized>(&mut self, store: &S, index: usize) -> Result<LineItem> {
        let budget = self.loaded_mut()?;
        let len = budget.items.len();
        if index >= len {
            return Err(Error::Index { index, len });
        }

        let removed = budget.items.remove(index);
        info!(proyecto_id = budget.project.id, material_id = removed.material_id, "item removed");
        sync_items(store, budget)?;
        Ok(removed)
    }

    /// Overwrite the editable fields of the active project and persist it
    pub fn edit_project<S: ProjectStore + ?Sized>(&mut self, store: &S, fields: ProjectFields) -> Result<()> {
        let fields = fields.validated()?;
        let budget = self.loaded_mut()?;
        budget.project.apply(fields);
        store.upsert_project(&budget.project)?;
        info!(id = budget.project.id, "project edited");
        Ok(())
    }

    /// Clear the items, delete the project row, and go back to Empty.
    /// Returns the deleted project.
    pub fn delete_active<S: ProjectStore + ?Sized>(&mut self, store: &S) -> Result<Project> {
        let id = self.loaded_mut()?.project.id;

        store.clear_items(id)?;
        store.delete_project(id)?;

        let deleted = match std::mem::take(&mut self.state) {
            BudgetState::Loaded(budget) => budget.project,
            BudgetState::Empty => return Err(Error::NoActiveProject),
        };
        info!(id, "project deleted");
        Ok(deleted)
    }

    /// Resolve the items against `catalog` and compute totals.
    /// `None` when no project is selected.
    pub fn compute_totals(&self, catalog: &[Material]) -> Result<Option<BudgetSnapshot>> {
        match &self.state {
            BudgetState::Loaded(budget) => compute_totals(&budget.project, &budget.items, catalog).map(Some),
            BudgetState::Empty => Ok(None),
        }
    }
}

fn sync_items<S: ProjectStore + ?Sized>(store: &S, budget: &LoadedBudget) -> Result<()> {
    store.clear_items(budget.project.id)?;
    for item in &budget.items {
        store.add_item(item)?;
    }
    debug!(proyecto_id = budget.project.id, items = budget.items.len(), "items synchronized");
    Ok(())
}

// ============================================================================
// TOTALS
// ============================================================================

/// One resolved line of the budget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetRow {
    /// Position of the item in the aggregate (what `remove_item` takes)
    pub index: usize,
    pub material: Material,
    pub cantidad: Decimal,
    pub subtotal: Decimal,
    /// Share of the total, 0..=100
    pub porcentaje: Decimal,
}

/// Computed view of a loaded budget
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSnapshot {
    pub project: Project,
    pub superficie: Decimal,
    pub rows: Vec<BudgetRow>,
    pub total: Decimal,
    /// Items whose material is not in the catalog
    pub skipped: usize,
}

impl BudgetSnapshot {
    pub fn percent_sum(&self) -> Decimal {
        self.rows.iter().map(|r| r.porcentaje).sum()
    }
}

/// Subtotal per item is price × quantity; items whose material cannot be
/// resolved are left out of both the rows and the total.
/// Fails instead of overflowing when a subtotal or the total is out of range.
pub fn compute_totals(project: &Project, items: &[LineItem], catalog: &[Material]) -> Result<BudgetSnapshot> {
    let overflow = || Error::validation("budget amounts are too large to compute");
    let by_id: HashMap<i64, &Material> = catalog.iter().map(|m| (m.id, m)).collect();

    let mut rows = Vec::with_capacity(items.len());
    let mut skipped = 0;

    for (index, item) in items.iter().enumerate() {
        match by_id.get(&item.material_id) {
            Some(material) => rows.push(BudgetRow {
                index,
                material: (*material).clone(),
                cantidad: item.cantidad,
                subtotal: material.precio.checked_mul(item.cantidad).ok_or_else(overflow)?,
                porcentaje: Decimal::ZERO,
            }),
            None => {
                warn!(
                    proyecto_id = project.id,
                    material_id = item.material_id,
                    "line item references unknown material, skipped"
                );
                skipped += 1;
            }
        }
    }

    let total = rows
        .iter()
        .try_fold(Decimal::ZERO, |acc, r| acc.checked_add(r.subtotal))
        .ok_or_else(overflow)?;
    if total > Decimal::ZERO {
        for row in &mut rows {
            row.porcentaje = row.subtotal / total * Decimal::ONE_HUNDRED;
        }
    }

    Ok(BudgetSnapshot {
        project: project.clone(),
        superficie: project.superficie(),
        rows,
        total,
        skipped,
    })
}
