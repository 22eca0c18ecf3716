// 🎛️ Session - the one place user commands enter the core
//
// Owns the store and the single active budget. The presentation layer builds
// a `Command` and dispatches it; it never touches the store directly.

use crate::budget::{BudgetAggregate, BudgetSnapshot};
use crate::catalog;
use crate::error::{Error, Result};
use crate::export::{self, SavePathChooser};
use crate::models::{next_project_id, LineItem, Material, Project, ProjectFields};
use crate::pricing::{self, CategoryFilter};
use crate::report::Report;
use crate::store::Store;
use chrono::{Local, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

// ============================================================================
// COMMANDS
// ============================================================================

/// Everything a user can ask the core to do.
/// Destructive commands carry the user's confirmation.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SelectProject(Option<i64>),
    CreateProject(ProjectFields),
    EditProject(ProjectFields),
    DeleteProject { confirmed: bool },
    AddMaterial { material_id: i64, cantidad: Decimal },
    RemoveItem { index: usize, confirmed: bool },
    CreateMaterial { nombre: String, categoria: String, precio: Decimal },
    SetUnitPrice { material_id: i64, precio: Decimal },
    ApplyIncrease { percent: Decimal, filter: CategoryFilter, confirmed: bool },
}

impl Command {
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Command::DeleteProject { .. } | Command::RemoveItem { .. } | Command::ApplyIncrease { .. }
        )
    }

    fn is_confirmed(&self) -> bool {
        match self {
            Command::DeleteProject { confirmed }
            | Command::RemoveItem { confirmed, .. }
            | Command::ApplyIncrease { confirmed, .. } => *confirmed,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Done,
    /// A destructive command arrived without confirmation; nothing happened
    Cancelled,
    ProjectCreated(Project),
    ProjectDeleted(Project),
    ItemRemoved(LineItem),
    MaterialSaved(Material),
    PricesUpdated(usize),
}

/// Headline counts for the start page
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub proyectos: usize,
    pub materiales: usize,
    pub categorias: Vec<String>,
}

// ============================================================================
// SESSION
// ============================================================================

pub struct Session<S> {
    store: S,
    budget: BudgetAggregate,
}

impl<S: Store> Session<S> {
    pub fn new(store: S) -> Self {
        Session {
            store,
            budget: BudgetAggregate::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn budget(&self) -> &BudgetAggregate {
        &self.budget
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Outcome> {
        if command.is_destructive() && !command.is_confirmed() {
            info!(?command, "destructive command not confirmed");
            return Ok(Outcome::Cancelled);
        }

        match command {
            Command::SelectProject(id) => {
                self.budget.select(&self.store, id)?;
                Ok(Outcome::Done)
            }
            Command::CreateProject(fields) => self.create_project(fields).map(Outcome::ProjectCreated),
            Command::EditProject(fields) => {
                self.budget.edit_project(&self.store, fields)?;
                Ok(Outcome::Done)
            }
            Command::DeleteProject { .. } => self.budget.delete_active(&self.store).map(Outcome::ProjectDeleted),
            Command::AddMaterial { material_id, cantidad } => {
                self.budget.add_material(&self.store, material_id, cantidad)?;
                Ok(Outcome::Done)
            }
            Command::RemoveItem { index, .. } => self.budget.remove_item(&self.store, index).map(Outcome::ItemRemoved),
            Command::CreateMaterial {
                nombre,
                categoria,
                precio,
            } => catalog::create_material(&self.store, &nombre, &categoria, precio).map(Outcome::MaterialSaved),
            Command::SetUnitPrice { material_id, precio } => {
                catalog::set_unit_price(&self.store, material_id, precio).map(Outcome::MaterialSaved)
            }
            Command::ApplyIncrease { percent, filter, .. } => {
                pricing::apply_increase(&self.store, percent, &filter).map(Outcome::PricesUpdated)
            }
        }
    }

    /// Persist a new project and make it the active one
    pub fn create_project(&mut self, fields: ProjectFields) -> Result<Project> {
        let fields = fields.validated()?;

        let last = self.store.list_projects()?.iter().map(|p| p.id).max();
        let id = next_project_id(Utc::now().timestamp_millis(), last);
        let project = Project::new(id, fields);

        self.store.upsert_project(&project)?;
        self.budget.load_new(project.clone());

        info!(id, nombre = %project.nombre, "project created");
        Ok(project)
    }

    pub fn projects(&self) -> Result<Vec<Project>> {
        self.store.list_projects()
    }

    pub fn materials(&self) -> Result<Vec<Material>> {
        self.store.list_materials()
    }

    /// Totals of the active budget against the current catalog
    pub fn snapshot(&self) -> Result<Option<BudgetSnapshot>> {
        if !self.budget.is_loaded() {
            return Ok(None);
        }
        let catalog = self.store.list_materials()?;
        self.budget.compute_totals(&catalog)
    }

    pub fn dashboard(&self) -> Result<Dashboard> {
        let materials = self.store.list_materials()?;
        Ok(Dashboard {
            proyectos: self.store.list_projects()?.len(),
            materiales: materials.len(),
            categorias: catalog::categories(&materials),
        })
    }

    /// Printable report of the active budget, dated `today`
    pub fn report(&self, today: NaiveDate) -> Result<Report> {
        let snapshot = self.snapshot()?.ok_or(Error::NoActiveProject)?;
        Ok(Report::from_snapshot(&snapshot, today))
    }

    /// Export the active budget. `false` when the user picked no path.
    pub fn export_report<C: SavePathChooser + ?Sized>(&self, chooser: &mut C) -> Result<bool> {
        let report = self.report(Local::now().date_naive())?;
        export::export_report(&report, chooser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::export::DirectoryChooser;
    use crate::store::{CatalogStore, ProjectStore};
    use rust_decimal_macros::dec;

    fn fields(nombre: &str) -> ProjectFields {
        ProjectFields {
            nombre: nombre.to_string(),
            cliente: "Pérez".to_string(),
            descripcion: None,
            ancho: dec!(3.5),
            largo: dec!(4.2),
        }
    }

    fn session() -> Session<SqliteStore> {
        let mut session = Session::new(SqliteStore::open_in_memory().unwrap());
        for (nombre, categoria, precio) in [
            ("Cemento", "Obra gruesa", dec!(100)),
            ("Pintura", "Terminaciones", dec!(50)),
        ] {
            session
                .dispatch(Command::CreateMaterial {
                    nombre: nombre.to_string(),
                    categoria: categoria.to_string(),
                    precio,
                })
                .unwrap();
        }
        session
    }

    #[test]
    fn test_create_project_selects_it() {
        let mut session = session();

        let outcome = session.dispatch(Command::CreateProject(fields("Casa"))).unwrap();

        let Outcome::ProjectCreated(project) = outcome else {
            panic!("unexpected outcome: {outcome:?}");
        };
        assert_eq!(session.budget().project(), Some(&project));
        assert_eq!(session.projects().unwrap().len(), 1);
    }

    #[test]
    fn test_project_ids_are_unique() {
        let mut session = session();
        let first = session.create_project(fields("Casa")).unwrap();
        let second = session.create_project(fields("Galpón")).unwrap();
        assert!(second.id > first.id);
    }

    #[test]
    fn test_invalid_project_is_not_persisted() {
        let mut session = session();
        let err = session.dispatch(Command::CreateProject(fields(" "))).unwrap_err();
        assert!(err.is_user_error());
        assert!(session.projects().unwrap().is_empty());
    }

    #[test]
    fn test_full_budget_flow() {
        let mut session = session();
        session.create_project(fields("Casa")).unwrap();

        session
            .dispatch(Command::AddMaterial { material_id: 1, cantidad: dec!(2) })
            .unwrap();
        session
            .dispatch(Command::AddMaterial { material_id: 2, cantidad: dec!(4) })
            .unwrap();

        let snapshot = session.snapshot().unwrap().unwrap();
        assert_eq!(snapshot.total, dec!(400));

        // Price increase is visible on the next snapshot
        let outcome = session
            .dispatch(Command::ApplyIncrease {
                percent: dec!(10),
                filter: CategoryFilter::All,
                confirmed: true,
            })
            .unwrap();
        assert_eq!(outcome, Outcome::PricesUpdated(2));

        let snapshot = session.snapshot().unwrap().unwrap();
        assert_eq!(snapshot.total, dec!(440));
    }

    #[test]
    fn test_oversized_quantity_keeps_snapshot_available() {
        let mut session = session();
        session.create_project(fields("Casa")).unwrap();

        let huge = crate::models::parse_decimal("79228162514264337593543950335").unwrap();
        let err = session
            .dispatch(Command::AddMaterial { material_id: 1, cantidad: huge })
            .unwrap_err();

        assert!(err.is_user_error());
        let snapshot = session.snapshot().unwrap().unwrap();
        assert!(snapshot.rows.is_empty());
    }

    #[test]
    fn test_unconfirmed_destructive_commands_do_nothing() {
        let mut session = session();
        let project = session.create_project(fields("Casa")).unwrap();
        session
            .dispatch(Command::AddMaterial { material_id: 1, cantidad: dec!(1) })
            .unwrap();

        let cancelled = [
            Command::DeleteProject { confirmed: false },
            Command::RemoveItem { index: 0, confirmed: false },
            Command::ApplyIncrease {
                percent: dec!(50),
                filter: CategoryFilter::All,
                confirmed: false,
            },
        ];
        for command in cancelled {
            assert_eq!(session.dispatch(command).unwrap(), Outcome::Cancelled);
        }

        assert_eq!(session.store().list_items(project.id).unwrap().len(), 1);
        assert_eq!(session.store().list_materials().unwrap()[0].precio, dec!(100));
        assert!(session.budget().is_loaded());
    }

    #[test]
    fn test_delete_project_clears_items() {
        let mut session = session();
        let project = session.create_project(fields("Casa")).unwrap();
        session
            .dispatch(Command::AddMaterial { material_id: 1, cantidad: dec!(1) })
            .unwrap();

        let outcome = session.dispatch(Command::DeleteProject { confirmed: true }).unwrap();

        assert_eq!(outcome, Outcome::ProjectDeleted(project.clone()));
        assert!(session.store().list_items(project.id).unwrap().is_empty());
        assert!(session.snapshot().unwrap().is_none());
    }

    #[test]
    fn test_remove_item_through_dispatch() {
        let mut session = session();
        session.create_project(fields("Casa")).unwrap();
        session
            .dispatch(Command::AddMaterial { material_id: 2, cantidad: dec!(3) })
            .unwrap();

        let outcome = session
            .dispatch(Command::RemoveItem { index: 0, confirmed: true })
            .unwrap();
        assert!(matches!(outcome, Outcome::ItemRemoved(item) if item.material_id == 2));

        let err = session
            .dispatch(Command::RemoveItem { index: 0, confirmed: true })
            .unwrap_err();
        assert!(matches!(err, Error::Index { index: 0, len: 0 }));
    }

    #[test]
    fn test_edit_with_blank_description_clears_it() {
        let mut session = session();
        let mut with_description = fields("Casa");
        with_description.descripcion = Some("Quincho".to_string());
        let project = session.create_project(with_description).unwrap();

        let mut edited = fields("Casa");
        edited.descripcion = Some(String::new());
        session.dispatch(Command::EditProject(edited)).unwrap();

        let stored = session
            .projects()
            .unwrap()
            .into_iter()
            .find(|p| p.id == project.id)
            .unwrap();
        assert_eq!(stored.descripcion, None);
        assert_eq!(session.budget().project().unwrap().descripcion, None);
    }

    #[test]
    fn test_dashboard_counts() {
        let mut session = session();
        session.create_project(fields("Casa")).unwrap();

        let dashboard = session.dashboard().unwrap();

        assert_eq!(dashboard.proyectos, 1);
        assert_eq!(dashboard.materiales, 2);
        assert_eq!(dashboard.categorias, vec!["Obra gruesa", "Terminaciones"]);
    }

    #[test]
    fn test_export_requires_active_project() {
        let session = session();
        let dir = tempfile::tempdir().unwrap();
        let err = session
            .export_report(&mut DirectoryChooser::new(dir.path()))
            .unwrap_err();
        assert!(matches!(err, Error::NoActiveProject));
    }

    #[test]
    fn test_export_active_project() {
        let mut session = session();
        session.create_project(fields("Casa   Pérez #2")).unwrap();
        session
            .dispatch(Command::AddMaterial { material_id: 1, cantidad: dec!(1) })
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let exported = session
            .export_report(&mut DirectoryChooser::new(dir.path()))
            .unwrap();

        assert!(exported);
        let files: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].starts_with("Casa_Prez_2_"));
        assert!(files[0].ends_with(".html"));
    }
}
