// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

use obras_budget::config::{self, AppConfig, Overrides};
use obras_budget::{
    catalog, logging, parse_decimal, parse_percent, CategoryFilter, Command, DirectoryChooser,
    Outcome, ProjectFields, Report, Session, SqliteStore, ALL_CATEGORIES,
};

#[derive(Debug, Parser)]
#[command(name = "obras", version, about = "Construction budgets: materials, projects, reports")]
struct Cli {
    /// Config file (TOML). Defaults to ./obras.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Database file
    #[arg(long = "db", global = true, env = "OBRAS_DATABASE_PATH")]
    database_path: Option<PathBuf>,
    /// Where exported reports go
    #[arg(long, global = true)]
    reports_dir: Option<PathBuf>,
    /// Default log level when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Cmd>,
}

#[derive(Debug, Subcommand)]
enum Cmd {
    /// Create the database schema
    Init,
    /// Project and material counts
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Material catalog
    #[command(subcommand)]
    Materials(MaterialsCmd),
    /// Raise (or lower) prices by a percentage
    Inflate {
        #[arg(allow_hyphen_values = true)]
        percent: String,
        /// Exact category, or TODOS for every material
        #[arg(long, default_value = ALL_CATEGORIES)]
        categoria: String,
        #[arg(long)]
        yes: bool,
    },
    #[command(subcommand)]
    Projects(ProjectsCmd),
    /// Budget of one project
    Show {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Line items of a project
    #[command(subcommand)]
    Items(ItemsCmd),
    /// Write the project's budget as a printable HTML file
    Export {
        id: i64,
        /// Output directory (defaults to reports_dir)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Interactive terminal UI (default)
    Tui,
}

#[derive(Debug, Subcommand)]
enum MaterialsCmd {
    List,
    Add {
        nombre: String,
        #[arg(long, default_value = "")]
        categoria: String,
        #[arg(long, value_parser = amount)]
        precio: Decimal,
    },
    SetPrice {
        id: i64,
        #[arg(value_parser = amount)]
        precio: Decimal,
    },
    /// Import a CSV price list (nombre,categoria,precio)
    Import { csv: PathBuf },
}

#[derive(Debug, Subcommand)]
enum ProjectsCmd {
    List,
    Create {
        nombre: String,
        #[arg(long)]
        cliente: String,
        #[arg(long)]
        descripcion: Option<String>,
        #[arg(long, value_parser = amount)]
        ancho: Decimal,
        #[arg(long, value_parser = amount)]
        largo: Decimal,
    },
    /// Change some fields; the rest are kept
    Edit {
        id: i64,
        #[arg(long)]
        nombre: Option<String>,
        #[arg(long)]
        cliente: Option<String>,
        /// New description; an empty value clears it
        #[arg(long)]
        descripcion: Option<String>,
        #[arg(long, value_parser = amount)]
        ancho: Option<Decimal>,
        #[arg(long, value_parser = amount)]
        largo: Option<Decimal>,
    },
    Delete {
        id: i64,
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
enum ItemsCmd {
    Add {
        project: i64,
        material: i64,
        #[arg(value_parser = amount)]
        cantidad: Decimal,
    },
    Remove {
        project: i64,
        /// Position as shown by `show` (starting at 0)
        index: usize,
        #[arg(long)]
        yes: bool,
    },
}

fn amount(text: &str) -> std::result::Result<Decimal, String> {
    parse_decimal(text).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = config::load(Overrides {
        config: cli.config.clone(),
        database_path: cli.database_path.clone(),
        reports_dir: cli.reports_dir.clone(),
        log_level: cli.log_level.clone(),
    })
    .context("Failed to load configuration")?;

    match cli.command.unwrap_or(Cmd::Tui) {
        Cmd::Tui => run_ui_mode(&settings),
        command => {
            logging::init(&settings.log_level);
            run_command(&settings, command)
        }
    }
}

fn open_session(settings: &AppConfig) -> Result<Session<SqliteStore>> {
    let store = SqliteStore::open(&settings.database_path)
        .with_context(|| format!("Failed to open database {}", settings.database_path.display()))?;
    Ok(Session::new(store))
}

fn select(session: &mut Session<SqliteStore>, id: i64) -> Result<()> {
    session.dispatch(Command::SelectProject(Some(id)))?;
    Ok(())
}

fn run_command(settings: &AppConfig, command: Cmd) -> Result<()> {
    let mut session = open_session(settings)?;

    match command {
        Cmd::Init => {
            println!("✓ Database ready at {}", settings.database_path.display());
        }
        Cmd::Stats { json } => {
            let dashboard = session.dashboard()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                println!("Proyectos:  {}", dashboard.proyectos);
                println!("Materiales: {}", dashboard.materiales);
                println!("Categorías: {}", dashboard.categorias.join(", "));
            }
        }
        Cmd::Materials(MaterialsCmd::List) => {
            for m in session.materials()? {
                println!(
                    "{:>4}  {:<30} {:<18} {:>16}",
                    m.id,
                    m.nombre,
                    m.categoria,
                    obras_budget::format_money(m.precio)
                );
            }
        }
        Cmd::Materials(MaterialsCmd::Add {
            nombre,
            categoria,
            precio,
        }) => {
            if let Outcome::MaterialSaved(m) = session.dispatch(Command::CreateMaterial {
                nombre,
                categoria,
                precio,
            })? {
                println!("✓ Material {} created: {}", m.id, m.nombre);
            }
        }
        Cmd::Materials(MaterialsCmd::SetPrice { id, precio }) => {
            session.dispatch(Command::SetUnitPrice {
                material_id: id,
                precio,
            })?;
            println!("✓ Price of material {} set to {}", id, obras_budget::format_money(precio));
        }
        Cmd::Materials(MaterialsCmd::Import { csv }) => {
            let imported = catalog::import_csv(session.store(), &csv)
                .with_context(|| format!("Failed to import {}", csv.display()))?;
            println!("✓ Imported {} materials", imported);
        }
        Cmd::Inflate {
            percent,
            categoria,
            yes,
        } => {
            let percent = parse_percent(&percent)?;
            let filter: CategoryFilter = categoria.parse()?;
            if !yes {
                println!("Would change prices by {}% in: {}", percent, filter);
                bail!("refusing to change prices without --yes");
            }
            if let Outcome::PricesUpdated(count) = session.dispatch(Command::ApplyIncrease {
                percent,
                filter,
                confirmed: true,
            })? {
                println!("✓ Updated {} materials", count);
            }
        }
        Cmd::Projects(ProjectsCmd::List) => {
            for p in session.projects()? {
                println!(
                    "{:>14}  {:<30} {:<24} {:>10} m²  {}",
                    p.id,
                    p.nombre,
                    p.cliente,
                    p.superficie(),
                    p.fecha_text()
                );
            }
        }
        Cmd::Projects(ProjectsCmd::Create {
            nombre,
            cliente,
            descripcion,
            ancho,
            largo,
        }) => {
            let project = session.create_project(ProjectFields {
                nombre,
                cliente,
                descripcion,
                ancho,
                largo,
            })?;
            println!("✓ Project {} created: {}", project.id, project.nombre);
        }
        Cmd::Projects(ProjectsCmd::Edit {
            id,
            nombre,
            cliente,
            descripcion,
            ancho,
            largo,
        }) => {
            select(&mut session, id)?;
            let Some(current) = session.budget().project().cloned() else {
                bail!("project {} could not be loaded", id);
            };
            session.dispatch(Command::EditProject(ProjectFields {
                nombre: nombre.unwrap_or(current.nombre),
                cliente: cliente.unwrap_or(current.cliente),
                // Some("") reaches validation, which turns it into None
                descripcion: descripcion.or(current.descripcion),
                ancho: ancho.unwrap_or(current.ancho),
                largo: largo.unwrap_or(current.largo),
            }))?;
            println!("✓ Project {} updated", id);
        }
        Cmd::Projects(ProjectsCmd::Delete { id, yes }) => {
            select(&mut session, id)?;
            match session.dispatch(Command::DeleteProject { confirmed: yes })? {
                Outcome::ProjectDeleted(p) => println!("✓ Project {} deleted: {}", p.id, p.nombre),
                _ => bail!("refusing to delete project {} without --yes", id),
            }
        }
        Cmd::Show { id, json } => {
            select(&mut session, id)?;
            let Some(snapshot) = session.snapshot()? else {
                bail!("project {} could not be loaded", id);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                let report = Report::from_snapshot(&snapshot, chrono::Local::now().date_naive());
                print!("{}", report.render_text());
                for row in &snapshot.rows {
                    println!("  [{}] {}", row.index, row.material.nombre);
                }
                if snapshot.skipped > 0 {
                    println!("⚠️  {} items reference unknown materials", snapshot.skipped);
                }
            }
        }
        Cmd::Items(ItemsCmd::Add {
            project,
            material,
            cantidad,
        }) => {
            select(&mut session, project)?;
            session.dispatch(Command::AddMaterial {
                material_id: material,
                cantidad,
            })?;
            println!("✓ Added {} of material {} to project {}", cantidad, material, project);
        }
        Cmd::Items(ItemsCmd::Remove {
            project,
            index,
            yes,
        }) => {
            select(&mut session, project)?;
            match session.dispatch(Command::RemoveItem {
                index,
                confirmed: yes,
            })? {
                Outcome::ItemRemoved(item) => {
                    println!("✓ Removed material {} from project {}", item.material_id, project)
                }
                _ => bail!("refusing to remove an item without --yes"),
            }
        }
        Cmd::Export { id, out } => {
            select(&mut session, id)?;
            let dir = out.unwrap_or_else(|| settings.reports_dir.clone());
            let exported = session.export_report(&mut DirectoryChooser::new(&dir))?;
            if exported {
                println!("✓ Report written to {}", dir.display());
            }
        }
        Cmd::Tui => unreachable!("handled by run_ui_mode"),
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(settings: &AppConfig) -> Result<()> {
    logging::init_to_file(&settings.log_level, &settings.database_path.with_extension("log"))
        .context("Failed to open log file")?;

    let session = open_session(settings)?;
    let mut app = ui::App::new(session, settings.reports_dir.clone())?;
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_settings: &AppConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the subcommands: obras --help");
    std::process::exit(1);
}
