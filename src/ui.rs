use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::path::PathBuf;

use obras_budget::export::default_file_name;
use obras_budget::report::{format_percent, format_quantity};
use obras_budget::{
    format_money, parse_decimal, parse_percent, BudgetSnapshot, CategoryFilter, Command, Dashboard,
    Material, Outcome, Project, ProjectFields, SavePathChooser, Session, SqliteStore,
    ALL_CATEGORIES,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Projects,
    Budget,
    Inventory,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Projects => Page::Budget,
            Page::Budget => Page::Inventory,
            Page::Inventory => Page::Projects,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Projects => Page::Inventory,
            Page::Budget => Page::Projects,
            Page::Inventory => Page::Budget,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Page::Projects => "Proyectos",
            Page::Budget => "Presupuesto",
            Page::Inventory => "Inventario",
        }
    }
}

/// Project form being filled one field at a time
#[derive(Debug, Clone, Default)]
struct ProjectDraft {
    editing: bool,
    nombre: String,
    cliente: String,
    descripcion: Option<String>,
    ancho: String,
    largo: String,
}

/// What the text in the prompt line is for
#[derive(Debug, Clone)]
enum PromptKind {
    Quantity { material_id: i64 },
    Price { material_id: i64 },
    Percent,
    Category { percent: rust_decimal::Decimal },
    ExportPath,
    ProjectName(ProjectDraft),
    ProjectClient(ProjectDraft),
    ProjectDescription(ProjectDraft),
    ProjectWidth(ProjectDraft),
    ProjectLength(ProjectDraft),
}

#[derive(Debug, Clone)]
struct Prompt {
    kind: PromptKind,
    label: String,
    buffer: String,
}

#[derive(Debug, Clone)]
enum Mode {
    Normal,
    Input(Prompt),
    /// Destructive command waiting for y/n
    Confirm { command: Command, question: String },
}

#[derive(Debug, Clone)]
struct Status {
    message: String,
    error: bool,
}

/// Path typed by the user; empty means cancelled
struct TypedPath(String);

impl SavePathChooser for TypedPath {
    fn choose(&mut self, _default_name: &str) -> Option<PathBuf> {
        let path = self.0.trim();
        if path.is_empty() {
            None
        } else {
            Some(PathBuf::from(path))
        }
    }
}

pub struct App {
    session: Session<SqliteStore>,
    reports_dir: PathBuf,
    pub current_page: Page,
    projects: Vec<Project>,
    materials: Vec<Material>,
    snapshot: Option<BudgetSnapshot>,
    dashboard: Dashboard,
    projects_state: TableState,
    budget_state: TableState,
    inventory_state: TableState,
    mode: Mode,
    status: Option<Status>,
}

impl App {
    pub fn new(session: Session<SqliteStore>, reports_dir: PathBuf) -> Result<Self> {
        let dashboard = session.dashboard()?;
        let mut app = Self {
            session,
            reports_dir,
            current_page: Page::Projects,
            projects: Vec::new(),
            materials: Vec::new(),
            snapshot: None,
            dashboard,
            projects_state: TableState::default(),
            budget_state: TableState::default(),
            inventory_state: TableState::default(),
            mode: Mode::Normal,
            status: None,
        };
        app.refresh();
        Ok(app)
    }

    /// Reload lists and recompute the active budget
    fn refresh(&mut self) {
        let loaded = self
            .session
            .projects()
            .and_then(|projects| Ok((projects, self.session.materials()?)))
            .and_then(|(projects, materials)| {
                Ok((projects, materials, self.session.snapshot()?, self.session.dashboard()?))
            });

        match loaded {
            Ok((projects, materials, snapshot, dashboard)) => {
                self.projects = projects;
                self.materials = materials;
                self.snapshot = snapshot;
                self.dashboard = dashboard;
            }
            Err(e) => self.fail(e.to_string()),
        }

        clamp_selection(&mut self.projects_state, self.projects.len());
        clamp_selection(&mut self.inventory_state, self.materials.len());
        let rows = self.snapshot.as_ref().map_or(0, |s| s.rows.len());
        clamp_selection(&mut self.budget_state, rows);
    }

    fn info(&mut self, message: impl Into<String>) {
        self.status = Some(Status {
            message: message.into(),
            error: false,
        });
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.status = Some(Status {
            message: message.into(),
            error: true,
        });
    }

    /// Run one command, report the outcome, refresh
    fn run(&mut self, command: Command) {
        match self.session.dispatch(command) {
            Ok(outcome) => {
                let message = match outcome {
                    Outcome::Done => "Listo".to_string(),
                    Outcome::Cancelled => "Cancelado".to_string(),
                    Outcome::ProjectCreated(p) => format!("Proyecto creado: {}", p.nombre),
                    Outcome::ProjectDeleted(p) => format!("Proyecto eliminado: {}", p.nombre),
                    Outcome::ItemRemoved(_) => "Material quitado del presupuesto".to_string(),
                    Outcome::MaterialSaved(m) => format!("{}: {}", m.nombre, format_money(m.precio)),
                    Outcome::PricesUpdated(n) => format!("Se actualizaron {} materiales", n),
                };
                self.info(message);
            }
            Err(e) => self.fail(e.to_string()),
        }
        self.refresh();
    }

    fn selected_material(&self) -> Option<&Material> {
        self.inventory_state.selected().and_then(|i| self.materials.get(i))
    }

    fn prompt(&mut self, kind: PromptKind, label: &str, initial: &str) {
        self.mode = Mode::Input(Prompt {
            kind,
            label: label.to_string(),
            buffer: initial.to_string(),
        });
    }

    fn confirm(&mut self, command: Command, question: String) {
        self.mode = Mode::Confirm { command, question };
    }

    // ------------------------------------------------------------------------
    // Normal-mode actions
    // ------------------------------------------------------------------------

    fn select_highlighted_project(&mut self) {
        let Some(id) = self
            .projects_state
            .selected()
            .and_then(|i| self.projects.get(i))
            .map(|p| p.id)
        else {
            return;
        };
        self.run(Command::SelectProject(Some(id)));
        if self.session.budget().is_loaded() {
            self.current_page = Page::Budget;
        }
    }

    fn start_add_material(&mut self) {
        if !self.session.budget().is_loaded() {
            return self.fail("Selecciona un proyecto primero");
        }
        let Some(material) = self.selected_material().cloned() else {
            return;
        };
        self.prompt(
            PromptKind::Quantity {
                material_id: material.id,
            },
            &format!("Cantidad de {}", material.nombre),
            "",
        );
    }

    fn start_set_price(&mut self) {
        let Some(material) = self.selected_material().cloned() else {
            return;
        };
        self.prompt(
            PromptKind::Price {
                material_id: material.id,
            },
            &format!("Nuevo precio de {}", material.nombre),
            &material.precio.to_string(),
        );
    }

    fn start_remove_item(&mut self) {
        let Some(row) = self
            .snapshot
            .as_ref()
            .zip(self.budget_state.selected())
            .and_then(|(s, i)| s.rows.get(i))
        else {
            return;
        };
        let question = format!("¿Quitar {} del presupuesto?", row.material.nombre);
        let command = Command::RemoveItem {
            index: row.index,
            confirmed: true,
        };
        self.confirm(command, question);
    }

    fn start_delete_project(&mut self) {
        let Some(project) = self.session.budget().project() else {
            return self.fail("Selecciona un proyecto primero");
        };
        let question = format!(
            "¿ELIMINAR el proyecto \"{}\"? Esta acción no se puede deshacer.",
            project.nombre
        );
        self.confirm(Command::DeleteProject { confirmed: true }, question);
    }

    fn start_export(&mut self) {
        let today = chrono::Local::now().date_naive();
        match self.session.report(today) {
            Ok(report) => {
                let default = self.reports_dir.join(default_file_name(&report));
                self.prompt(
                    PromptKind::ExportPath,
                    "Guardar presupuesto en (vacío cancela)",
                    &default.to_string_lossy(),
                );
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn start_project_form(&mut self, editing: bool) {
        let current = self.session.budget().project().cloned();
        let draft = match (editing, current) {
            (true, Some(p)) => ProjectDraft {
                editing: true,
                nombre: p.nombre,
                cliente: p.cliente,
                descripcion: p.descripcion,
                ancho: p.ancho.to_string(),
                largo: p.largo.to_string(),
            },
            (true, None) => return self.fail("Selecciona un proyecto primero"),
            (false, _) => ProjectDraft::default(),
        };
        let initial = draft.nombre.clone();
        self.prompt(PromptKind::ProjectName(draft), "Nombre del proyecto", &initial);
    }

    // ------------------------------------------------------------------------
    // Prompt submission
    // ------------------------------------------------------------------------

    fn submit(&mut self, prompt: Prompt) {
        let text = prompt.buffer;
        match prompt.kind {
            PromptKind::Quantity { material_id } => match parse_decimal(&text) {
                Ok(cantidad) => self.run(Command::AddMaterial {
                    material_id,
                    cantidad,
                }),
                Err(e) => self.fail(e.to_string()),
            },
            PromptKind::Price { material_id } => match parse_decimal(&text) {
                Ok(precio) => self.run(Command::SetUnitPrice {
                    material_id,
                    precio,
                }),
                Err(e) => self.fail(e.to_string()),
            },
            PromptKind::Percent => match parse_percent(&text) {
                Ok(percent) => self.prompt(
                    PromptKind::Category { percent },
                    &format!("Categoría ({} = todas)", ALL_CATEGORIES),
                    ALL_CATEGORIES,
                ),
                Err(e) => self.fail(e.to_string()),
            },
            PromptKind::Category { percent } => {
                let filter = text.parse().unwrap_or(CategoryFilter::All);
                let question = format!("¿Aumentar precios un {}% en: {}?", percent, filter);
                self.confirm(
                    Command::ApplyIncrease {
                        percent,
                        filter,
                        confirmed: true,
                    },
                    question,
                );
            }
            PromptKind::ExportPath => match self.session.export_report(&mut TypedPath(text)) {
                Ok(true) => self.info("Presupuesto exportado"),
                Ok(false) => self.info("Exportación cancelada"),
                Err(e) => self.fail(e.to_string()),
            },
            PromptKind::ProjectName(mut draft) => {
                draft.nombre = text;
                let initial = draft.cliente.clone();
                self.prompt(PromptKind::ProjectClient(draft), "Cliente", &initial);
            }
            PromptKind::ProjectClient(mut draft) => {
                draft.cliente = text;
                let initial = draft.descripcion.clone().unwrap_or_default();
                self.prompt(
                    PromptKind::ProjectDescription(draft),
                    "Descripción (vacío = sin descripción)",
                    &initial,
                );
            }
            PromptKind::ProjectDescription(mut draft) => {
                // blank text is dropped by ProjectFields::validated
                draft.descripcion = Some(text);
                let initial = draft.ancho.clone();
                self.prompt(PromptKind::ProjectWidth(draft), "Ancho (m)", &initial);
            }
            PromptKind::ProjectWidth(mut draft) => {
                draft.ancho = text;
                let initial = draft.largo.clone();
                self.prompt(PromptKind::ProjectLength(draft), "Largo (m)", &initial);
            }
            PromptKind::ProjectLength(mut draft) => {
                draft.largo = text;
                self.submit_project(draft);
            }
        }
    }

    fn submit_project(&mut self, draft: ProjectDraft) {
        let dimensions = parse_decimal(&draft.ancho).and_then(|a| Ok((a, parse_decimal(&draft.largo)?)));
        let (ancho, largo) = match dimensions {
            Ok(d) => d,
            Err(e) => return self.fail(e.to_string()),
        };

        let fields = ProjectFields {
            nombre: draft.nombre,
            cliente: draft.cliente,
            descripcion: draft.descripcion,
            ancho,
            largo,
        };

        if draft.editing {
            self.run(Command::EditProject(fields));
        } else {
            self.run(Command::CreateProject(fields));
            if self.session.budget().is_loaded() {
                self.current_page = Page::Budget;
            }
        }
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    fn active_table(&mut self) -> (&mut TableState, usize) {
        match self.current_page {
            Page::Projects => (&mut self.projects_state, self.projects.len()),
            Page::Budget => (
                &mut self.budget_state,
                self.snapshot.as_ref().map_or(0, |s| s.rows.len()),
            ),
            Page::Inventory => (&mut self.inventory_state, self.materials.len()),
        }
    }

    pub fn next(&mut self) {
        let (state, len) = self.active_table();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let (state, len) = self.active_table();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    /// Handle one key; returns true to quit
    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match std::mem::replace(&mut self.mode, Mode::Normal) {
            Mode::Input(mut prompt) => {
                match code {
                    KeyCode::Enter => self.submit(prompt),
                    KeyCode::Esc => self.info("Cancelado"),
                    KeyCode::Backspace => {
                        prompt.buffer.pop();
                        self.mode = Mode::Input(prompt);
                    }
                    KeyCode::Char(c) => {
                        prompt.buffer.push(c);
                        self.mode = Mode::Input(prompt);
                    }
                    _ => self.mode = Mode::Input(prompt),
                }
                false
            }
            Mode::Confirm { command, .. } => {
                match code {
                    KeyCode::Char('y') | KeyCode::Char('s') => self.run(command),
                    _ => self.info("Cancelado"),
                }
                false
            }
            Mode::Normal => self.handle_normal_key(code, modifiers),
        }
    }

    fn handle_normal_key(&mut self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => {
                if modifiers.contains(KeyModifiers::SHIFT) {
                    self.current_page = self.current_page.previous();
                } else {
                    self.current_page = self.current_page.next();
                }
            }
            KeyCode::BackTab => self.current_page = self.current_page.previous(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::Enter if self.current_page == Page::Projects => self.select_highlighted_project(),
            KeyCode::Char('n') => self.start_project_form(false),
            KeyCode::Char('r') => self.start_project_form(true),
            KeyCode::Char('x') => self.start_delete_project(),
            KeyCode::Char('a') if self.current_page == Page::Inventory => self.start_add_material(),
            KeyCode::Char('p') if self.current_page == Page::Inventory => self.start_set_price(),
            KeyCode::Char('d') if self.current_page == Page::Budget => self.start_remove_item(),
            KeyCode::Char('i') => {
                self.prompt(PromptKind::Percent, "Porcentaje de aumento", "");
            }
            KeyCode::Char('e') => self.start_export(),
            _ => {}
        }
        false
    }
}

fn clamp_selection(state: &mut TableState, len: usize) {
    match (state.selected(), len) {
        (_, 0) => state.select(None),
        (None, _) => state.select(Some(0)),
        (Some(i), len) if i >= len => state.select(Some(len - 1)),
        _ => {}
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if app.handle_key(key.code, key.modifiers) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar / prompt
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Projects => render_projects(f, chunks[1], app),
        Page::Budget => render_budget(f, chunks[1], app),
        Page::Inventory => render_inventory(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Projects, Page::Budget, Page::Inventory];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Proyectos: {}", app.dashboard.proyectos),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("Materiales: {}", app.dashboard.materiales),
        Style::default().fg(Color::White),
    ));

    if let Some(snapshot) = &app.snapshot {
        tab_spans.push(Span::raw("  |  "));
        tab_spans.push(Span::styled(
            format!("{} · Total: {}", snapshot.project.nombre, format_money(snapshot.total)),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn table_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title)
}

fn highlight() -> Style {
    Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD)
}

fn render_projects(f: &mut Frame, area: Rect, app: &mut App) {
    let active = app.session.budget().project().map(|p| p.id);

    let rows = app.projects.iter().map(|p| {
        let style = if Some(p.id) == active {
            Style::default().fg(Color::Green)
        } else {
            Style::default()
        };
        Row::new(vec![
            Cell::from(truncate(&p.nombre, 30)),
            Cell::from(truncate(&p.cliente, 24)),
            Cell::from(format!("{} m²", p.superficie())),
            Cell::from(p.fecha_text()),
        ])
        .style(style)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(32),
            Constraint::Length(26),
            Constraint::Length(14),
            Constraint::Length(12),
        ],
    )
    .header(header_row(&["Proyecto", "Cliente", "Superficie", "Fecha"]))
    .block(table_block(" Proyectos ".to_string()))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.projects_state);
}

fn render_budget(f: &mut Frame, area: Rect, app: &mut App) {
    let Some(snapshot) = &app.snapshot else {
        let empty = Paragraph::new(vec![
            Line::from(""),
            Line::from("  No hay un proyecto seleccionado."),
            Line::from("  Elegí uno en Proyectos (Enter) o creá uno nuevo (n)."),
        ])
        .block(table_block(" Presupuesto ".to_string()));
        f.render_widget(empty, area);
        return;
    };

    let rows = snapshot.rows.iter().map(|row| {
        Row::new(vec![
            Cell::from(truncate(&row.material.nombre, 28)),
            Cell::from(truncate(&row.material.categoria, 16)),
            Cell::from(format_money(row.material.precio)),
            Cell::from(format_quantity(row.cantidad)),
            Cell::from(format_money(row.subtotal)).style(Style::default().add_modifier(Modifier::BOLD)),
            Cell::from(format_percent(row.porcentaje)),
        ])
    });

    let mut title = format!(
        " {} ({}) · {} m² · Total: {} ",
        snapshot.project.nombre,
        snapshot.project.cliente,
        snapshot.superficie,
        format_money(snapshot.total)
    );
    if snapshot.skipped > 0 {
        title.push_str(&format!("· {} sin material ", snapshot.skipped));
    }

    let table = Table::new(
        rows,
        [
            Constraint::Length(30),
            Constraint::Length(18),
            Constraint::Length(16),
            Constraint::Length(10),
            Constraint::Length(18),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&["Material", "Categoría", "Precio", "Cantidad", "Subtotal", "%"]))
    .block(table_block(title))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.budget_state);
}

fn render_inventory(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.materials.iter().map(|m| {
        Row::new(vec![
            Cell::from(m.id.to_string()),
            Cell::from(truncate(&m.nombre, 30)),
            Cell::from(truncate(&m.categoria, 20)),
            Cell::from(format_money(m.precio)),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(32),
            Constraint::Length(22),
            Constraint::Length(18),
        ],
    )
    .header(header_row(&["ID", "Material", "Categoría", "Precio"]))
    .block(table_block(" Inventario ".to_string()))
    .highlight_style(highlight())
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.inventory_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let line = match &app.mode {
        Mode::Input(prompt) => Line::from(vec![
            Span::styled(format!(" {}: ", prompt.label), Style::default().fg(Color::Yellow)),
            Span::raw(prompt.buffer.clone()),
            Span::styled("█", Style::default().fg(Color::Yellow)),
        ]),
        Mode::Confirm { question, .. } => Line::from(vec![
            Span::styled(format!(" {} ", question), Style::default().fg(Color::Red)),
            Span::styled("(y/n)", Style::default().fg(Color::Yellow)),
        ]),
        Mode::Normal => {
            let mut spans = Vec::new();
            if let Some(status) = &app.status {
                let color = if status.error { Color::Red } else { Color::Green };
                spans.push(Span::styled(format!(" {} ", status.message), Style::default().fg(color)));
                spans.push(Span::raw("|"));
            }
            let keys: &[(&str, &str)] = match app.current_page {
                Page::Projects => &[("Enter", "Abrir"), ("n", "Nuevo"), ("r", "Editar"), ("x", "Eliminar")],
                Page::Budget => &[("d", "Quitar"), ("e", "Exportar"), ("r", "Editar"), ("x", "Eliminar")],
                Page::Inventory => &[("a", "Agregar"), ("p", "Precio"), ("i", "Aumento %")],
            };
            for (key, label) in keys.iter().chain(&[("Tab", "Página"), ("q", "Salir")]) {
                spans.push(Span::raw(" "));
                spans.push(Span::styled(*key, Style::default().fg(Color::Yellow)));
                spans.push(Span::raw(format!(" {} ", label)));
            }
            Line::from(spans)
        }
    };

    let status = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(status, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn app() -> App {
        let session = Session::new(SqliteStore::open_in_memory().unwrap());
        App::new(session, PathBuf::from(".")).unwrap()
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(code, KeyModifiers::NONE)
    }

    fn type_line(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
        press(app, KeyCode::Enter);
    }

    #[test]
    fn test_new_project_form_creates_and_opens_budget() {
        let mut app = app();

        press(&mut app, KeyCode::Char('n'));
        type_line(&mut app, "Casa Pérez");
        type_line(&mut app, "Juan");
        type_line(&mut app, "Quincho y galería");
        type_line(&mut app, "3,5");
        type_line(&mut app, "4.2");

        assert_eq!(app.projects.len(), 1);
        assert_eq!(app.current_page, Page::Budget);
        let snapshot = app.snapshot.as_ref().unwrap();
        assert_eq!(snapshot.project.nombre, "Casa Pérez");
        assert_eq!(snapshot.project.descripcion.as_deref(), Some("Quincho y galería"));
        assert_eq!(snapshot.superficie, dec!(14.70));
    }

    #[test]
    fn test_invalid_project_shows_error() {
        let mut app = app();

        press(&mut app, KeyCode::Char('n'));
        type_line(&mut app, "");
        type_line(&mut app, "Juan");
        type_line(&mut app, "");
        type_line(&mut app, "3");
        type_line(&mut app, "4");

        assert!(app.projects.is_empty());
        assert!(app.status.as_ref().unwrap().error);
    }

    #[test]
    fn test_declined_confirmation_keeps_project() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        for text in ["Obra", "Ana", "", "2", "2"] {
            type_line(&mut app, text);
        }

        press(&mut app, KeyCode::Char('x'));
        assert!(matches!(app.mode, Mode::Confirm { .. }));
        press(&mut app, KeyCode::Char('n'));

        assert_eq!(app.projects.len(), 1);
        assert!(app.session.budget().is_loaded());
    }

    #[test]
    fn test_price_increase_flow() {
        let mut session = Session::new(SqliteStore::open_in_memory().unwrap());
        session
            .dispatch(Command::CreateMaterial {
                nombre: "Cemento".to_string(),
                categoria: "Obra gruesa".to_string(),
                precio: dec!(100),
            })
            .unwrap();
        let mut app = App::new(session, PathBuf::from(".")).unwrap();

        press(&mut app, KeyCode::Char('i'));
        type_line(&mut app, "10");
        // category prompt starts with TODOS
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Char('y'));

        assert_eq!(app.materials[0].precio, dec!(110));
    }

    #[test]
    fn test_escape_cancels_prompt() {
        let mut app = app();
        press(&mut app, KeyCode::Char('i'));
        press(&mut app, KeyCode::Char('5'));
        assert!(!press(&mut app, KeyCode::Esc));
        assert!(matches!(app.mode, Mode::Normal));
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn test_add_material_needs_a_project() {
        let mut session = Session::new(SqliteStore::open_in_memory().unwrap());
        session
            .dispatch(Command::CreateMaterial {
                nombre: "Arena".to_string(),
                categoria: String::new(),
                precio: dec!(50),
            })
            .unwrap();
        let mut app = App::new(session, PathBuf::from(".")).unwrap();
        app.current_page = Page::Inventory;

        press(&mut app, KeyCode::Char('a'));

        assert!(matches!(app.mode, Mode::Normal));
        assert!(app.status.as_ref().unwrap().error);
    }

    #[test]
    fn test_edit_form_can_clear_description() {
        let mut app = app();
        press(&mut app, KeyCode::Char('n'));
        for text in ["Obra", "Ana", "Baño nuevo", "2", "2"] {
            type_line(&mut app, text);
        }
        assert!(app.session.budget().project().unwrap().descripcion.is_some());

        press(&mut app, KeyCode::Char('r'));
        // name and client keep their prefilled values
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);
        let Mode::Input(prompt) = &app.mode else {
            panic!("expected the description prompt");
        };
        assert_eq!(prompt.buffer, "Baño nuevo");
        for _ in 0.."Baño nuevo".chars().count() {
            press(&mut app, KeyCode::Backspace);
        }
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.projects[0].descripcion, None);
        assert_eq!(app.projects[0].nombre, "Obra");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("corto", 10), "corto");
        assert_eq!(truncate("Hormigón elaborado H21", 10), "Hormigó...");
    }
}
