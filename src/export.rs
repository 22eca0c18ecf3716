// 💾 Report export - one-shot write to a user-confirmed path
//
// The presentation layer decides where the file goes. No path chosen means
// the user cancelled, which is a normal outcome and not an error.

use crate::error::Result;
use crate::report::Report;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const REPORT_EXTENSION: &str = "html";

/// Asks the user where to save a report
pub trait SavePathChooser {
    /// `default_name` is the suggested file name (with extension).
    /// `None` means the user cancelled.
    fn choose(&mut self, default_name: &str) -> Option<PathBuf>;
}

/// Always saves under one directory with the suggested name
pub struct DirectoryChooser {
    dir: PathBuf,
}

impl DirectoryChooser {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirectoryChooser { dir: dir.into() }
    }
}

impl SavePathChooser for DirectoryChooser {
    fn choose(&mut self, default_name: &str) -> Option<PathBuf> {
        Some(self.dir.join(default_name))
    }
}

/// Suggested file name for a report: `<filename>.html`
pub fn default_file_name(report: &Report) -> String {
    format!("{}.{}", report.filename, REPORT_EXTENSION)
}

/// Render `report` as HTML and write it where the chooser says.
/// Returns `false` when the user cancelled.
pub fn export_report<C: SavePathChooser + ?Sized>(report: &Report, chooser: &mut C) -> Result<bool> {
    let Some(path) = chooser.choose(&default_file_name(report)) else {
        info!(report = %report.filename, "export cancelled");
        return Ok(false);
    };

    write_report(report, &path)?;
    info!(path = %path.display(), "report exported");
    Ok(true)
}

fn write_report(report: &Report, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, report.render_html())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::compute_totals;
    use crate::models::{LineItem, Material, Project, ProjectFields};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    struct Cancel;

    impl SavePathChooser for Cancel {
        fn choose(&mut self, _default_name: &str) -> Option<PathBuf> {
            None
        }
    }

    fn report() -> Report {
        let project = Project::new(
            1,
            ProjectFields {
                nombre: "Casa Pérez".to_string(),
                cliente: "Pérez".to_string(),
                descripcion: None,
                ancho: dec!(2),
                largo: dec!(3),
            },
        );
        let catalog = vec![Material::new(1, "Cemento", "Obra gruesa", dec!(100))];
        let items = vec![LineItem::new(1, 1, dec!(2))];
        let snapshot = compute_totals(&project, &items, &catalog).unwrap();
        Report::from_snapshot(&snapshot, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
    }

    #[test]
    fn test_export_writes_html_into_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut chooser = DirectoryChooser::new(dir.path().join("reportes"));

        let exported = export_report(&report(), &mut chooser).unwrap();

        assert!(exported);
        let path = dir.path().join("reportes").join("Casa_Prez_2024-01-02.html");
        let html = fs::read_to_string(path).unwrap();
        assert!(html.contains("$ 200,00"));
    }

    #[test]
    fn test_cancelled_export_is_not_an_error() {
        let exported = export_report(&report(), &mut Cancel).unwrap();
        assert!(!exported);
    }
}
