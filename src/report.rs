// 🖨️ Report Formatter - display-ready figures from a budget snapshot
//
// Pure functions only. Writing the document somewhere is export.rs's job.

use crate::budget::BudgetSnapshot;
use crate::models::round2;
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt::Write as _;

/// Fallback when a project name sanitizes to nothing
pub const DEFAULT_FILENAME: &str = "presupuesto";

// ============================================================================
// NUMBERS
// ============================================================================

/// Peso amount in `es-AR` style: `$ 1.234,56`
pub fn format_money(amount: Decimal) -> String {
    let rounded = round2(amount);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();

    let plain = fixed(rounded.abs(), 2);
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(*digit);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}$ {grouped},{frac_part}")
}

/// Share of total with one decimal: `12.5%`
pub fn format_percent(percent: Decimal) -> String {
    format!("{}%", fixed(percent, 1))
}

/// Round half away from zero and pad to exactly `dp` decimals
fn fixed(value: Decimal, dp: u32) -> String {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    rounded.to_string()
}

/// Quantity without trailing zeros: `2.50` → `2.5`
pub fn format_quantity(cantidad: Decimal) -> String {
    cantidad.normalize().to_string()
}

// ============================================================================
// FILENAMES
// ============================================================================

/// Trim, collapse whitespace runs to `_`, and drop anything outside
/// `[A-Za-z0-9_-]`.
pub fn sanitize_filename(name: &str) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join("_");
    let sanitized: String = collapsed
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();

    if sanitized.is_empty() {
        DEFAULT_FILENAME.to_string()
    } else {
        sanitized
    }
}

/// `<sanitized name>_<yyyy-mm-dd>`, without extension
pub fn report_filename(project_name: &str, date: NaiveDate) -> String {
    format!("{}_{}", sanitize_filename(project_name), date.format("%Y-%m-%d"))
}

// ============================================================================
// REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub material: String,
    pub categoria: String,
    pub precio_unitario: String,
    pub cantidad: String,
    pub subtotal: String,
    pub porcentaje: String,
}

/// Everything a printable budget shows, already formatted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub filename: String,
    pub proyecto: String,
    pub cliente: String,
    pub descripcion: Option<String>,
    pub fecha: String,
    pub superficie: String,
    pub rows: Vec<ReportRow>,
    pub total: String,
}

impl Report {
    /// Build the report for `snapshot`, with the filename dated `today`
    pub fn from_snapshot(snapshot: &BudgetSnapshot, today: NaiveDate) -> Self {
        let project = &snapshot.project;

        let rows = snapshot
            .rows
            .iter()
            .map(|row| ReportRow {
                material: row.material.nombre.clone(),
                categoria: row.material.categoria.clone(),
                precio_unitario: format_money(row.material.precio),
                cantidad: format_quantity(row.cantidad),
                subtotal: format_money(row.subtotal),
                porcentaje: format_percent(row.porcentaje),
            })
            .collect();

        Report {
            filename: report_filename(&project.nombre, today),
            proyecto: project.nombre.clone(),
            cliente: project.cliente.clone(),
            descripcion: project.descripcion.clone(),
            fecha: project.fecha_text(),
            superficie: format!("{} m²", fixed(snapshot.superficie, 2)),
            rows,
            total: format_money(snapshot.total),
        }
    }

    /// Plain-text rendering for terminals
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Presupuesto: {}", self.proyecto);
        let _ = writeln!(out, "Cliente:     {}", self.cliente);
        if let Some(descripcion) = &self.descripcion {
            let _ = writeln!(out, "Descripción: {}", descripcion);
        }
        let _ = writeln!(out, "Fecha:       {}", self.fecha);
        let _ = writeln!(out, "Superficie:  {}", self.superficie);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:<28} {:<16} {:>14} {:>9} {:>16} {:>7}",
            "Material", "Categoría", "Precio", "Cantidad", "Subtotal", "%"
        );
        let _ = writeln!(out, "{}", "─".repeat(95));
        for row in &self.rows {
            let _ = writeln!(
                out,
                "{:<28} {:<16} {:>14} {:>9} {:>16} {:>7}",
                truncate(&row.material, 28),
                truncate(&row.categoria, 16),
                row.precio_unitario,
                row.cantidad,
                row.subtotal,
                row.porcentaje
            );
        }
        let _ = writeln!(out, "{}", "─".repeat(95));
        let _ = writeln!(out, "{:>95}", format!("Total: {}", self.total));
        out
    }

    /// Standalone printable HTML page (A4)
    pub fn render_html(&self) -> String {
        let mut rows = String::new();
        for row in &self.rows {
            let _ = writeln!(
                rows,
                "      <tr><td>{}</td><td><span class=\"badge\">{}</span></td><td class=\"num\">{}</td><td class=\"center\">{}</td><td class=\"num\"><strong>{}</strong></td><td class=\"center\">{}</td></tr>",
                escape_html(&row.material),
                escape_html(&row.categoria),
                row.precio_unitario,
                row.cantidad,
                row.subtotal,
                row.porcentaje
            );
        }

        let descripcion = self
            .descripcion
            .as_deref()
            .map(|d| format!("    <p><strong>Descripción:</strong> {}</p>\n", escape_html(d)))
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html lang="es">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <style>
    @page {{ size: A4; margin: 15mm; }}
    body {{ font-family: sans-serif; font-size: 11pt; color: #222; }}
    table {{ width: 100%; border-collapse: collapse; margin-top: 12px; }}
    th, td {{ border-bottom: 1px solid #ddd; padding: 6px; text-align: left; }}
    .num {{ text-align: right; }}
    .center {{ text-align: center; }}
    .badge {{ background: #eee; border-radius: 3px; padding: 1px 6px; }}
    .total {{ text-align: right; font-size: 14pt; margin-top: 12px; }}
  </style>
</head>
<body>
  <header>
    <h1>Presupuesto: {proyecto}</h1>
    <p><strong>Cliente:</strong> {cliente}</p>
{descripcion}    <p><strong>Fecha:</strong> {fecha} &middot; <strong>Superficie:</strong> {superficie}</p>
  </header>
  <table>
    <thead>
      <tr><th>Material</th><th>Categoría</th><th class="num">Precio unitario</th><th class="center">Cantidad</th><th class="num">Subtotal</th><th class="center">%</th></tr>
    </thead>
    <tbody>
{rows}    </tbody>
  </table>
  <p class="total">Total: <strong>{total}</strong></p>
</body>
</html>
"#,
            title = escape_html(&self.filename),
            proyecto = escape_html(&self.proyecto),
            cliente = escape_html(&self.cliente),
            descripcion = descripcion,
            fecha = self.fecha,
            superficie = self.superficie,
            rows = rows,
            total = self.total,
        )
    }
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::compute_totals;
    use crate::models::{LineItem, Material, Project, ProjectFields};
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
    }

    fn snapshot() -> BudgetSnapshot {
        let mut project = Project::new(
            1,
            ProjectFields {
                nombre: "Casa   Pérez #2".to_string(),
                cliente: "Juan <Pérez>".to_string(),
                descripcion: Some("Quincho".to_string()),
                ancho: dec!(3.5),
                largo: dec!(4.2),
            },
        );
        project.fecha = today();
        let catalog = vec![
            Material::new(1, "Cemento", "Obra gruesa", dec!(1500)),
            Material::new(2, "Arena", "Obra gruesa", dec!(500)),
        ];
        let items = vec![LineItem::new(1, 1, dec!(3)), LineItem::new(1, 2, dec!(1.5))];
        compute_totals(&project, &items, &catalog).unwrap()
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(dec!(0)), "$ 0,00");
        assert_eq!(format_money(dec!(5.5)), "$ 5,50");
        assert_eq!(format_money(dec!(999.999)), "$ 1.000,00");
        assert_eq!(format_money(dec!(1234.56)), "$ 1.234,56");
        assert_eq!(format_money(dec!(1234567.891)), "$ 1.234.567,89");
        assert_eq!(format_money(dec!(-250)), "-$ 250,00");
        assert_eq!(format_money(dec!(-0.001)), "$ 0,00");
    }

    #[test]
    fn test_format_percent_and_quantity() {
        assert_eq!(format_percent(dec!(12.345)), "12.3%");
        assert_eq!(format_percent(dec!(0)), "0.0%");
        assert_eq!(format_quantity(dec!(2.50)), "2.5");
        assert_eq!(format_quantity(dec!(10)), "10");
    }

    #[test]
    fn test_sanitize_filename() {
        let sanitized = sanitize_filename("Casa   Pérez #2");
        assert_eq!(sanitized, "Casa_Prez_2");
        assert!(sanitized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));

        assert_eq!(sanitize_filename("  obra\tnueva\n "), "obra_nueva");
        assert_eq!(sanitize_filename("local-3 (PB)"), "local-3_PB");
        assert_eq!(sanitize_filename("###"), DEFAULT_FILENAME);
        assert_eq!(sanitize_filename(""), DEFAULT_FILENAME);
    }

    #[test]
    fn test_report_filename_has_date_suffix() {
        assert_eq!(report_filename("Casa   Pérez #2", today()), "Casa_Prez_2_2024-05-17");
    }

    #[test]
    fn test_report_from_snapshot() {
        let report = Report::from_snapshot(&snapshot(), today());

        assert_eq!(report.filename, "Casa_Prez_2_2024-05-17");
        assert_eq!(report.fecha, "17/05/2024");
        assert_eq!(report.superficie, "14.70 m²");
        assert_eq!(report.total, "$ 5.250,00");
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].subtotal, "$ 4.500,00");
        assert_eq!(report.rows[0].porcentaje, "85.7%");
        assert_eq!(report.rows[1].cantidad, "1.5");
    }

    #[test]
    fn test_render_html_escapes_text() {
        let html = Report::from_snapshot(&snapshot(), today()).render_html();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("Juan &lt;Pérez&gt;"));
        assert!(html.contains("$ 5.250,00"));
        assert!(html.contains("Quincho"));
        assert!(!html.contains("<Pérez>"));
    }

    #[test]
    fn test_render_text_lists_rows_and_total() {
        let text = Report::from_snapshot(&snapshot(), today()).render_text();

        assert!(text.contains("Cemento"));
        assert!(text.contains("Arena"));
        assert!(text.contains("Total: $ 5.250,00"));
    }
}
