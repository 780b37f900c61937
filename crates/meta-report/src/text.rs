//! Fixed-width forest plot for terminal output.

use crate::forest::{ForestLayout, ForestRow, Marker};

const MIN_PLOT_WIDTH: usize = 11;
const COLUMN_GAP: &str = "  ";

fn column_widths(layout: &ForestLayout) -> Vec<usize> {
    let mut widths: Vec<usize> = layout
        .headers
        .iter()
        .map(|header| header.chars().count())
        .collect();
    for row in layout.rows.iter().filter(|row| row.spanning_text().is_none()) {
        for (width, cell) in widths.iter_mut().zip(&row.cells) {
            *width = (*width).max(cell.chars().count());
        }
    }
    widths
}

fn pad(text: &str, width: usize, right_align: bool) -> String {
    if right_align {
        format!("{text:>width$}")
    } else {
        format!("{text:<width$}")
    }
}

struct PlotArea<'a> {
    layout: &'a ForestLayout,
    width: usize,
}

impl PlotArea<'_> {
    fn column_of(&self, value: f64) -> usize {
        let fraction = self.layout.axis.fraction(value);
        ((fraction * (self.width - 1) as f64).round() as usize).min(self.width - 1)
    }

    fn blank(&self) -> Vec<char> {
        let mut cells = vec![' '; self.width];
        cells[self.column_of(self.layout.reference)] = '|';
        cells
    }

    fn row(&self, row: &ForestRow) -> Vec<char> {
        let mut cells = self.blank();
        let Some(ci) = row.interval else {
            return cells;
        };
        if !(ci.lower.is_finite() && ci.upper.is_finite()) {
            return cells;
        }
        let lower = self.column_of(ci.lower);
        let upper = self.column_of(ci.upper);
        let estimate = self.column_of(ci.estimate);
        let (fill, left, right, centre) = match row.marker {
            Marker::Square { .. } => ('-', '-', '-', '■'),
            Marker::Diamond(_) => ('=', '<', '>', '◆'),
            Marker::None => ('-', '[', ']', '-'),
        };
        for cell in &mut cells[lower..=upper] {
            *cell = fill;
        }
        if upper > lower {
            cells[lower] = left;
            cells[upper] = right;
        }
        cells[estimate] = centre;
        cells
    }

    fn axis(&self) -> (String, String) {
        let mut line = vec!['-'; self.width];
        let mut labels = vec![' '; self.width + 8];
        let mut next_free = 0;
        for tick in &self.layout.axis.ticks {
            let column = self.column_of(*tick);
            line[column] = '+';
            let label: Vec<char> = self.layout.axis.tick_label(*tick).chars().collect();
            let start = column.saturating_sub(label.len() / 2);
            if start < next_free || start + label.len() > labels.len() {
                continue;
            }
            labels[start..start + label.len()].copy_from_slice(&label);
            next_free = start + label.len() + 1;
        }
        (line.into_iter().collect(), labels.into_iter().collect())
    }
}

/// Render a forest layout as fixed-width text.
///
/// `plot_width` is the number of characters used for the interval area.
pub fn render_text_plot(layout: &ForestLayout, plot_width: usize) -> String {
    let widths = column_widths(layout);
    let table_width =
        widths.iter().sum::<usize>() + COLUMN_GAP.len() * widths.len().saturating_sub(1);
    let area = PlotArea {
        layout,
        width: plot_width.max(MIN_PLOT_WIDTH),
    };
    let indent = " ".repeat(table_width + COLUMN_GAP.len());

    let mut lines = Vec::new();
    if let Some(title) = &layout.title {
        lines.push(title.clone());
        lines.push(String::new());
    }

    let table_cells = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .zip(&layout.columns)
            .map(|((cell, width), column)| pad(cell, *width, column.is_numeric()))
            .collect::<Vec<_>>()
            .join(COLUMN_GAP)
    };

    lines.push(table_cells(&layout.headers));
    lines.push("-".repeat(table_width + COLUMN_GAP.len() + area.width));

    for row in &layout.rows {
        let plot: String = area.row(row).into_iter().collect();
        let line = match row.spanning_text() {
            Some(text) if text.chars().count() > table_width => text.to_string(),
            Some(text) => format!("{}{COLUMN_GAP}{plot}", pad(text, table_width, false)),
            None => format!("{}{COLUMN_GAP}{plot}", table_cells(&row.cells)),
        };
        lines.push(line);
    }

    let (axis_line, tick_labels) = area.axis();
    lines.push(format!("{indent}{axis_line}"));
    lines.push(format!("{indent}{tick_labels}"));
    let label_start = area.width.saturating_sub(layout.x_label.chars().count()) / 2;
    lines.push(format!("{indent}{}{}", " ".repeat(label_start), layout.x_label));

    if !layout.footer.is_empty() {
        lines.push(String::new());
        lines.extend(layout.footer.iter().cloned());
    }

    let mut out = lines
        .iter()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");
    out.push('\n');
    out
}
