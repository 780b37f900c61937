use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use meta_cli::pipeline::AnalyzeOutcome;
use meta_model::AnalysisWarning;
use meta_report::{ForestLayout, ForestRow, RowKind};

pub fn print_summary(outcome: &AnalyzeOutcome) {
    let analysis = &outcome.analysis;
    let options = &analysis.options;
    let provenance = &outcome.loaded.provenance;
    println!(
        "Input: {} ({} rows, {} studies analysed)",
        provenance.path.display(),
        provenance.data_rows,
        analysis.study_count()
    );
    println!(
        "Model: {}, {} tau², {}",
        options.effect_measure.label(),
        options.tau_estimator.abbreviation(),
        if analysis.overall.hartung_knapp {
            "Hartung-Knapp adjustment"
        } else {
            "normal intervals"
        }
    );
    println!("{}", forest_table(&outcome.layout));
    for line in &outcome.layout.footer {
        println!("{line}");
    }
    print_warning_table(&analysis.warnings);
    if let Some(plot) = &outcome.text_plot {
        println!();
        print!("{plot}");
    }
    if let Some(path) = &outcome.svg {
        println!("SVG: {}", path.display());
    }
    if let Some(path) = &outcome.json {
        println!("JSON: {}", path.display());
    }
}

/// Tabular form of the forest layout: studies, subgroup and overall rows.
pub fn forest_table(layout: &ForestLayout) -> Table {
    let mut table = Table::new();
    table.set_header(
        layout
            .headers
            .iter()
            .map(|header| header_cell(header))
            .collect::<Vec<_>>(),
    );
    apply_summary_table_style(&mut table);
    for (index, column) in layout.columns.iter().enumerate() {
        if column.is_numeric() {
            align_column(&mut table, index, CellAlignment::Right);
        }
    }
    for row in &layout.rows {
        table.add_row(row_cells(row));
    }
    table
}

fn row_cells(row: &ForestRow) -> Vec<Cell> {
    match row.kind {
        RowKind::Heading => spanning(row, |text| {
            Cell::new(text)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold)
        }),
        RowKind::Note => spanning(row, |text| dim_cell(text)),
        RowKind::Study => row.cells.iter().map(Cell::new).collect(),
        RowKind::SubgroupPooled => row
            .cells
            .iter()
            .map(|cell| Cell::new(cell).add_attribute(Attribute::Bold))
            .collect(),
        RowKind::Overall => row
            .cells
            .iter()
            .map(|cell| {
                Cell::new(cell)
                    .fg(Color::Cyan)
                    .add_attribute(Attribute::Bold)
            })
            .collect(),
        RowKind::Prediction => row.cells.iter().map(dim_cell).collect(),
    }
}

fn spanning(row: &ForestRow, first: impl Fn(&str) -> Cell) -> Vec<Cell> {
    let mut cells = vec![first(row.spanning_text().unwrap_or_default())];
    cells.extend(row.cells.iter().skip(1).map(|_| Cell::new("")));
    cells
}

fn print_warning_table(warnings: &[AnalysisWarning]) {
    if warnings.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Warning"),
        header_cell("Study"),
        header_cell("Detail"),
    ]);
    apply_table_style(&mut table);
    for warning in warnings {
        table.add_row(vec![
            Cell::new(warning.code()).fg(Color::Yellow),
            match warning.study() {
                Some(study) => Cell::new(study),
                None => dim_cell("-"),
            },
            Cell::new(warning.to_string()),
        ]);
    }
    println!();
    println!("Warnings:");
    println!("{table}");
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(160);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

pub fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
