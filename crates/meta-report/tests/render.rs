//! Layout and renderer tests over real analysis results.

use std::path::PathBuf;

use meta_ingest::InputProvenance;
use meta_model::{AnalysisOptions, MetaAnalysis, StudyRecord};
use meta_report::{
    AnalysisReport, DisplayColumn, ForestLayout, OVERALL_LABEL, PlotOptions, RowKind,
    render_svg, render_text_plot, write_json_report, write_svg,
};
use meta_stats::{Stratification, run_analysis};

fn study(label: &str, group: &str, values: [f64; 6]) -> StudyRecord {
    let [n_t, m_t, sd_t, n_c, m_c, sd_c] = values;
    StudyRecord {
        study_label: label.to_string(),
        n_treatment: n_t as u32,
        mean_treatment: m_t,
        sd_treatment: sd_t,
        n_control: n_c as u32,
        mean_control: m_c,
        sd_control: sd_c,
        subgroup_label: Some(group.to_string()),
        row: 0,
    }
}

fn records() -> Vec<StudyRecord> {
    vec![
        study("Adams 2011", "Short", [40.0, 14.2, 4.1, 38.0, 12.0, 4.4]),
        study("Baker 2013", "Short", [55.0, 13.1, 3.8, 57.0, 12.9, 3.6]),
        study("Chen 2015", "Long", [120.0, 18.4, 5.2, 118.0, 12.2, 5.0]),
        study("Diaz 2017", "Long", [64.0, 16.0, 4.9, 66.0, 13.1, 4.7]),
        study("Evans 2019", "Short", [30.0, 11.0, 3.9, 31.0, 11.6, 4.2]),
        study("Fox 2020", "Long", [88.0, 17.5, 5.5, 90.0, 12.4, 5.1]),
        study("Gray 2021", "Very long", [45.0, 15.0, 4.0, 44.0, 12.5, 4.1]),
    ]
}

fn analysis(stratification: Stratification) -> MetaAnalysis {
    run_analysis(&records(), &AnalysisOptions::default(), stratification).unwrap()
}

#[test]
fn layout_without_subgroups_lists_studies_then_overall() {
    let analysis = analysis(Stratification::None);
    let layout = ForestLayout::build(&analysis, &records(), &PlotOptions::default());

    assert_eq!(layout.study_rows().count(), 7);
    assert_eq!(layout.diamonds().count(), 1);
    let last = layout.rows.last().unwrap();
    assert_eq!(last.kind, RowKind::Overall);
    assert_eq!(last.cells[0], OVERALL_LABEL);
    assert_eq!(last.cells[1], "442");
    assert_eq!(last.cells.last().unwrap(), "100.0%");
    assert_eq!(layout.headers.len(), DisplayColumn::DEFAULT.len());
    assert_eq!(layout.headers[7], "MD [95% CI]");

    let first = &layout.rows[0];
    assert_eq!(first.cells[0], "Adams 2011");
    assert_eq!(first.cells[1], "40");
    assert_eq!(first.cells[2], "14.20");

    for row in &layout.rows {
        if let Some(ci) = row.interval {
            assert!(layout.axis.min <= ci.lower && ci.upper <= layout.axis.max);
        }
    }
    assert!(layout.axis.min <= 0.0 && 0.0 <= layout.axis.max);
}

#[test]
fn layout_with_subgroups_marks_insufficient_data() {
    let analysis = analysis(Stratification::BySubgroup);
    let layout = ForestLayout::build(&analysis, &records(), &PlotOptions::default());

    let headings: Vec<&str> = layout
        .rows
        .iter()
        .filter(|row| row.kind == RowKind::Heading)
        .map(|row| row.cells[0].as_str())
        .collect();
    assert_eq!(headings, vec!["Short", "Long", "Very long"]);
    assert_eq!(layout.study_rows().count(), 7);
    // Two pooled subgroups plus the overall estimate.
    assert_eq!(layout.diamonds().count(), 3);
    assert!(layout.rows.iter().any(|row| row.kind == RowKind::Note
        && row.cells[0] == "Insufficient data for a pooled estimate (k = 1)"));
    assert!(
        layout
            .footer
            .iter()
            .any(|line| line.starts_with("Test for subgroup differences: Chi² = "))
    );
}

#[test]
fn footer_respects_toggles() {
    let analysis = analysis(Stratification::BySubgroup);
    let options = PlotOptions {
        print_tau2: false,
        test_overall: false,
        test_subgroup: false,
        ..PlotOptions::default()
    };
    let layout = ForestLayout::build(&analysis, &records(), &options);
    let footer = layout.footer.join("\n");
    assert!(footer.starts_with("Heterogeneity: Chi² = "));
    assert!(!footer.contains("Tau²"));
    assert!(!footer.contains("Test for overall effect"));
    assert!(!footer.contains("Test for subgroup differences"));
}

#[test]
fn custom_columns_and_labels() {
    let analysis = analysis(Stratification::None);
    let options = PlotOptions::new()
        .with_columns(vec![DisplayColumn::Study, DisplayColumn::Effect])
        .with_label(DisplayColumn::Study, "Trial");
    let layout = ForestLayout::build(&analysis, &records(), &options);
    assert_eq!(layout.headers, vec!["Trial", "MD [95% CI]"]);
    assert!(layout.rows.iter().all(|row| row.cells.len() == 2));
}

#[test]
fn svg_contains_markers_and_escaped_title() {
    let analysis = analysis(Stratification::BySubgroup);
    let options = PlotOptions::new().with_title(Some("Exercise & HbA1c".to_string()));
    let layout = ForestLayout::build(&analysis, &records(), &options);
    let svg = render_svg(&layout, &options).unwrap();

    assert!(svg.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(svg.contains("<svg xmlns=\"http://www.w3.org/2000/svg\""));
    assert!(svg.contains("Exercise &amp; HbA1c"));
    assert_eq!(svg.matches("<polygon").count(), 3);
    assert!(svg.contains(&options.colors.overall_diamond));
    assert!(svg.contains(&options.colors.subgroup_diamond));
    assert!(svg.contains("Gray 2021"));
    assert!(svg.trim_end().ends_with("</svg>"));
}

#[test]
fn write_svg_creates_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plots").join("forest.svg");
    let analysis = analysis(Stratification::None);
    let options = PlotOptions::default();
    let layout = ForestLayout::build(&analysis, &records(), &options);
    write_svg(&path, &layout, &options).unwrap();
    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("Random effects model"));
}

#[test]
fn text_plot_draws_rows_and_axis() {
    let analysis = analysis(Stratification::BySubgroup);
    let options = PlotOptions::default();
    let layout = ForestLayout::build(&analysis, &records(), &options);
    let plot = render_text_plot(&layout, 41);

    assert_eq!(plot.lines().filter(|line| line.contains('◆')).count(), 3);
    assert_eq!(plot.lines().filter(|line| line.contains('■')).count(), 7);
    assert!(plot.contains("Mean Difference"));
    assert!(plot.contains("Insufficient data for a pooled estimate (k = 1)"));
    assert!(plot.lines().any(|line| {
        let axis = line.trim();
        axis.starts_with('+') && axis.chars().all(|c| c == '+' || c == '-')
    }));
    assert!(plot.ends_with('\n'));
}

#[test]
fn json_report_includes_provenance() {
    let analysis = analysis(Stratification::BySubgroup);
    let provenance = InputProvenance {
        path: PathBuf::from("trials.csv"),
        sha256: "ab12".to_string(),
        data_rows: 7,
    };
    insta::assert_json_snapshot!(provenance, @r#"
    {
      "path": "trials.csv",
      "sha256": "ab12",
      "data_rows": 7
    }
    "#);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    let report = AnalysisReport::new(&analysis, &provenance);
    write_json_report(&path, &report).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["generator"]["name"], "forest-meta");
    assert_eq!(value["input"]["sha256"], "ab12");
    assert_eq!(value["analysis"]["overall"]["study_count"], 7);
    assert_eq!(value["analysis"]["subgroups"][2]["outcome"]["status"], "insufficient_subgroup_data");
    let warnings = value["analysis"]["warnings"].as_array().unwrap();
    assert!(warnings.iter().any(|w| w["kind"] == "insufficient_subgroup_data"));
    assert!(value["generated_at"].as_str().unwrap().ends_with('Z'));
}
