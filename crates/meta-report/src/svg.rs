//! Standalone SVG forest plot.

use std::io::Write;
use std::path::Path;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::debug;

use crate::error::Result;
use crate::write::write_document;
use crate::forest::{DiamondKind, ForestLayout, ForestRow, Marker, RowKind};
use crate::options::PlotOptions;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const FONT_FAMILY: &str = "Helvetica, Arial, sans-serif";
const FONT_SIZE: f64 = 12.0;
const CHAR_WIDTH: f64 = 7.0;
const ROW_HEIGHT: f64 = 22.0;
const MARGIN: f64 = 20.0;
const COLUMN_PADDING: f64 = 14.0;
const MAX_SQUARE: f64 = 14.0;
const MIN_SQUARE: f64 = 4.0;
const DIAMOND_HALF_HEIGHT: f64 = 6.0;

fn px(value: f64) -> String {
    format!("{value:.1}")
}

struct Geometry {
    column_x: Vec<f64>,
    column_width: Vec<f64>,
    plot_left: f64,
    plot_width: f64,
    header_y: f64,
    first_row_y: f64,
    axis_y: f64,
    width: f64,
    height: f64,
}

impl Geometry {
    fn new(layout: &ForestLayout, options: &PlotOptions) -> Self {
        let mut column_width: Vec<f64> = layout
            .headers
            .iter()
            .map(|header| header.chars().count() as f64)
            .collect();
        for row in layout.rows.iter().filter(|row| row.spanning_text().is_none()) {
            for (width, cell) in column_width.iter_mut().zip(&row.cells) {
                *width = width.max(cell.chars().count() as f64);
            }
        }
        let column_width: Vec<f64> = column_width
            .into_iter()
            .map(|chars| chars * CHAR_WIDTH + COLUMN_PADDING)
            .collect();
        let mut column_x = Vec::with_capacity(column_width.len());
        let mut x = MARGIN;
        for width in &column_width {
            column_x.push(x);
            x += width;
        }
        let plot_left = x + MARGIN;
        let plot_width = options.svg_plot_width.max(80.0);

        let header_y = MARGIN + if layout.title.is_some() { 28.0 } else { 0.0 } + FONT_SIZE;
        let first_row_y = header_y + ROW_HEIGHT;
        let axis_y = first_row_y + layout.rows.len() as f64 * ROW_HEIGHT;
        let footer_lines = layout.footer.len() as f64;
        let height = axis_y + 48.0 + footer_lines * (FONT_SIZE + 6.0) + MARGIN;

        let longest_footer = layout
            .footer
            .iter()
            .chain(layout.title.iter())
            .map(|line| line.chars().count() as f64 * CHAR_WIDTH)
            .fold(0.0, f64::max);
        let width = (plot_left + plot_width + MARGIN).max(MARGIN * 2.0 + longest_footer);

        Self {
            column_x,
            column_width,
            plot_left,
            plot_width,
            header_y,
            first_row_y,
            axis_y,
            width,
            height,
        }
    }

    fn x_of(&self, layout: &ForestLayout, value: f64) -> f64 {
        self.plot_left + layout.axis.fraction(value) * self.plot_width
    }

    fn row_center(&self, index: usize) -> f64 {
        self.first_row_y + index as f64 * ROW_HEIGHT + ROW_HEIGHT / 2.0
    }
}

struct SvgWriter<'a, W: Write> {
    xml: Writer<W>,
    options: &'a PlotOptions,
}

impl<W: Write> SvgWriter<'_, W> {
    fn text(&mut self, x: f64, y: f64, content: &str, anchor: &str, style: TextStyle) -> Result<()> {
        let mut element = BytesStart::new("text");
        element.push_attribute(("x", px(x).as_str()));
        element.push_attribute(("y", px(y).as_str()));
        element.push_attribute(("text-anchor", anchor));
        element.push_attribute(("fill", self.options.colors.text.as_str()));
        match style {
            TextStyle::Normal => {}
            TextStyle::Bold => element.push_attribute(("font-weight", "bold")),
            TextStyle::Italic => element.push_attribute(("font-style", "italic")),
            TextStyle::Title => {
                element.push_attribute(("font-weight", "bold"));
                element.push_attribute(("font-size", "16"));
            }
        }
        self.xml.write_event(Event::Start(element))?;
        self.xml.write_event(Event::Text(BytesText::new(content)))?;
        self.xml.write_event(Event::End(BytesEnd::new("text")))?;
        Ok(())
    }

    fn line(&mut self, from: (f64, f64), to: (f64, f64), stroke: &str, dashed: bool) -> Result<()> {
        let mut element = BytesStart::new("line");
        element.push_attribute(("x1", px(from.0).as_str()));
        element.push_attribute(("y1", px(from.1).as_str()));
        element.push_attribute(("x2", px(to.0).as_str()));
        element.push_attribute(("y2", px(to.1).as_str()));
        element.push_attribute(("stroke", stroke));
        element.push_attribute(("stroke-width", "1"));
        if dashed {
            element.push_attribute(("stroke-dasharray", "4 3"));
        }
        self.xml.write_event(Event::Empty(element))?;
        Ok(())
    }

    fn square(&mut self, cx: f64, cy: f64, side: f64) -> Result<()> {
        let mut element = BytesStart::new("rect");
        element.push_attribute(("x", px(cx - side / 2.0).as_str()));
        element.push_attribute(("y", px(cy - side / 2.0).as_str()));
        element.push_attribute(("width", px(side).as_str()));
        element.push_attribute(("height", px(side).as_str()));
        element.push_attribute(("fill", self.options.colors.study_square.as_str()));
        self.xml.write_event(Event::Empty(element))?;
        Ok(())
    }

    fn diamond(&mut self, lower: f64, estimate: f64, upper: f64, cy: f64, fill: &str) -> Result<()> {
        let points = format!(
            "{},{} {},{} {},{} {},{}",
            px(lower),
            px(cy),
            px(estimate),
            px(cy - DIAMOND_HALF_HEIGHT),
            px(upper),
            px(cy),
            px(estimate),
            px(cy + DIAMOND_HALF_HEIGHT)
        );
        let mut element = BytesStart::new("polygon");
        element.push_attribute(("points", points.as_str()));
        element.push_attribute(("fill", fill));
        element.push_attribute(("stroke", fill));
        self.xml.write_event(Event::Empty(element))?;
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum TextStyle {
    Normal,
    Bold,
    Italic,
    Title,
}

fn write_row<W: Write>(
    svg: &mut SvgWriter<'_, W>,
    layout: &ForestLayout,
    geometry: &Geometry,
    row: &ForestRow,
    index: usize,
) -> Result<()> {
    let options = svg.options;
    let cy = geometry.row_center(index);
    let baseline = cy + FONT_SIZE / 3.0;

    if let Some(text) = row.spanning_text() {
        let style = if row.kind == RowKind::Heading {
            TextStyle::Bold
        } else {
            TextStyle::Italic
        };
        return svg.text(geometry.column_x[0], baseline, text, "start", style);
    }

    let style = match row.kind {
        RowKind::Overall | RowKind::SubgroupPooled => TextStyle::Bold,
        _ => TextStyle::Normal,
    };
    for (i, cell) in row.cells.iter().enumerate() {
        if cell.is_empty() {
            continue;
        }
        let numeric = layout.columns.get(i).is_some_and(|column| column.is_numeric());
        let (x, anchor) = if numeric {
            (
                geometry.column_x[i] + geometry.column_width[i] - COLUMN_PADDING / 2.0,
                "end",
            )
        } else {
            (geometry.column_x[i], "start")
        };
        svg.text(x, baseline, cell, anchor, style)?;
    }

    let Some(ci) = row.interval else {
        return Ok(());
    };
    let lower = geometry.x_of(layout, ci.lower);
    let upper = geometry.x_of(layout, ci.upper);
    let estimate = geometry.x_of(layout, ci.estimate);
    let colors = &options.colors;
    match row.marker {
        Marker::Square { size } => {
            svg.line((lower, cy), (upper, cy), &colors.ci_line, false)?;
            let side = MIN_SQUARE + (MAX_SQUARE - MIN_SQUARE) * size.clamp(0.0, 1.0);
            svg.square(estimate, cy, side)?;
        }
        Marker::Diamond(kind) => {
            let fill = match kind {
                DiamondKind::Overall => &colors.overall_diamond,
                DiamondKind::Subgroup => &colors.subgroup_diamond,
            };
            svg.diamond(lower, estimate, upper, cy, fill)?;
        }
        Marker::None => {
            let stroke = &colors.overall_diamond;
            svg.line((lower, cy), (upper, cy), stroke, false)?;
            svg.line((lower, cy - 3.0), (lower, cy + 3.0), stroke, false)?;
            svg.line((upper, cy - 3.0), (upper, cy + 3.0), stroke, false)?;
        }
    }
    Ok(())
}

/// Render a forest layout as an SVG document.
pub fn render_svg(layout: &ForestLayout, options: &PlotOptions) -> Result<String> {
    let geometry = Geometry::new(layout, options);
    let mut svg = SvgWriter {
        xml: Writer::new_with_indent(Vec::new(), b' ', 2),
        options,
    };

    svg.xml
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut root = BytesStart::new("svg");
    root.push_attribute(("xmlns", SVG_NS));
    root.push_attribute(("width", px(geometry.width).as_str()));
    root.push_attribute(("height", px(geometry.height).as_str()));
    let view_box = format!("0 0 {} {}", px(geometry.width), px(geometry.height));
    root.push_attribute(("viewBox", view_box.as_str()));
    root.push_attribute(("font-family", FONT_FAMILY));
    root.push_attribute(("font-size", px(FONT_SIZE).as_str()));
    svg.xml.write_event(Event::Start(root))?;

    let mut background = BytesStart::new("rect");
    background.push_attribute(("width", "100%"));
    background.push_attribute(("height", "100%"));
    background.push_attribute(("fill", "#FFFFFF"));
    svg.xml.write_event(Event::Empty(background))?;

    if let Some(title) = &layout.title {
        svg.text(MARGIN, MARGIN + FONT_SIZE, title, "start", TextStyle::Title)?;
    }

    for (i, header) in layout.headers.iter().enumerate() {
        let numeric = layout.columns.get(i).is_some_and(|column| column.is_numeric());
        let (x, anchor) = if numeric {
            (
                geometry.column_x[i] + geometry.column_width[i] - COLUMN_PADDING / 2.0,
                "end",
            )
        } else {
            (geometry.column_x[i], "start")
        };
        svg.text(x, geometry.header_y, header, anchor, TextStyle::Bold)?;
    }
    let rule_y = geometry.header_y + 6.0;
    let text_color = &options.colors.text;
    svg.line(
        (MARGIN, rule_y),
        (geometry.plot_left + geometry.plot_width, rule_y),
        text_color,
        false,
    )?;

    let reference_x = geometry.x_of(layout, layout.reference);
    svg.line(
        (reference_x, geometry.first_row_y),
        (reference_x, geometry.axis_y),
        &options.colors.reference_line,
        true,
    )?;

    for (index, row) in layout.rows.iter().enumerate() {
        write_row(&mut svg, layout, &geometry, row, index)?;
    }

    let axis_y = geometry.axis_y;
    svg.line(
        (geometry.plot_left, axis_y),
        (geometry.plot_left + geometry.plot_width, axis_y),
        text_color,
        false,
    )?;
    for tick in &layout.axis.ticks {
        let x = geometry.x_of(layout, *tick);
        svg.line((x, axis_y), (x, axis_y + 4.0), text_color, false)?;
        let label = layout.axis.tick_label(*tick);
        svg.text(x, axis_y + 16.0, &label, "middle", TextStyle::Normal)?;
    }
    svg.text(
        geometry.plot_left + geometry.plot_width / 2.0,
        axis_y + 32.0,
        &layout.x_label,
        "middle",
        TextStyle::Normal,
    )?;

    let mut footer_y = axis_y + 48.0 + FONT_SIZE;
    for line in &layout.footer {
        svg.text(MARGIN, footer_y, line, "start", TextStyle::Normal)?;
        footer_y += FONT_SIZE + 6.0;
    }

    svg.xml.write_event(Event::End(BytesEnd::new("svg")))?;
    let bytes = svg.xml.into_inner();
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Render and write an SVG forest plot, creating parent directories.
pub fn write_svg(path: &Path, layout: &ForestLayout, options: &PlotOptions) -> Result<()> {
    let document = render_svg(layout, options)?;
    write_document(path, &document)?;
    debug!(path = %path.display(), "wrote SVG forest plot");
    Ok(())
}
