//! Page feature grouping: positioned items into document blocks.
//!
//! The heuristics are tunable through [`LayoutConfig`] so regressions can
//! be dialed in without forking the interpreter: row clustering tolerance,
//! grid-line clustering tolerance, underline/strikethrough gap factors and
//! the column-gap multiplier.

use crate::ast::{
    Block, ColorValue, ImageBlock, ImageData, Inline, LineVariant, Paragraph, Table, TableCell,
    TableRow, Text, TextProperties,
};
use crate::pdf::content::{ImageItem, LineItem, PageContent, TextItem};
use std::collections::HashMap;

/// Tunable thresholds for page layout reconstruction.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    /// Items within this vertical distance share a row (or half the font
    /// size, whichever is larger)
    pub row_y_tolerance: f32,
    /// Grid lines within this distance collapse into one boundary
    pub line_cluster_tolerance: f32,
    /// An underline sits within `factor · fontSize` below the baseline
    pub underline_gap_factor: f32,
    /// A strikethrough sits near `factor · fontSize` above the baseline
    pub strike_gap_factor: f32,
    /// A gap wider than `factor · fontSize` splits a row into columns
    pub column_gap_factor: f32,
    /// Minimum horizontal and vertical lines for a detected grid
    pub min_grid_lines: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            row_y_tolerance: 10.0,
            line_cluster_tolerance: 2.0,
            underline_gap_factor: 0.5,
            strike_gap_factor: 0.3,
            column_gap_factor: 2.0,
            min_grid_lines: 2,
        }
    }
}

/// Text decoration inferred from nearby graphic lines.
#[derive(Debug, Default, Clone, Copy)]
struct Decoration {
    underline: bool,
    strike: bool,
}

/// Convert one interpreted page into blocks.
pub fn page_to_blocks(
    content: &PageContent,
    images: &HashMap<String, ImageData>,
    config: &LayoutConfig,
) -> Vec<Block> {
    let decorations = detect_decorations(&content.text, &content.lines, config);

    // Sort top-to-bottom (PDF Y grows upward), then left-to-right.
    let mut order: Vec<usize> = (0..content.text.len()).collect();
    order.sort_by(|&a, &b| {
        let (ta, tb) = (&content.text[a], &content.text[b]);
        tb.y.partial_cmp(&ta.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(ta.x.partial_cmp(&tb.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    // Group into visual rows.
    let mut rows: Vec<Vec<usize>> = Vec::new();
    for index in order {
        let item = &content.text[index];
        let tolerance = config.row_y_tolerance.max(item.font_size / 2.0);
        match rows.last_mut() {
            Some(row) if (content.text[row[0]].y - item.y).abs() <= tolerance => row.push(index),
            _ => rows.push(vec![index]),
        }
    }

    let mut blocks: Vec<Block> = Vec::new();

    // A ruled grid turns the overlapping rows into one table.
    if let Some(table) = detect_grid_table(content, config, &decorations) {
        let (table, covered) = table;
        blocks.push(Block::Table(table));
        // Emit the remaining rows (outside the grid) as paragraphs
        for row in &rows {
            if row.iter().all(|i| !covered.contains(i)) {
                blocks.push(row_block(content, row, &decorations, config));
            }
        }
    } else {
        // Column heuristic: consecutive rows agreeing on a column count
        let mut i = 0;
        while i < rows.len() {
            let columns = split_columns(content, &rows[i], config);
            if columns.len() >= 2 {
                let mut run = vec![columns];
                let mut j = i + 1;
                while j < rows.len() {
                    let next = split_columns(content, &rows[j], config);
                    if next.len() == run[0].len() {
                        run.push(next);
                        j += 1;
                    } else {
                        break;
                    }
                }
                if run.len() >= 2 {
                    blocks.push(Block::Table(columns_to_table(content, &run, &decorations)));
                    i = j;
                    continue;
                }
            }
            blocks.push(row_block(content, &rows[i], &decorations, config));
            i += 1;
        }
    }

    // Image placements, merged in by vertical position.
    let mut image_blocks: Vec<(f32, Block)> = content
        .images
        .iter()
        .filter_map(|item| image_block(item, images).map(|b| (item.y, b)))
        .collect();
    image_blocks.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    for (_, block) in image_blocks {
        blocks.push(block);
    }

    blocks
}

/// Underline/strikethrough detection: a short horizontal line overlapping
/// a run horizontally, just below the baseline (underline) or a little
/// above it (strikethrough).
fn detect_decorations(
    text: &[TextItem],
    lines: &[LineItem],
    config: &LayoutConfig,
) -> Vec<Decoration> {
    let mut decorations = vec![Decoration::default(); text.len()];
    for line in lines.iter().filter(|l| l.is_horizontal()) {
        let (lx0, lx1) = (line.x0.min(line.x1), line.x0.max(line.x1));
        for (item, decoration) in text.iter().zip(decorations.iter_mut()) {
            let overlaps = lx0 <= item.x + item.width && lx1 >= item.x;
            if !overlaps {
                continue;
            }
            let dy = item.y - line.y0; // positive: line below baseline
            if dy > 0.0 && dy <= item.font_size * config.underline_gap_factor {
                decoration.underline = true;
            }
            let above = line.y0 - item.y;
            if above > 0.0 && (above - item.font_size * config.strike_gap_factor).abs()
                <= item.font_size * 0.15
            {
                decoration.strike = true;
            }
        }
    }
    decorations
}

/// Cluster sorted scalar values within a tolerance, returning the centers.
fn cluster(mut values: Vec<f32>, tolerance: f32) -> Vec<f32> {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mut centers: Vec<f32> = Vec::new();
    let mut group: Vec<f32> = Vec::new();
    for v in values {
        match group.last() {
            Some(&last) if (v - last).abs() <= tolerance => group.push(v),
            _ => {
                if !group.is_empty() {
                    centers.push(group.iter().sum::<f32>() / group.len() as f32);
                }
                group = vec![v];
            },
        }
    }
    if !group.is_empty() {
        centers.push(group.iter().sum::<f32>() / group.len() as f32);
    }
    centers
}

/// Detect a ruled table: enough clustered horizontal and vertical lines
/// forming a grid; text lands in whichever cell contains its baseline.
fn detect_grid_table(
    content: &PageContent,
    config: &LayoutConfig,
    decorations: &[Decoration],
) -> Option<(Table, Vec<usize>)> {
    let horizontals: Vec<f32> = content
        .lines
        .iter()
        .filter(|l| l.is_horizontal())
        .map(|l| l.y0)
        .collect();
    let verticals: Vec<f32> = content
        .lines
        .iter()
        .filter(|l| l.is_vertical())
        .map(|l| l.x0)
        .collect();
    let y_bounds = cluster(horizontals, config.line_cluster_tolerance);
    let x_bounds = cluster(verticals, config.line_cluster_tolerance);
    if y_bounds.len() < config.min_grid_lines + 1 || x_bounds.len() < config.min_grid_lines + 1 {
        return None;
    }

    let row_count = y_bounds.len() - 1;
    let col_count = x_bounds.len() - 1;
    let mut cells: Vec<Vec<Vec<usize>>> = vec![vec![Vec::new(); col_count]; row_count];
    let mut covered = Vec::new();

    for (index, item) in content.text.iter().enumerate() {
        let col = x_bounds.windows(2).position(|w| item.x >= w[0] && item.x < w[1]);
        // y_bounds ascend; table rows read top-down
        let band = y_bounds.windows(2).position(|w| item.y >= w[0] && item.y < w[1]);
        if let (Some(col), Some(band)) = (col, band) {
            let row = row_count - 1 - band;
            cells[row][col].push(index);
            covered.push(index);
        }
    }

    if covered.is_empty() {
        return None;
    }

    let rows = cells
        .into_iter()
        .map(|row| {
            TableRow::new(
                row.into_iter()
                    .map(|indices| {
                        let paragraph = indices_to_paragraph(content, &indices, decorations);
                        TableCell::new(vec![Block::Paragraph(paragraph)])
                    })
                    .collect(),
            )
        })
        .collect();

    let mut table = Table::new(rows);
    table.borders = crate::ast::TableBorders::grid(4, "000000");
    Some((table, covered))
}

/// Split a row's items into columns at significant gaps
/// (`> column_gap_factor · previous item's font size`).
fn split_columns(content: &PageContent, row: &[usize], config: &LayoutConfig) -> Vec<Vec<usize>> {
    let mut sorted: Vec<usize> = row.to_vec();
    sorted.sort_by(|&a, &b| {
        content.text[a]
            .x
            .partial_cmp(&content.text[b].x)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut columns: Vec<Vec<usize>> = Vec::new();
    for index in sorted {
        let item = &content.text[index];
        match columns.last_mut() {
            Some(column) => {
                let previous = &content.text[*column.last().unwrap()];
                let gap = item.x - (previous.x + previous.width);
                if gap > config.column_gap_factor * previous.font_size.max(1.0) {
                    columns.push(vec![index]);
                } else {
                    column.push(index);
                }
            },
            None => columns.push(vec![index]),
        }
    }
    columns
}

fn columns_to_table(
    content: &PageContent,
    rows: &[Vec<Vec<usize>>],
    decorations: &[Decoration],
) -> Table {
    let table_rows = rows
        .iter()
        .map(|columns| {
            TableRow::new(
                columns
                    .iter()
                    .map(|indices| {
                        let paragraph = indices_to_paragraph(content, indices, decorations);
                        TableCell::new(vec![Block::Paragraph(paragraph)])
                    })
                    .collect(),
            )
        })
        .collect();
    Table::new(table_rows)
}

fn row_block(
    content: &PageContent,
    row: &[usize],
    decorations: &[Decoration],
    _config: &LayoutConfig,
) -> Block {
    Block::Paragraph(indices_to_paragraph(content, row, decorations))
}

/// Merge a set of items into one paragraph, inserting spaces at gaps.
fn indices_to_paragraph(
    content: &PageContent,
    indices: &[usize],
    decorations: &[Decoration],
) -> Paragraph {
    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_by(|&a, &b| {
        content.text[a]
            .x
            .partial_cmp(&content.text[b].x)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut inlines: Vec<Inline> = Vec::new();
    let mut previous_end: Option<f32> = None;
    for index in sorted {
        let item = &content.text[index];
        let mut text = item.text.clone();
        // A gap of more than a third of the font size reads as a space
        if let Some(end) = previous_end {
            if item.x - end > item.font_size * 0.3 && !text.starts_with(' ') {
                text.insert(0, ' ');
            }
        }
        previous_end = Some(item.x + item.width);
        let decoration = decorations.get(index).copied().unwrap_or_default();
        inlines.push(Inline::Text(Text {
            content: text,
            props: item_properties(item, decoration),
            href: None,
        }));
    }
    Paragraph::new(inlines)
}

/// Map an extracted item's visual attributes onto run properties.
fn item_properties(item: &TextItem, decoration: Decoration) -> TextProperties {
    let mut props = TextProperties::default();
    // Half-points
    props.size = Some((item.font_size * 2.0).round() as u32);
    let (r, g, b) = item.fill;
    if (r, g, b) != (0.0, 0.0, 0.0) {
        props.color = Some(ColorValue::Hex(format!(
            "{:02X}{:02X}{:02X}",
            (r * 255.0).round() as u8,
            (g * 255.0).round() as u8,
            (b * 255.0).round() as u8
        )));
    }
    let name = item.font_name.to_ascii_lowercase();
    if name.contains("bold") {
        props.bold = Some(true);
    }
    if name.contains("italic") || name.contains("oblique") {
        props.italic = Some(true);
    }
    if decoration.underline {
        props.underline = Some(LineVariant::Single);
    }
    if decoration.strike {
        props.strike = Some(LineVariant::Single);
    }
    props
}

fn image_block(item: &ImageItem, images: &HashMap<String, ImageData>) -> Option<Block> {
    let data = images.get(&item.name)?.clone();
    Some(Block::Image(ImageBlock { data, alt: None }))
}
