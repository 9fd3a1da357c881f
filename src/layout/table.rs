use std::collections::HashMap;

use serde_json::json;

use super::{
    BASELINE_CELL_EXTENT_PT, DEFAULT_LINE_HEIGHT_PT, DEFAULT_PAGE_WIDTH_PT,
    DEFAULT_TABLE_BORDER_WIDTH_PT, DEFAULT_TABLE_CELL_PADDING_PT, LayoutContext, LayoutPass,
    TABLE_SPACING_PT, image,
};
use crate::model::{
    BlockElement, BoxContent, CellLayout, Edges, ElementType, LayoutBox, PropertyNode,
    StyleDefinition, StyleMap, Table, TableCell, TableContent, VMerge,
};
use crate::property::{emu_to_points, find_node, local_name};

fn grid_span(cell: &TableCell) -> usize {
    find_node(&cell.properties, "gridSpan")
        .and_then(|n| n.int_attr("val"))
        .filter(|&v| v > 0)
        .map(|v| v as usize)
        .unwrap_or(1)
}

/// `restart` opens a merge; any other value, including none, continues one.
fn vertical_merge(cell: &TableCell) -> Option<VMerge> {
    let node = find_node(&cell.properties, "vMerge")?;
    match node.attr("val") {
        Some(v) if v.eq_ignore_ascii_case("restart") => Some(VMerge::Restart),
        _ => Some(VMerge::Continue),
    }
}

fn column_count(table: &Table) -> usize {
    let spans = table
        .rows
        .iter()
        .map(|row| row.cells.iter().map(grid_span).sum::<usize>())
        .max()
        .unwrap_or(0);
    let count = if spans == 0 {
        table.rows.iter().map(|r| r.cells.len()).max().unwrap_or(0)
    } else {
        spans
    };
    count.max(1)
}

/// Span clamped to the columns left in the row, never below 1.
fn clamped_span(cell: &TableCell, column_index: usize, column_count: usize) -> usize {
    grid_span(cell)
        .min(column_count.saturating_sub(column_index))
        .max(1)
}

/// The table's own property, falling back to its style's `tblPr` block.
fn table_level_node<'a>(
    table: &'a Table,
    style: Option<&'a StyleDefinition>,
    suffix: &str,
) -> Option<&'a PropertyNode> {
    find_node(&table.properties, suffix)
        .or_else(|| style.and_then(|s| find_node(s.block("tblPr"), suffix)))
}

fn edge_mut<'a>(edges: &'a mut Edges, side: &str) -> Option<&'a mut f32> {
    match side {
        "top" => Some(&mut edges.top),
        "bottom" => Some(&mut edges.bottom),
        "left" | "start" => Some(&mut edges.left),
        "right" | "end" => Some(&mut edges.right),
        _ => None,
    }
}

fn apply_margin_node(node: &PropertyNode, padding: &mut Edges) {
    for child in &node.children {
        let Some(edge) = edge_mut(padding, local_name(&child.tag)) else {
            continue;
        };
        if child.attr("type").is_some_and(|t| t.eq_ignore_ascii_case("nil")) {
            *edge = 0.0;
        } else if let Some(w) = child.twips_attr("w") {
            *edge = w;
        }
    }
}

fn apply_border_node(node: &PropertyNode, borders: &mut Edges) {
    for child in &node.children {
        let Some(edge) = edge_mut(borders, local_name(&child.tag)) else {
            continue;
        };
        let style = child.attr("val").unwrap_or("").to_ascii_lowercase();
        if style == "nil" || style == "none" {
            *edge = 0.0;
        } else if let Some(size) = child.float_attr("sz") {
            // eighths of a point
            *edge = size / 8.0;
        }
    }
}

/// Padding and border widths shared by every cell of a table before cell
/// overrides.
#[derive(Clone, Copy, Debug)]
struct CellDefaults {
    padding: Edges,
    borders: Edges,
}

impl CellDefaults {
    fn builtin() -> Self {
        CellDefaults {
            padding: Edges::uniform(DEFAULT_TABLE_CELL_PADDING_PT),
            borders: Edges::uniform(DEFAULT_TABLE_BORDER_WIDTH_PT),
        }
    }

    fn for_table(table: &Table, style: Option<&StyleDefinition>) -> Self {
        let mut defaults = CellDefaults::builtin();
        if let Some(node) = table_level_node(table, style, "tblCellMar") {
            apply_margin_node(node, &mut defaults.padding);
        }
        if let Some(node) = table_level_node(table, style, "tblBorders") {
            apply_border_node(node, &mut defaults.borders);
        }
        defaults
    }

    fn for_cell(&self, cell: &TableCell) -> CellDefaults {
        let mut resolved = *self;
        if let Some(node) = find_node(&cell.properties, "tcMar") {
            apply_margin_node(node, &mut resolved.padding);
        }
        if let Some(node) = find_node(&cell.properties, "tcBorders") {
            apply_border_node(node, &mut resolved.borders);
        }
        resolved
    }

    fn horizontal(&self) -> f32 {
        self.padding.horizontal() + self.borders.horizontal()
    }
}

/// Explicit `tcW` in points; `auto` and unknown width types give `None`.
fn cell_width_constraint(cell: &TableCell, available_width: f32) -> Option<f32> {
    let node = find_node(&cell.properties, "tcW")?;
    let w = node.float_attr("w")?;
    match node.attr("type").unwrap_or("").to_ascii_lowercase().as_str() {
        "dxa" => Some(w / 20.0),
        // fiftieths of a percent
        "pct" => Some(available_width * (w / 5000.0)),
        _ => None,
    }
}

/// `gridCol` widths in points, padded with the last width or truncated to
/// `column_count`.
fn grid_widths(table: &Table, column_count: usize) -> Vec<f32> {
    let Some(grid) = find_node(&table.properties, "tblGrid") else {
        return Vec::new();
    };
    let mut widths: Vec<f32> = grid
        .children
        .iter()
        .filter(|c| c.matches("gridCol"))
        .filter_map(|c| c.twips_attr("w"))
        .collect();
    if let Some(&last) = widths.last() {
        widths.resize(column_count, last);
    }
    widths
}

fn scale_widths(widths: &[f32], target_width: f32) -> Vec<f32> {
    let total: f32 = widths.iter().sum();
    if total <= 0.0 || target_width <= 0.0 {
        return widths.to_vec();
    }
    let scale = target_width / total;
    widths.iter().map(|w| w * scale).collect()
}

/// Final column widths: grid hints scaled to the available width (or the
/// minimum widths), never below a column's minimum, with slack distributed or
/// excess taken from the flexible part.
fn resolve_column_widths(grid: &[f32], available_width: f32, min_widths: &[f32]) -> Vec<f32> {
    let mut widths = if grid.is_empty() {
        min_widths.to_vec()
    } else {
        scale_widths(grid, available_width)
    };
    for (width, &min) in widths.iter_mut().zip(min_widths) {
        *width = width.max(min);
    }

    let total: f32 = widths.iter().sum();
    if total < available_width {
        let leftover = available_width - total;
        let weights: Vec<f32> = if grid.is_empty() {
            min_widths.to_vec()
        } else {
            grid.to_vec()
        };
        let weight_sum: f32 = weights.iter().sum();
        let count = widths.len() as f32;
        for (width, weight) in widths.iter_mut().zip(weights) {
            *width += if weight_sum > 0.0 {
                leftover * (weight / weight_sum)
            } else {
                leftover / count
            };
        }
    } else {
        let excess = total - available_width;
        let flexible: Vec<f32> = widths.iter().zip(min_widths).map(|(w, m)| w - m).collect();
        let flexible_sum: f32 = flexible.iter().filter(|&&f| f > 0.0).sum();
        if excess > 0.0 && flexible_sum > 0.0 {
            for (width, extra) in widths.iter_mut().zip(flexible) {
                if extra > 0.0 {
                    *width -= extra.min(excess * (extra / flexible_sum));
                }
            }
        }
    }
    widths
}

fn empty_cell(column_index: usize, row_index: usize, col_span: usize, width: f32) -> CellLayout {
    let defaults = CellDefaults::builtin();
    CellLayout {
        column_index,
        row_index,
        col_span,
        row_span: 1,
        v_merge: None,
        base_row: None,
        x: 0.0,
        y: 0.0,
        width,
        height: BASELINE_CELL_EXTENT_PT,
        content_height: 0.0,
        padding: defaults.padding,
        borders: defaults.borders,
        boxes: Vec::new(),
    }
}

struct MergeGroup {
    anchor: (usize, usize),
    row_span: usize,
    height: f32,
    start_row: usize,
    last_row: usize,
}

/// Fold `continue` cells into the `restart` cell above them, keyed by
/// (start column, column span).
fn apply_vertical_merges(cells: &mut [Vec<CellLayout>], row_heights: &[f32]) {
    let mut active: HashMap<(usize, usize), MergeGroup> = HashMap::new();

    for row_index in 0..cells.len() {
        for cell_index in 0..cells[row_index].len() {
            let cell = &mut cells[row_index][cell_index];
            let Some(state) = cell.v_merge else {
                continue;
            };
            let key = (cell.column_index, cell.col_span);
            let row_height = row_heights.get(row_index).copied().unwrap_or(cell.height);

            if state == VMerge::Continue
                && let Some(group) = active.get_mut(&key)
            {
                group.row_span += 1;
                group.height += row_height;
                group.last_row = row_index;

                cell.row_span = 0;
                cell.height = 0.0;
                cell.content_height = 0.0;
                cell.boxes.clear();
                cell.base_row = Some(group.start_row);

                let (anchor_row, anchor_cell) = group.anchor;
                let anchor = &mut cells[anchor_row][anchor_cell];
                anchor.row_span = group.row_span;
                anchor.height = group.height;
                continue;
            }

            // a continue with nothing open starts its own group
            cell.row_span = 1;
            cell.base_row = Some(row_index);
            active.insert(
                key,
                MergeGroup {
                    anchor: (row_index, cell_index),
                    row_span: 1,
                    height: row_height,
                    start_row: row_index,
                    last_row: row_index,
                },
            );
        }
        active.retain(|_, group| group.last_row >= row_index);
    }
}

impl<'e> LayoutPass<'e> {
    pub(super) fn layout_table(&mut self, table: &Table, context: &mut LayoutContext) -> LayoutBox {
        self.table_depth += 1;
        let b = self.layout_table_grid(table, context);
        self.table_depth -= 1;
        b
    }

    fn table_style(&self, table: &Table) -> Option<&'e StyleDefinition> {
        table.style_id.as_deref().and_then(|id| self.styles.get(id))
    }

    fn layout_table_grid(&mut self, table: &Table, context: &mut LayoutContext) -> LayoutBox {
        let available_width = context.available_width();
        let cell_defaults = CellDefaults::for_table(table, self.table_style(table));
        let column_count = column_count(table);
        let min_widths =
            self.column_min_widths(table, column_count, available_width, self.table_depth);
        let mut column_widths =
            resolve_column_widths(&grid_widths(table, column_count), available_width, &min_widths);

        let table_x = context.margin_left;
        let table_y = context.cursor_y;
        let mut cells: Vec<Vec<CellLayout>> = Vec::with_capacity(table.rows.len());
        let mut row_heights: Vec<f32> = Vec::with_capacity(table.rows.len());
        let mut y_offset = 0.0;

        for (row_index, row) in table.rows.iter().enumerate() {
            let mut row_cells: Vec<CellLayout> = Vec::with_capacity(row.cells.len());
            let mut row_height: f32 = 0.0;
            let mut column_index = 0;

            for cell in &row.cells {
                let span = clamped_span(cell, column_index, column_count);
                let width: f32 = column_widths.iter().skip(column_index).take(span).sum();
                let mut layout =
                    self.layout_cell(cell, width, context, cell_defaults.for_cell(cell));
                layout.column_index = column_index;
                layout.row_index = row_index;
                layout.col_span = span;
                layout.v_merge = vertical_merge(cell);
                row_height = row_height.max(layout.height);
                row_cells.push(layout);
                column_index += span;
            }

            if column_index < column_count {
                let remaining: f32 = column_widths[column_index..].iter().sum();
                let filler =
                    empty_cell(column_index, row_index, column_count - column_index, remaining);
                row_height = row_height.max(filler.height);
                row_cells.push(filler);
            }

            if row_height == 0.0 {
                row_height = BASELINE_CELL_EXTENT_PT;
            }

            for cell in &mut row_cells {
                let start = cell.column_index;
                cell.width = column_widths.iter().skip(start).take(cell.col_span).sum();
                cell.height = row_height;
                cell.x = table_x + column_widths.iter().take(start).sum::<f32>();
                cell.y = table_y + y_offset;
                cell.base_row = Some(row_index);
            }

            cells.push(row_cells);
            row_heights.push(row_height);
            y_offset += row_height;
        }

        apply_vertical_merges(&mut cells, &row_heights);

        if row_heights.is_empty() {
            let mut cell = empty_cell(0, 0, 1, available_width);
            cell.x = table_x;
            cell.y = table_y;
            cells = vec![vec![cell]];
            row_heights = vec![BASELINE_CELL_EXTENT_PT];
            column_widths = vec![available_width];
        }

        let table_width: f32 = column_widths.iter().sum();
        let table_height: f32 = row_heights.iter().sum();
        log::debug!(
            "Table {}x{} at y={:.1}: width {:.1}, height {:.1}",
            cells.len(),
            column_widths.len(),
            table_y,
            table_width,
            table_height
        );

        let mut style = StyleMap::new();
        style.insert("styleId".into(), json!(table.style_id));
        style.insert("properties".into(), json!(table.properties));

        context.cursor_y += table_height + TABLE_SPACING_PT;

        LayoutBox {
            element_type: ElementType::Table,
            content: BoxContent::Table(TableContent {
                rows: cells.len(),
                columns: column_widths.len(),
                column_widths,
                row_heights,
                cells,
            }),
            x: table_x,
            y: table_y,
            width: table_width,
            height: table_height,
            style,
        }
    }

    /// Lay out a cell's blocks in a context of its own; nested boxes come out
    /// relative to the cell's top-left corner.
    fn layout_cell(
        &mut self,
        cell: &TableCell,
        width: f32,
        parent: &LayoutContext,
        edges: CellDefaults,
    ) -> CellLayout {
        let margin_left = edges.padding.left + edges.borders.left;
        let margin_right = edges.padding.right + edges.borders.right;
        let margin_top = edges.padding.top + edges.borders.top;
        let margin_bottom = edges.padding.bottom + edges.borders.bottom;

        let mut inner = LayoutContext {
            page_width: width,
            page_height: parent.page_height,
            margin_left,
            margin_right,
            margin_top,
            margin_bottom,
            cursor_x: margin_left,
            cursor_y: margin_top,
            header_margin: parent.header_margin,
            footer_margin: parent.footer_margin,
        };

        let boxes: Vec<LayoutBox> = cell
            .content
            .iter()
            .map(|block| self.layout_block(block, &mut inner))
            .collect();

        let content_height = (inner.cursor_y - margin_top).max(0.0);
        CellLayout {
            column_index: 0,
            row_index: 0,
            col_span: 1,
            row_span: 1,
            v_merge: None,
            base_row: None,
            x: 0.0,
            y: 0.0,
            width,
            height: content_height + margin_top + margin_bottom,
            content_height,
            padding: edges.padding,
            borders: edges.borders,
            boxes,
        }
    }

    /// Per-column minimum widths of `table`. `depth` counts the tables that
    /// enclose the cells being measured.
    fn column_min_widths(
        &self,
        table: &Table,
        column_count: usize,
        available_width: f32,
        depth: usize,
    ) -> Vec<f32> {
        let cell_defaults = CellDefaults::for_table(table, self.table_style(table));
        let mut min_widths = vec![0.0_f32; column_count];

        for row in &table.rows {
            let mut column_index = 0;
            for cell in &row.cells {
                let span = clamped_span(cell, column_index, column_count);
                let margins = cell_defaults.for_cell(cell).horizontal();
                let content = cell
                    .content
                    .iter()
                    .map(|block| self.block_min_width(block, depth))
                    .fold(0.0_f32, f32::max);
                let constraint = cell_width_constraint(cell, available_width).unwrap_or(0.0);
                let per_column = (content.max(constraint) + margins) / span as f32;

                for min in min_widths.iter_mut().skip(column_index).take(span) {
                    *min = min.max(per_column);
                }
                column_index += span;
            }
        }

        for min in &mut min_widths {
            if *min == 0.0 {
                *min = BASELINE_CELL_EXTENT_PT;
            }
        }
        min_widths
    }

    fn block_min_width(&self, block: &BlockElement, depth: usize) -> f32 {
        match block {
            BlockElement::Paragraph(p) => self.paragraph_min_width(p),
            BlockElement::Table(t) if depth < self.options.max_table_depth => {
                let count = column_count(t);
                self.column_min_widths(t, count, DEFAULT_PAGE_WIDTH_PT, depth + 1)
                    .iter()
                    .sum()
            }
            BlockElement::Image(i) => {
                let margins = image::image_margins(i);
                i.width_emu.map(emu_to_points).unwrap_or(0.0) + margins.horizontal()
            }
            _ => DEFAULT_LINE_HEIGHT_PT,
        }
    }
}
