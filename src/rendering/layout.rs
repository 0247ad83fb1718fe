//! Block and inline layout of a rendered visual tree.
//!
//! Everything is measured in CSS pixels on a monospace cell grid: a character cell
//! is `ADVANCE * size` wide and `LINE_HEIGHT * size` tall, where `size` is the
//! integer glyph scale of the block (body text is 2, an `h1` is 4). Colours are
//! carried through as the computed CSS strings; they are interpreted only when a
//! capture builds its display list.

use scraper::ElementRef;

use crate::markup::{VisualTree, MAX_NESTING};
use crate::rendering::fonts::{ADVANCE, LINE_HEIGHT};
use crate::rendering::style::declarations;
use crate::theme::Palette;

/// Space between the region edge and its content
pub const PAGE_PADDING: u32 = 24;
/// Glyph scale of body text
pub const BODY_SIZE: u32 = 2;

const BLOCK_GAP: u32 = 12;
const ITEM_GAP: u32 = 4;
const LIST_INDENT: u32 = 28;
const QUOTE_INDENT: u32 = 20;
const QUOTE_BAR: u32 = 4;
const CODE_PADDING: u32 = 12;
const CELL_PADDING: u32 = 8;
const RULE_THICKNESS: u32 = 2;
const HEADING_SIZES: [u32; 6] = [4, 3, 2, 2, 2, 2];

#[derive(Debug, Clone, PartialEq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x: x as i32,
            y: y as i32,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextStyle {
    pub color: String,
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    pub underline: bool,
}

/// One positioned piece of the region. `property` names the style property the
/// colour came from, for error reporting.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutItem {
    Fill {
        rect: Rect,
        color: String,
        property: &'static str,
    },
    Text {
        x: i32,
        y: i32,
        text: String,
        size: u32,
        style: TextStyle,
    },
    Checkbox {
        rect: Rect,
        checked: bool,
        color: String,
    },
}

/// Settled layout of the whole render region
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTree {
    pub width: u32,
    pub height: u32,
    pub items: Vec<LayoutItem>,
}

impl LayoutTree {
    pub fn text_items(&self) -> impl Iterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            LayoutItem::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Inline style inherited down the tree
#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct RunStyle {
    text: TextStyle,
    background: Option<String>,
}

#[derive(Debug, Clone)]
enum Piece {
    Text(String, RunStyle),
    Break,
}

#[derive(Debug, Clone, PartialEq)]
struct Placed {
    col: usize,
    text: String,
    style: RunStyle,
}

type Line = Vec<Placed>;

/// Lay out `tree` for a region `viewport_width` pixels wide.
pub fn layout_tree(tree: &VisualTree, palette: &Palette, viewport_width: u32) -> LayoutTree {
    let min_width = 2 * PAGE_PADDING + ADVANCE * BODY_SIZE;
    let width = viewport_width.max(min_width);
    let mut flow = Flow {
        palette,
        items: Vec::new(),
        y: PAGE_PADDING,
        gap: BLOCK_GAP,
        depth: 0,
    };
    let base = RunStyle {
        text: TextStyle {
            color: palette.text.clone(),
            ..Default::default()
        },
        background: None,
    };
    flow.layout_children(tree.root(), PAGE_PADDING, width - 2 * PAGE_PADDING, &base);

    let height = flow.y.saturating_sub(flow.gap).max(PAGE_PADDING) + PAGE_PADDING;
    LayoutTree {
        width,
        height,
        items: flow.items,
    }
}

struct Flow<'p> {
    palette: &'p Palette,
    items: Vec<LayoutItem>,
    y: u32,
    gap: u32,
    /// Blocks currently open around the one being laid out
    depth: usize,
}

impl<'p> Flow<'p> {
    /// Mixed content: runs of inline nodes become anonymous paragraphs between blocks.
    fn layout_children(&mut self, parent: ElementRef<'_>, x: u32, width: u32, base: &RunStyle) {
        let mut pending = Vec::new();
        for node in parent.children() {
            match ElementRef::wrap(node) {
                Some(el) if is_block(el.value().name()) => {
                    self.paragraph(&pending, x, width, BODY_SIZE);
                    pending.clear();
                    self.layout_block(el, x, width, base);
                }
                Some(el) => collect_element(el, base, self.palette, 0, &mut pending),
                None => push_text(node.value().as_text().map(|t| &**t), base, &mut pending),
            }
        }
        self.paragraph(&pending, x, width, BODY_SIZE);
    }

    /// Lay out one block element. Past `MAX_NESTING` open blocks the element's
    /// text is laid out as one plain paragraph instead of descending further.
    fn layout_block(&mut self, el: ElementRef<'_>, x: u32, width: u32, base: &RunStyle) {
        if self.depth >= MAX_NESTING {
            let text = el.text().collect::<Vec<_>>().join(" ");
            self.paragraph(&[Piece::Text(text, base.clone())], x, width, BODY_SIZE);
            return;
        }
        self.depth += 1;
        self.block(el, x, width, base);
        self.depth -= 1;
    }

    fn block(&mut self, el: ElementRef<'_>, x: u32, width: u32, base: &RunStyle) {
        let name = el.value().name();
        match name {
            "p" => {
                let mut style = base.clone();
                if has_class(&el, "placeholder") {
                    style.text.color = self.palette.muted.clone();
                    style.text.italic = true;
                }
                apply_inline_style(&el, &mut style);
                let pieces = collect_runs(el, &style, self.palette);
                self.paragraph(&pieces, x, width, BODY_SIZE);
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1).clamp(1, 6);
                let mut style = base.clone();
                style.text.color = self.palette.heading.clone();
                style.text.bold = true;
                apply_inline_style(&el, &mut style);
                if level <= 2 && self.y > PAGE_PADDING {
                    self.y += BLOCK_GAP;
                }
                let pieces = collect_runs(el, &style, self.palette);
                self.paragraph(&pieces, x, width, HEADING_SIZES[level - 1]);
            }
            "ul" | "ol" => self.list(el, x, width, base, name == "ol"),
            "pre" => self.code_block(el, x, width),
            "blockquote" => {
                let top = self.y;
                let mut style = base.clone();
                style.text.color = self.palette.muted.clone();
                style.text.italic = true;
                let inner = width.saturating_sub(QUOTE_INDENT).max(ADVANCE * BODY_SIZE);
                self.layout_children(el, x + QUOTE_INDENT, inner, &style);
                let bottom = self.y.saturating_sub(self.gap);
                if bottom > top {
                    self.items.push(LayoutItem::Fill {
                        rect: Rect::new(x, top, QUOTE_BAR, bottom - top),
                        color: self.palette.quote_bar.clone(),
                        property: "border-color",
                    });
                }
            }
            "hr" => {
                self.items.push(LayoutItem::Fill {
                    rect: Rect::new(x, self.y, width, RULE_THICKNESS),
                    color: self.palette.rule.clone(),
                    property: "border-color",
                });
                self.y += RULE_THICKNESS + self.gap;
            }
            "table" => self.table(el, x, width, base),
            "script" | "style" | "head" | "title" | "meta" | "link" | "template" => {}
            _ => {
                let mut style = base.clone();
                apply_inline_style(&el, &mut style);
                self.layout_children(el, x, width, &style);
            }
        }
    }

    fn paragraph(&mut self, pieces: &[Piece], x: u32, width: u32, size: u32) {
        let has_content = pieces.iter().any(|p| match p {
            Piece::Text(t, _) => !t.trim().is_empty(),
            Piece::Break => false,
        });
        if !has_content {
            return;
        }
        let lines = wrap(pieces, columns(width, size));
        let height = self.emit_lines(&lines, x, self.y, size);
        self.y += height + self.gap;
    }

    fn emit_lines(&mut self, lines: &[Line], x: u32, y: u32, size: u32) -> u32 {
        let cell = ADVANCE * size;
        let line_height = LINE_HEIGHT * size;
        for (i, line) in lines.iter().enumerate() {
            let line_y = y + i as u32 * line_height;
            for placed in line {
                let px = x + placed.col as u32 * cell;
                let chars = placed.text.chars().count() as u32;
                if let Some(bg) = &placed.style.background {
                    self.items.push(LayoutItem::Fill {
                        rect: Rect::new(px, line_y, chars * cell, line_height),
                        color: bg.clone(),
                        property: "background-color",
                    });
                }
                self.items.push(LayoutItem::Text {
                    x: px as i32,
                    y: line_y as i32,
                    text: placed.text.clone(),
                    size,
                    style: placed.style.text.clone(),
                });
            }
        }
        lines.len() as u32 * line_height
    }

    fn list(&mut self, el: ElementRef<'_>, x: u32, width: u32, base: &RunStyle, ordered: bool) {
        let mut number = el
            .value()
            .attr("start")
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(1);
        let outer_gap = self.gap;
        self.gap = ITEM_GAP;
        let inner_x = x + LIST_INDENT;
        let inner_width = width.saturating_sub(LIST_INDENT).max(ADVANCE * BODY_SIZE);

        for item in el.children().filter_map(ElementRef::wrap) {
            if item.value().name() != "li" {
                continue;
            }
            let top = self.y;
            match task_checkbox(&item) {
                Some(checked) => self.items.push(LayoutItem::Checkbox {
                    rect: Rect::new(x + 2, top + 3, 14, 14),
                    checked,
                    color: base.text.color.clone(),
                }),
                None if ordered => self.items.push(LayoutItem::Text {
                    x: x as i32,
                    y: top as i32,
                    text: format!("{}.", number),
                    size: BODY_SIZE,
                    style: base.text.clone(),
                }),
                None => self.items.push(LayoutItem::Fill {
                    rect: Rect::new(x + 8, top + 7, 6, 6),
                    color: base.text.color.clone(),
                    property: "color",
                }),
            }
            number += 1;

            self.layout_children(item, inner_x, inner_width, base);
            if self.y == top {
                self.y += LINE_HEIGHT * BODY_SIZE + self.gap;
            }
        }

        self.gap = outer_gap;
        self.y += outer_gap.saturating_sub(ITEM_GAP);
    }

    fn code_block(&mut self, el: ElementRef<'_>, x: u32, width: u32) {
        let raw: String = el.text().collect();
        let raw = raw.strip_suffix('\n').unwrap_or(&raw).replace('\t', "    ");
        let cols = columns(width.saturating_sub(2 * CODE_PADDING), BODY_SIZE);
        let mut lines: Vec<String> = Vec::new();
        for line in raw.split('\n') {
            let chars: Vec<char> = line.chars().collect();
            if chars.is_empty() {
                lines.push(String::new());
                continue;
            }
            for chunk in chars.chunks(cols) {
                lines.push(chunk.iter().collect());
            }
        }

        let line_height = LINE_HEIGHT * BODY_SIZE;
        let height = lines.len() as u32 * line_height + 2 * CODE_PADDING;
        self.items.push(LayoutItem::Fill {
            rect: Rect::new(x, self.y, width, height),
            color: self.palette.code_background.clone(),
            property: "background-color",
        });
        let style = TextStyle {
            color: self.palette.code_text.clone(),
            ..Default::default()
        };
        for (i, line) in lines.into_iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            self.items.push(LayoutItem::Text {
                x: (x + CODE_PADDING) as i32,
                y: (self.y + CODE_PADDING + i as u32 * line_height) as i32,
                text: line,
                size: BODY_SIZE,
                style: style.clone(),
            });
        }
        self.y += height + self.gap;
    }

    fn table(&mut self, el: ElementRef<'_>, x: u32, width: u32, base: &RunStyle) {
        let rows: Vec<ElementRef<'_>> = el
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "tr")
            .collect();
        let column_count = rows.iter().map(|r| table_cells(r).len()).max().unwrap_or(0);
        if column_count == 0 {
            return;
        }
        let col_width = (width / column_count as u32).max(2 * CELL_PADDING + ADVANCE * BODY_SIZE);
        let table_width = col_width * column_count as u32;
        let cols = columns(col_width - 2 * CELL_PADDING, BODY_SIZE);
        let line_height = LINE_HEIGHT * BODY_SIZE;
        let top = self.y;

        for row in &rows {
            let cells = table_cells(row);
            let header = !cells.is_empty() && cells.iter().all(|c| c.value().name() == "th");
            let laid: Vec<Vec<Line>> = cells
                .iter()
                .map(|cell| {
                    let mut style = base.clone();
                    style.text.bold = cell.value().name() == "th";
                    apply_inline_style(cell, &mut style);
                    wrap(&collect_runs(*cell, &style, self.palette), cols)
                })
                .collect();
            let row_lines = laid.iter().map(Vec::len).max().unwrap_or(0).max(1) as u32;
            let row_height = row_lines * line_height + 2 * CELL_PADDING;

            if header {
                self.items.push(LayoutItem::Fill {
                    rect: Rect::new(x, self.y, table_width, row_height),
                    color: self.palette.table_header_background.clone(),
                    property: "background-color",
                });
            }
            for (i, lines) in laid.iter().enumerate() {
                let cell_x = x + i as u32 * col_width + CELL_PADDING;
                self.emit_lines(lines, cell_x, self.y + CELL_PADDING, BODY_SIZE);
            }
            self.items.push(LayoutItem::Fill {
                rect: Rect::new(x, self.y, table_width, 1),
                color: self.palette.rule.clone(),
                property: "border-color",
            });
            self.y += row_height;
        }

        self.items.push(LayoutItem::Fill {
            rect: Rect::new(x, self.y, table_width, 1),
            color: self.palette.rule.clone(),
            property: "border-color",
        });
        for c in 0..=column_count as u32 {
            let line_x = (x + c * col_width).min(x + table_width - 1);
            self.items.push(LayoutItem::Fill {
                rect: Rect::new(line_x, top, 1, self.y - top + 1),
                color: self.palette.rule.clone(),
                property: "border-color",
            });
        }
        self.y += 1 + self.gap;
    }
}

fn columns(width: u32, size: u32) -> usize {
    ((width / (ADVANCE * size)) as usize).max(1)
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "ul"
            | "ol"
            | "pre"
            | "blockquote"
            | "hr"
            | "table"
            | "div"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "aside"
            | "nav"
            | "figure"
            | "details"
            | "dl"
            | "script"
            | "style"
            | "template"
    )
}

fn table_cells<'a>(row: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|c| matches!(c.value().name(), "th" | "td"))
        .collect()
}

fn has_class(el: &ElementRef<'_>, class: &str) -> bool {
    el.value()
        .attr("class")
        .map(|c| c.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

/// `Some(checked)` for a task-list item, tight or loose.
fn task_checkbox(item: &ElementRef<'_>) -> Option<bool> {
    let is_checkbox = |e: &ElementRef<'_>| {
        e.value().name() == "input"
            && e.value().attr("type").map(|t| t.eq_ignore_ascii_case("checkbox")).unwrap_or(false)
    };
    let first = item.children().filter_map(ElementRef::wrap).next()?;
    let input = if is_checkbox(&first) {
        first
    } else if first.value().name() == "p" {
        first.children().filter_map(ElementRef::wrap).next().filter(|e| is_checkbox(e))?
    } else {
        return None;
    };
    Some(input.value().attr("checked").is_some())
}

fn apply_inline_style(el: &ElementRef<'_>, style: &mut RunStyle) {
    let Some(attr) = el.value().attr("style") else {
        return;
    };
    for (prop, value) in declarations(attr) {
        let lower = value.to_ascii_lowercase();
        match prop.as_str() {
            "color" => style.text.color = value,
            "background-color" | "background" => style.background = Some(value),
            "font-weight" => {
                style.text.bold = lower == "bold"
                    || lower == "bolder"
                    || lower.parse::<u32>().map(|w| w >= 600).unwrap_or(false)
            }
            "font-style" => style.text.italic = lower == "italic" || lower == "oblique",
            "text-decoration" | "text-decoration-line" => {
                style.text.strike = lower.contains("line-through");
                style.text.underline = lower.contains("underline");
            }
            _ => {}
        }
    }
}

fn collect_runs(el: ElementRef<'_>, style: &RunStyle, palette: &Palette) -> Vec<Piece> {
    let mut out = Vec::new();
    collect_children(el, style, palette, 0, &mut out);
    out
}

fn collect_children(el: ElementRef<'_>, style: &RunStyle, palette: &Palette, depth: usize, out: &mut Vec<Piece>) {
    for node in el.children() {
        match ElementRef::wrap(node) {
            Some(child) => collect_element(child, style, palette, depth, out),
            None => push_text(node.value().as_text().map(|t| &**t), style, out),
        }
    }
}

fn push_text(text: Option<&str>, style: &RunStyle, out: &mut Vec<Piece>) {
    if let Some(text) = text {
        out.push(Piece::Text(text.to_string(), style.clone()));
    }
}

/// Inline runs of `el`. Elements nested deeper than `MAX_NESTING` contribute
/// their text with the style in effect at the limit.
fn collect_element(el: ElementRef<'_>, style: &RunStyle, palette: &Palette, depth: usize, out: &mut Vec<Piece>) {
    if depth >= MAX_NESTING {
        out.extend(el.text().map(|t| Piece::Text(t.to_string(), style.clone())));
        return;
    }
    let mut inner = style.clone();
    match el.value().name() {
        "strong" | "b" => inner.text.bold = true,
        "em" | "i" | "cite" => inner.text.italic = true,
        "del" | "s" | "strike" => inner.text.strike = true,
        "u" | "ins" => inner.text.underline = true,
        "code" | "kbd" | "samp" => {
            inner.text.color = palette.code_text.clone();
            inner.background = Some(palette.code_background.clone());
        }
        "a" => {
            inner.text.color = palette.link.clone();
            inner.text.underline = true;
        }
        "br" => {
            out.push(Piece::Break);
            return;
        }
        "img" => {
            let alt = el.value().attr("alt").unwrap_or("image");
            out.push(Piece::Text(format!("[{}]", alt), inner));
            return;
        }
        // task checkboxes are drawn as list markers; nested blocks are laid out separately
        "input" | "ul" | "ol" | "pre" | "table" | "blockquote" | "script" | "style" => return,
        _ => {}
    }
    apply_inline_style(&el, &mut inner);
    collect_children(el, &inner, palette, depth + 1, out);
}

/// Greedy word wrap onto lines of `max_cols` cells. Whitespace collapses as in
/// HTML; words longer than a line are broken across lines.
fn wrap(pieces: &[Piece], max_cols: usize) -> Vec<Line> {
    let mut lines: Vec<Line> = Vec::new();
    let mut line: Line = Vec::new();
    let mut col = 0usize;
    let mut pending_space: Option<RunStyle> = None;

    for piece in pieces {
        let (text, style) = match piece {
            Piece::Break => {
                lines.push(std::mem::take(&mut line));
                col = 0;
                pending_space = None;
                continue;
            }
            Piece::Text(text, style) => (text, style),
        };

        let mut word = String::new();
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch.is_whitespace() && ch != '\u{00A0}' {
                if !word.is_empty() {
                    place_word(&mut lines, &mut line, &mut col, &mut pending_space, &word, style, max_cols);
                    word.clear();
                }
                pending_space = Some(style.clone());
                continue;
            }
            word.push(ch);
            if chars.peek().is_none() {
                place_word(&mut lines, &mut line, &mut col, &mut pending_space, &word, style, max_cols);
                word.clear();
            }
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    while lines.last().map(|l| l.is_empty()).unwrap_or(false) {
        lines.pop();
    }
    lines
}

fn place_word(
    lines: &mut Vec<Line>,
    line: &mut Line,
    col: &mut usize,
    pending_space: &mut Option<RunStyle>,
    word: &str,
    style: &RunStyle,
    max_cols: usize,
) {
    let len = word.chars().count();
    let space = pending_space.take().filter(|_| *col > 0);
    let needed = len + usize::from(space.is_some());

    if *col + needed <= max_cols {
        if let Some(space_style) = space {
            push_placed(line, *col, " ", &space_style);
            *col += 1;
        }
        push_placed(line, *col, word, style);
        *col += len;
        return;
    }

    if *col > 0 {
        lines.push(std::mem::take(line));
        *col = 0;
    }
    let chars: Vec<char> = word.chars().collect();
    let mut chunks = chars.chunks(max_cols).peekable();
    while let Some(chunk) = chunks.next() {
        let text: String = chunk.iter().collect();
        push_placed(line, 0, &text, style);
        *col = chunk.len();
        if chunks.peek().is_some() {
            lines.push(std::mem::take(line));
        }
    }
}

fn push_placed(line: &mut Line, col: usize, text: &str, style: &RunStyle) {
    if let Some(last) = line.last_mut() {
        if last.style == *style && last.col + last.text.chars().count() == col {
            last.text.push_str(text);
            return;
        }
    }
    line.push(Placed {
        col,
        text: text.to_string(),
        style: style.clone(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::{render_markup, Extensions};

    fn lay(src: &str, width: u32) -> LayoutTree {
        let tree = render_markup(src, Extensions::gfm());
        layout_tree(&tree, &Palette::light(), width)
    }

    fn text_piece(s: &str) -> Piece {
        Piece::Text(s.to_string(), RunStyle::default())
    }

    #[test]
    fn layout_places_heading_before_paragraph() {
        let layout = lay("# Heading\n\nHello world", 400);
        let texts: Vec<_> = layout.text_items().collect();
        assert_eq!(texts, vec!["Heading", "Hello world"]);
        let ys: Vec<i32> = layout
            .items
            .iter()
            .filter_map(|i| match i {
                LayoutItem::Text { y, .. } => Some(*y),
                _ => None,
            })
            .collect();
        assert!(ys[0] < ys[1]);
        assert_eq!(layout.width, 400);
        assert!(layout.height > 2 * PAGE_PADDING);
    }

    #[test]
    fn wrap_breaks_on_words_and_collapses_spaces() {
        let lines = wrap(&[text_piece("aaa   bbb ccc")], 7);
        let rendered: Vec<String> = lines
            .iter()
            .map(|l| l.iter().map(|p| p.text.as_str()).collect::<String>())
            .collect();
        assert_eq!(rendered, vec!["aaa bbb", "ccc"]);
    }

    #[test]
    fn wrap_splits_overlong_words() {
        let lines = wrap(&[text_piece("abcdefghij")], 4);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2][0].text, "ij");
    }

    #[test]
    fn hard_breaks_start_new_lines() {
        let lines = wrap(&[text_piece("one"), Piece::Break, text_piece("two")], 80);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1][0].col, 0);
    }

    #[test]
    fn styled_runs_keep_their_style() {
        let layout = lay("plain **bold** ~~gone~~", 800);
        let bold = layout.items.iter().any(|i| matches!(i, LayoutItem::Text { text, style, .. } if text == "bold" && style.bold));
        let struck = layout.items.iter().any(|i| matches!(i, LayoutItem::Text { text, style, .. } if text == "gone" && style.strike));
        assert!(bold);
        assert!(struck);
    }

    #[test]
    fn task_items_get_checkboxes() {
        let layout = lay("- [x] done\n- [ ] todo\n", 400);
        let boxes: Vec<bool> = layout
            .items
            .iter()
            .filter_map(|i| match i {
                LayoutItem::Checkbox { checked, .. } => Some(*checked),
                _ => None,
            })
            .collect();
        assert_eq!(boxes, vec![true, false]);
    }

    #[test]
    fn inline_style_colors_flow_through_uninterpreted() {
        let layout = lay("<span style=\"color: oklch(0.5 0.1 20)\">tinted</span>", 400);
        let found = layout.items.iter().any(|i| matches!(i, LayoutItem::Text { style, .. } if style.color.starts_with("oklch")));
        assert!(found);
    }

    #[test]
    fn tables_and_code_blocks_produce_backgrounds() {
        let layout = lay("| a | b |\n|---|---|\n| 1 | 2 |\n\n```\ncode\n```\n", 600);
        let backgrounds = layout
            .items
            .iter()
            .filter(|i| matches!(i, LayoutItem::Fill { property: "background-color", .. }))
            .count();
        assert!(backgrounds >= 2);
        let texts: Vec<_> = layout.text_items().collect();
        assert!(texts.contains(&"code"));
        assert!(texts.contains(&"a"));
    }

    #[test]
    fn deep_quote_nesting_is_capped() {
        let src = format!("{}deep", "> ".repeat(10_000));
        let layout = lay(&src, 800);
        assert_eq!(layout.text_items().collect::<Vec<_>>(), vec!["deep"]);
        let bars = layout
            .items
            .iter()
            .filter(|i| matches!(i, LayoutItem::Fill { property: "border-color", .. }))
            .count();
        assert_eq!(bars, MAX_NESTING);
    }

    #[test]
    fn deep_inline_nesting_keeps_its_text() {
        let src = format!("{}core{}", "<span>".repeat(5_000), "</span>".repeat(5_000));
        let layout = lay(&src, 800);
        assert_eq!(layout.text_items().collect::<Vec<_>>(), vec!["core"]);
    }

    #[test]
    fn layout_is_deterministic() {
        let src = "# T\n\n- a\n- b\n\n> quote\n\n---\n\n1. x\n";
        assert_eq!(lay(src, 500), lay(src, 500));
    }
}
