//! Markup renderer: Markdown text to a DOM-equivalent visual tree.
//!
//! Parsing is done by `pulldown-cmark`; its HTML output is parsed back into a
//! `scraper` document so the render surface can walk elements and attributes the
//! same way it would walk a page.

use pulldown_cmark::{html, Options, Parser};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

/// Text shown in place of an empty document
pub const PLACEHOLDER_TEXT: &str = "Start writing Markdown to see the preview here.";

/// Element nesting walked before deeper content is flattened to its text
pub const MAX_NESTING: usize = 64;

/// Optional markup extensions. The three GFM ones are on by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Extensions {
    pub tables: bool,
    pub strikethrough: bool,
    pub task_lists: bool,
}

impl Extensions {
    /// Tables, strikethrough and task lists
    pub fn gfm() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            task_lists: true,
        }
    }

    /// CommonMark only
    pub fn none() -> Self {
        Self {
            tables: false,
            strikethrough: false,
            task_lists: false,
        }
    }

    fn options(&self) -> Options {
        let mut options = Options::empty();
        if self.tables {
            options.insert(Options::ENABLE_TABLES);
        }
        if self.strikethrough {
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.task_lists {
            options.insert(Options::ENABLE_TASKLISTS);
        }
        options
    }
}

impl Default for Extensions {
    fn default() -> Self {
        Self::gfm()
    }
}

/// Structural node kinds the renderer can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Heading,
    Paragraph,
    Emphasis,
    Strong,
    List,
    ListItem,
    CodeBlock,
    InlineCode,
    Table,
    Strikethrough,
    TaskItem,
    BlockQuote,
    Link,
    Placeholder,
}

impl NodeKind {
    fn selector(&self) -> &'static str {
        match self {
            NodeKind::Heading => "h1, h2, h3, h4, h5, h6",
            NodeKind::Paragraph => "p",
            NodeKind::Emphasis => "em",
            NodeKind::Strong => "strong",
            NodeKind::List => "ul, ol",
            NodeKind::ListItem => "li",
            NodeKind::CodeBlock => "pre",
            NodeKind::InlineCode => "code",
            NodeKind::Table => "table",
            NodeKind::Strikethrough => "del",
            NodeKind::TaskItem => "li > input[type=\"checkbox\"]",
            NodeKind::BlockQuote => "blockquote",
            NodeKind::Link => "a",
            NodeKind::Placeholder => "p.placeholder",
        }
    }
}

/// Rendered form of a document: the HTML produced by the parser and its DOM.
#[derive(Debug, Clone)]
pub struct VisualTree {
    html: String,
    dom: Html,
}

impl PartialEq for VisualTree {
    fn eq(&self, other: &Self) -> bool {
        self.html == other.html
    }
}

impl VisualTree {
    pub fn html(&self) -> &str {
        &self.html
    }

    /// Top-level element the render surface lays out
    pub fn root(&self) -> ElementRef<'_> {
        self.dom.root_element()
    }

    pub fn is_placeholder(&self) -> bool {
        self.count(NodeKind::Placeholder) > 0
    }

    pub fn count(&self, kind: NodeKind) -> usize {
        let Ok(selector) = Selector::parse(kind.selector()) else {
            return 0;
        };
        let matches = self.dom.select(&selector).count();
        if kind == NodeKind::InlineCode {
            // code inside pre is a code block, not inline code
            let in_pre = Selector::parse("pre > code")
                .map(|s| self.dom.select(&s).count())
                .unwrap_or(0);
            return matches.saturating_sub(in_pre);
        }
        matches
    }

    pub fn contains(&self, kind: NodeKind) -> bool {
        self.count(kind) > 0
    }

    /// Plain-text outline of the tree, one block per line.
    pub fn text_snapshot(&self) -> String {
        let mut out = Vec::new();
        outline(self.root(), 0, 0, &mut out);
        out.join("\n")
    }
}

fn outline(element: ElementRef<'_>, depth: usize, level: usize, out: &mut Vec<String>) {
    if level >= MAX_NESTING {
        let text = squash(&element);
        if !text.is_empty() {
            out.push(format!("{}{}", "  ".repeat(depth), text));
        }
        return;
    }
    for child in element.children().filter_map(ElementRef::wrap) {
        let name = child.value().name();
        let indent = "  ".repeat(depth);
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse::<usize>().unwrap_or(1);
                out.push(format!("{}{} {}", indent, "#".repeat(level), squash(&child)));
            }
            "p" => out.push(format!("{}{}", indent, squash(&child))),
            "ul" | "ol" => outline(child, depth, level + 1, out),
            "li" => {
                let checkbox = child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .find(|c| c.value().name() == "input");
                let marker = match checkbox {
                    Some(input) if input.value().attr("checked").is_some() => "[x]",
                    Some(_) => "[ ]",
                    None => "-",
                };
                let own_text: String = child
                    .children()
                    .filter(|n| {
                        ElementRef::wrap(*n)
                            .map(|e| !matches!(e.value().name(), "ul" | "ol"))
                            .unwrap_or(true)
                    })
                    .map(|n| match ElementRef::wrap(n) {
                        Some(e) => e.text().collect::<String>(),
                        None => n.value().as_text().map(|t| String::from(&**t)).unwrap_or_default(),
                    })
                    .collect();
                out.push(format!(
                    "{}{} {}",
                    indent,
                    marker,
                    own_text.split_whitespace().collect::<Vec<_>>().join(" ")
                ));
                for nested in child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|e| matches!(e.value().name(), "ul" | "ol"))
                {
                    outline(nested, depth + 1, level + 1, out);
                }
            }
            "pre" => {
                for line in child.text().collect::<String>().lines() {
                    out.push(format!("{}    {}", indent, line));
                }
            }
            "blockquote" => {
                let mut inner = Vec::new();
                outline(child, 0, level + 1, &mut inner);
                for line in inner {
                    out.push(format!("{}> {}", indent, line));
                }
            }
            "table" => {
                let Ok(row_sel) = Selector::parse("tr") else { continue };
                let Ok(cell_sel) = Selector::parse("th, td") else { continue };
                for row in child.select(&row_sel) {
                    let cells: Vec<String> = row.select(&cell_sel).map(|c| squash(&c)).collect();
                    out.push(format!("{}| {} |", indent, cells.join(" | ")));
                }
            }
            "hr" => out.push(format!("{}---", indent)),
            "script" | "style" => {}
            _ => outline(child, depth, level + 1, out),
        }
    }
}

fn squash(element: &ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render markup text with the given extensions.
///
/// Deterministic: the same text and extension set always yield the same tree.
/// Empty or whitespace-only input renders the placeholder paragraph.
pub fn render_markup(text: &str, extensions: Extensions) -> VisualTree {
    let html = if text.trim().is_empty() {
        format!("<p class=\"placeholder\">{}</p>\n", PLACEHOLDER_TEXT)
    } else {
        let parser = Parser::new_ext(text, extensions.options());
        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, parser);
        out
    };
    let dom = Html::parse_fragment(&html);
    VisualTree { html, dom }
}
