use markpress::markup::{render_markup, Extensions, NodeKind, PLACEHOLDER_TEXT};

#[test]
fn bold_and_italic_without_gfm() {
    let src = "**bold** and *italic*\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n~~struck~~\n";
    let tree = render_markup(src, Extensions::none());
    assert_eq!(tree.count(NodeKind::Strong), 1);
    assert_eq!(tree.count(NodeKind::Emphasis), 1);
    assert!(!tree.contains(NodeKind::Table));
    assert!(!tree.contains(NodeKind::Strikethrough));
}

#[test]
fn every_core_construct_is_recognised() {
    let src = "\
# Title

Some *em*, **strong**, `code` and ~~gone~~.

- one
- two

1. first
2. second

```rust
fn main() {}
```

| h1 | h2 |
|----|----|
| c1 | c2 |

- [x] done
- [ ] open

> quoted
";
    let tree = render_markup(src, Extensions::gfm());
    assert_eq!(tree.count(NodeKind::Heading), 1);
    assert!(tree.contains(NodeKind::Emphasis));
    assert!(tree.contains(NodeKind::Strong));
    assert_eq!(tree.count(NodeKind::InlineCode), 1);
    assert_eq!(tree.count(NodeKind::CodeBlock), 1);
    assert_eq!(tree.count(NodeKind::List), 3);
    assert_eq!(tree.count(NodeKind::Table), 1);
    assert_eq!(tree.count(NodeKind::Strikethrough), 1);
    assert_eq!(tree.count(NodeKind::TaskItem), 2);
    assert_eq!(tree.count(NodeKind::BlockQuote), 1);
}

#[test]
fn same_input_same_tree() {
    let src = "# A\n\n- [ ] b\n\n| x |\n|---|\n| y |\n";
    let a = render_markup(src, Extensions::gfm());
    let b = render_markup(src, Extensions::gfm());
    assert_eq!(a, b);
    assert_eq!(a.text_snapshot(), b.text_snapshot());
}

#[test]
fn extension_set_changes_tree() {
    let src = "~~x~~";
    assert_ne!(render_markup(src, Extensions::gfm()), render_markup(src, Extensions::none()));
}

#[test]
fn empty_input_shows_placeholder() {
    for src in ["", "  ", "\n\n\t"] {
        let tree = render_markup(src, Extensions::gfm());
        assert!(tree.is_placeholder());
        assert!(tree.html().contains(PLACEHOLDER_TEXT));
    }
    assert!(!render_markup("x", Extensions::gfm()).is_placeholder());
}
