//! Rich-document (ADF) tree model and the document → text renderer.
//!
//! Nodes arrive as arbitrary JSON; the model keeps the raw `type` string so
//! nothing is lost on unknown nodes, and [`AdfNode::kind`] maps it onto the
//! closed [`NodeKind`] vocabulary the renderer matches on. The renderer is
//! pure and total: every variant has a defined rendering, including the
//! explicit unknown case, so no content is silently dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdfNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<AdfNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub mark_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Value>,
}

impl Mark {
    pub fn strong() -> Self {
        Mark {
            mark_type: "strong".to_string(),
            attrs: None,
        }
    }

    pub fn em() -> Self {
        Mark {
            mark_type: "em".to_string(),
            attrs: None,
        }
    }

    pub fn code() -> Self {
        Mark {
            mark_type: "code".to_string(),
            attrs: None,
        }
    }

    pub fn link(href: &str) -> Self {
        Mark {
            mark_type: "link".to_string(),
            attrs: Some(serde_json::json!({ "href": href })),
        }
    }
}

/// The closed node vocabulary. Anything else maps to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Doc,
    Paragraph,
    Text,
    CodeBlock,
    Mention,
    InlineCard,
    Panel,
    Emoji,
    BulletList,
    OrderedList,
    ListItem,
    Blockquote,
    Rule,
    Heading,
    HardBreak,
    Unknown,
}

impl AdfNode {
    pub fn kind(&self) -> NodeKind {
        match self.node_type.as_str() {
            "doc" => NodeKind::Doc,
            "paragraph" => NodeKind::Paragraph,
            "text" => NodeKind::Text,
            "codeBlock" => NodeKind::CodeBlock,
            "mention" => NodeKind::Mention,
            "inlineCard" => NodeKind::InlineCard,
            "panel" => NodeKind::Panel,
            "emoji" => NodeKind::Emoji,
            "bulletList" => NodeKind::BulletList,
            "orderedList" => NodeKind::OrderedList,
            "listItem" => NodeKind::ListItem,
            "blockquote" => NodeKind::Blockquote,
            "rule" => NodeKind::Rule,
            "heading" => NodeKind::Heading,
            "hardBreak" => NodeKind::HardBreak,
            _ => NodeKind::Unknown,
        }
    }

    fn node(node_type: &str) -> Self {
        AdfNode {
            node_type: node_type.to_string(),
            ..Default::default()
        }
    }

    pub fn doc(content: Vec<AdfNode>) -> Self {
        AdfNode {
            version: Some(1),
            content,
            ..Self::node("doc")
        }
    }

    pub fn paragraph(content: Vec<AdfNode>) -> Self {
        AdfNode {
            content,
            ..Self::node("paragraph")
        }
    }

    pub fn text(text: &str) -> Self {
        AdfNode {
            text: Some(text.to_string()),
            ..Self::node("text")
        }
    }

    pub fn marked_text(text: &str, marks: Vec<Mark>) -> Self {
        AdfNode {
            text: Some(text.to_string()),
            marks,
            ..Self::node("text")
        }
    }

    pub fn code_block(language: Option<&str>, code: &str) -> Self {
        AdfNode {
            attrs: language.map(|lang| serde_json::json!({ "language": lang })),
            content: vec![Self::text(code)],
            ..Self::node("codeBlock")
        }
    }

    pub fn heading(level: u32, content: Vec<AdfNode>) -> Self {
        AdfNode {
            attrs: Some(serde_json::json!({ "level": level })),
            content,
            ..Self::node("heading")
        }
    }

    pub fn bullet_list(items: Vec<AdfNode>) -> Self {
        AdfNode {
            content: items,
            ..Self::node("bulletList")
        }
    }

    pub fn ordered_list(items: Vec<AdfNode>) -> Self {
        AdfNode {
            attrs: Some(serde_json::json!({ "order": 1 })),
            content: items,
            ..Self::node("orderedList")
        }
    }

    pub fn list_item(content: Vec<AdfNode>) -> Self {
        AdfNode {
            content,
            ..Self::node("listItem")
        }
    }

    pub fn blockquote(content: Vec<AdfNode>) -> Self {
        AdfNode {
            content,
            ..Self::node("blockquote")
        }
    }

    pub fn rule() -> Self {
        Self::node("rule")
    }

    pub fn panel(content: Vec<AdfNode>) -> Self {
        AdfNode {
            content,
            ..Self::node("panel")
        }
    }

    pub fn emoji(short_name: &str) -> Self {
        AdfNode {
            attrs: Some(serde_json::json!({ "shortName": short_name })),
            ..Self::node("emoji")
        }
    }

    pub fn mention(text: &str) -> Self {
        AdfNode {
            attrs: Some(serde_json::json!({ "text": text })),
            ..Self::node("mention")
        }
    }

    fn attr_str(&self, name: &str) -> Option<&str> {
        self.attrs.as_ref()?.get(name)?.as_str()
    }

    fn attr_u64(&self, name: &str) -> Option<u64> {
        self.attrs.as_ref()?.get(name)?.as_u64()
    }
}

/// Render a rich document as flat markdown-flavored text. Block-level
/// siblings are joined by a blank line.
pub fn document_to_text(node: &AdfNode) -> String {
    match node.kind() {
        NodeKind::Doc => render_blocks(&node.content),
        _ => render_block(node),
    }
}

fn render_blocks(nodes: &[AdfNode]) -> String {
    let mut rendered: Vec<String> = Vec::new();
    for (index, node) in nodes.iter().enumerate() {
        let mut block = render_block(node);
        if block.is_empty() {
            continue;
        }
        // Sibling panels get a rule separator between them.
        if node.kind() == NodeKind::Panel
            && nodes.get(index + 1).map(AdfNode::kind) == Some(NodeKind::Panel)
        {
            block.push_str("\n\n---");
        }
        rendered.push(block);
    }
    rendered.join("\n\n")
}

fn render_block(node: &AdfNode) -> String {
    match node.kind() {
        NodeKind::Doc | NodeKind::Panel => render_blocks(&node.content),
        NodeKind::Paragraph => render_inline(&node.content),
        NodeKind::Heading => {
            let level = node.attr_u64("level").unwrap_or(1).clamp(1, 3) as usize;
            format!("{} {}", "#".repeat(level), render_inline(&node.content))
        }
        NodeKind::CodeBlock => {
            let language = node.attr_str("language").unwrap_or_default();
            let code: String = node
                .content
                .iter()
                .filter_map(|child| child.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n");
            format!("```{language}\n{code}\n```")
        }
        NodeKind::BulletList => render_list(&node.content, None),
        NodeKind::OrderedList => render_list(&node.content, Some(1)),
        NodeKind::ListItem => render_item(node),
        NodeKind::Blockquote => render_blocks(&node.content)
            .lines()
            .map(|line| format!("> {line}"))
            .collect::<Vec<_>>()
            .join("\n"),
        NodeKind::Rule => "---".to_string(),
        NodeKind::Text
        | NodeKind::Mention
        | NodeKind::Emoji
        | NodeKind::InlineCard
        | NodeKind::HardBreak => render_inline_node(node),
        NodeKind::Unknown => node.text.clone().unwrap_or_default(),
    }
}

fn render_list(items: &[AdfNode], ordered_from: Option<usize>) -> String {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| match ordered_from {
            Some(start) => format!("{}. {}", start + index, render_item(item)),
            None => format!("- {}", render_item(item)),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_item(item: &AdfNode) -> String {
    item.content
        .iter()
        .map(render_block)
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_inline(nodes: &[AdfNode]) -> String {
    nodes.iter().map(render_inline_node).collect()
}

fn render_inline_node(node: &AdfNode) -> String {
    match node.kind() {
        NodeKind::Text => apply_marks(node),
        NodeKind::Mention => {
            let display = node.attr_str("text").unwrap_or_default();
            format!("@{}", display.trim_start_matches('@'))
        }
        NodeKind::Emoji => node
            .attr_str("shortName")
            .or(node.text.as_deref())
            .unwrap_or_default()
            .to_string(),
        NodeKind::InlineCard => node.attr_str("url").unwrap_or_default().to_string(),
        NodeKind::HardBreak => "\n".to_string(),
        NodeKind::Unknown => node.text.clone().unwrap_or_default(),
        _ => render_block(node),
    }
}

fn apply_marks(node: &AdfNode) -> String {
    let mut text = node.text.clone().unwrap_or_default();
    for mark in &node.marks {
        text = match mark.mark_type.as_str() {
            "strong" => format!("**{text}**"),
            "em" => format!("*{text}*"),
            "code" => format!("`{text}`"),
            "link" => {
                let href = mark
                    .attrs
                    .as_ref()
                    .and_then(|attrs| attrs.get("href"))
                    .and_then(|href| href.as_str())
                    .unwrap_or_default();
                format!("[{text}]({href})")
            }
            _ => text,
        };
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_marks_as_markdown_emphasis() {
        let doc = AdfNode::doc(vec![AdfNode::paragraph(vec![
            AdfNode::text("plain "),
            AdfNode::marked_text("bold", vec![Mark::strong()]),
            AdfNode::text(" and "),
            AdfNode::marked_text("async", vec![Mark::code()]),
        ])]);
        assert_eq!(document_to_text(&doc), "plain **bold** and `async`");
    }

    #[test]
    fn renders_link_marks_as_markdown_links() {
        let doc = AdfNode::doc(vec![AdfNode::paragraph(vec![AdfNode::marked_text(
            "docs",
            vec![Mark::link("https://example.com")],
        )])]);
        assert_eq!(document_to_text(&doc), "[docs](https://example.com)");
    }

    #[test]
    fn blocks_are_joined_by_blank_lines() {
        let doc = AdfNode::doc(vec![
            AdfNode::paragraph(vec![AdfNode::text("first")]),
            AdfNode::paragraph(vec![AdfNode::text("second")]),
        ]);
        assert_eq!(document_to_text(&doc), "first\n\nsecond");
    }

    #[test]
    fn code_blocks_keep_their_language_tag() {
        let doc = AdfNode::doc(vec![AdfNode::code_block(
            Some("rust"),
            "fn main() {}\nlet x = 1;",
        )]);
        assert_eq!(
            document_to_text(&doc),
            "```rust\nfn main() {}\nlet x = 1;\n```"
        );
    }

    #[test]
    fn mentions_render_with_a_single_at_sign() {
        let doc = AdfNode::doc(vec![AdfNode::paragraph(vec![AdfNode::mention("@jsmith")])]);
        assert_eq!(document_to_text(&doc), "@jsmith");
    }

    #[test]
    fn sibling_panels_are_separated_by_a_rule() {
        let doc = AdfNode::doc(vec![
            AdfNode::panel(vec![AdfNode::paragraph(vec![AdfNode::text("one")])]),
            AdfNode::panel(vec![AdfNode::paragraph(vec![AdfNode::text("two")])]),
        ]);
        assert_eq!(document_to_text(&doc), "one\n\n---\n\ntwo");
    }

    #[test]
    fn lists_render_with_markdown_prefixes() {
        let doc = AdfNode::doc(vec![
            AdfNode::bullet_list(vec![
                AdfNode::list_item(vec![AdfNode::paragraph(vec![AdfNode::text("first")])]),
                AdfNode::list_item(vec![AdfNode::paragraph(vec![AdfNode::text("second")])]),
            ]),
            AdfNode::ordered_list(vec![
                AdfNode::list_item(vec![AdfNode::paragraph(vec![AdfNode::text("one")])]),
                AdfNode::list_item(vec![AdfNode::paragraph(vec![AdfNode::text("two")])]),
            ]),
        ]);
        assert_eq!(
            document_to_text(&doc),
            "- first\n- second\n\n1. one\n2. two"
        );
    }

    #[test]
    fn unknown_nodes_fall_back_to_their_text_field() {
        let unknown = AdfNode {
            node_type: "decisionList".to_string(),
            text: Some("decided: ship it".to_string()),
            ..Default::default()
        };
        let doc = AdfNode::doc(vec![unknown]);
        assert_eq!(document_to_text(&doc), "decided: ship it");

        let empty_unknown = AdfNode {
            node_type: "mediaGroup".to_string(),
            ..Default::default()
        };
        assert_eq!(document_to_text(&AdfNode::doc(vec![empty_unknown])), "");
    }

    #[test]
    fn blockquotes_prefix_each_line() {
        let doc = AdfNode::doc(vec![AdfNode::blockquote(vec![AdfNode::paragraph(vec![
            AdfNode::text("quoted"),
        ])])]);
        assert_eq!(document_to_text(&doc), "> quoted");
    }

    #[test]
    fn parses_remote_document_json() {
        let raw = serde_json::json!({
            "type": "doc",
            "version": 1,
            "content": [
                {
                    "type": "paragraph",
                    "content": [
                        { "type": "text", "text": "hello " },
                        { "type": "text", "text": "world", "marks": [{ "type": "strong" }] }
                    ]
                }
            ]
        });
        let doc: AdfNode = serde_json::from_value(raw).unwrap();
        assert_eq!(document_to_text(&doc), "hello **world**");
    }
}
