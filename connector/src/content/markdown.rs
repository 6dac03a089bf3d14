//! Markdown → rich-document parser, the inverse of
//! [`document_to_text`](super::adf::document_to_text).
//!
//! Line-based: headings 1–3, fenced code blocks with language tags,
//! bullet/ordered lists, blockquotes, horizontal rules, and paragraphs with
//! inline bold/italic/code, links, and `:shortname:` emoji. Round-trips are
//! structural, not byte-identical on whitespace.

use super::adf::{AdfNode, Mark};

pub fn text_to_document(text: &str) -> AdfNode {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() {
            i += 1;
            continue;
        }

        if let Some(rest) = line.strip_prefix("```") {
            let language = rest.trim();
            let mut code_lines = Vec::new();
            i += 1;
            while i < lines.len() && !lines[i].trim().starts_with("```") {
                code_lines.push(lines[i]);
                i += 1;
            }
            // Skip the closing fence when present.
            i += 1;
            blocks.push(AdfNode::code_block(
                (!language.is_empty()).then_some(language),
                &code_lines.join("\n"),
            ));
            continue;
        }

        if let Some((level, rest)) = heading_prefix(line) {
            blocks.push(AdfNode::heading(level, parse_inline(rest)));
            i += 1;
            continue;
        }

        if is_rule(line) {
            blocks.push(AdfNode::rule());
            i += 1;
            continue;
        }

        if line.starts_with('>') {
            let mut paragraphs = Vec::new();
            while i < lines.len() {
                let quoted = lines[i].trim();
                let Some(inner) = quoted.strip_prefix('>') else {
                    break;
                };
                let inner = inner.strip_prefix(' ').unwrap_or(inner);
                if !inner.is_empty() {
                    paragraphs.push(AdfNode::paragraph(parse_inline(inner)));
                }
                i += 1;
            }
            blocks.push(AdfNode::blockquote(paragraphs));
            continue;
        }

        if bullet_prefix(line).is_some() {
            let mut items = Vec::new();
            while i < lines.len() {
                match bullet_prefix(lines[i].trim()) {
                    Some(rest) => {
                        items.push(AdfNode::list_item(vec![AdfNode::paragraph(parse_inline(
                            rest,
                        ))]));
                        i += 1;
                    }
                    None => break,
                }
            }
            blocks.push(AdfNode::bullet_list(items));
            continue;
        }

        if ordered_prefix(line).is_some() {
            let mut items = Vec::new();
            while i < lines.len() {
                match ordered_prefix(lines[i].trim()) {
                    Some(rest) => {
                        items.push(AdfNode::list_item(vec![AdfNode::paragraph(parse_inline(
                            rest,
                        ))]));
                        i += 1;
                    }
                    None => break,
                }
            }
            blocks.push(AdfNode::ordered_list(items));
            continue;
        }

        // Plain paragraph: consecutive non-special lines fold into one.
        let mut paragraph_lines = vec![line];
        i += 1;
        while i < lines.len() {
            let next = lines[i].trim();
            if next.is_empty() || is_block_marker(next) {
                break;
            }
            paragraph_lines.push(next);
            i += 1;
        }
        blocks.push(AdfNode::paragraph(parse_inline(&paragraph_lines.join(" "))));
    }

    AdfNode::doc(blocks)
}

fn heading_prefix(line: &str) -> Option<(u32, &str)> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if (1..=3).contains(&hashes) {
        line[hashes..]
            .strip_prefix(' ')
            .map(|rest| (hashes as u32, rest))
    } else {
        None
    }
}

fn bullet_prefix(line: &str) -> Option<&str> {
    line.strip_prefix("- ").or_else(|| line.strip_prefix("* "))
}

fn ordered_prefix(line: &str) -> Option<&str> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    line[digits..].strip_prefix(". ")
}

fn is_rule(line: &str) -> bool {
    line.len() >= 3
        && (line.chars().all(|c| c == '-') || line.chars().all(|c| c == '*'))
}

fn is_block_marker(line: &str) -> bool {
    heading_prefix(line).is_some()
        || bullet_prefix(line).is_some()
        || ordered_prefix(line).is_some()
        || is_rule(line)
        || line.starts_with('>')
        || line.starts_with("```")
}

fn parse_inline(text: &str) -> Vec<AdfNode> {
    let chars: Vec<char> = text.chars().collect();
    let mut nodes = Vec::new();
    let mut plain = String::new();
    let mut i = 0;

    while i < chars.len() {
        // Bold: **text**
        if chars[i] == '*' && chars.get(i + 1) == Some(&'*') {
            if let Some(end) = find_double_star(&chars, i + 2) {
                flush_plain(&mut plain, &mut nodes);
                let inner: String = chars[i + 2..end].iter().collect();
                nodes.push(AdfNode::marked_text(&inner, vec![Mark::strong()]));
                i = end + 2;
                continue;
            }
        }

        // Italic: *text*
        if chars[i] == '*' {
            if let Some(end) = find_char(&chars, i + 1, '*') {
                if end > i + 1 {
                    flush_plain(&mut plain, &mut nodes);
                    let inner: String = chars[i + 1..end].iter().collect();
                    nodes.push(AdfNode::marked_text(&inner, vec![Mark::em()]));
                    i = end + 1;
                    continue;
                }
            }
        }

        // Inline code: `text`
        if chars[i] == '`' {
            if let Some(end) = find_char(&chars, i + 1, '`') {
                flush_plain(&mut plain, &mut nodes);
                let inner: String = chars[i + 1..end].iter().collect();
                nodes.push(AdfNode::marked_text(&inner, vec![Mark::code()]));
                i = end + 1;
                continue;
            }
        }

        // Link: [label](href)
        if chars[i] == '[' {
            if let Some(close) = find_char(&chars, i + 1, ']') {
                if chars.get(close + 1) == Some(&'(') {
                    if let Some(end) = find_char(&chars, close + 2, ')') {
                        flush_plain(&mut plain, &mut nodes);
                        let label: String = chars[i + 1..close].iter().collect();
                        let href: String = chars[close + 2..end].iter().collect();
                        nodes.push(AdfNode::marked_text(&label, vec![Mark::link(&href)]));
                        i = end + 1;
                        continue;
                    }
                }
            }
        }

        // Emoji shortcode: :shortname:
        if chars[i] == ':' {
            if let Some(end) = find_char(&chars, i + 1, ':') {
                let name: String = chars[i + 1..end].iter().collect();
                if !name.is_empty() && name.chars().all(is_shortcode_char) {
                    flush_plain(&mut plain, &mut nodes);
                    nodes.push(AdfNode::emoji(&format!(":{name}:")));
                    i = end + 1;
                    continue;
                }
            }
        }

        plain.push(chars[i]);
        i += 1;
    }

    flush_plain(&mut plain, &mut nodes);
    nodes
}

fn flush_plain(plain: &mut String, nodes: &mut Vec<AdfNode>) {
    if !plain.is_empty() {
        nodes.push(AdfNode::text(plain));
        plain.clear();
    }
}

fn find_char(chars: &[char], from: usize, needle: char) -> Option<usize> {
    (from..chars.len()).find(|&i| chars[i] == needle)
}

fn find_double_star(chars: &[char], from: usize) -> Option<usize> {
    (from..chars.len().saturating_sub(1)).find(|&i| chars[i] == '*' && chars[i + 1] == '*')
}

fn is_shortcode_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+')
}
