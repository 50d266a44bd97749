//! Recovering HTML scanner.
//!
//! Single-pass tag scanner, not a full DOM parser. Tolerates stray close
//! tags and unknown elements; fails only when a tag is left unterminated
//! at end of input, since section boundaries are then undeterminable.

use super::{ChunkOptions, Section};
use docgraph_core::{AppError, AppResult};

/// Tags whose boundaries imply a paragraph break in the extracted text.
const BLOCK_TAGS: &[&str] = &[
    "p", "div", "section", "header", "footer", "main", "nav", "aside", "ul", "ol", "li", "table",
    "tr", "td", "th", "blockquote", "pre", "figure", "figcaption", "dl", "dt", "dd", "br", "hr",
];

#[derive(Debug)]
enum Token<'a> {
    Text(&'a str),
    Open { name: String, self_closing: bool },
    Close { name: String },
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Next token, or None at end of input. Errors on a tag with no
    /// closing `>` before end of input.
    fn next_token(&mut self) -> AppResult<Option<Token<'a>>> {
        let rest = self.rest();
        if rest.is_empty() {
            return Ok(None);
        }

        if !rest.starts_with('<') {
            let end = rest.find('<').unwrap_or(rest.len());
            let start = self.pos;
            self.pos += end;
            return Ok(Some(Token::Text(&self.input[start..start + end])));
        }

        // Comments and declarations carry no content; skip them.
        if rest.starts_with("<!--") {
            match rest.find("-->") {
                Some(end) => self.pos += end + 3,
                None => self.pos = self.input.len(),
            }
            return self.next_token();
        }
        if rest.starts_with("<!") || rest.starts_with("<?") {
            match rest.find('>') {
                Some(end) => self.pos += end + 1,
                None => {
                    return Err(AppError::Parse(format!(
                        "unterminated markup declaration at byte {}",
                        self.pos
                    )))
                }
            }
            return self.next_token();
        }

        let after = &rest[1..];
        let is_close = after.starts_with('/');
        let name_part = if is_close { &after[1..] } else { after };

        // A '<' not followed by a tag name is literal text.
        if !name_part.starts_with(|c: char| c.is_ascii_alphabetic()) {
            let start = self.pos;
            self.pos += 1;
            return Ok(Some(Token::Text(&self.input[start..start + 1])));
        }

        let end = rest.find('>').ok_or_else(|| {
            AppError::Parse(format!("unterminated tag at byte {}", self.pos))
        })?;
        let inner = &rest[..end];

        let name: String = name_part
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        self.pos += end + 1;

        if is_close {
            Ok(Some(Token::Close { name }))
        } else {
            let self_closing = inner.ends_with('/') || is_void_tag(&name);
            Ok(Some(Token::Open { name, self_closing }))
        }
    }

    /// Skip raw content of a script/style element, past its close tag.
    /// Scans in place rather than lowercasing the remaining input, so
    /// cost is bounded by the element's own length.
    fn skip_raw_content(&mut self, tag: &str) {
        let bytes = self.input.as_bytes();
        let tag_bytes = tag.as_bytes();
        let mut i = self.pos;

        while i < bytes.len() {
            if bytes[i] == b'<'
                && bytes.get(i + 1) == Some(&b'/')
                && bytes.len() - i - 2 >= tag_bytes.len()
                && bytes[i + 2..i + 2 + tag_bytes.len()].eq_ignore_ascii_case(tag_bytes)
            {
                match self.input[i..].find('>') {
                    Some(gt) => self.pos = i + gt + 1,
                    None => self.pos = self.input.len(),
                }
                return;
            }
            i += 1;
        }
        self.pos = self.input.len();
    }
}

fn is_void_tag(name: &str) -> bool {
    matches!(
        name,
        "br" | "hr" | "img" | "input" | "meta" | "link" | "area" | "base" | "col" | "embed"
            | "source" | "track" | "wbr"
    )
}

/// Decode the common named entities plus numeric character references.
/// Unknown entities pass through literally.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        // Entity names are short; a distant ';' means a bare ampersand.
        let semi = rest.find(';').filter(|&i| i <= 12);
        let Some(semi) = semi else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };

        let entity = &rest[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some(' '),
            _ => entity
                .strip_prefix('#')
                .and_then(|num| {
                    if let Some(hex) = num.strip_prefix('x').or_else(|| num.strip_prefix('X')) {
                        u32::from_str_radix(hex, 16).ok()
                    } else {
                        num.parse::<u32>().ok()
                    }
                })
                .and_then(char::from_u32),
        };

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Accumulates extracted text with paragraph breaks and span tracking.
#[derive(Default)]
struct SectionBuffer {
    text: String,
    span_start: Option<usize>,
    span_end: usize,
}

impl SectionBuffer {
    fn push_text(&mut self, raw: &str, at: usize) {
        let decoded = decode_entities(raw);
        let normalized = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
        if normalized.is_empty() {
            return;
        }
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push(' ');
        }
        self.text.push_str(&normalized);
        if self.span_start.is_none() {
            self.span_start = Some(at);
        }
        self.span_end = at + raw.len();
    }

    fn push_break(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with("\n\n") {
            while self.text.ends_with(' ') {
                self.text.pop();
            }
            self.text.push_str("\n\n");
        }
    }

    fn flush(&mut self, heading_path: &[String], out: &mut Vec<Section>) {
        let text = std::mem::take(&mut self.text);
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            out.push(Section {
                heading_path: heading_path.to_vec(),
                text: trimmed.to_string(),
                span: (self.span_start.unwrap_or(0), self.span_end),
            });
        }
        self.span_start = None;
        self.span_end = 0;
    }
}

/// Extract heading-scoped sections from markup.
///
/// When any of the configured section containers occur, only text inside
/// them is extracted; otherwise the whole document is in scope. Headings
/// maintain a path stack: a heading at level `n` truncates the stack to
/// `n` entries, then pushes its own title.
pub(crate) fn extract_sections(html: &str, options: &ChunkOptions) -> AppResult<Vec<Section>> {
    let heading_level = |name: &str| -> Option<usize> {
        options
            .heading_selectors
            .iter()
            .position(|(tag, _)| tag == name)
    };
    let is_container = |name: &str| -> bool {
        options.section_selectors.iter().any(|(tag, _)| tag == name)
    };

    let scoped = document_has_container(html, options)?;

    let mut scanner = Scanner::new(html);
    let mut sections = Vec::new();
    let mut buffer = SectionBuffer::default();
    let mut heading_stack: Vec<String> = Vec::new();
    let mut container_depth = 0usize;

    loop {
        let token_at = scanner.pos;
        let Some(token) = scanner.next_token()? else {
            break;
        };

        let collecting = !scoped || container_depth > 0;

        match token {
            Token::Text(raw) => {
                if collecting {
                    buffer.push_text(raw, token_at);
                }
            }
            Token::Open { name, self_closing } => {
                if name == "script" || name == "style" {
                    if !self_closing {
                        scanner.skip_raw_content(&name);
                    }
                    continue;
                }

                if is_container(&name) && !self_closing {
                    container_depth += 1;
                    continue;
                }

                if let Some(level) = heading_level(&name) {
                    if collecting && !self_closing {
                        buffer.flush(&heading_stack, &mut sections);
                        let title = read_heading_text(&mut scanner, &name)?;
                        heading_stack.truncate(level);
                        if !title.is_empty() {
                            heading_stack.push(title);
                        }
                    } else if !self_closing {
                        // Out-of-scope heading: consume so its text is
                        // not attributed to content.
                        read_heading_text(&mut scanner, &name)?;
                    }
                    continue;
                }

                if collecting && BLOCK_TAGS.contains(&name.as_str()) {
                    buffer.push_break();
                }
            }
            Token::Close { name } => {
                if is_container(&name) {
                    if container_depth > 0 {
                        buffer.flush(&heading_stack, &mut sections);
                        container_depth -= 1;
                    }
                    continue;
                }
                if collecting && BLOCK_TAGS.contains(&name.as_str()) {
                    buffer.push_break();
                }
            }
        }
    }

    buffer.flush(&heading_stack, &mut sections);
    Ok(sections)
}

/// Whether any configured section container opens anywhere in the input.
fn document_has_container(html: &str, options: &ChunkOptions) -> AppResult<bool> {
    if options.section_selectors.is_empty() {
        return Ok(false);
    }
    let mut scanner = Scanner::new(html);
    while let Some(token) = scanner.next_token()? {
        if let Token::Open { name, self_closing: false } = token {
            if name == "script" || name == "style" {
                scanner.skip_raw_content(&name);
                continue;
            }
            if options.section_selectors.iter().any(|(tag, _)| *tag == name) {
                return Ok(true);
            }
        }
    }
    Ok(false)
}

/// Consume tokens up to the heading's close tag, returning its
/// whitespace-normalized text. Markup nested in the heading is dropped,
/// its text kept. Recovers at end of input with whatever was read.
fn read_heading_text(scanner: &mut Scanner<'_>, heading_tag: &str) -> AppResult<String> {
    let mut parts: Vec<String> = Vec::new();

    while let Some(token) = scanner.next_token()? {
        match token {
            Token::Text(raw) => {
                let decoded = decode_entities(raw);
                parts.extend(decoded.split_whitespace().map(str::to_string));
            }
            Token::Close { name } if name == heading_tag => break,
            Token::Open { name, self_closing: false }
                if name == "script" || name == "style" =>
            {
                scanner.skip_raw_content(&name);
            }
            _ => {}
        }
    }

    Ok(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sections(html: &str) -> Vec<Section> {
        extract_sections(html, &ChunkOptions::default()).unwrap()
    }

    #[test]
    fn test_entity_decoding() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("&unknown; &"), "&unknown; &");
    }

    #[test]
    fn test_script_and_style_content_dropped() {
        let s = sections(
            "<p>visible</p><script>var hidden = '<p>not text</p>';</script>\
             <style>p { color: red; }</style><p>also visible</p>",
        );
        let all: String = s.iter().map(|x| x.text.as_str()).collect();
        assert!(all.contains("visible"));
        assert!(all.contains("also visible"));
        assert!(!all.contains("hidden"));
        assert!(!all.contains("color"));
    }

    #[test]
    fn test_script_close_tag_matched_case_insensitively() {
        let s = sections(
            "<p>before</p><SCRIPT>var hidden = 1;</SCRIPT>\
             <script>var also = 2;</Script><p>after</p>",
        );
        let all: String = s.iter().map(|x| x.text.as_str()).collect();
        assert!(all.contains("before"));
        assert!(all.contains("after"));
        assert!(!all.contains("hidden"));
        assert!(!all.contains("also"));
    }

    #[test]
    fn test_comments_dropped() {
        let s = sections("<p>keep</p><!-- <p>drop</p> --><p>keep too</p>");
        let all: String = s.iter().map(|x| x.text.as_str()).collect();
        assert!(all.contains("keep too"));
        assert!(!all.contains("drop"));
    }

    #[test]
    fn test_heading_starts_new_section() {
        let s = sections("<p>preamble</p><h1>Topic</h1><p>body</p>");
        assert_eq!(s.len(), 2);
        assert!(s[0].heading_path.is_empty());
        assert_eq!(s[1].heading_path, vec!["Topic"]);
    }

    #[test]
    fn test_h1_resets_h2() {
        let s = sections(
            "<h1>A</h1><h2>A1</h2><p>one</p><h1>B</h1><p>two</p>",
        );
        let one = s.iter().find(|x| x.text.contains("one")).unwrap();
        assert_eq!(one.heading_path, vec!["A", "A1"]);
        let two = s.iter().find(|x| x.text.contains("two")).unwrap();
        assert_eq!(two.heading_path, vec!["B"]);
    }

    #[test]
    fn test_nested_markup_in_heading() {
        let s = sections("<h1>The <em>Big</em> Idea</h1><p>text</p>");
        assert_eq!(s[0].heading_path, vec!["The Big Idea"]);
    }

    #[test]
    fn test_container_scoping_ignores_outside_text() {
        let s = sections("<header>skip me</header><article><p>inside</p></article>");
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].text, "inside");
    }

    #[test]
    fn test_no_container_means_whole_document() {
        let s = sections("<div><p>everything</p><p>counts</p></div>");
        assert_eq!(s.len(), 1);
        assert!(s[0].text.contains("everything"));
        assert!(s[0].text.contains("counts"));
    }

    #[test]
    fn test_block_tags_produce_paragraph_breaks() {
        let s = sections("<p>first para</p><p>second para</p>");
        assert_eq!(s[0].text, "first para\n\nsecond para");
    }

    #[test]
    fn test_unterminated_tag_errors() {
        let err = extract_sections("<p>ok</p><div attr=", &ChunkOptions::default());
        assert!(matches!(err, Err(AppError::Parse(_))));
    }

    #[test]
    fn test_literal_angle_bracket_is_text() {
        let s = sections("<p>3 < 5 is true</p>");
        assert!(s[0].text.contains("3 < 5"));
    }

    #[test]
    fn test_spans_cover_source_region() {
        let html = "<article><p>alpha beta</p></article>";
        let s = sections(html);
        let (start, end) = s[0].span;
        assert!(html[start..end].contains("alpha beta"));
    }
}
