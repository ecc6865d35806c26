//! Block-level document model
//!
//! Parses article HTML into an element tree and the list of block-level
//! units (paragraphs, headings, lists, code) that highlights anchor to.
//! Inline formatting never becomes a highlight target, so anchors survive
//! changes to emphasis, links and the like.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use tracing::debug;

use super::sanitize::sanitize_html;
use super::surface::{BlockIndex, ContentSurface, ElementId};
use super::text::{first_chars, last_chars, normalize_whitespace};
use crate::anchor::{AnchorPatch, HighlightAnchor};
use crate::error::Result;

/// Elements that form block-level units on their own
const BLOCK_TAGS: &[&str] = &[
    "p", "code", "pre", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Attributes that mark any element as an anchorable block
const ANCHOR_ATTRIBUTES: &[&str] = &["data-omnivore-anchor-idx", "data-anchor-idx"];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text is never reader-visible
const SKIP_TAGS: &[&str] = &["head", "title", "script", "style", "noscript", "template"];

/// Start tags that implicitly close an open `<p>`
const CLOSES_PARAGRAPH: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "figure", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p", "pre",
    "section", "table", "ul",
];

/// Elements an implicit `<p>` close does not search past
const PARAGRAPH_SCOPE: &[&str] = &[
    "blockquote", "div", "li", "td", "th", "section", "article", "table", "button",
];

/// Kind of block-level unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Paragraph,
    Heading(u8),
    List,
    Code,
    Preformatted,
    /// Any other element explicitly carrying an anchor index attribute
    Anchored,
}

impl BlockKind {
    fn from_tag(tag: &str, anchored: bool) -> Option<Self> {
        if !anchored && !BLOCK_TAGS.contains(&tag) {
            return None;
        }
        let kind = match tag {
            "p" => BlockKind::Paragraph,
            "ul" | "ol" => BlockKind::List,
            "code" => BlockKind::Code,
            "pre" => BlockKind::Preformatted,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                BlockKind::Heading(tag[1..].parse().unwrap_or(1))
            }
            _ => BlockKind::Anchored,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone)]
struct ElementNode {
    tag: String,
    parent: Option<ElementId>,
    block: Option<BlockIndex>,
}

/// A block-level unit of the document
#[derive(Debug, Clone)]
pub struct BlockUnit {
    pub index: BlockIndex,
    pub kind: BlockKind,
    pub element: ElementId,
    /// Text content, including the text of descendants
    pub text: String,
    /// Byte range within the flattened document text
    start: usize,
    end: usize,
}

/// Parsed article content
#[derive(Debug, Clone, Default)]
pub struct BlockDocument {
    elements: Vec<ElementNode>,
    blocks: Vec<BlockUnit>,
    /// Flattened document text; block boundaries are separated by whitespace
    text: String,
}

impl BlockDocument {
    /// Sanitize and parse article HTML
    pub fn parse(html: &str) -> Result<Self> {
        let sanitized = sanitize_html(html)?;
        Self::parse_sanitized(&sanitized)
    }

    /// Parse HTML that has already been sanitized
    pub fn parse_sanitized(html: &str) -> Result<Self> {
        let mut reader = Reader::from_str(html);
        reader.trim_text(false);
        reader.check_end_names(false);

        let mut builder = TreeBuilder::default();

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    let (tag, anchored) = tag_info(&e);
                    builder.start(tag, anchored);
                }
                Event::Empty(e) => {
                    let (tag, anchored) = tag_info(&e);
                    builder.empty(tag, anchored);
                }
                Event::End(e) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                    builder.end(&tag);
                }
                Event::Text(t) => {
                    let raw = String::from_utf8_lossy(&t);
                    builder.text(&html_escape::decode_html_entities(&raw));
                }
                Event::CData(t) => {
                    builder.text(&String::from_utf8_lossy(&t));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let document = builder.finish();
        debug!(
            elements = document.elements.len(),
            blocks = document.blocks.len(),
            "Parsed article content"
        );
        Ok(document)
    }

    pub fn blocks(&self) -> &[BlockUnit] {
        &self.blocks
    }

    pub fn block(&self, index: BlockIndex) -> Option<&BlockUnit> {
        self.blocks.get(index.0)
    }

    /// Flattened document text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Tag name of an element
    pub fn tag(&self, element: ElementId) -> Option<&str> {
        self.elements.get(element.0).map(|e| e.tag.as_str())
    }

    /// All elements with the given tag name, in document order
    pub fn elements_by_tag(&self, tag: &str) -> Vec<ElementId> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| e.tag.eq_ignore_ascii_case(tag))
            .map(|(idx, _)| ElementId(idx))
            .collect()
    }

    /// First block whose text contains `needle`
    pub fn find_block(&self, needle: &str) -> Option<&BlockUnit> {
        self.blocks.iter().find(|b| b.text.contains(needle))
    }

    /// View of the document with the renderer's current page position
    pub fn with_page(&self, page_index: usize, total_pages: usize) -> PageView<'_> {
        let fraction = if total_pages == 0 {
            None
        } else {
            Some((page_index.min(total_pages - 1) + 1) as f64 / total_pages as f64)
        };
        PageView {
            document: self,
            fraction,
        }
    }

    /// Relocate an anchor after reflow or re-serialization.
    ///
    /// The ordinal hint wins when its text still matches; otherwise blocks
    /// with the same normalized quote are ranked by how well their
    /// surrounding text matches the stored prefix/suffix, then by distance
    /// from the ordinal hint.
    pub fn locate(&self, anchor: &HighlightAnchor) -> Option<BlockIndex> {
        let quote = normalize_whitespace(&anchor.quote);
        if quote.is_empty() {
            return None;
        }

        let hint = anchor.position_anchor_index as usize;
        if let Some(block) = self.blocks.get(hint) {
            let matches = match anchor.patch.as_deref().and_then(AnchorPatch::parse) {
                Some(patch) => patch.matches(&block.text),
                None => normalize_whitespace(&block.text) == quote,
            };
            if matches {
                return Some(block.index);
            }
        }

        let prefix = normalize_whitespace(&anchor.prefix);
        let suffix = normalize_whitespace(&anchor.suffix);

        self.blocks
            .iter()
            .filter(|b| normalize_whitespace(&b.text) == quote)
            .max_by_key(|b| {
                let before = normalize_whitespace(&self.text[..b.start]);
                let after = normalize_whitespace(&self.text[b.end..]);
                let context_score = usize::from(!prefix.is_empty() && before.ends_with(&prefix))
                    + usize::from(!suffix.is_empty() && after.starts_with(&suffix));
                // Closer to the hint ranks higher
                (context_score, std::cmp::Reverse(b.index.0.abs_diff(hint)))
            })
            .map(|b| b.index)
    }
}

impl ContentSurface for BlockDocument {
    fn resolve_block(&self, target: ElementId) -> Option<BlockIndex> {
        let mut current = Some(target);
        while let Some(id) = current {
            let node = self.elements.get(id.0)?;
            if let Some(block) = node.block {
                return Some(block);
            }
            current = node.parent;
        }
        None
    }

    fn contains(&self, block: BlockIndex, target: ElementId) -> bool {
        let Some(unit) = self.blocks.get(block.0) else {
            return false;
        };
        let mut current = Some(target);
        while let Some(id) = current {
            if id == unit.element {
                return true;
            }
            current = self.elements.get(id.0).and_then(|n| n.parent);
        }
        false
    }

    fn block_text(&self, block: BlockIndex) -> Option<&str> {
        self.blocks.get(block.0).map(|b| b.text.as_str())
    }

    fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn text_before(&self, block: BlockIndex, max_chars: usize) -> String {
        self.blocks
            .get(block.0)
            .map(|b| last_chars(&self.text[..b.start], max_chars).to_string())
            .unwrap_or_default()
    }

    fn text_after(&self, block: BlockIndex, max_chars: usize) -> String {
        self.blocks
            .get(block.0)
            .map(|b| first_chars(&self.text[b.end..], max_chars).to_string())
            .unwrap_or_default()
    }

    fn block_offset(&self, block: BlockIndex) -> Option<usize> {
        self.blocks
            .get(block.0)
            .map(|b| self.text[..b.start].chars().count())
    }

    fn text_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A document paired with the renderer's current page position
#[derive(Debug, Clone, Copy)]
pub struct PageView<'a> {
    document: &'a BlockDocument,
    fraction: Option<f64>,
}

impl ContentSurface for PageView<'_> {
    fn resolve_block(&self, target: ElementId) -> Option<BlockIndex> {
        self.document.resolve_block(target)
    }

    fn contains(&self, block: BlockIndex, target: ElementId) -> bool {
        self.document.contains(block, target)
    }

    fn block_text(&self, block: BlockIndex) -> Option<&str> {
        self.document.block_text(block)
    }

    fn block_count(&self) -> usize {
        self.document.block_count()
    }

    fn text_before(&self, block: BlockIndex, max_chars: usize) -> String {
        self.document.text_before(block, max_chars)
    }

    fn text_after(&self, block: BlockIndex, max_chars: usize) -> String {
        self.document.text_after(block, max_chars)
    }

    fn block_offset(&self, block: BlockIndex) -> Option<usize> {
        self.document.block_offset(block)
    }

    fn text_len(&self) -> usize {
        self.document.text_len()
    }

    fn page_fraction(&self) -> Option<f64> {
        self.fraction
    }
}

fn tag_info(e: &BytesStart<'_>) -> (String, bool) {
    let tag = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
    let anchored = e.html_attributes().flatten().any(|attr| {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        ANCHOR_ATTRIBUTES.contains(&key.as_str())
    });
    (tag, anchored)
}

/// Builds the element tree from a tolerant stream of HTML events
#[derive(Default)]
struct TreeBuilder {
    elements: Vec<ElementNode>,
    blocks: Vec<BlockUnit>,
    text: String,
    open: Vec<ElementId>,
}

impl TreeBuilder {
    fn start(&mut self, tag: String, anchored: bool) {
        let is_void = VOID_TAGS.contains(&tag.as_str());
        let id = self.open_element(tag, anchored);
        if is_void {
            self.close_element(id);
        } else {
            self.open.push(id);
        }
    }

    fn empty(&mut self, tag: String, anchored: bool) {
        let id = self.open_element(tag, anchored);
        self.close_element(id);
    }

    fn end(&mut self, tag: &str) {
        let Some(pos) = self
            .open
            .iter()
            .rposition(|id| self.elements[id.0].tag == tag)
        else {
            return;
        };
        let closed: Vec<ElementId> = self.open.drain(pos..).collect();
        for id in closed.into_iter().rev() {
            self.close_element(id);
        }
    }

    fn text(&mut self, s: &str) {
        let skipped = self
            .open
            .iter()
            .any(|id| SKIP_TAGS.contains(&self.elements[id.0].tag.as_str()));
        if skipped || s.is_empty() {
            return;
        }

        self.text.push_str(s);
        for id in &self.open {
            if let Some(block) = self.elements[id.0].block {
                self.blocks[block.0].text.push_str(s);
            }
        }
    }

    fn finish(mut self) -> BlockDocument {
        let still_open: Vec<ElementId> = self.open.drain(..).collect();
        for id in still_open.into_iter().rev() {
            self.close_element(id);
        }
        BlockDocument {
            elements: self.elements,
            blocks: self.blocks,
            text: self.text,
        }
    }

    fn open_element(&mut self, tag: String, anchored: bool) -> ElementId {
        self.close_implied(&tag);

        let id = ElementId(self.elements.len());
        let parent = self.open.last().copied();
        let mut block = None;

        if let Some(kind) = BlockKind::from_tag(&tag, anchored) {
            self.separate();
            let index = BlockIndex(self.blocks.len());
            self.blocks.push(BlockUnit {
                index,
                kind,
                element: id,
                text: String::new(),
                start: self.text.len(),
                end: self.text.len(),
            });
            block = Some(index);
        }

        self.elements.push(ElementNode { tag, parent, block });
        id
    }

    fn close_element(&mut self, id: ElementId) {
        if let Some(block) = self.elements[id.0].block {
            self.blocks[block.0].end = self.text.len();
            self.separate();
        }
    }

    /// HTML end-tag omission for `<p>` and `<li>`
    fn close_implied(&mut self, tag: &str) {
        let target = if CLOSES_PARAGRAPH.contains(&tag) {
            self.open_in_scope("p", PARAGRAPH_SCOPE)
        } else if tag == "li" {
            self.open_in_scope("li", &["ul", "ol"])
        } else {
            None
        };

        if let Some(pos) = target {
            let closed: Vec<ElementId> = self.open.drain(pos..).collect();
            for id in closed.into_iter().rev() {
                self.close_element(id);
            }
        }
    }

    fn open_in_scope(&self, tag: &str, boundaries: &[&str]) -> Option<usize> {
        for (pos, id) in self.open.iter().enumerate().rev() {
            let open_tag = self.elements[id.0].tag.as_str();
            if open_tag == tag {
                return Some(pos);
            }
            if boundaries.contains(&open_tag) {
                return None;
            }
        }
        None
    }

    /// Keep adjacent blocks from running together in the flattened text
    fn separate(&mut self) {
        if self.text.chars().last().is_some_and(|c| !c.is_whitespace()) {
            self.text.push('\n');
        }
    }
}
