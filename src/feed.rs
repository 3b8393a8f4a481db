//! Feed document parsing.
//!
//! Parsing is split in two steps so each can be tested without a network:
//! [`parse_feed`] walks the XML and collects the raw text of the fields we care
//! about, [`build_feed`] turns that into the JSON shape handed to clients.
//! RSS 2.0 (`channel`/`item`) and Atom (`feed`/`entry`) are both understood.

use once_cell::sync::Lazy;
use quick_xml::escape::{resolve_html5_entity, resolve_predefined_entity, unescape_with};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;

use crate::data_models::{FeedItem, FeedResult, UNTITLED};
use crate::error::RelayError;

/// First double-quoted `src` of the first `<img>` tag.
static IMG_SRC_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img[^>]+src="([^"]+)""#).expect("Invalid img src pattern")
});

/// Raw channel data as it appeared in the document.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub items: Vec<ParsedItem>,
}

/// Raw item fields; `None` means the element was not present at all.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParsedItem {
    pub title: Option<String>,
    pub description: Option<String>,
    pub pub_date: Option<String>,
    pub link: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Format {
    Rss,
    Atom,
}

impl Format {
    fn container(self) -> &'static str {
        match self {
            Format::Rss => "channel",
            Format::Atom => "feed",
        }
    }

    fn item(self) -> &'static str {
        match self {
            Format::Rss => "item",
            Format::Atom => "entry",
        }
    }

    fn field(self, name: &str) -> Option<Field> {
        match (self, name) {
            (_, "title") => Some(Field::Title),
            (_, "link") => Some(Field::Link),
            (Format::Rss, "description") => Some(Field::Description),
            (Format::Rss, "pubDate") => Some(Field::PubDate),
            (Format::Atom, "content") => Some(Field::Description),
            (Format::Atom, "summary") => Some(Field::Summary),
            (Format::Atom, "published") => Some(Field::PubDate),
            (Format::Atom, "updated") => Some(Field::Updated),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Title,
    Description,
    Summary,
    PubDate,
    Updated,
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Target {
    ChannelTitle,
    Item(Field),
}

/// Text being collected for one element, closed when the stack unwinds to `depth`.
struct Capture {
    target: Target,
    depth: usize,
    text: String,
}

#[derive(Default)]
struct ItemBuilder {
    title: Option<String>,
    description: Option<String>,
    summary: Option<String>,
    pub_date: Option<String>,
    updated: Option<String>,
    link: Option<String>,
}

impl ItemBuilder {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Title => &mut self.title,
            Field::Description => &mut self.description,
            Field::Summary => &mut self.summary,
            Field::PubDate => &mut self.pub_date,
            Field::Updated => &mut self.updated,
            Field::Link => &mut self.link,
        }
    }

    fn build(self) -> ParsedItem {
        ParsedItem {
            title: self.title,
            description: self.description.or(self.summary),
            pub_date: self.pub_date.or(self.updated),
            link: self.link,
        }
    }
}

/// Parse a feed document into its raw channel title and items, in document order.
pub fn parse_feed(xml: &str) -> Result<ParsedFeed, RelayError> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut detected: Option<Format> = None;
    let mut stack: Vec<String> = Vec::new();
    let mut feed = ParsedFeed::default();

    let mut current_item: Option<(ItemBuilder, usize)> = None;
    let mut capture: Option<Capture> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                let format = *detected.get_or_insert_with(|| detect_format(&name));

                if capture.is_none() {
                    capture =
                        open_element(format, &name, &e, &stack, &mut feed, &mut current_item);
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                let format = *detected.get_or_insert_with(|| detect_format(&name));

                if capture.is_none() {
                    // An empty element still counts as present, with empty text.
                    if let Some(open) =
                        open_element(format, &name, &e, &stack, &mut feed, &mut current_item)
                    {
                        finish_capture(open, &mut feed, &mut current_item);
                    }
                    if current_item.as_ref().is_some_and(|(_, d)| *d == stack.len()) {
                        if let Some((builder, _)) = current_item.take() {
                            feed.items.push(builder.build());
                        }
                    }
                }
            }
            Ok(Event::End(_)) => {
                stack.pop();
                let depth = stack.len();

                if capture.as_ref().is_some_and(|c| c.depth == depth) {
                    if let Some(done) = capture.take() {
                        finish_capture(done, &mut feed, &mut current_item);
                    }
                }
                if current_item.as_ref().is_some_and(|(_, d)| *d == depth) {
                    if let Some((builder, _)) = current_item.take() {
                        feed.items.push(builder.build());
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(capture) = capture.as_mut() {
                    capture.text.push_str(&decode_text(&String::from_utf8_lossy(&e)));
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(capture) = capture.as_mut() {
                    capture.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(RelayError::ParseFailure(format!(
                    "XML parse error at position {}: {}",
                    reader.error_position(),
                    e
                )));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(feed)
}

/// Resolve entity references one at a time. Feeds routinely carry HTML
/// entities XML does not define; those resolve through the HTML5 table and
/// anything still unknown is kept verbatim.
fn decode_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        let end = tail[1..]
            .find(|c: char| c == ';' || c == '&' || c.is_whitespace())
            .map(|i| i + 1)
            .filter(|&i| tail.as_bytes()[i] == b';');

        match end {
            Some(end) => {
                let reference = &tail[..=end];
                match unescape_with(reference, resolve_entity) {
                    Ok(text) => out.push_str(&text),
                    Err(_) => out.push_str(reference),
                }
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn resolve_entity(entity: &str) -> Option<&'static str> {
    resolve_predefined_entity(entity).or_else(|| resolve_html5_entity(entity))
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn detect_format(root: &str) -> Format {
    if root == "feed" {
        Format::Atom
    } else {
        Format::Rss
    }
}

/// Handle an opening tag, returning the capture it starts, if any.
fn open_element(
    format: Format,
    name: &str,
    e: &BytesStart,
    stack: &[String],
    feed: &mut ParsedFeed,
    current_item: &mut Option<(ItemBuilder, usize)>,
) -> Option<Capture> {
    let depth = stack.len();

    if current_item.is_none() {
        if name == format.item() {
            *current_item = Some((ItemBuilder::default(), depth));
            return None;
        }
        let under_container = stack.last().is_some_and(|p| p == format.container());
        if name == "title" && under_container && feed.title.is_none() {
            return Some(Capture {
                target: Target::ChannelTitle,
                depth,
                text: String::new(),
            });
        }
        return None;
    }

    let (builder, _) = current_item.as_mut()?;
    let field = format.field(name)?;
    if builder.slot(field).is_some() {
        return None;
    }
    if format == Format::Atom && field == Field::Link {
        if !is_alternate_link(e) {
            return None;
        }
        if let Some(href) = attribute(e, "href") {
            *builder.slot(field) = Some(href);
            return None;
        }
    }
    Some(Capture {
        target: Target::Item(field),
        depth,
        text: String::new(),
    })
}

fn finish_capture(
    capture: Capture,
    feed: &mut ParsedFeed,
    current_item: &mut Option<(ItemBuilder, usize)>,
) {
    match capture.target {
        Target::ChannelTitle => feed.title = Some(capture.text),
        Target::Item(field) => {
            if let Some((builder, _)) = current_item.as_mut() {
                *builder.slot(field) = Some(capture.text);
            }
        }
    }
}

fn attribute(e: &BytesStart, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == key.as_bytes())
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

fn is_alternate_link(e: &BytesStart) -> bool {
    match attribute(e, "rel") {
        None => true,
        Some(rel) => rel == "alternate",
    }
}

/// Find the first `<img src="...">` in an item's markup.
pub fn extract_image_url(content: &str) -> Option<String> {
    IMG_SRC_PATTERN
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Turn one parsed item into its response shape, filling in defaults.
pub fn to_feed_item(item: ParsedItem, source: &str, index: usize, cached_at: i64) -> FeedItem {
    let title = item
        .title
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
        .trim()
        .to_string();
    let content = item.description.unwrap_or_default();
    let image_url = extract_image_url(&content);

    FeedItem {
        id: format!("{}-{}", source, index),
        title,
        content,
        pub_date: item.pub_date.unwrap_or_default(),
        link: item.link.unwrap_or_default(),
        source: source.to_string(),
        image_url,
        cached_at,
    }
}

pub fn build_feed(parsed: ParsedFeed, source: &str, cached_at: i64) -> FeedResult {
    FeedResult {
        title: parsed.title.unwrap_or_default().trim().to_string(),
        items: parsed
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| to_feed_item(item, source, index, cached_at))
            .collect(),
    }
}
