//! A small, forgiving HTML/SVG reader for template markup.
//!
//! This is not an HTML5 tree builder: there are no implied end tags and no foster parenting.
//! Unmatched end tags are dropped and open elements are closed at the end of input.
//! A self-closing non-void tag (`<x-counter/>`) closes immediately, as if it had been written as `<x-counter></x-counter>`.

use crate::dom::Namespace;
use memchr::memchr;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MarkupNode {
	Element(MarkupElement),
	Text(String),
	Comment(String),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MarkupElement {
	pub name: String,
	pub namespace: Namespace,
	/// In source order, names case-preserved, duplicates retained.
	pub attributes: Vec<(String, String)>,
	pub children: Vec<MarkupNode>,
}

pub(crate) fn is_void_element(name: &str) -> bool {
	matches!(
		name,
		"area" | "base" | "br" | "col" | "embed" | "hr" | "img" | "input" | "link" | "meta" | "param" | "source" | "track" | "wbr"
	)
}

/// Elements whose content is a single run of text.
/// Only `textarea` and `title` decode character references in it.
pub(crate) fn is_text_only_element(name: &str) -> bool {
	matches!(name, "script" | "style" | "textarea" | "title")
}

fn decodes_entities_in_text(name: &str) -> bool {
	matches!(name, "textarea" | "title")
}

const COMMENT_START: &str = "<!--";
const COMMENT_END: &str = "-->";

/// Decodes `&amp;`, `&lt;`, `&gt;`, `&quot;`, `&apos;`, `&nbsp;` and semicolon-terminated numeric references.
/// Anything else is left as written.
pub(crate) fn decode_entities(text: &str) -> String {
	if memchr(b'&', text.as_bytes()).is_none() {
		return text.to_string();
	}

	let mut out = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(start) = rest.find('&') {
		out.push_str(&rest[..start]);
		rest = &rest[start..];
		let decoded = rest.find(';').filter(|&end| end <= 10).and_then(|end| {
			let decoded = match &rest[1..end] {
				"amp" => Some('&'),
				"lt" => Some('<'),
				"gt" => Some('>'),
				"quot" => Some('"'),
				"apos" => Some('\''),
				"nbsp" => Some('\u{a0}'),
				numeric if numeric.starts_with("#x") || numeric.starts_with("#X") => u32::from_str_radix(&numeric[2..], 16).ok().and_then(char::from_u32),
				numeric if numeric.starts_with('#') => numeric[1..].parse::<u32>().ok().and_then(char::from_u32),
				_ => None,
			};
			decoded.map(|c| (c, end))
		});
		match decoded {
			Some((c, end)) => {
				out.push(c);
				rest = &rest[end + 1..];
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

struct TreeBuilder {
	root_namespace: Namespace,
	roots: Vec<MarkupNode>,
	open: Vec<MarkupElement>,
}
impl TreeBuilder {
	fn push(&mut self, node: MarkupNode) {
		match self.open.last_mut() {
			Some(parent) => parent.children.push(node),
			None => self.roots.push(node),
		}
	}

	fn close_top(&mut self) {
		if let Some(element) = self.open.pop() {
			self.push(MarkupNode::Element(element))
		}
	}

	fn child_namespace(&self) -> Namespace {
		match self.open.last() {
			Some(parent) if parent.namespace == Namespace::Svg && parent.name == "foreignObject" => Namespace::Html,
			Some(parent) => parent.namespace,
			None => self.root_namespace,
		}
	}

	fn end_tag(&mut self, name: &str) {
		let position = self.open.iter().rposition(|element| match element.namespace {
			Namespace::Html => element.name.eq_ignore_ascii_case(name),
			Namespace::Svg => element.name == name || element.name.eq_ignore_ascii_case(name),
		});
		if let Some(position) = position {
			while self.open.len() > position {
				self.close_top()
			}
		}
	}

	fn finish(mut self) -> Vec<MarkupNode> {
		while !self.open.is_empty() {
			self.close_top()
		}
		self.roots
	}
}

fn is_name_end(b: u8) -> bool {
	b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
	while i < bytes.len() && bytes[i].is_ascii_whitespace() {
		i += 1
	}
	i
}

/// Finds `</name` (ASCII case-insensitive) followed by optional whitespace and `>`.
/// Returns the start of the close tag and the index just past it.
fn find_close_tag(input: &str, from: usize, name: &str) -> Option<(usize, usize)> {
	let bytes = input.as_bytes();
	let mut i = from;
	while i < bytes.len() {
		i += memchr(b'<', &bytes[i..])?;
		let name_start = i + 2;
		let name_end = name_start + name.len();
		if bytes.get(i + 1) == Some(&b'/') && bytes.len() >= name_end && bytes[name_start..name_end].eq_ignore_ascii_case(name.as_bytes()) {
			let k = skip_whitespace(bytes, name_end);
			if bytes.get(k) == Some(&b'>') {
				return Some((i, k + 1));
			}
		}
		i += 1;
	}
	None
}

struct StartTag {
	name: String,
	attributes: Vec<(String, String)>,
	self_closing: bool,
	end: usize,
}

/// `i` points just past `<`. Returns [`None`] for a tag that isn't terminated.
fn read_start_tag(input: &str, mut i: usize) -> Option<StartTag> {
	let bytes = input.as_bytes();
	let name_start = i;
	while i < bytes.len() && !is_name_end(bytes[i]) {
		i += 1
	}
	let name = input[name_start..i].to_string();

	let mut attributes = Vec::new();
	loop {
		i = skip_whitespace(bytes, i);
		match bytes.get(i)? {
			b'>' => {
				return Some(StartTag {
					name,
					attributes,
					self_closing: false,
					end: i + 1,
				})
			}
			b'/' if bytes.get(i + 1) == Some(&b'>') => {
				return Some(StartTag {
					name,
					attributes,
					self_closing: true,
					end: i + 2,
				})
			}
			b'/' => {
				i += 1;
				continue;
			}
			_ => (),
		}

		let attribute_start = i;
		while i < bytes.len() && !is_name_end(bytes[i]) && bytes[i] != b'=' {
			i += 1
		}
		// A lone `=` still names an attribute, so always make progress.
		if i == attribute_start {
			i += 1
		}
		let attribute_name = input[attribute_start..i].to_string();

		let after_name = skip_whitespace(bytes, i);
		if bytes.get(after_name) != Some(&b'=') {
			attributes.push((attribute_name, String::new()));
			continue;
		}
		i = skip_whitespace(bytes, after_name + 1);
		let value = match *bytes.get(i)? {
			quote @ b'"' | quote @ b'\'' => {
				let value_start = i + 1;
				let value_end = value_start + memchr(quote, &bytes[value_start..])?;
				i = value_end + 1;
				&input[value_start..value_end]
			}
			_ => {
				let value_start = i;
				while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
					i += 1
				}
				&input[value_start..i]
			}
		};
		attributes.push((attribute_name, decode_entities(value)));
	}
}

/// Reads `input` as a sequence of sibling nodes.
///
/// `namespace` is the namespace of the (virtual) parent, so SVG templates can be read without an `<svg>` wrapper.
pub(crate) fn parse(input: &str, namespace: Namespace) -> Vec<MarkupNode> {
	let bytes = input.as_bytes();
	let mut builder = TreeBuilder {
		root_namespace: namespace,
		roots: Vec::new(),
		open: Vec::new(),
	};

	let mut text_start = 0;
	let mut i = 0;
	// Invariant: slices are only cut at ASCII structural bytes, so they always fall on UTF-8 boundaries.
	while i < bytes.len() {
		i += match memchr(b'<', &bytes[i..]) {
			Some(offset) => offset,
			None => bytes.len() - i,
		};
		if i >= bytes.len() {
			break;
		}

		let flush_text = |builder: &mut TreeBuilder, end: usize| {
			if end > text_start {
				builder.push(MarkupNode::Text(decode_entities(&input[text_start..end])))
			}
		};

		if input[i..].starts_with(COMMENT_START) {
			flush_text(&mut builder, i);
			let data_start = i + COMMENT_START.len();
			let (data_end, next) = match input[data_start..].find(COMMENT_END) {
				Some(end) => (data_start + end, data_start + end + COMMENT_END.len()),
				None => (bytes.len(), bytes.len()),
			};
			builder.push(MarkupNode::Comment(input[data_start..data_end].to_string()));
			i = next;
			text_start = i;
			continue;
		}

		match bytes.get(i + 1) {
			// Doctype, processing instructions, CDATA and other bogus comments are dropped.
			Some(b'!') | Some(b'?') => {
				flush_text(&mut builder, i);
				i = match memchr(b'>', &bytes[i..]) {
					Some(end) => i + end + 1,
					None => bytes.len(),
				};
				text_start = i;
			}

			Some(b'/') if bytes.get(i + 2).map_or(false, u8::is_ascii_alphabetic) => {
				flush_text(&mut builder, i);
				let name_start = i + 2;
				let mut name_end = name_start;
				while name_end < bytes.len() && !is_name_end(bytes[name_end]) {
					name_end += 1
				}
				builder.end_tag(&input[name_start..name_end]);
				i = match memchr(b'>', &bytes[name_end..]) {
					Some(end) => name_end + end + 1,
					None => bytes.len(),
				};
				text_start = i;
			}

			Some(b) if b.is_ascii_alphabetic() => {
				let tag = match read_start_tag(input, i + 1) {
					Some(tag) => tag,
					None => {
						// Unterminated tag: drop the rest of the input, like a browser would.
						flush_text(&mut builder, i);
						text_start = bytes.len();
						break;
					}
				};
				flush_text(&mut builder, i);
				i = tag.end;
				text_start = i;

				let namespace = if tag.name.eq_ignore_ascii_case("svg") { Namespace::Svg } else { builder.child_namespace() };
				let name = match namespace {
					Namespace::Html => tag.name.to_ascii_lowercase(),
					Namespace::Svg if tag.name.eq_ignore_ascii_case("svg") => "svg".to_string(),
					Namespace::Svg => tag.name,
				};
				let element = MarkupElement {
					name,
					namespace,
					attributes: tag.attributes,
					children: Vec::new(),
				};

				if namespace == Namespace::Html && is_void_element(&element.name) {
					builder.push(MarkupNode::Element(element));
					continue;
				}
				let text_only = namespace == Namespace::Html && is_text_only_element(&element.name);
				let element_name = element.name.clone();
				builder.open.push(element);
				if tag.self_closing {
					builder.close_top();
					continue;
				}
				if text_only {
					let (text_end, next) = find_close_tag(input, i, &element_name).unwrap_or((bytes.len(), bytes.len()));
					let text = &input[i..text_end];
					if !text.is_empty() {
						let text = if decodes_entities_in_text(&element_name) { decode_entities(text) } else { text.to_string() };
						builder.push(MarkupNode::Text(text));
					}
					builder.close_top();
					i = next;
					text_start = i;
				}
			}

			// A stray `<` is text.
			_ => i += 1,
		}
	}
	if text_start < bytes.len() {
		builder.push(MarkupNode::Text(decode_entities(&input[text_start..])))
	}
	builder.finish()
}
