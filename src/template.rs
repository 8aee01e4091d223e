//! Template identity and structural parsing.
//!
//! A template's static chunks are joined around per-slot sentinel tokens, read as markup and turned into a host fragment.
//! Each sentinel is replaced by a [`Path`] to the node its value will update, and the finished [`TemplateInfo`] is cached
//! by the identity of the chunk array.

use crate::{
	dom::{Dom, Namespace},
	markup::{self, MarkupNode},
	path::{Path, PathKind},
};
use hashbrown::HashMap;
use std::{
	collections::hash_map::RandomState,
	hash::{BuildHasher, Hasher},
	rc::Rc,
};
use tracing::{error, trace, trace_span, warn};

/// Per-engine random token family marking interpolation slots in joined markup.
#[derive(Debug, Clone)]
pub(crate) struct Sentinel {
	prefix: String,
}
impl Sentinel {
	pub fn new() -> Self {
		let seed = RandomState::new().build_hasher().finish();
		Self {
			prefix: format!("wire-dom:{:016x}:", seed),
		}
	}

	fn token(&self, slot: usize) -> String {
		format!("{}{};", self.prefix, slot)
	}

	/// All slots mentioned in `text`, in order of appearance.
	fn slots(&self, text: &str) -> Vec<usize> {
		text.match_indices(&self.prefix)
			.filter_map(|(start, _)| {
				let digits = &text[start + self.prefix.len()..];
				let end = digits.find(';')?;
				digits[..end].parse().ok()
			})
			.collect()
	}

	/// The slot if `text` is exactly one token.
	fn exact(&self, text: &str) -> Option<usize> {
		let slot = text.strip_prefix(self.prefix.as_str())?.strip_suffix(';')?;
		slot.parse().ok()
	}

	fn strip(&self, text: &str) -> String {
		let mut stripped = text.to_string();
		for slot in self.slots(text) {
			stripped = stripped.replacen(&self.token(slot), "", 1);
		}
		stripped
	}
}

#[derive(Clone, Copy, PartialEq)]
enum Scan {
	Text,
	Tag,
	Quoted(u8),
	Comment,
}

/// Joins `strings` around slot tokens, choosing a token form that survives the markup reader at each position.
fn join(strings: &[&str], sentinel: &Sentinel) -> String {
	let mut markup = String::new();
	let mut state = Scan::Text;
	for (slot, chunk) in strings.iter().enumerate() {
		let bytes = chunk.as_bytes();
		let mut i = 0;
		while i < bytes.len() {
			state = match (state, bytes[i]) {
				(Scan::Text, b'<') if chunk[i..].starts_with("<!--") => {
					i += 3;
					Scan::Comment
				}
				(Scan::Text, b'<') if bytes.get(i + 1).map_or(false, |b| b.is_ascii_alphabetic() || *b == b'/') => Scan::Tag,
				(Scan::Tag, quote @ b'"') | (Scan::Tag, quote @ b'\'') => Scan::Quoted(quote),
				(Scan::Tag, b'>') => Scan::Text,
				(Scan::Quoted(quote), b) if b == quote => Scan::Tag,
				(Scan::Comment, b'-') if chunk[i..].starts_with("-->") => {
					i += 2;
					Scan::Text
				}
				(state, _) => state,
			};
			i += 1;
		}
		markup.push_str(chunk);

		if slot + 1 == strings.len() {
			break;
		}
		let token = sentinel.token(slot);
		match state {
			Scan::Text => {
				markup.push_str("<!--");
				markup.push_str(&token);
				markup.push_str("-->");
			}
			Scan::Tag if markup.trim_end().ends_with('=') => {
				markup.push('"');
				markup.push_str(&token);
				markup.push('"');
			}
			Scan::Tag => {
				markup.push(' ');
				markup.push_str(&token);
				markup.push(' ');
			}
			Scan::Quoted(_) | Scan::Comment => markup.push_str(&token),
		}
	}
	markup
}

/// A parsed template: a pristine fragment to clone plus one optional [`Path`] per slot.
pub(crate) struct TemplateInfo<D: Dom> {
	pub fragment: D::Node,
	/// [`None`] where a slot has no usable target. Values for it are ignored.
	pub paths: Vec<Option<Path>>,
	/// Routes to `<script>` elements, which cloning may leave inert.
	pub scripts: Vec<Vec<usize>>,
	pub namespace: Namespace,
}

struct Builder<'a, D: Dom> {
	dom: &'a D,
	sentinel: Option<&'a Sentinel>,
	paths: Vec<Option<Path>>,
	scripts: Vec<Vec<usize>>,
}
impl<'a, D: Dom> Builder<'a, D> {
	fn record(&mut self, slot: usize, kind: PathKind, route: &[usize]) {
		#[cfg(feature = "log-paths")]
		trace!(slot, ?kind, ?route, "Recorded path.");

		match self.paths.get_mut(slot) {
			Some(path @ None) => {
				*path = Some(Path {
					kind,
					route: route.to_vec(),
				})
			}
			Some(Some(_)) => warn!("Interpolation #{} appears twice in the template markup; keeping the first position.", slot),
			None => error!("Markup contained a token for interpolation #{}, which doesn't exist.", slot),
		}
	}

	fn append(&self, parent: &D::Node, node: &D::Node) {
		if let Err(error) = self.dom.append_child(parent, node) {
			error!("Failed to append template node: {:?}", error)
		}
	}

	fn build(&mut self, parent: &D::Node, nodes: &[MarkupNode], route: &mut Vec<usize>) {
		for (index, node) in nodes.iter().enumerate() {
			route.push(index);
			match node {
				MarkupNode::Text(text) => self.append(parent, &self.dom.create_text(text)),
				MarkupNode::Comment(data) => {
					let comment = match self.sentinel {
						Some(sentinel) => match sentinel.exact(data) {
							Some(slot) => {
								self.record(slot, PathKind::Any, route);
								self.dom.create_comment("")
							}
							None if !sentinel.slots(data).is_empty() => {
								error!("Interpolations inside comments are not supported; their values will be ignored.");
								self.dom.create_comment(&sentinel.strip(data))
							}
							None => self.dom.create_comment(data),
						},
						None => self.dom.create_comment(data),
					};
					self.append(parent, &comment);
				}
				MarkupNode::Element(element) => {
					let node = match self.dom.create_element(element.namespace, &element.name) {
						Ok(node) => node,
						Err(error) => {
							error!("Failed to create <{}>: {:?}", element.name, error);
							route.pop();
							continue;
						}
					};

					let mut assigned = Vec::<&str>::new();
					for (name, value) in &element.attributes {
						if let Some(sentinel) = self.sentinel {
							if !sentinel.slots(name).is_empty() {
								error!("Interpolation in attribute name position on <{}> is not supported; its value will be ignored.", element.name);
								continue;
							}
							let slots = sentinel.slots(value);
							if !slots.is_empty() {
								if sentinel.exact(value).is_none() {
									warn!("Attribute {:?} on <{}> mixes static text with interpolations; the static text is dropped.", name, element.name);
								}
								for slot in slots {
									self.record(slot, PathKind::Attribute(name.clone()), route);
								}
								continue;
							}
						}
						if assigned.contains(&name.as_str()) {
							trace!("Ignoring duplicate attribute {:?} on <{}>.", name, element.name);
							continue;
						}
						assigned.push(name);
						if let Err(error) = self.dom.set_attribute(&node, name, value) {
							error!("Failed to set attribute {:?}: {:?}", name, error)
						}
					}

					let text_slots = match (self.sentinel, element.namespace, element.children.as_slice()) {
						(Some(sentinel), Namespace::Html, [MarkupNode::Text(text)]) if markup::is_text_only_element(&element.name) => {
							let slots = sentinel.slots(text);
							if slots.is_empty() {
								None
							} else {
								Some((slots, sentinel.strip(&text.replace("<!--", "").replace("-->", ""))))
							}
						}
						_ => None,
					};
					match text_slots {
						Some((slots, text)) => {
							if !text.trim().is_empty() {
								warn!("<{}> mixes static text with interpolations; the static text is dropped.", element.name);
							}
							for slot in slots {
								self.record(slot, PathKind::Text, route);
							}
						}
						None => self.build(&node, &element.children, route),
					}

					if element.namespace == Namespace::Html && element.name == "script" {
						self.scripts.push(route.clone())
					}
					self.append(parent, &node);
				}
			}
			route.pop();
		}
	}
}

/// Builds `markup` into a new fragment. Used for parsed HTML content.
pub(crate) fn fragment_from_markup<D: Dom>(dom: &D, markup: &str, namespace: Namespace) -> D::Node {
	let fragment = dom.create_fragment();
	let mut builder = Builder {
		dom,
		sentinel: None,
		paths: Vec::new(),
		scripts: Vec::new(),
	};
	builder.build(&fragment, &markup::parse(markup, namespace), &mut Vec::new());
	fragment
}

fn parse_template<D: Dom>(dom: &D, sentinel: &Sentinel, strings: &[&str], namespace: Namespace) -> TemplateInfo<D> {
	let span = trace_span!("parse_template", chunks = strings.len(), ?namespace);
	let _enter = span.enter();

	let slot_count = strings.len().saturating_sub(1);
	let markup = join(strings, sentinel);
	let fragment = dom.create_fragment();
	let mut builder = Builder {
		dom,
		sentinel: Some(sentinel),
		paths: vec![None; slot_count],
		scripts: Vec::new(),
	};
	builder.build(&fragment, &markup::parse(markup.trim(), namespace), &mut Vec::new());

	for (slot, path) in builder.paths.iter().enumerate() {
		if path.is_none() {
			warn!("Interpolation #{} has no usable position in its template.", slot);
		}
	}
	trace!(slots = slot_count, scripts = builder.scripts.len(), "Parsed template.");
	TemplateInfo {
		fragment,
		paths: builder.paths,
		scripts: builder.scripts,
		namespace,
	}
}

/// Parsed templates by chunk array address, falling back to chunk contents.
pub(crate) struct TemplateCache<D: Dom> {
	by_address: HashMap<(usize, usize, Namespace), Rc<TemplateInfo<D>>>,
	by_contents: HashMap<(Vec<&'static str>, Namespace), Rc<TemplateInfo<D>>>,
}
impl<D: Dom> TemplateCache<D> {
	pub fn new() -> Self {
		Self {
			by_address: HashMap::new(),
			by_contents: HashMap::new(),
		}
	}

	pub fn get_or_parse(&mut self, dom: &D, sentinel: &Sentinel, strings: &'static [&'static str], namespace: Namespace) -> Rc<TemplateInfo<D>> {
		let address = (strings.as_ptr() as usize, strings.len(), namespace);
		if let Some(template) = self.by_address.get(&address) {
			return template.clone();
		}
		let template = self
			.by_contents
			.entry((strings.to_vec(), namespace))
			.or_insert_with(|| Rc::new(parse_template(dom, sentinel, strings, namespace)))
			.clone();
		self.by_address.insert(address, template.clone());
		template
	}

	pub fn len(&self) -> usize {
		self.by_contents.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::memory::MemoryDom;

	fn parse(strings: &'static [&'static str]) -> (MemoryDom, TemplateInfo<MemoryDom>) {
		let dom = MemoryDom::new();
		let template = parse_template(&dom, &Sentinel::new(), strings, Namespace::Html);
		(dom, template)
	}

	#[test]
	fn paths_follow_slot_order() {
		let (dom, template) = parse(&["<div class=", " id='x'><p>", "</p><style>", "</style></div>"]);
		assert_eq!(
			template.paths,
			vec![
				Some(Path {
					kind: PathKind::Attribute("class".to_string()),
					route: vec![0],
				}),
				Some(Path { kind: PathKind::Any, route: vec![0, 0, 0] }),
				Some(Path { kind: PathKind::Text, route: vec![0, 1] }),
			]
		);
		assert_eq!(dom.inner_html(&template.fragment), r#"<div id="x"><p><!----></p><style></style></div>"#);
	}

	#[test]
	fn outer_whitespace_is_trimmed() {
		let (dom, template) = parse(&["\n\t<b>", "</b>\n"]);
		assert_eq!(dom.inner_html(&template.fragment), "<b><!----></b>");
	}

	#[test]
	fn quoted_attributes_and_duplicates() {
		let (dom, template) = parse(&["<a href='", "' title=\"t\" title=\"u\" data-x=", ">"]);
		let kinds: Vec<_> = template.paths.iter().map(|path| path.as_ref().map(|path| path.kind.clone())).collect();
		assert_eq!(
			kinds,
			vec![Some(PathKind::Attribute("href".to_string())), Some(PathKind::Attribute("data-x".to_string()))]
		);
		assert_eq!(dom.inner_html(&template.fragment), r#"<a title="t"></a>"#);
	}

	#[test]
	fn comment_and_name_positions_are_unfillable() {
		let (_, template) = parse(&["<p ", "></p><!-- ", " -->"]);
		assert_eq!(template.paths, vec![None, None]);
	}

	#[test]
	fn scripts_are_recorded() {
		let (_, template) = parse(&["<div><script>var a = 1;</script></div>"]);
		assert_eq!(template.scripts, vec![vec![0, 0]]);
		assert!(template.paths.is_empty());
	}

	#[test]
	fn cache_prefers_identity_then_contents() {
		static A: &[&str] = &["<i>", "</i>"];
		static B: &[&str] = &["<i>", "</i>"];
		let dom = MemoryDom::new();
		let sentinel = Sentinel::new();
		let mut cache = TemplateCache::new();
		let a = cache.get_or_parse(&dom, &sentinel, A, Namespace::Html);
		assert!(Rc::ptr_eq(&a, &cache.get_or_parse(&dom, &sentinel, A, Namespace::Html)));
		assert!(Rc::ptr_eq(&a, &cache.get_or_parse(&dom, &sentinel, B, Namespace::Html)));
		assert!(!Rc::ptr_eq(&a, &cache.get_or_parse(&dom, &sentinel, A, Namespace::Svg)));
		assert_eq!(cache.len(), 2);
	}
}
