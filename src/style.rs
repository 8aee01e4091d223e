//! Inline style declaration naming and units.

use crate::value::Primitive;

/// Hyphenated properties that take bare numbers.
const UNITLESS: &[&str] = &[
	"animation-iteration-count",
	"column-count",
	"columns",
	"fill-opacity",
	"flex",
	"flex-grow",
	"flex-shrink",
	"font-weight",
	"grid-column",
	"grid-row",
	"line-clamp",
	"line-height",
	"opacity",
	"order",
	"orphans",
	"stop-opacity",
	"stroke-dashoffset",
	"stroke-opacity",
	"stroke-width",
	"tab-size",
	"widows",
	"z-index",
	"zoom",
];

/// `backgroundColor` → `background-color`, `msTransform` → `-ms-transform`.
/// Custom properties (`--x`) and already hyphenated names pass through.
pub(crate) fn hyphenate(name: &str) -> String {
	if name.starts_with("--") {
		return name.to_string();
	}
	let mut hyphenated = String::with_capacity(name.len() + 4);
	for c in name.chars() {
		if c.is_ascii_uppercase() {
			hyphenated.push('-');
			hyphenated.push(c.to_ascii_lowercase());
		} else {
			hyphenated.push(c);
		}
	}
	if hyphenated.starts_with("ms-") {
		hyphenated.insert(0, '-');
	}
	hyphenated
}

fn is_unitless(hyphenated: &str) -> bool {
	let unprefixed = if hyphenated.starts_with('-') && !hyphenated.starts_with("--") {
		// `-webkit-flex-grow` → `flex-grow`
		hyphenated[1..].splitn(2, '-').nth(1).unwrap_or(hyphenated)
	} else {
		hyphenated
	};
	UNITLESS.contains(&unprefixed)
}

/// Numbers become pixel lengths unless the property is unitless.
pub(crate) fn declaration_value(hyphenated: &str, value: &Primitive) -> String {
	match value {
		Primitive::Number(_) if !is_unitless(hyphenated) && !hyphenated.starts_with("--") => format!("{}px", value),
		other => other.to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hyphenation() {
		assert_eq!(hyphenate("backgroundColor"), "background-color");
		assert_eq!(hyphenate("WebkitTransition"), "-webkit-transition");
		assert_eq!(hyphenate("msTransform"), "-ms-transform");
		assert_eq!(hyphenate("--mainColor"), "--mainColor");
		assert_eq!(hyphenate("z-index"), "z-index");
	}

	#[test]
	fn numbers_get_pixels_unless_unitless() {
		assert_eq!(declaration_value("width", &Primitive::Number(10.0)), "10px");
		assert_eq!(declaration_value("opacity", &Primitive::Number(0.5)), "0.5");
		assert_eq!(declaration_value("-webkit-flex-grow", &Primitive::Number(2.0)), "2");
		assert_eq!(declaration_value("--gap", &Primitive::Number(3.0)), "3");
		assert_eq!(declaration_value("width", &Primitive::Str("50%".to_string())), "50%");
	}
}
