//! The sentinels joining literal segments, and where they may appear.
//!
//! Each sentinel carries the index of the value it stands for, so the compiler can tell when a parser moved one.
//! The joined markup is handed to a [`Parser`](`crate::fragment::Parser`), which lower-cases attribute names.
//! To keep the author's spelling, [`scan`] walks the segments themselves with a small tag-level lexer and records,
//! for every sentinel, whether it stands for a whole attribute value (and under which raw name) or for child content.
//! Anything else is rejected before parsing.

use crate::error::{MarkerContext, StructuralError};

/// Start of every sentinel. Reserved: literal segments must not contain it.
pub const MARKER_PREFIX: &str = "{{stencil-part-";

/// End of every sentinel, after the decimal value index.
pub const MARKER_SUFFIX: &str = "}}";

/// The sentinel standing for value `index`.
///
/// Survives HTML tokenization unchanged both as text and as attribute value.
#[must_use]
pub fn sentinel(index: usize) -> String {
	format!("{}{}{}", MARKER_PREFIX, index, MARKER_SUFFIX)
}

/// Joins `segments`, putting the sentinel for value `i` after segment `i`.
#[must_use]
pub fn join(segments: &[&str]) -> String {
	let mut markup = String::new();
	for (index, segment) in segments.iter().enumerate() {
		if index > 0 {
			markup.push_str(&sentinel(index - 1));
		}
		markup.push_str(segment);
	}
	markup
}

/// Whether `text` contains anything that looks like a sentinel.
#[must_use]
pub fn contains_sentinel(text: &str) -> bool {
	text.contains(MARKER_PREFIX)
}

/// The value index of `text` if it is exactly one sentinel.
#[must_use]
pub fn parse(text: &str) -> Option<usize> {
	let digits = text.strip_prefix(MARKER_PREFIX)?.strip_suffix(MARKER_SUFFIX)?;
	if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
		return None;
	}
	digits.parse().ok()
}

/// A run of text or a sentinel, as found by [`split`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece<'a> {
	Text(&'a str),
	Sentinel(usize),
}

/// Splits `text` into plain runs and sentinels, in order. Empty runs are skipped.
///
/// Malformed sentinels stay text.
#[must_use]
pub fn split(text: &str) -> Vec<Piece<'_>> {
	let mut pieces = Vec::new();
	let mut rest = text;
	let mut plain = 0;
	while let Some(offset) = rest[plain..].find(MARKER_PREFIX) {
		let start = plain + offset;
		let found = rest[start..].find(MARKER_SUFFIX).and_then(|length| {
			let end = start + length + MARKER_SUFFIX.len();
			parse(&rest[start..end]).map(|index| (end, index))
		});
		match found {
			Some((end, index)) => {
				if start > 0 {
					pieces.push(Piece::Text(&rest[..start]));
				}
				pieces.push(Piece::Sentinel(index));
				rest = &rest[end..];
				plain = 0;
			}
			None => plain = start + MARKER_PREFIX.len(),
		}
	}
	if !rest.is_empty() {
		pieces.push(Piece::Text(rest));
	}
	pieces
}

/// Elements whose content isn't markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// What a sentinel stands for, as seen in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Position {
	/// The complete value of an attribute, spelled `raw_name` in the source.
	Attribute { raw_name: String },
	/// Child content of an element or the fragment root.
	Child,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
	Data,
	TagOpen,
	EndTagOpen,
	TagName { end: bool, start: usize },
	BeforeAttributeName,
	AttributeName { start: usize },
	AfterAttributeName,
	BeforeAttributeValue,
	QuotedValue { quote: u8, empty: bool },
	UnquotedValue,
	SelfClosing,
	MarkupDeclaration { dashes: u8 },
	Comment { dashes: u8 },
	BogusComment,
	RawText,
}

struct Scanner {
	state: State,
	tag: String,
	end_tag: bool,
	attribute: String,
}

fn is_whitespace(b: u8) -> bool {
	matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0C')
}

impl Scanner {
	fn new() -> Self {
		Self {
			state: State::Data,
			tag: String::new(),
			end_tag: false,
			attribute: String::new(),
		}
	}

	fn finish_tag_name(&mut self, name: &str, end: bool) {
		self.tag = name.to_ascii_lowercase();
		self.end_tag = end;
	}

	fn close_tag(&mut self, self_closing: bool) {
		self.state = if !self.end_tag && !self_closing && RAW_TEXT_ELEMENTS.contains(&self.tag.as_str()) {
			State::RawText
		} else {
			State::Data
		};
	}

	#[allow(clippy::too_many_lines)]
	fn feed(&mut self, segment: &str) {
		let bytes = segment.as_bytes();
		let mut i = 0;
		while i < bytes.len() {
			let b = bytes[i];
			match self.state {
				State::Data => {
					if b == b'<' {
						self.state = State::TagOpen;
					}
				}
				State::TagOpen => match b {
					b'!' => self.state = State::MarkupDeclaration { dashes: 0 },
					b'/' => self.state = State::EndTagOpen,
					b'?' => self.state = State::BogusComment,
					b if b.is_ascii_alphabetic() => self.state = State::TagName { end: false, start: i },
					_ => {
						// Not a tag after all. Reprocess as text.
						self.state = State::Data;
						continue;
					}
				},
				State::EndTagOpen => match b {
					b if b.is_ascii_alphabetic() => self.state = State::TagName { end: true, start: i },
					b'>' => self.state = State::Data,
					_ => self.state = State::BogusComment,
				},
				State::TagName { end, start } => match b {
					b if is_whitespace(b) => {
						self.finish_tag_name(&segment[start..i], end);
						self.state = State::BeforeAttributeName;
					}
					b'/' => {
						self.finish_tag_name(&segment[start..i], end);
						self.state = State::SelfClosing;
					}
					b'>' => {
						self.finish_tag_name(&segment[start..i], end);
						self.close_tag(false);
					}
					_ => (),
				},
				State::BeforeAttributeName => match b {
					b if is_whitespace(b) => (),
					b'/' => self.state = State::SelfClosing,
					b'>' => self.close_tag(false),
					_ => self.state = State::AttributeName { start: i },
				},
				State::AttributeName { start } => match b {
					b if is_whitespace(b) => {
						self.attribute = segment[start..i].to_owned();
						self.state = State::AfterAttributeName;
					}
					b'/' => {
						self.attribute = segment[start..i].to_owned();
						self.state = State::SelfClosing;
					}
					b'=' => {
						self.attribute = segment[start..i].to_owned();
						self.state = State::BeforeAttributeValue;
					}
					b'>' => {
						self.attribute = segment[start..i].to_owned();
						self.close_tag(false);
					}
					_ => (),
				},
				State::AfterAttributeName => match b {
					b if is_whitespace(b) => (),
					b'/' => self.state = State::SelfClosing,
					b'=' => self.state = State::BeforeAttributeValue,
					b'>' => self.close_tag(false),
					_ => self.state = State::AttributeName { start: i },
				},
				State::BeforeAttributeValue => match b {
					b if is_whitespace(b) => (),
					b'"' | b'\'' => self.state = State::QuotedValue { quote: b, empty: true },
					b'>' => self.close_tag(false),
					_ => self.state = State::UnquotedValue,
				},
				State::QuotedValue { quote, .. } => {
					self.state = if b == quote {
						State::BeforeAttributeName
					} else {
						State::QuotedValue { quote, empty: false }
					}
				}
				State::UnquotedValue => match b {
					b if is_whitespace(b) => self.state = State::BeforeAttributeName,
					b'>' => self.close_tag(false),
					_ => (),
				},
				State::SelfClosing => {
					if b == b'>' {
						self.close_tag(true);
					} else {
						self.state = State::BeforeAttributeName;
						continue;
					}
				}
				State::MarkupDeclaration { dashes } => match b {
					b'-' if dashes == 1 => self.state = State::Comment { dashes: 0 },
					b'-' => self.state = State::MarkupDeclaration { dashes: 1 },
					b'>' => self.state = State::Data,
					_ => self.state = State::BogusComment,
				},
				State::Comment { dashes } => match b {
					b'-' => self.state = State::Comment { dashes: (dashes + 1).min(2) },
					b'>' if dashes == 2 => self.state = State::Data,
					_ => self.state = State::Comment { dashes: 0 },
				},
				State::BogusComment => {
					if b == b'>' {
						self.state = State::Data;
					}
				}
				State::RawText => {
					let needle = format!("</{}", self.tag);
					match segment[i..].to_ascii_lowercase().find(&needle) {
						Some(offset) => {
							i += offset + 2;
							self.state = State::TagName { end: true, start: i };
						}
						None => i = bytes.len(),
					}
					continue;
				}
			}
			i += 1;
		}
	}

	/// Classifies the sentinel following the segments fed so far.
	fn classify(&mut self, index: usize, next: &str, next_is_last: bool) -> Result<Position, StructuralError> {
		let unsupported = |context| StructuralError::UnsupportedPosition { index, context };
		match self.state {
			State::Data => Ok(Position::Child),
			State::RawText => Err(unsupported(MarkerContext::RawText { tag: self.tag.clone() })),
			State::TagOpen | State::EndTagOpen | State::TagName { .. } => Err(unsupported(MarkerContext::TagName)),
			State::BeforeAttributeName | State::AfterAttributeName | State::SelfClosing => Err(unsupported(MarkerContext::Tag)),
			State::AttributeName { .. } => Err(unsupported(MarkerContext::AttributeName)),
			State::MarkupDeclaration { .. } | State::Comment { .. } | State::BogusComment => Err(unsupported(MarkerContext::Comment)),
			State::BeforeAttributeValue => {
				let whole = match next.as_bytes().first() {
					// A directly following `/` would still be part of an unquoted value.
					Some(&b) => is_whitespace(b) || b == b'>',
					None => next_is_last,
				};
				if whole {
					self.state = State::UnquotedValue;
					Ok(Position::Attribute { raw_name: self.attribute.clone() })
				} else {
					Err(unsupported(MarkerContext::PartialAttributeValue { name: self.attribute.clone() }))
				}
			}
			State::QuotedValue { quote, empty } => {
				if empty && next.as_bytes().first() == Some(&quote) {
					self.state = State::QuotedValue { quote, empty: false };
					Ok(Position::Attribute { raw_name: self.attribute.clone() })
				} else {
					Err(unsupported(MarkerContext::PartialAttributeValue { name: self.attribute.clone() }))
				}
			}
			State::UnquotedValue => Err(unsupported(MarkerContext::PartialAttributeValue { name: self.attribute.clone() })),
		}
	}
}

/// Determines the [`Position`] of each sentinel between `segments`, in order.
///
/// # Errors
///
/// Iff `segments` is empty, contains [`MARKER_PREFIX`] or places a sentinel anywhere other than a whole attribute value or child content.
pub fn scan(segments: &[&str]) -> Result<Vec<Position>, StructuralError> {
	if segments.is_empty() {
		return Err(StructuralError::NoSegments);
	}
	if let Some(segment) = segments.iter().position(|segment| contains_sentinel(segment)) {
		return Err(StructuralError::ReservedMarker { segment });
	}

	let mut scanner = Scanner::new();
	let mut positions = Vec::with_capacity(segments.len() - 1);
	for (index, pair) in segments.windows(2).enumerate() {
		scanner.feed(pair[0]);
		positions.push(scanner.classify(index, pair[1], index + 2 == segments.len())?);
	}
	Ok(positions)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn attribute(raw_name: &str) -> Position {
		Position::Attribute { raw_name: raw_name.to_owned() }
	}

	fn context(segments: &[&str]) -> MarkerContext {
		match scan(segments) {
			Err(StructuralError::UnsupportedPosition { context, .. }) => context,
			other => panic!("expected an unsupported position, got {:?}", other),
		}
	}

	#[test]
	fn text_positions() {
		assert_eq!(scan(&["<div>Hello ", "!</div>"]).unwrap(), vec![Position::Child]);
		assert_eq!(scan(&["", ""]).unwrap(), vec![Position::Child]);
		assert_eq!(scan(&["a < b ", ""]).unwrap(), vec![Position::Child]);
	}

	#[test]
	fn attribute_positions_keep_raw_names() {
		assert_eq!(
			scan(&[r#"<div someProp=""#, r#"" other='"#, "'></div>"]).unwrap(),
			vec![attribute("someProp"), attribute("other")]
		);
		assert_eq!(scan(&["<input value=", ">"]).unwrap(), vec![attribute("value")]);
		assert_eq!(scan(&["<input value = ", " />"]).unwrap(), vec![attribute("value")]);
		assert_eq!(scan(&["<a .href=", ""]).unwrap(), vec![attribute(".href")]);
	}

	#[test]
	fn static_attributes_and_text_before_parts() {
		assert_eq!(
			scan(&[r#"<p class="a>b" title='x'>"#, r#"<br/><i id=""#, r#""></i></p>"#]).unwrap(),
			vec![Position::Child, attribute("id")]
		);
	}

	#[test]
	fn comments_are_rejected() {
		assert_eq!(context(&["<!-- ", " -->"]), MarkerContext::Comment);
		assert_eq!(context(&["<!DOCTYPE ", ">"]), MarkerContext::Comment);
		assert_eq!(scan(&["<!-- <b> -->", ""]).unwrap(), vec![Position::Child]);
	}

	#[test]
	fn tag_level_positions_are_rejected() {
		assert_eq!(context(&["<", "></div>"]), MarkerContext::TagName);
		assert_eq!(context(&["<di", "v>"]), MarkerContext::TagName);
		assert_eq!(context(&["<div ", "></div>"]), MarkerContext::Tag);
		assert_eq!(context(&["<div data-", "=1></div>"]), MarkerContext::AttributeName);
	}

	#[test]
	fn partial_values_are_rejected() {
		let class = MarkerContext::PartialAttributeValue { name: "class".to_owned() };
		assert_eq!(context(&[r#"<div class="a "#, r#""></div>"#]), class);
		assert_eq!(context(&[r#"<div class=""#, " ", r#""></div>"#]), class);
		assert_eq!(context(&["<div class=", "", "></div>"]), class);
	}

	#[test]
	fn raw_text_is_rejected() {
		assert_eq!(context(&["<style>", "</style>"]), MarkerContext::RawText { tag: "style".to_owned() });
		assert_eq!(scan(&["<script>if (a</b) {}</script>", ""]).unwrap(), vec![Position::Child]);
	}

	#[test]
	fn reserved_marker() {
		assert!(matches!(scan(&[sentinel(0).as_str(), ""]), Err(StructuralError::ReservedMarker { segment: 0 })));
		assert!(matches!(scan(&["", "a {{stencil-part-"]), Err(StructuralError::ReservedMarker { segment: 1 })));
		assert!(matches!(scan(&[]), Err(StructuralError::NoSegments)));
	}

	#[test]
	fn sentinels_carry_their_index() {
		assert_eq!(join(&["<p>", "</p>", ""]), "<p>{{stencil-part-0}}</p>{{stencil-part-1}}");
		assert_eq!(parse(&sentinel(12)), Some(12));
		assert_eq!(parse("{{stencil-part-+1}}"), None);
		assert_eq!(parse(" {{stencil-part-1}}"), None);
		assert_eq!(
			split("a{{stencil-part-3}}{{stencil-part-}}b{{stencil-part-4}}"),
			vec![Piece::Text("a"), Piece::Sentinel(3), Piece::Text("{{stencil-part-}}b"), Piece::Sentinel(4)]
		);
	}

	#[test]
	fn slash_after_unquoted_value_is_partial() {
		assert_eq!(
			context(&[r#"<a title="t" href="#, "/>x</a>"]),
			MarkerContext::PartialAttributeValue { name: "href".to_owned() }
		);
	}
}
