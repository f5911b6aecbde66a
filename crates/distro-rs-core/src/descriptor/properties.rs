//! Reading and writing the Java properties text format descriptors are stored in.
//!
//! Follows the grammar of `java.util.Properties`:
//! - lines starting with `#` or `!` (after leading whitespace) are comments.
//! - the key ends at the first unescaped `=`, `:` or whitespace. Whitespace around the separator
//!   is skipped, trailing whitespace of the value is kept.
//! - a line ending in an odd number of `\` continues on the next line, whose leading whitespace is dropped.
//! - `\t`, `\n`, `\r`, `\f` and `\uXXXX` are escapes, any other escaped character stands for itself.

const WHITESPACE: [char; 3] = [' ', '\t', '\x0c'];

/// Decodes file contents. Text that isn't UTF-8 is read as ISO-8859-1, the encoding `Properties.store` writes.
pub fn decode(bytes: Vec<u8>) -> String {
	match String::from_utf8(bytes) {
		Ok(text) => text,
		Err(e) => {
			log::debug!("Properties text is not UTF-8, reading it as ISO-8859-1");
			e.into_bytes().into_iter().map(char::from).collect()
		},
	}
}

/// Parses properties text into `(key, value)` pairs in file order.
///
/// Later duplicates replace the value of an earlier key but keep its position.
///
/// # Errors
/// - [`Parse`](crate::Error::Parse) on a malformed `\uXXXX` escape.
pub fn parse(text: &str) -> crate::Result<Vec<(String, String)>> {
	let mut entries: Vec<(String, String)> = Vec::new();
	for line in logical_lines(text) {
		let (key, value) = split_entry(&line);
		let (key, value) = (unescape(key)?, unescape(value)?);
		if let Some(existing) = entries.iter_mut().find(|(k, _)| *k == key) {
			existing.1 = value;
		} else {
			entries.push((key, value));
		}
	}
	Ok(entries)
}

/// Joins continued lines and drops blanks and comments.
fn logical_lines(text: &str) -> Vec<String> {
	let mut lines = Vec::new();
	let mut current: Option<String> = None;

	for raw in text.split('\n') {
		let raw = raw.strip_suffix('\r').unwrap_or(raw);
		let part = raw.trim_start_matches(WHITESPACE);
		let mut line = match current.take() {
			Some(line) => line,
			None if part.is_empty() || part.starts_with('#') || part.starts_with('!') => continue,
			None => String::new(),
		};

		let trailing = part.chars().rev().take_while(|&c| c == '\\').count();
		if trailing % 2 == 1 {
			line.push_str(&part[..part.len() - 1]);
			current = Some(line);
		} else {
			line.push_str(part);
			lines.push(line);
		}
	}
	/* A continuation on the last line just ends the entry. */
	if let Some(line) = current {
		lines.push(line);
	}
	lines
}

/// Splits a logical line into its still escaped key and value.
fn split_entry(line: &str) -> (&str, &str) {
	let mut escaped = false;
	let mut key_end = line.len();
	for (i, c) in line.char_indices() {
		if escaped {
			escaped = false;
		} else if c == '\\' {
			escaped = true;
		} else if c == '=' || c == ':' || WHITESPACE.contains(&c) {
			key_end = i;
			break;
		}
	}

	let rest = line[key_end..].trim_start_matches(WHITESPACE);
	let rest = rest.strip_prefix(['=', ':']).unwrap_or(rest);
	(&line[..key_end], rest.trim_start_matches(WHITESPACE))
}

fn unescape(text: &str) -> crate::Result<String> {
	let mut units: Vec<u16> = Vec::with_capacity(text.len());
	let mut chars = text.chars();
	while let Some(c) = chars.next() {
		let c = if c != '\\' {
			c
		} else {
			match chars.next() {
				Some('t') => '\t',
				Some('n') => '\n',
				Some('r') => '\r',
				Some('f') => '\x0c',
				Some('u') => {
					let hex: String = chars.by_ref().take(4).collect();
					let unit = (hex.len() == 4).then(|| u16::from_str_radix(&hex, 16).ok()).flatten()
						.ok_or_else(|| crate::Error::Parse(format!("malformed \\u{hex} escape in \"{text}\"")))?;
					units.push(unit);
					continue;
				},
				Some(other) => other,
				None => continue,
			}
		};
		let mut buf = [0u16; 2];
		units.extend_from_slice(c.encode_utf16(&mut buf));
	}

	char::decode_utf16(units)
		.collect::<Result<String, _>>()
		.map_err(|_| crate::Error::Parse(format!("unpaired surrogate escape in \"{text}\"")))
}

fn escape(text: &str, is_key: bool, out: &mut String) {
	for (i, c) in text.chars().enumerate() {
		match c {
			'\\' => out.push_str("\\\\"),
			'\t' => out.push_str("\\t"),
			'\n' => out.push_str("\\n"),
			'\r' => out.push_str("\\r"),
			'\x0c' => out.push_str("\\f"),
			'=' | ':' | '#' | '!' => {
				out.push('\\');
				out.push(c);
			},
			' ' if is_key || i == 0 => out.push_str("\\ "),
			' '..='~' => out.push(c),
			_ => {
				let mut buf = [0u16; 2];
				for unit in c.encode_utf16(&mut buf) {
					out.push_str(&format!("\\u{unit:04X}"));
				}
			},
		}
	}
}

/// Renders pairs back into properties text, one escaped `key=value` per line.
///
/// The output is plain ASCII, non ASCII characters are written as `\uXXXX`.
pub fn render<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
	let mut out = String::new();
	for (key, value) in entries {
		escape(key, true, &mut out);
		out.push('=');
		escape(value, false, &mut out);
		out.push('\n');
	}
	out
}
