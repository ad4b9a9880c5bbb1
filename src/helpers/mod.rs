use std::collections::HashMap;

/// What to emit for a `${name}` placeholder that has no replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum MissingPlaceholder {
	/// Re-emit the placeholder text unchanged.
	#[default]
	Keep,
	/// Emit the literal text `undefined`.
	Undefined,
	/// Emit nothing.
	Empty,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
	Normal,
	PossibleOpen { dollar: usize },
	InKey { dollar: usize, key_start: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment<'a> {
	Literal(&'a str),
	Placeholder(&'a str),
}

pub fn is_key_char(ch: char) -> bool {
	ch.is_ascii_alphanumeric() || ch == '_' || ch == '-'
}

/// Split a template into literal text and `${key}` placeholders.
/// Anything that does not form a complete placeholder stays literal.
pub fn tokenize(template: &str) -> Vec<Segment<'_>> {
	let mut segments = Vec::new();
	let mut literal_start = 0;
	let mut state = State::Normal;

	for (i, ch) in template.char_indices() {
		state = match state {
			State::Normal => {
				if ch == '$' { State::PossibleOpen { dollar: i } } else { State::Normal }
			}
			State::PossibleOpen { dollar } => {
				match ch {
					'{' => State::InKey { dollar, key_start: i + 1 },
					'$' => State::PossibleOpen { dollar: i },
					_ => State::Normal,
				}
			}
			State::InKey { dollar, key_start } => {
				if ch == '}' && i > key_start {
					if dollar > literal_start {
						segments.push(Segment::Literal(&template[literal_start..dollar]));
					}
					segments.push(Segment::Placeholder(&template[key_start..i]));
					literal_start = i + 1;
					State::Normal
				} else if is_key_char(ch) {
					State::InKey { dollar, key_start }
				} else if ch == '$' {
					State::PossibleOpen { dollar: i }
				} else {
					State::Normal
				}
			}
		};
	}

	if literal_start < template.len() {
		segments.push(Segment::Literal(&template[literal_start..]));
	}
	segments
}

pub struct TemplateProcessor {
	replacements: HashMap<String, String>,
	missing: MissingPlaceholder,
}

impl TemplateProcessor {
	#[cfg(test)]
	pub fn new() -> Self {
		Self {
			replacements: HashMap::new(),
			missing: MissingPlaceholder::default(),
		}
	}

	pub fn with_replacements(replacements: HashMap<String, String>) -> Self {
		Self { replacements, missing: MissingPlaceholder::default() }
	}

	pub fn missing_placeholder(mut self, missing: MissingPlaceholder) -> Self {
		self.missing = missing;
		self
	}

	#[cfg(test)]
	pub fn add_replacement(&mut self, key: String, value: String) {
		self.replacements.insert(key, value);
	}

	pub fn process_template(&self, template: &str) -> String {
		let mut output = String::with_capacity(template.len());
		for segment in tokenize(template) {
			match segment {
				Segment::Literal(text) => output.push_str(text),
				Segment::Placeholder(key) => match self.replacements.get(key) {
					Some(value) => output.push_str(value),
					None => match self.missing {
						MissingPlaceholder::Keep => {
							output.push_str("${");
							output.push_str(key);
							output.push('}');
						}
						MissingPlaceholder::Undefined => output.push_str("undefined"),
						MissingPlaceholder::Empty => {}
					},
				},
			}
		}
		output
	}
}

/// Trim a generated message and drop one surrounding double quote on each side.
pub fn strip_wrapping_quotes(text: &str) -> String {
	let text = text.trim();
	let text = text.strip_prefix('"').unwrap_or(text);
	let text = text.strip_suffix('"').unwrap_or(text);
	text.to_string()
}

/// Treat empty strings the same as unset values.
pub fn non_empty(value: Option<String>) -> Option<String> {
	value.filter(|v| !v.is_empty())
}
