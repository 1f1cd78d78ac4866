//! Path pattern compilation and matching.

use super::RouteParams;
use super::core::RouterError;
use regex::Regex;
use std::collections::HashMap;

/// Error raised when a route pattern cannot be compiled.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
	/// Patterns are absolute.
	#[error("pattern must start with '/': {0}")]
	NotAbsolute(String),

	/// A `{name}` placeholder is not an identifier.
	#[error("invalid parameter name `{name}` in pattern `{pattern}`")]
	InvalidParameter {
		/// The offending pattern.
		pattern: String,
		/// The rejected name.
		name: String,
	},

	/// A `{` without a matching `}`.
	#[error("unclosed parameter in pattern `{0}`")]
	Unclosed(String),

	/// A catch-all appears before the last segment or shares a segment.
	#[error("catch-all parameter must be a whole, final segment in pattern `{0}`")]
	MisplacedCatchAll(String),

	/// The generated expression was rejected, e.g. for duplicate names.
	#[error("invalid pattern `{pattern}`: {source}")]
	Regex {
		/// The offending pattern.
		pattern: String,
		/// Regex compilation failure.
		#[source]
		source: regex::Error,
	},
}

/// A compiled route path pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
	pattern: String,
	regex: Regex,
	param_names: Vec<String>,
}

impl PathPattern {
	/// Compiles a pattern.
	///
	/// # Examples
	///
	/// ```
	/// use reinhardt_ssr_core::router::PathPattern;
	///
	/// let pattern = PathPattern::parse("/users/{id}").unwrap();
	/// let params = pattern.matches("/users/42").unwrap();
	/// assert_eq!(params.get("id").map(String::as_str), Some("42"));
	/// assert!(pattern.matches("/users").is_none());
	/// ```
	pub fn parse(pattern: &str) -> Result<Self, PatternError> {
		if !pattern.starts_with('/') {
			return Err(PatternError::NotAbsolute(pattern.to_string()));
		}

		let segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
		let mut expr = String::from("^");
		let mut param_names = Vec::new();
		let mut ends_with_catch_all = false;

		for (index, segment) in segments.iter().enumerate() {
			if let Some(name) = segment
				.strip_prefix("{*")
				.and_then(|rest| rest.strip_suffix('}'))
			{
				if index + 1 != segments.len() {
					return Err(PatternError::MisplacedCatchAll(pattern.to_string()));
				}
				validate_name(pattern, name)?;
				expr.push_str(&format!("(?:/(?P<{}>.*))?", name));
				param_names.push(name.to_string());
				ends_with_catch_all = true;
				continue;
			}

			expr.push('/');
			compile_segment(pattern, segment, &mut expr, &mut param_names)?;
		}

		if segments.is_empty() {
			expr.push('/');
		} else if !ends_with_catch_all {
			expr.push_str("/?");
		}
		expr.push('$');

		let regex = Regex::new(&expr).map_err(|source| PatternError::Regex {
			pattern: pattern.to_string(),
			source,
		})?;

		Ok(Self {
			pattern: pattern.to_string(),
			regex,
			param_names,
		})
	}

	/// Returns the source pattern.
	pub fn as_str(&self) -> &str {
		&self.pattern
	}

	/// Returns parameter names in declaration order.
	pub fn param_names(&self) -> &[String] {
		&self.param_names
	}

	/// Matches a path (without query string), returning decoded parameters.
	pub fn matches(&self, path: &str) -> Option<RouteParams> {
		let captures = self.regex.captures(path)?;

		let params = self
			.param_names
			.iter()
			.map(|name| {
				let raw = captures.name(name).map(|m| m.as_str()).unwrap_or("");
				let value = urlencoding::decode(raw)
					.map(|decoded| decoded.into_owned())
					.unwrap_or_else(|_| raw.to_string());
				(name.clone(), value)
			})
			.collect();

		Some(params)
	}

	/// Builds a path from parameter values.
	pub fn reverse(&self, params: &HashMap<String, String>) -> Result<String, RouterError> {
		let mut result = String::with_capacity(self.pattern.len());
		let mut rest = self.pattern.as_str();

		while let Some(open) = rest.find('{') {
			result.push_str(&rest[..open]);
			let after = &rest[open + 1..];
			let close = after
				.find('}')
				.ok_or_else(|| RouterError::MissingParameter(after.to_string()))?;
			let placeholder = &after[..close];

			match placeholder.strip_prefix('*') {
				Some(name) => {
					let value = params
						.get(name)
						.ok_or_else(|| RouterError::MissingParameter(name.to_string()))?;
					result.push_str(value);
				}
				None => {
					let value = params
						.get(placeholder)
						.ok_or_else(|| RouterError::MissingParameter(placeholder.to_string()))?;
					result.push_str(&urlencoding::encode(value));
				}
			}

			rest = &after[close + 1..];
		}
		result.push_str(rest);

		Ok(result)
	}
}

/// Joins a nested route path onto its parent's path.
pub(super) fn join_paths(parent: &str, child: &str) -> String {
	if child.starts_with('/') {
		return child.to_string();
	}
	if child.is_empty() {
		return parent.to_string();
	}
	format!("{}/{}", parent.trim_end_matches('/'), child)
}

fn compile_segment(
	pattern: &str,
	segment: &str,
	expr: &mut String,
	param_names: &mut Vec<String>,
) -> Result<(), PatternError> {
	let mut rest = segment;

	while let Some(open) = rest.find('{') {
		expr.push_str(&regex::escape(&rest[..open]));
		let after = &rest[open + 1..];
		let close = after
			.find('}')
			.ok_or_else(|| PatternError::Unclosed(pattern.to_string()))?;
		let name = &after[..close];

		if name.starts_with('*') {
			return Err(PatternError::MisplacedCatchAll(pattern.to_string()));
		}
		validate_name(pattern, name)?;

		expr.push_str(&format!("(?P<{}>[^/]+)", name));
		param_names.push(name.to_string());
		rest = &after[close + 1..];
	}
	expr.push_str(&regex::escape(rest));

	Ok(())
}

fn validate_name(pattern: &str, name: &str) -> Result<(), PatternError> {
	let mut chars = name.chars();
	let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
		&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

	if valid {
		Ok(())
	} else {
		Err(PatternError::InvalidParameter {
			pattern: pattern.to_string(),
			name: name.to_string(),
		})
	}
}
