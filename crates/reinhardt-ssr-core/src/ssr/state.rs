//! State serialization for hydration.
//!
//! The store's state is captured once preloading has finished and embedded
//! in the document so the client can restore it before hydrating.

use crate::store::{StateMap, Store};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The default global JavaScript variable receiving the state.
pub const DEFAULT_STATE_VARIABLE: &str = "__INITIAL_STATE__";

/// A deep-copied snapshot of a store's state.
///
/// Serializes as the plain state object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatePayload {
	state: StateMap,
}

impl StatePayload {
	/// Creates an empty payload.
	pub fn new() -> Self {
		Self::default()
	}

	/// Gets a value by key.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.state.get(key)
	}

	/// Returns the number of top-level keys.
	pub fn len(&self) -> usize {
		self.state.len()
	}

	/// Checks if the payload is empty.
	pub fn is_empty(&self) -> bool {
		self.state.is_empty()
	}

	/// Returns the underlying state object.
	pub fn as_map(&self) -> &StateMap {
		&self.state
	}

	/// Consumes the payload, returning the state object.
	pub fn into_map(self) -> StateMap {
		self.state
	}

	/// Serializes the state to JSON.
	pub fn to_json(&self) -> Result<String, serde_json::Error> {
		serde_json::to_string(self)
	}

	/// Deserializes state from JSON. The document must be an object.
	pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(json)
	}

	/// Generates an inline `<script>` assigning the state to `window.<variable>`.
	///
	/// The JSON is escaped so that it can neither close the script element
	/// nor break the surrounding JavaScript.
	pub fn to_script_tag(&self, variable: &str) -> Result<String, serde_json::Error> {
		let json = escape_for_script(&self.to_json()?);
		Ok(format!("<script>window.{}={}</script>", variable, json))
	}
}

impl From<StateMap> for StatePayload {
	fn from(state: StateMap) -> Self {
		Self { state }
	}
}

/// Snapshots the store's current state.
///
/// The payload is independent of the store: later mutations are not
/// reflected in it.
pub fn serialize(store: &Store) -> StatePayload {
	StatePayload::from(store.snapshot())
}

fn escape_for_script(json: &str) -> String {
	let mut escaped = String::with_capacity(json.len());
	for c in json.chars() {
		match c {
			'<' => escaped.push_str("\\u003c"),
			'>' => escaped.push_str("\\u003e"),
			'&' => escaped.push_str("\\u0026"),
			'\u{2028}' => escaped.push_str("\\u2028"),
			'\u{2029}' => escaped.push_str("\\u2029"),
			other => escaped.push(other),
		}
	}
	escaped
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::store::StoreDefinition;
	use proptest::prelude::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	fn test_serialize_is_detached_from_store() {
		let definition = StoreDefinition::builder()
			.state("username", json!("jack"))
			.mutation("changeName", |state, payload| {
				state.insert("username".to_string(), payload);
			})
			.build();
		let store = definition.instantiate();

		let before = serialize(&store);
		store.commit("changeName", json!("rose")).unwrap();
		let after = serialize(&store);

		assert_eq!(before.get("username"), Some(&json!("jack")));
		assert_eq!(after.get("username"), Some(&json!("rose")));
	}

	#[rstest]
	fn test_json_is_plain_object() {
		let mut map = StateMap::new();
		map.insert("count".to_string(), json!(3));
		let payload = StatePayload::from(map);

		assert_eq!(payload.to_json().unwrap(), r#"{"count":3}"#);
		assert_eq!(StatePayload::from_json(r#"{"count":3}"#).unwrap(), payload);
		assert!(StatePayload::from_json("[1,2]").is_err());
	}

	#[rstest]
	fn test_script_tag_escapes_markup() {
		let mut map = StateMap::new();
		map.insert("html".to_string(), json!("</script><b>&\u{2028}"));
		let payload = StatePayload::from(map);

		let tag = payload.to_script_tag(DEFAULT_STATE_VARIABLE).unwrap();

		assert_eq!(
			tag,
			"<script>window.__INITIAL_STATE__={\"html\":\"\\u003c/script\\u003e\\u003cb\\u003e\\u0026\\u2028\"}</script>"
		);
	}

	#[rstest]
	fn test_empty_payload() {
		let payload = StatePayload::new();
		assert!(payload.is_empty());
		assert_eq!(payload.len(), 0);
		assert_eq!(payload.to_script_tag("S").unwrap(), "<script>window.S={}</script>");
	}

	const LINE_SEPARATOR: char = '\u{2028}';
	const PARAGRAPH_SEPARATOR: char = '\u{2029}';

	proptest! {
		#[test]
		fn prop_script_tag_never_contains_raw_markup(value in ".*") {
			let mut map = StateMap::new();
			map.insert("value".to_string(), json!(value));
			let tag = StatePayload::from(map).to_script_tag("S").unwrap();

			let body = &tag["<script>".len()..tag.len() - "</script>".len()];
			prop_assert!(!body.contains('<'));
			prop_assert!(!body.contains('>'));
			prop_assert!(!body.contains(LINE_SEPARATOR), "raw line separator in script body");
			prop_assert!(
				!body.contains(PARAGRAPH_SEPARATOR),
				"raw paragraph separator in script body"
			);
		}

		#[test]
		fn prop_escaped_json_parses_back(value in ".*") {
			let mut map = StateMap::new();
			map.insert("value".to_string(), json!(value.clone()));
			let payload = StatePayload::from(map);

			let escaped = escape_for_script(&payload.to_json().unwrap());
			let parsed = StatePayload::from_json(&escaped).unwrap();
			prop_assert_eq!(parsed.get("value"), Some(&json!(value)));
		}
	}
}
