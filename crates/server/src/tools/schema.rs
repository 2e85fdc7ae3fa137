//! Structural validation of tool arguments.
//!
//! Each tool declares a flat field list; validation runs before any side
//! effect and names the offending field on failure. The same declaration
//! renders the JSON schema advertised by `tools_list`.

use serde_json::{Map, Value, json};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
	String,
	Integer,
	Boolean,
	/// String restricted to an enumerated set.
	StringEnum(&'static [&'static str]),
	/// Flat string-keyed, string-valued object.
	StringMap,
	/// Array of objects, validated in depth by the handler's deserializer.
	ObjectArray,
}

impl FieldKind {
	fn describe(&self) -> &'static str {
		match self {
			Self::String => "a string",
			Self::Integer => "an integer",
			Self::Boolean => "a boolean",
			Self::StringEnum(_) => "one of the enumerated values",
			Self::StringMap => "an object with string values",
			Self::ObjectArray => "an array of objects",
		}
	}

	fn accepts(&self, value: &Value) -> bool {
		match self {
			Self::String => value.is_string(),
			Self::Integer => value.is_u64() || value.is_i64(),
			Self::Boolean => value.is_boolean(),
			Self::StringEnum(choices) => {
				value.as_str().is_some_and(|s| choices.contains(&s))
			}
			Self::StringMap => value
				.as_object()
				.is_some_and(|map| map.values().all(Value::is_string)),
			Self::ObjectArray => value
				.as_array()
				.is_some_and(|items| items.iter().all(Value::is_object)),
		}
	}

	fn to_json_schema(&self) -> Value {
		match self {
			Self::String => json!({ "type": "string" }),
			Self::Integer => json!({ "type": "integer" }),
			Self::Boolean => json!({ "type": "boolean" }),
			Self::StringEnum(choices) => json!({ "type": "string", "enum": choices }),
			Self::StringMap => json!({
				"type": "object",
				"additionalProperties": { "type": "string" }
			}),
			Self::ObjectArray => json!({
				"type": "array",
				"items": { "type": "object" }
			}),
		}
	}
}

#[derive(Debug, Clone)]
pub struct Field {
	pub name: &'static str,
	pub kind: FieldKind,
	pub required: bool,
	pub description: &'static str,
}

/// A tool's declared argument structure.
#[derive(Debug, Clone, Default)]
pub struct Schema {
	fields: Vec<Field>,
}

impl Schema {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn required(mut self, name: &'static str, kind: FieldKind, description: &'static str) -> Self {
		self.fields.push(Field {
			name,
			kind,
			required: true,
			description,
		});
		self
	}

	pub fn optional(mut self, name: &'static str, kind: FieldKind, description: &'static str) -> Self {
		self.fields.push(Field {
			name,
			kind,
			required: false,
			description,
		});
		self
	}

	/// Validates raw arguments. `null` counts as an empty object so that
	/// argument-free tools accept an omitted `arguments` field.
	pub fn validate(&self, args: &Value) -> Result<()> {
		let empty = Map::new();
		let object = match args {
			Value::Null => &empty,
			Value::Object(map) => map,
			_ => return Err(Error::validation("arguments", "expected an object")),
		};

		for (name, value) in object {
			let field = self
				.fields
				.iter()
				.find(|field| field.name == name)
				.ok_or_else(|| Error::validation(name.clone(), "unexpected field"))?;
			if value.is_null() {
				continue;
			}
			if !field.kind.accepts(value) {
				return Err(Error::validation(
					field.name,
					format!("expected {}", field.kind.describe()),
				));
			}
		}

		for field in self.fields.iter().filter(|f| f.required) {
			let present = object.get(field.name).is_some_and(|v| !v.is_null());
			if !present {
				return Err(Error::validation(field.name, "missing required field"));
			}
		}
		Ok(())
	}

	/// Renders the advertised JSON schema.
	pub fn to_json_schema(&self) -> Value {
		let mut properties = Map::new();
		let mut required = Vec::new();
		for field in &self.fields {
			let mut schema = field.kind.to_json_schema();
			if let Some(obj) = schema.as_object_mut() {
				obj.insert("description".to_string(), json!(field.description));
			}
			properties.insert(field.name.to_string(), schema);
			if field.required {
				required.push(json!(field.name));
			}
		}

		let mut schema = Map::new();
		schema.insert("type".to_string(), json!("object"));
		schema.insert("properties".to_string(), Value::Object(properties));
		if !required.is_empty() {
			schema.insert("required".to_string(), Value::Array(required));
		}
		Value::Object(schema)
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn schema() -> Schema {
		Schema::new()
			.required("url", FieldKind::String, "target URL")
			.optional("state", FieldKind::StringEnum(&["load", "domcontentloaded"]), "load state")
			.optional("timeout_ms", FieldKind::Integer, "deadline")
	}

	#[test]
	fn missing_required_field_is_named() {
		let err = schema().validate(&json!({})).unwrap_err();
		assert!(err.to_string().contains("`url`"));
	}

	#[test]
	fn unexpected_field_is_named() {
		let err = schema()
			.validate(&json!({"url": "https://a.test", "bogus": 1}))
			.unwrap_err();
		assert!(err.to_string().contains("`bogus`"));
	}

	#[test]
	fn enum_rejects_values_outside_the_set() {
		let err = schema()
			.validate(&json!({"url": "https://a.test", "state": "networkidle"}))
			.unwrap_err();
		assert!(err.to_string().contains("`state`"));

		schema()
			.validate(&json!({"url": "https://a.test", "state": "load"}))
			.unwrap();
	}

	#[test]
	fn null_arguments_mean_no_arguments() {
		let empty = Schema::new().optional("name", FieldKind::String, "filter");
		empty.validate(&Value::Null).unwrap();
		assert!(schema().validate(&Value::Null).is_err());
	}

	#[test]
	fn explicit_null_optional_is_treated_as_absent() {
		schema()
			.validate(&json!({"url": "https://a.test", "timeout_ms": null}))
			.unwrap();
	}

	#[test]
	fn json_schema_lists_properties_and_required() {
		let rendered = schema().to_json_schema();
		assert_eq!(rendered["type"], "object");
		assert_eq!(rendered["required"], json!(["url"]));
		assert_eq!(rendered["properties"]["state"]["enum"], json!(["load", "domcontentloaded"]));
	}
}
