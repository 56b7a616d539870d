//! Tool descriptors - static metadata for one callable.
//!
//! A descriptor is built once, at registration time. For compiled tools it is
//! derived from the JSON Schema of the tool's parameter struct; for command
//! plugins it comes straight from the manifest. The descriptor is advisory
//! metadata for discovery: the gateway uses it to bind arguments, but it does
//! no type coercion of its own.

use std::sync::Arc;
use std::time::Duration;

use rmcp::handler::server::tool::cached_schema_for_type;
use rmcp::model::{JsonObject, Tool};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name as it appears in the arguments mapping.
    pub name: String,

    /// Declared JSON type (`string`, `integer`, ...), if known.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_hint: Option<String>,

    /// Whether the caller must supply this parameter.
    #[serde(default)]
    pub required: bool,

    /// Value bound when the caller omits the parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParamSpec {
    /// A required parameter with a type hint.
    pub fn required(name: impl Into<String>, type_hint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: Some(type_hint.into()),
            required: true,
            default: None,
            description: None,
        }
    }

    /// An optional parameter with a default value.
    pub fn optional(name: impl Into<String>, type_hint: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            type_hint: Some(type_hint.into()),
            required: false,
            default: Some(default),
            description: None,
        }
    }
}

/// Static metadata describing a tool.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    parameters: Vec<ParamSpec>,
    accepts_extra: bool,
    is_suspending: bool,
    timeout: Option<Duration>,
    schema: Arc<JsonObject>,
}

impl ToolDescriptor {
    /// Build a descriptor from an explicit parameter list.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ParamSpec>,
    ) -> Self {
        let mut descriptor = Self {
            name: name.into(),
            description: description.into(),
            parameters,
            accepts_extra: false,
            is_suspending: false,
            timeout: None,
            schema: Arc::new(JsonObject::new()),
        };
        descriptor.schema = Arc::new(descriptor.synthesize_schema());
        descriptor
    }

    /// Build a descriptor by introspecting the JSON Schema of a parameter struct.
    ///
    /// Property order follows field declaration order, `required` marks
    /// mandatory parameters and `default` carries serde defaults.
    pub fn from_params<P>(name: impl Into<String>, description: impl Into<String>) -> Self
    where
        P: JsonSchema + 'static,
    {
        let schema = cached_schema_for_type::<P>();
        let parameters = params_from_schema(&schema);
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            accepts_extra: false,
            is_suspending: false,
            timeout: None,
            schema,
        }
    }

    /// Mark the tool as accepting arbitrary extra keyword arguments.
    pub fn accepting_extra(mut self) -> Self {
        self.accepts_extra = true;
        let mut schema = (*self.schema).clone();
        schema.insert("additionalProperties".into(), Value::Bool(true));
        self.schema = Arc::new(schema);
        self
    }

    /// Mark the tool as suspending (its invocation must be awaited).
    pub fn suspending(mut self) -> Self {
        self.is_suspending = true;
        self
    }

    /// Override the gateway's default execution timeout for this tool.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Replace the description, keeping everything else.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Rename the tool, keeping everything else.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &[ParamSpec] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn accepts_extra(&self) -> bool {
        self.accepts_extra
    }

    pub fn is_suspending(&self) -> bool {
        self.is_suspending
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// The MCP `inputSchema` for this tool.
    pub fn input_schema(&self) -> Arc<JsonObject> {
        self.schema.clone()
    }

    /// Create a Tool model for this descriptor (metadata).
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone().into(),
            description: Some(self.description.clone().into()),
            input_schema: self.input_schema(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// A one-line signature such as `fetch_weather(location: string, units: string = "metric")`.
    pub fn signature(&self) -> String {
        let mut parts: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                let mut part = p.name.clone();
                if let Some(hint) = &p.type_hint {
                    part.push_str(": ");
                    part.push_str(hint);
                }
                if let Some(default) = &p.default {
                    part.push_str(" = ");
                    part.push_str(&default.to_string());
                }
                part
            })
            .collect();
        if self.accepts_extra {
            parts.push("**kwargs".to_string());
        }
        format!("{}({})", self.name, parts.join(", "))
    }

    fn synthesize_schema(&self) -> JsonObject {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut property = serde_json::Map::new();
            if let Some(hint) = &param.type_hint {
                property.insert("type".into(), Value::String(hint.clone()));
            }
            if let Some(description) = &param.description {
                property.insert("description".into(), Value::String(description.clone()));
            }
            if let Some(default) = &param.default {
                property.insert("default".into(), default.clone());
            }
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
            properties.insert(param.name.clone(), Value::Object(property));
        }

        let schema = json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": self.accepts_extra,
        });

        match schema {
            Value::Object(map) => map,
            _ => JsonObject::new(),
        }
    }
}

/// Extract the ordered parameter list from an object schema.
fn params_from_schema(schema: &JsonObject) -> Vec<ParamSpec> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };

    properties
        .iter()
        .map(|(name, property)| ParamSpec {
            name: name.clone(),
            type_hint: type_hint(property),
            required: required.contains(&name.as_str()),
            default: property.get("default").cloned(),
            description: property
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
        .collect()
}

/// First non-null JSON type of a property schema.
fn type_hint(property: &Value) -> Option<String> {
    match property.get("type") {
        Some(Value::String(t)) => Some(t.clone()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    #[derive(Deserialize, JsonSchema)]
    struct SampleParams {
        /// City name or location
        location: String,
        #[serde(default = "default_units")]
        units: String,
        #[serde(default)]
        limit: Option<u32>,
    }

    fn default_units() -> String {
        "metric".to_string()
    }

    #[test]
    fn test_from_params_preserves_declaration_order() {
        let descriptor = ToolDescriptor::from_params::<SampleParams>("sample", "A sample");
        let names: Vec<_> = descriptor.parameters().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["location", "units", "limit"]);
    }

    #[test]
    fn test_from_params_required_flags() {
        let descriptor = ToolDescriptor::from_params::<SampleParams>("sample", "A sample");
        assert!(descriptor.parameter("location").unwrap().required);
        assert!(!descriptor.parameter("units").unwrap().required);
        assert!(!descriptor.parameter("limit").unwrap().required);
        assert_eq!(
            descriptor.parameter("location").unwrap().type_hint.as_deref(),
            Some("string")
        );
        assert_eq!(
            descriptor.parameter("location").unwrap().description.as_deref(),
            Some("City name or location")
        );
    }

    #[test]
    fn test_explicit_descriptor_schema() {
        let descriptor = ToolDescriptor::new(
            "word_count",
            "",
            vec![
                ParamSpec::required("text", "string"),
                ParamSpec::optional("mode", "string", json!("words")),
            ],
        );
        let schema = descriptor.input_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["text"]));
        assert_eq!(schema["properties"]["mode"]["default"], "words");
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(descriptor.description(), "");
    }

    #[test]
    fn test_accepting_extra_opens_schema() {
        let descriptor = ToolDescriptor::new("echo", "Echo", vec![]).accepting_extra();
        assert!(descriptor.accepts_extra());
        assert_eq!(descriptor.input_schema()["additionalProperties"], true);
        assert_eq!(descriptor.signature(), "echo(**kwargs)");
    }

    #[test]
    fn test_signature_renders_defaults() {
        let descriptor = ToolDescriptor::new(
            "fetch_weather",
            "",
            vec![
                ParamSpec::required("location", "string"),
                ParamSpec::optional("units", "string", json!("metric")),
            ],
        );
        assert_eq!(
            descriptor.signature(),
            r#"fetch_weather(location: string, units: string = "metric")"#
        );
    }

    #[test]
    fn test_to_tool_carries_metadata() {
        let descriptor = ToolDescriptor::new("health", "Reports health", vec![]);
        let tool = descriptor.to_tool();
        assert_eq!(tool.name, "health");
        assert_eq!(tool.description.as_deref(), Some("Reports health"));
    }
}
