use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Named participant inside a pact (`consumer`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(default)]
    pub name: String,
}

/// Consumer contract document. Only the consumer name is interpreted; the other
/// sections are carried through to the broker untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pact {
    #[serde(default)]
    pub consumer: Participant,
    #[serde(default)]
    pub interactions: JsonValue,
    #[serde(default)]
    pub metadata: JsonValue,
    #[serde(default)]
    pub provider: JsonValue,
}

/// Serialization format of a provider spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecFormat {
    Json,
    Yaml,
}

impl SpecFormat {
    /// Detect the format from the trailing characters of the path. Accepts
    /// `json`, `yaml` and `.yml`; anything else is unsupported.
    pub fn detect(path: &Path) -> Option<Self> {
        let raw = path.to_string_lossy();
        if raw.ends_with("json") {
            Some(SpecFormat::Json)
        } else if raw.ends_with("yaml") || raw.ends_with(".yml") {
            Some(SpecFormat::Yaml)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SpecFormat::Json => "json",
            SpecFormat::Yaml => "yaml",
        }
    }
}

/// Provider spec document. JSON specs are parsed; YAML specs are kept verbatim
/// and only validated by the broker.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Spec {
    Json(JsonValue),
    Yaml(String),
}

impl Spec {
    pub fn format(&self) -> SpecFormat {
        match self {
            Spec::Json(_) => SpecFormat::Json,
            Spec::Yaml(_) => SpecFormat::Yaml,
        }
    }

    /// Interpret a spec payload fetched from the broker. A `{"spec": ...}`
    /// envelope is unwrapped; a string document is YAML text, anything else
    /// JSON. Bodies that are not JSON at all are treated as raw YAML.
    pub fn from_broker_payload(raw: &[u8]) -> Self {
        match serde_json::from_slice::<JsonValue>(raw) {
            Ok(JsonValue::Object(mut map)) if map.contains_key("spec") => {
                match map.remove("spec").unwrap_or_default() {
                    JsonValue::String(text) => Spec::Yaml(text),
                    other => Spec::Json(other),
                }
            }
            Ok(JsonValue::String(text)) => Spec::Yaml(text),
            Ok(other) => Spec::Json(other),
            Err(_) => Spec::Yaml(String::from_utf8_lossy(raw).into_owned()),
        }
    }

    /// Bytes suitable for writing the spec to disk.
    pub fn to_document_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            Spec::Json(value) => serde_json::to_vec_pretty(value),
            Spec::Yaml(text) => Ok(text.clone().into_bytes()),
        }
    }
}
