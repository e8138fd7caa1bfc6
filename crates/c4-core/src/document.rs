//! Portable JSON documents.
//!
//! Version 2 is the flat layout the store keeps in memory, stamped with
//! `schemaVersion`. Version 1 nests containers inside systems, components
//! inside containers and code elements inside components; it is read and
//! flattened but never written.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DocumentError;
use crate::model::{
    BaseBlock, CodeElement, CodeType, Component, Container, Model, System,
};
use crate::navigation::Navigation;

pub const SCHEMA_VERSION: u64 = 2;
pub const LEGACY_SCHEMA_VERSION: u64 = 1;

const COLLECTIONS: [&str; 4] = ["systems", "containers", "components", "codeElements"];

/// The current on-disk shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub schema_version: u64,
    #[serde(flatten)]
    pub model: Model,
}

/// Serialize `model` as an indented current-version document.
pub fn export(model: &Model) -> Result<String, DocumentError> {
    let document = Document {
        schema_version: SCHEMA_VERSION,
        model: model.clone(),
    };
    serde_json::to_string_pretty(&document).map_err(DocumentError::Encode)
}

/// Parse a document of either version into a flat model. Nothing is returned
/// unless the whole document validates.
pub fn parse(text: &str) -> Result<Model, DocumentError> {
    let value: Value = serde_json::from_str(text).map_err(DocumentError::Parse)?;
    let object = value.as_object().ok_or(DocumentError::NotAnObject)?;

    let version = match object.get("schemaVersion") {
        Some(v) => v.as_u64().ok_or_else(|| DocumentError::InvalidVersion {
            found: v.to_string(),
        })?,
        // Unstamped files predate versioning unless they are already flat.
        None if object.get("containers").is_some_and(Value::is_array) => SCHEMA_VERSION,
        None => LEGACY_SCHEMA_VERSION,
    };

    match version {
        SCHEMA_VERSION => {
            for name in COLLECTIONS {
                if !object.get(name).is_some_and(Value::is_array) {
                    return Err(DocumentError::MissingCollection { name });
                }
            }
            serde_json::from_value(value).map_err(DocumentError::Malformed)
        }
        LEGACY_SCHEMA_VERSION => {
            if !object.get("systems").is_some_and(Value::is_array) {
                return Err(DocumentError::MissingCollection { name: "systems" });
            }
            let legacy: LegacyDocument =
                serde_json::from_value(value).map_err(DocumentError::Malformed)?;
            Ok(convert_to_flat_model(legacy))
        }
        version => Err(DocumentError::UnsupportedVersion { version }),
    }
}

/// JSON Schema of [`Document`].
pub fn schema() -> schemars::Schema {
    schemars::schema_for!(Document)
}

// --- Legacy nested layout ---

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDocument {
    #[serde(default)]
    pub systems: Vec<LegacySystem>,
    #[serde(flatten)]
    pub navigation: Navigation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySystem {
    #[serde(flatten)]
    pub base: BaseBlock,
    #[serde(default)]
    pub containers: Vec<LegacyContainer>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyContainer {
    #[serde(flatten)]
    pub base: BaseBlock,
    #[serde(default)]
    pub components: Vec<LegacyComponent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyComponent {
    #[serde(flatten)]
    pub base: BaseBlock,
    #[serde(default)]
    pub code_elements: Vec<LegacyCodeElement>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyCodeElement {
    #[serde(flatten)]
    pub base: BaseBlock,
    #[serde(default)]
    pub code_type: CodeType,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Walk the nested tree and emit the four flat collections. Parent keys come
/// from the nesting, whatever the nested records themselves claim.
pub fn convert_to_flat_model(legacy: LegacyDocument) -> Model {
    let mut systems = Vec::new();
    let mut containers = Vec::new();
    let mut components = Vec::new();
    let mut code_elements = Vec::new();

    for system in legacy.systems {
        let system_id = system.base.id.clone();
        for container in system.containers {
            let container_id = container.base.id.clone();
            for component in container.components {
                let component_id = component.base.id.clone();
                for element in component.code_elements {
                    code_elements.push(CodeElement {
                        base: element.base,
                        system_id: system_id.clone(),
                        container_id: container_id.clone(),
                        component_id: component_id.clone(),
                        code_type: element.code_type,
                        language: element.language,
                        code: element.code,
                    });
                }
                components.push(Component {
                    base: component.base,
                    system_id: system_id.clone(),
                    container_id: container_id.clone(),
                });
            }
            containers.push(Container {
                base: container.base,
                system_id: system_id.clone(),
            });
        }
        systems.push(System { base: system.base });
    }

    Model {
        systems: Arc::new(systems),
        containers: Arc::new(containers),
        components: Arc::new(components),
        code_elements: Arc::new(code_elements),
        navigation: legacy.navigation,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::model::{ConnectionData, ViewLevel};

    #[test]
    fn export_stamps_version_and_uses_camel_case() {
        let text = export(&Model::default()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["schemaVersion"], 2);
        assert_eq!(value["codeElements"], json!([]));
        assert_eq!(value["viewLevel"], "system");
        assert!(value.get("activeSystemId").is_none());
        assert!(text.contains('\n'), "export is indented");
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(matches!(parse("not json"), Err(DocumentError::Parse(_))));
        assert!(matches!(parse("[]"), Err(DocumentError::NotAnObject)));
        assert!(matches!(
            parse(r#"{"schemaVersion": "two"}"#),
            Err(DocumentError::InvalidVersion { .. })
        ));
        assert!(matches!(
            parse(r#"{"schemaVersion": 99, "systems": []}"#),
            Err(DocumentError::UnsupportedVersion { version: 99 })
        ));
        let stray = [
            "{}",
            r#"{"name":"my-package","version":"1.0.0"}"#,
            r#"{"schemaVersion": 1}"#,
        ];
        for text in stray {
            assert!(matches!(
                parse(text),
                Err(DocumentError::MissingCollection { name: "systems" })
            ));
        }
    }

    #[test]
    fn v2_requires_all_four_arrays() {
        let doc = json!({
            "schemaVersion": 2,
            "systems": [],
            "containers": [],
            "components": {}
        });
        match parse(&doc.to_string()) {
            Err(DocumentError::MissingCollection { name }) => assert_eq!(name, "components"),
            other => panic!("unexpected result: {other:?}")
        }
    }

    #[test]
    fn v2_rejects_malformed_entities() {
        let doc = json!({
            "schemaVersion": 2,
            "systems": [{ "name": "no id" }],
            "containers": [],
            "components": [],
            "codeElements": []
        });
        assert!(matches!(parse(&doc.to_string()), Err(DocumentError::Malformed(_))));
    }

    #[test]
    fn v2_defaults_navigation() {
        let doc = json!({
            "schemaVersion": 2,
            "systems": [{ "id": "s1", "name": "S", "position": { "x": 1.0, "y": 2.0 }, "connections": [] }],
            "containers": [],
            "components": [],
            "codeElements": []
        });
        let model = parse(&doc.to_string()).unwrap();
        assert_eq!(model.navigation, Navigation::default());
        assert_eq!(model.systems[0].base.position.y, 2.0);
    }

    #[test]
    fn unstamped_flat_document_reads_as_v2() {
        let doc = json!({
            "systems": [],
            "containers": [],
            "components": [],
            "codeElements": [],
            "viewLevel": "container",
            "activeSystemId": "s1"
        });
        let model = parse(&doc.to_string()).unwrap();
        assert_eq!(model.navigation.view_level, ViewLevel::Container);
    }

    #[test]
    fn v1_is_flattened() {
        let doc = json!({
            "schemaVersion": 1,
            "viewLevel": "component",
            "activeSystemId": "s1",
            "activeContainerId": "c1",
            "systems": [{
                "id": "s1", "name": "Shop",
                "connections": [{ "targetId": "s2", "label": "pays" }],
                "containers": [{
                    "id": "c1", "name": "API", "systemId": "stale",
                    "connections": [],
                    "components": [{
                        "id": "k1", "name": "Orders",
                        "connections": [],
                        "codeElements": [{ "id": "e1", "name": "Order", "codeType": "class", "language": "rust", "connections": [] }]
                    }]
                }]
            }, {
                "id": "s2", "name": "Payments", "connections": []
            }]
        });
        let model = parse(&doc.to_string()).unwrap();
        assert_eq!(model.systems.len(), 2);
        assert_eq!(model.containers[0].system_id, "s1");
        assert_eq!(model.components[0].container_id, "c1");
        let element = &model.code_elements[0];
        assert_eq!(
            (element.system_id.as_str(), element.container_id.as_str(), element.component_id.as_str()),
            ("s1", "c1", "k1")
        );
        assert_eq!(element.language.as_deref(), Some("rust"));
        assert_eq!(
            model.systems[0].base.connections,
            vec![ConnectionData::to("s2").with_label("pays")]
        );
        assert_eq!(model.navigation.view_level, ViewLevel::Component);
        assert_eq!(model.navigation.active_container_id.as_deref(), Some("c1"));
    }

    #[test]
    fn v1_without_view_level_starts_at_system() {
        let doc = json!({ "schemaVersion": 1, "systems": [] });
        let model = parse(&doc.to_string()).unwrap();
        assert!(model.is_empty());
        assert_eq!(model.navigation.view_level, ViewLevel::System);
    }

    #[test]
    fn schema_describes_document() {
        let schema = serde_json::to_value(schema()).unwrap();
        assert!(schema["properties"].get("schemaVersion").is_some());
        assert!(schema.to_string().contains("codeElements"));
    }
}
