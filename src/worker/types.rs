//! Wire types of the worker HTTP surface.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::template::TemplateVersion;

/// File selector handed to a processor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobSelector {
    pub glob: String,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Body of `POST /api/process` on a processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub read_dir: String,
    pub write_dir: String,
    pub globs: Vec<GlobSelector>,
    pub config: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub output_dir: String,
}

/// Body of `POST /api/plug` on a plugin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlugRequest {
    pub directory: String,
    pub config: Value,
}

/// Body of `POST /merge/{session}` on a merger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeRequest {
    pub from_dirs: Vec<String>,
    pub to_dir: String,
    pub template: TemplateVersion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardResponse {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_process_request_wire_names() {
        let request = ProcessRequest {
            read_dir: "/workspace/cyanprint".to_string(),
            write_dir: "/workspace/area/x".to_string(),
            globs: vec![GlobSelector {
                glob: "**/*.md".to_string(),
                exclude: vec!["README.md".to_string()],
                kind: "template".to_string(),
            }],
            config: json!({"name": "demo"}),
        };

        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["readDir"], "/workspace/cyanprint");
        assert_eq!(value["writeDir"], "/workspace/area/x");
        assert_eq!(value["globs"][0]["type"], "template");
        assert_eq!(value["config"]["name"], "demo");
    }

    #[test]
    fn test_merge_request_wire_names() {
        let request = MergeRequest {
            from_dirs: vec!["/a".to_string()],
            to_dir: "/b".to_string(),
            template: TemplateVersion::default(),
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["fromDirs"][0], "/a");
        assert_eq!(value["toDir"], "/b");
        assert!(value["template"]["principal"].is_object());
    }

    #[test]
    fn test_glob_selector_defaults() {
        let glob: GlobSelector = serde_json::from_str(r#"{"glob": "*"}"#).expect("parse");
        assert!(glob.exclude.is_empty());
        assert!(glob.kind.is_empty());

        let response: ProcessResponse =
            serde_json::from_str(r#"{"outputDir": "/workspace/area/1"}"#).expect("parse");
        assert_eq!(response.output_dir, "/workspace/area/1");
    }
}
