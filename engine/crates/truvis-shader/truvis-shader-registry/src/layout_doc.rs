//! layout 描述文件（JSON）的原始结构
//!
//! ```json
//! {
//!     "bindings": [
//!         { "slot": 0, "resource": "buffer", "usage": "uniform", "rate": "frame",
//!           "elements": [{ "type": "mat4" }, { "type": "vec4", "count": 2 }] }
//!     ],
//!     "fragment": {
//!         "bindings": [
//!             { "slot": 1, "resource": "image", "usage": "sampled", "type": "2d", "format": "rgba8" },
//!             { "slot": 2, "resource": "sampler", "immutable": true }
//!         ]
//!     }
//! }
//! ```
//!
//! 顶层 `bindings` 对所有存在源码的 stage 可见；各 stage 段中的 binding 只对该 stage 可见。
//! 这里只做反序列化，语义校验见 [`crate::binding`]。

use anyhow::Context;
use serde::Deserialize;

use crate::stage::ShaderStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawResourceKind {
    Buffer,
    Image,
    Sampler,
    Bindless,
}

/// binding 的更新频率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShaderUpdateRate {
    #[default]
    Frame,
    Pass,
    Batch,
    Draw,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawElement {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default = "default_count")]
    pub count: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawBinding {
    pub slot: u32,
    pub resource: RawResourceKind,
    /// 源码中没有对应声明时使用的名字
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub rate: ShaderUpdateRate,
    #[serde(default = "default_count")]
    pub count: u32,

    // buffer
    #[serde(default)]
    pub elements: Vec<RawElement>,

    // image
    #[serde(rename = "type", default)]
    pub dimension: Option<String>,
    #[serde(default)]
    pub format: Option<String>,

    // sampler
    #[serde(default)]
    pub immutable: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawStageSection {
    #[serde(default)]
    pub bindings: Vec<RawBinding>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawLayoutDoc {
    #[serde(default)]
    pub bindings: Vec<RawBinding>,
    #[serde(default)]
    pub vertex: Option<RawStageSection>,
    #[serde(default)]
    pub fragment: Option<RawStageSection>,
    #[serde(default)]
    pub compute: Option<RawStageSection>,
    #[serde(default)]
    pub task: Option<RawStageSection>,
    #[serde(default)]
    pub mesh: Option<RawStageSection>,
}

fn default_count() -> u32 {
    1
}

impl RawLayoutDoc {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        serde_json::from_str(text).context("layout 描述格式错误")
    }

    /// 各个 stage 段中的 binding
    pub fn stage_sections(&self) -> impl Iterator<Item = (ShaderStage, &RawStageSection)> {
        [
            (ShaderStage::Vertex, &self.vertex),
            (ShaderStage::Fragment, &self.fragment),
            (ShaderStage::Compute, &self.compute),
            (ShaderStage::Task, &self.task),
            (ShaderStage::Mesh, &self.mesh),
        ]
        .into_iter()
        .filter_map(|(stage, section)| section.as_ref().map(|section| (stage, section)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_layout_doc() {
        let doc = RawLayoutDoc::parse(
            r#"{
                "bindings": [{ "slot": 0, "resource": "buffer", "usage": "uniform", "elements": [{ "type": "mat4" }] }],
                "fragment": { "bindings": [{ "slot": 1, "resource": "image", "usage": "sampled", "type": "2d", "rate": "pass" }] }
            }"#,
        )
        .unwrap();

        assert_eq!(doc.bindings.len(), 1);
        assert_eq!(doc.bindings[0].elements[0].count, 1);
        assert_eq!(doc.bindings[0].rate, ShaderUpdateRate::Frame);

        let sections: Vec<_> = doc.stage_sections().collect();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].0, ShaderStage::Fragment);
        assert_eq!(sections[0].1.bindings[0].dimension.as_deref(), Some("2d"));
        assert_eq!(sections[0].1.bindings[0].rate, ShaderUpdateRate::Pass);
    }

    #[test]
    fn test_misspelled_binding_key_fails() {
        let sampler = r#"{ "fragment": { "bindings": [{ "slot": 2, "resource": "sampler", "immutible": true }] } }"#;
        let err = RawLayoutDoc::parse(sampler).unwrap_err();
        assert!(format!("{:#}", err).contains("immutible"));

        let image = r#"{ "bindings": [{ "slot": 1, "resource": "image", "usage": "sampled", "fromat": "rgba8" }] }"#;
        assert!(RawLayoutDoc::parse(image).is_err());

        let element = r#"{ "bindings": [{ "slot": 0, "resource": "buffer", "elements": [{ "type": "vec4", "cnt": 2 }] }] }"#;
        assert!(RawLayoutDoc::parse(element).is_err());
    }

    #[test]
    fn test_unknown_resource_kind_fails() {
        assert!(RawLayoutDoc::parse(r#"{ "bindings": [{ "slot": 0, "resource": "texture" }] }"#).is_err());
    }
}
