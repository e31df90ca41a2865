use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use ash::vk;
use indexmap::IndexMap;
use itertools::Itertools;
use truvis_gfx::backend::GfxBackend;
use truvis_gfx::pipelines::graphics_pipeline::GfxShaderStageDesc;
use truvis_gfx::pipelines::layout::{GfxDescriptorBindingDesc, GfxDescriptorSetLayoutDesc};

use crate::binding::{ShaderBinding, ShaderBindingKind};
use crate::compiler::{GlslcCompiler, ShaderCompiler};
use crate::layout_doc::{RawBinding, RawLayoutDoc};
use crate::source_scan::scan_set0_bindings;
use crate::stage::ShaderStage;

/// 某个 stage 的源码
#[derive(Debug, Clone)]
pub struct ShaderSource {
    pub path: PathBuf,
    pub text: String,
}

/// 一个逻辑 shader：binding 布局 + 各 stage 源码 + 已编译的 module
#[derive(Debug)]
pub struct ShaderResource {
    name: String,
    /// 按 slot 升序排列
    bindings: IndexMap<String, ShaderBinding>,
    sources: BTreeMap<ShaderStage, ShaderSource>,
    modules: HashMap<ShaderStage, vk::ShaderModule>,
}

// getters
impl ShaderResource {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn bindings(&self) -> impl Iterator<Item = &ShaderBinding> {
        self.bindings.values()
    }

    #[inline]
    pub fn binding(&self, name: &str) -> Option<&ShaderBinding> {
        self.bindings.get(name)
    }

    #[inline]
    pub fn sources(&self) -> impl Iterator<Item = (ShaderStage, &ShaderSource)> {
        self.sources.iter().map(|(stage, source)| (*stage, source))
    }

    #[inline]
    pub fn module(&self, stage: ShaderStage) -> Option<vk::ShaderModule> {
        self.modules.get(&stage).copied()
    }

    /// 所有 stage 都已编译
    #[inline]
    pub fn is_compiled(&self) -> bool {
        !self.sources.is_empty() && self.sources.keys().all(|stage| self.modules.contains_key(stage))
    }

    /// 已编译的 stage，用于构建 graphics pipeline
    pub fn stage_descs(&self) -> Vec<GfxShaderStageDesc> {
        self.sources
            .keys()
            .filter_map(|stage| self.modules.get(stage).map(|module| GfxShaderStageDesc::main(stage.vk_stage(), *module)))
            .collect()
    }

    /// 根据 binding 生成 set 0 的 descriptor set layout 描述
    pub fn descriptor_set_layout_desc(&self) -> GfxDescriptorSetLayoutDesc {
        let bindless_flags =
            vk::DescriptorBindingFlags::PARTIALLY_BOUND | vk::DescriptorBindingFlags::UPDATE_AFTER_BIND;

        let bindings = self
            .bindings
            .values()
            .map(|binding| GfxDescriptorBindingDesc {
                binding: binding.slot,
                descriptor_type: binding.descriptor_type,
                count: binding.count,
                stages: binding.visibility,
                flags: if binding.kind() == ShaderBindingKind::Bindless {
                    bindless_flags
                } else {
                    vk::DescriptorBindingFlags::empty()
                },
            })
            .collect_vec();

        let flags = if self.bindings.values().any(|b| b.kind() == ShaderBindingKind::Bindless) {
            vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL
        } else {
            vk::DescriptorSetLayoutCreateFlags::empty()
        };

        GfxDescriptorSetLayoutDesc { bindings, flags }
    }
}

/// 路径层级中的一个节点，例如 `deferred` 与 `deferred/gbuffer`
#[derive(Debug, Default)]
struct ShaderNode {
    parent: Option<usize>,
    children: Vec<usize>,
    resource: Option<ShaderResource>,
}

/// Shader 资源注册表
///
/// 所有节点存放在以完整路径为 key 的 `IndexMap` 中，父子关系用下标表示。
pub struct ShaderResourceRegistry {
    nodes: IndexMap<String, ShaderNode>,
    compiler: Box<dyn ShaderCompiler>,
}

impl Default for ShaderResourceRegistry {
    fn default() -> Self {
        Self::new(Box::new(GlslcCompiler::new()))
    }
}

// new & init
impl ShaderResourceRegistry {
    pub fn new(compiler: Box<dyn ShaderCompiler>) -> Self {
        Self {
            nodes: IndexMap::new(),
            compiler,
        }
    }

    /// 加载 `dir` 目录下名为 `name` 的 shader，`name` 可以包含 `/`
    ///
    /// 同名 shader 再次加载会替换之前的布局，并丢弃已编译的 module
    pub fn load(&mut self, dir: impl AsRef<Path>, name: &str) -> anyhow::Result<&ShaderResource> {
        let dir = dir.as_ref();
        let layout_path = dir.join(format!("{name}.json"));
        let layout_text =
            std::fs::read_to_string(&layout_path).with_context(|| format!("读取 layout 失败: {:?}", layout_path))?;
        let doc = RawLayoutDoc::parse(&layout_text).with_context(|| format!("解析 layout 失败: {:?}", layout_path))?;

        let mut sources = BTreeMap::new();
        for stage in ShaderStage::ALL {
            let path = dir.join(format!("{name}.{}", stage.suffix()));
            if !path.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(&path).with_context(|| format!("读取 shader 源码失败: {:?}", path))?;
            sources.insert(stage, ShaderSource { path, text });
        }

        let bindings = Self::resolve_bindings(name, &doc, &sources)?;
        log::info!(
            "load shader {}: stages [{}], bindings [{}]",
            name,
            sources.keys().map(|s| s.suffix()).join(", "),
            bindings.keys().join(", ")
        );

        let resource = ShaderResource {
            name: name.to_string(),
            bindings,
            sources,
            modules: HashMap::new(),
        };

        let index = self.insert_path(name);
        let node = &mut self.nodes[index];
        if node.resource.is_some() {
            log::debug!("reload shader {}", name);
        }
        Ok(node.resource.insert(resource))
    }

    /// 合并 layout 描述与源码中扫描出的名字
    fn resolve_bindings(
        name: &str,
        doc: &RawLayoutDoc,
        sources: &BTreeMap<ShaderStage, ShaderSource>,
    ) -> anyhow::Result<IndexMap<String, ShaderBinding>> {
        let mut slot_names = BTreeMap::new();
        for source in sources.values() {
            for (slot, binding_name) in scan_set0_bindings(&source.text) {
                let existing = slot_names.entry(slot).or_insert_with(|| binding_name.clone());
                if *existing != binding_name {
                    log::warn!("shader {}: slot {} 在不同 stage 中名字不同: {} / {}", name, slot, existing, binding_name);
                }
            }
        }

        let all_stages = match sources.keys().fold(vk::ShaderStageFlags::empty(), |acc, s| acc | s.vk_stage()) {
            flags if flags.is_empty() => vk::ShaderStageFlags::ALL,
            flags => flags,
        };

        let declared = doc
            .bindings
            .iter()
            .map(|raw| (raw, all_stages))
            .chain(doc.stage_sections().flat_map(|(stage, section)| {
                section.bindings.iter().map(move |raw| (raw, stage.vk_stage()))
            }));

        let mut by_slot: BTreeMap<u32, ShaderBinding> = BTreeMap::new();
        for (raw, visibility) in declared {
            let binding_name = Self::binding_name(name, raw, &slot_names)?;
            let binding = ShaderBinding::from_raw(binding_name, raw, visibility)
                .with_context(|| format!("shader {} 的 slot {} 无效", name, raw.slot))?;

            match by_slot.get_mut(&raw.slot) {
                Some(existing) => {
                    if existing.descriptor_type != binding.descriptor_type || existing.detail != binding.detail {
                        bail!("shader {} 的 slot {} 在不同 stage 中描述不一致", name, raw.slot);
                    }
                    existing.visibility |= visibility;
                }
                None => {
                    by_slot.insert(raw.slot, binding);
                }
            }
        }

        for (slot, binding_name) in &slot_names {
            if !by_slot.contains_key(slot) {
                log::warn!("shader {}: 源码中的 {} (slot {}) 没有出现在 layout 中", name, binding_name, slot);
            }
        }

        let mut bindings = IndexMap::with_capacity(by_slot.len());
        for binding in by_slot.into_values() {
            if bindings.contains_key(&binding.name) {
                bail!("shader {} 中存在重名的 binding: {}", name, binding.name);
            }
            bindings.insert(binding.name.clone(), binding);
        }
        Ok(bindings)
    }

    fn binding_name(name: &str, raw: &RawBinding, slot_names: &BTreeMap<u32, String>) -> anyhow::Result<String> {
        match (slot_names.get(&raw.slot), &raw.name) {
            (Some(scanned), _) => Ok(scanned.clone()),
            (None, Some(explicit)) => Ok(explicit.clone()),
            (None, None) => bail!("shader {} 的 slot {} 在源码中没有声明，layout 中也没有给出名字", name, raw.slot),
        }
    }

    /// 确保 `name` 及其所有祖先路径都存在，返回 `name` 对应的下标
    fn insert_path(&mut self, name: &str) -> usize {
        let mut parent = None;
        let mut end = 0;
        for segment in name.split('/') {
            end += segment.len();
            let path = &name[..end];
            let index = match self.nodes.get_index_of(path) {
                Some(index) => index,
                None => {
                    let (index, _) = self.nodes.insert_full(
                        path.to_string(),
                        ShaderNode {
                            parent,
                            ..Default::default()
                        },
                    );
                    if let Some(parent) = parent {
                        self.nodes[parent].children.push(index);
                    }
                    index
                }
            };
            parent = Some(index);
            end += 1;
        }
        parent.unwrap_or_default()
    }
}

// compile
impl ShaderResourceRegistry {
    /// 从 `name` 对应的节点出发深度优先遍历，编译所有尚未编译的 stage
    ///
    /// 返回本次新编译的 module 数量
    pub fn compile<B: GfxBackend + ?Sized>(&mut self, name: &str, backend: &mut B) -> anyhow::Result<usize> {
        let Some(root) = self.nodes.get_index_of(name) else {
            panic!("shader {} 没有被加载", name);
        };

        let mut compiled = 0;
        let mut stack = vec![root];
        while let Some(index) = stack.pop() {
            let Some((path, node)) = self.nodes.get_index_mut(index) else {
                continue;
            };
            stack.extend(node.children.iter().rev());

            let Some(resource) = node.resource.as_mut() else {
                continue;
            };
            for (stage, source) in &resource.sources {
                if resource.modules.contains_key(stage) {
                    continue;
                }
                let spirv = self
                    .compiler
                    .compile(*stage, &source.path, &source.text)
                    .with_context(|| format!("编译 shader 失败: {}.{}", path, stage.suffix()))?;
                let module = backend
                    .create_shader_module(&spirv, &format!("{}.{}", path, stage.suffix()))
                    .with_context(|| format!("创建 shader module 失败: {}.{}", path, stage.suffix()))?;
                resource.modules.insert(*stage, module);
                compiled += 1;
            }
        }

        log::debug!("compile {}: {} new modules", name, compiled);
        Ok(compiled)
    }
}

// getters
impl ShaderResourceRegistry {
    /// 获取已加载的 shader，不存在时 panic
    pub fn layout(&self, name: &str) -> &ShaderResource {
        self.try_layout(name).unwrap_or_else(|| panic!("shader {} 没有被加载", name))
    }

    #[inline]
    pub fn try_layout(&self, name: &str) -> Option<&ShaderResource> {
        self.nodes.get(name).and_then(|node| node.resource.as_ref())
    }

    /// `name` 的直接子节点路径
    pub fn children(&self, name: &str) -> Vec<&str> {
        self.nodes
            .get(name)
            .map(|node| node.children.iter().filter_map(|i| self.nodes.get_index(*i)).map(|(k, _)| k.as_str()).collect())
            .unwrap_or_default()
    }

    #[inline]
    pub fn parent(&self, name: &str) -> Option<&str> {
        let parent = self.nodes.get(name)?.parent?;
        self.nodes.get_index(parent).map(|(k, _)| k.as_str())
    }

    /// 所有已加载的 shader 名称
    pub fn shader_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter(|(_, node)| node.resource.is_some()).map(|(k, _)| k.as_str())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use truvis_gfx::headless::GfxHeadlessBackend;

    use super::*;

    /// 只记录调用次数的编译器
    struct CountingCompiler {
        calls: Rc<Cell<usize>>,
    }

    impl ShaderCompiler for CountingCompiler {
        fn compile(&self, stage: ShaderStage, _source_path: &Path, _source: &str) -> anyhow::Result<Vec<u32>> {
            self.calls.set(self.calls.get() + 1);
            Ok(vec![0x0723_0203, stage as u32])
        }
    }

    const GBUFFER_JSON: &str = r#"{
        "bindings": [
            { "slot": 0, "resource": "buffer", "usage": "uniform", "elements": [{ "type": "mat4" }] }
        ],
        "fragment": {
            "bindings": [
                { "slot": 1, "resource": "image", "usage": "combined", "type": "2d" },
                { "slot": 4, "resource": "sampler", "name": "shared_sampler", "immutable": true }
            ]
        }
    }"#;

    const GBUFFER_VERT: &str = r#"
        layout(binding = 0) uniform Camera { mat4 view_proj; } camera;
        void main() {}
    "#;

    const GBUFFER_FRAG: &str = r#"
        layout(binding = 0) uniform Camera { mat4 view_proj; } camera;
        layout(set = 0, binding = 1) uniform sampler2D albedo;
        layout(set = 1, binding = 1) uniform sampler2D not_this_one;
        void main() {}
    "#;

    fn write_shader(dir: &Path, name: &str, files: &[(&str, &str)]) {
        let base = dir.join(name);
        std::fs::create_dir_all(base.parent().unwrap()).unwrap();
        for (ext, text) in files {
            std::fs::write(dir.join(format!("{name}.{ext}")), text).unwrap();
        }
    }

    fn registry() -> (ShaderResourceRegistry, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let registry = ShaderResourceRegistry::new(Box::new(CountingCompiler { calls: calls.clone() }));
        (registry, calls)
    }

    #[test]
    fn test_load_merges_layout_and_sources() {
        let dir = tempfile::tempdir().unwrap();
        write_shader(
            dir.path(),
            "deferred/gbuffer",
            &[("json", GBUFFER_JSON), ("vert", GBUFFER_VERT), ("frag", GBUFFER_FRAG)],
        );

        let (mut registry, _) = registry();
        registry.load(dir.path(), "deferred/gbuffer").unwrap();

        let layout = registry.layout("deferred/gbuffer");
        let camera = layout.binding("Camera").unwrap();
        assert_eq!(camera.slot, 0);
        assert!(camera.is_uniform());
        assert_eq!(camera.visibility, vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT);

        let albedo = layout.binding("albedo").unwrap();
        assert_eq!(albedo.slot, 1);
        assert_eq!(albedo.visibility, vk::ShaderStageFlags::FRAGMENT);

        assert_eq!(layout.binding("shared_sampler").unwrap().slot, 4);
        assert!(layout.binding("not_this_one").is_none());

        assert_eq!(registry.parent("deferred/gbuffer"), Some("deferred"));
        assert_eq!(registry.children("deferred"), vec!["deferred/gbuffer"]);
        assert_eq!(registry.shader_names().collect_vec(), vec!["deferred/gbuffer"]);
    }

    #[test]
    fn test_descriptor_set_layout_desc() {
        let dir = tempfile::tempdir().unwrap();
        write_shader(
            dir.path(),
            "deferred/gbuffer",
            &[("json", GBUFFER_JSON), ("vert", GBUFFER_VERT), ("frag", GBUFFER_FRAG)],
        );
        let (mut registry, _) = registry();
        let desc = registry.load(dir.path(), "deferred/gbuffer").unwrap().descriptor_set_layout_desc();

        assert_eq!(desc.bindings.iter().map(|b| b.binding).collect_vec(), vec![0, 1, 4]);
        assert_eq!(desc.bindings[1].descriptor_type, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        assert_eq!(desc.flags, vk::DescriptorSetLayoutCreateFlags::empty());
    }

    #[test]
    fn test_unknown_usage_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        write_shader(
            dir.path(),
            "broken",
            &[
                ("json", r#"{ "bindings": [{ "slot": 0, "resource": "image", "usage": "framebuffer" }] }"#),
                ("frag", "layout(binding = 0) uniform sampler2D tex;"),
            ],
        );
        let (mut registry, _) = registry();
        let err = registry.load(dir.path(), "broken").unwrap_err();
        assert!(format!("{err:#}").contains("framebuffer"));
        assert!(registry.try_layout("broken").is_none());
    }

    #[test]
    fn test_missing_name_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        write_shader(dir.path(), "nameless", &[("json", r#"{ "bindings": [{ "slot": 3, "resource": "sampler" }] }"#)]);
        let (mut registry, _) = registry();
        assert!(registry.load(dir.path(), "nameless").is_err());
    }

    #[test]
    fn test_compile_each_stage_once() {
        let dir = tempfile::tempdir().unwrap();
        write_shader(
            dir.path(),
            "deferred/gbuffer",
            &[("json", GBUFFER_JSON), ("vert", GBUFFER_VERT), ("frag", GBUFFER_FRAG)],
        );
        write_shader(
            dir.path(),
            "deferred/lighting",
            &[
                ("json", r#"{ "compute": { "bindings": [{ "slot": 0, "resource": "image", "usage": "storage", "format": "rgba16f" }] } }"#),
                ("comp", "layout(binding = 0, rgba16f) uniform image2D hdr;"),
            ],
        );

        let (mut registry, calls) = registry();
        let mut backend = GfxHeadlessBackend::new();
        registry.load(dir.path(), "deferred/gbuffer").unwrap();
        registry.load(dir.path(), "deferred/lighting").unwrap();

        assert!(!registry.layout("deferred/gbuffer").is_compiled());
        assert_eq!(registry.compile("deferred/gbuffer", &mut backend).unwrap(), 2);
        assert!(registry.layout("deferred/gbuffer").is_compiled());
        assert!(!registry.layout("deferred/lighting").is_compiled());
        // 从父节点出发，只会编译 lighting 的 compute stage
        assert_eq!(registry.compile("deferred", &mut backend).unwrap(), 1);
        assert_eq!(registry.compile("deferred", &mut backend).unwrap(), 0);

        assert_eq!(calls.get(), 3);
        assert_eq!(backend.created().shader_modules, 3);

        let gbuffer = registry.layout("deferred/gbuffer");
        assert!(gbuffer.module(ShaderStage::Vertex).is_some());
        assert_eq!(gbuffer.stage_descs().len(), 2);
        assert_eq!(gbuffer.stage_descs()[0].stage, vk::ShaderStageFlags::VERTEX);
    }

    #[test]
    #[should_panic(expected = "没有被加载")]
    fn test_layout_of_unknown_shader_panics() {
        let (registry, _) = registry();
        registry.layout("missing");
    }
}
