//! 测试共用的 shader 与资源

use std::path::Path;

use ash::vk;
use tempfile::TempDir;
use truvis_gfx::resources::buffer::GfxBufferDesc;
use truvis_gfx::resources::image::GfxImageDesc;
use truvis_shader_registry::compiler::ShaderCompiler;
use truvis_shader_registry::registry::ShaderResourceRegistry;
use truvis_shader_registry::stage::ShaderStage;

use crate::resource_graph::{RgResidency, ResourceGraph};

const DEFERRED_SHADERS: &[(&str, &str, &str)] = &[
    ("deferred/gbuffer", "json", include_str!("../../../shader/deferred/gbuffer.json")),
    ("deferred/gbuffer", "vert", include_str!("../../../shader/deferred/gbuffer.vert")),
    ("deferred/gbuffer", "frag", include_str!("../../../shader/deferred/gbuffer.frag")),
    ("deferred/lighting", "json", include_str!("../../../shader/deferred/lighting.json")),
    ("deferred/lighting", "vert", include_str!("../../../shader/deferred/lighting.vert")),
    ("deferred/lighting", "frag", include_str!("../../../shader/deferred/lighting.frag")),
    ("deferred/cull", "json", include_str!("../../../shader/deferred/cull.json")),
    ("deferred/cull", "comp", include_str!("../../../shader/deferred/cull.comp")),
];

/// 不调用外部工具，只返回合法的 SPIR-V 头
pub(crate) struct FakeCompiler;

impl ShaderCompiler for FakeCompiler {
    fn compile(&self, stage: ShaderStage, _source_path: &Path, _source: &str) -> anyhow::Result<Vec<u32>> {
        Ok(vec![0x0723_0203, 0x0001_0500, stage as u32])
    }
}

/// 加载 deferred 目录下的示例 shader，返回的 TempDir 需要在测试期间保持存活
pub(crate) fn deferred_shaders() -> (TempDir, ShaderResourceRegistry) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("deferred")).unwrap();
    for (name, ext, text) in DEFERRED_SHADERS {
        std::fs::write(dir.path().join(format!("{name}.{ext}")), text).unwrap();
    }

    let mut registry = ShaderResourceRegistry::new(Box::new(FakeCompiler));
    for name in ["deferred/gbuffer", "deferred/lighting", "deferred/cull"] {
        registry.load(dir.path(), name).unwrap();
    }
    (dir, registry)
}

pub(crate) fn color_image() -> GfxImageDesc {
    GfxImageDesc::new_2d(
        128,
        64,
        vk::Format::R8G8B8A8_UNORM,
        vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::TRANSFER_DST,
    )
}

pub(crate) fn depth_image() -> GfxImageDesc {
    GfxImageDesc::new_2d(
        128,
        64,
        vk::Format::D32_SFLOAT,
        vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
    )
}

pub(crate) fn storage_buffer(size: u64) -> GfxBufferDesc {
    GfxBufferDesc::new(
        size,
        vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::TRANSFER_DST | vk::BufferUsageFlags::INDIRECT_BUFFER,
    )
}

/// 延迟渲染常用的一组资源，尚未 mount
pub(crate) fn deferred_resources() -> ResourceGraph {
    let mut resources = ResourceGraph::new();
    resources.add_image("albedo", color_image(), RgResidency::Transient);
    resources.add_image("normal", color_image(), RgResidency::Transient);
    resources.add_image("depth", depth_image(), RgResidency::Transient);
    resources.add_buffer("camera", GfxBufferDesc::uniform(256), RgResidency::Persistent);
    resources.add_buffer("instances", storage_buffer(4096), RgResidency::Persistent);
    resources.add_buffer("lights", storage_buffer(1024), RgResidency::Persistent);
    resources.add_buffer("draws", storage_buffer(1024), RgResidency::Transient);
    resources
}
