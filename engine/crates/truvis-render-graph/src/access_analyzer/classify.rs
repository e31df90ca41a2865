//! 将 Pass 中声明的访问转换为 stage / access / layout
//!
//! 所有违反声明约定的情况都是配置错误，直接 panic。

use ash::vk;
use truvis_gfx::resources::image::VulkanFormatUtils;
use truvis_shader_registry::registry::ShaderResource;

use crate::pass_graph::{RgAccessMode, RgPass, RgPassResource, RgResourceKind};
use crate::resource_graph::RgResource;
use crate::resource_state::RgAccessState;

/// 深度附件写入所在的 stage
///
/// 深度写入发生在 EARLY / LATE_FRAGMENT_TESTS，只用 COLOR_ATTACHMENT_OUTPUT 无法与后续的深度读写同步，
/// 这里在 COLOR_ATTACHMENT_OUTPUT 的基础上加入这两个 stage。
const DEPTH_ATTACHMENT_STAGES: vk::PipelineStageFlags2 = vk::PipelineStageFlags2::from_raw(
    vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT.as_raw()
        | vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS.as_raw()
        | vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS.as_raw(),
);

const SHADER_WRITE_ACCESS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
    vk::AccessFlags2::SHADER_WRITE.as_raw() | vk::AccessFlags2::SHADER_STORAGE_WRITE.as_raw(),
);

const SHADER_READ_ACCESS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
    vk::AccessFlags2::SHADER_READ.as_raw()
        | vk::AccessFlags2::SHADER_SAMPLED_READ.as_raw()
        | vk::AccessFlags2::SHADER_STORAGE_READ.as_raw(),
);

/// RenderPass 中的访问
pub(crate) fn render_pass_access(pass: &RgPass, entry: &RgPassResource, resource: &RgResource) -> RgAccessState {
    let Some(desc) = resource.image_desc() else {
        panic!("pass {}: attachment {} is not an image", pass.name(), entry.resource);
    };
    if entry.kind.is_depth_or_stencil() && !VulkanFormatUtils::is_depth_or_stencil(desc.format) {
        panic!(
            "pass {}: {} is declared as {:?} but has format {:?}",
            pass.name(),
            entry.resource,
            entry.kind,
            desc.format
        );
    }

    if entry.is_attachment_output() {
        let (stage, write, read) = match entry.kind {
            kind if kind.is_depth_or_stencil() => (
                DEPTH_ATTACHMENT_STAGES,
                vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE,
                vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ,
            ),
            RgResourceKind::Color => (
                vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
                vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
                vk::AccessFlags2::COLOR_ATTACHMENT_READ,
            ),
            kind => panic!("pass {}: {:?} attachment {} needs a binding name", pass.name(), kind, entry.resource),
        };
        let access = match entry.access {
            RgAccessMode::Write => write,
            RgAccessMode::ReadWrite => write | read,
            RgAccessMode::Read => {
                panic!("pass {}: output attachment {} must not be read-only", pass.name(), entry.resource)
            }
        };
        return RgAccessState::new(stage, access, vk::ImageLayout::UNDEFINED);
    }

    match entry.kind {
        RgResourceKind::ShadingRate => {
            if entry.access.writes() {
                panic!("pass {}: shading rate attachment {} is read-only", pass.name(), entry.resource);
            }
            RgAccessState::new(
                vk::PipelineStageFlags2::FRAGMENT_SHADER | vk::PipelineStageFlags2::FRAGMENT_SHADING_RATE_ATTACHMENT_KHR,
                vk::AccessFlags2::FRAGMENT_SHADING_RATE_ATTACHMENT_READ_KHR,
                vk::ImageLayout::UNDEFINED,
            )
        }
        RgResourceKind::IndirectBuffer => {
            panic!("pass {}: indirect buffer {} cannot be an attachment", pass.name(), entry.resource)
        }
        kind => {
            let depth = kind.is_depth_or_stencil();
            let mut stage = vk::PipelineStageFlags2::FRAGMENT_SHADER;
            let mut access = vk::AccessFlags2::INPUT_ATTACHMENT_READ;
            if depth {
                stage |= vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS;
            }
            if entry.access.writes() {
                if depth {
                    stage |= vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS;
                    access |= vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE;
                } else {
                    stage |= vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT;
                    access |= vk::AccessFlags2::COLOR_ATTACHMENT_WRITE;
                }
            }
            RgAccessState::new(stage, access, vk::ImageLayout::UNDEFINED)
        }
    }
}

/// DrawBatch 中的访问，stage 由 binding 的可见性决定
pub(crate) fn draw_batch_access(
    pass: &RgPass,
    entry: &RgPassResource,
    resource: &RgResource,
    layout: &ShaderResource,
) -> RgAccessState {
    if entry.kind == RgResourceKind::IndirectBuffer {
        return indirect_access(pass, entry, resource);
    }

    let Some(binding) = layout.binding(&entry.binding) else {
        panic!("pass {}: binding {} not found in shader {}", pass.name(), entry.binding, layout.name());
    };
    let uniform = binding.is_uniform() && resource.is_buffer_like();
    RgAccessState::buffer(shader_stages(binding.visibility), shader_access(entry.access, uniform))
}

/// ComputePass 中的访问
///
/// 指定了 shader 时 uniform 判断来自 binding，否则来自 buffer 的 usage
pub(crate) fn compute_access(
    pass: &RgPass,
    entry: &RgPassResource,
    resource: &RgResource,
    layout: Option<&ShaderResource>,
) -> RgAccessState {
    if entry.kind == RgResourceKind::IndirectBuffer {
        return indirect_access(pass, entry, resource);
    }

    let uniform = match layout {
        Some(layout) => match layout.binding(&entry.binding) {
            Some(binding) => binding.is_uniform() && resource.is_buffer_like(),
            None => panic!("pass {}: binding {} not found in shader {}", pass.name(), entry.binding, layout.name()),
        },
        None => resource.buffer_desc().is_some_and(|desc| desc.is_uniform()),
    };
    RgAccessState::buffer(vk::PipelineStageFlags2::COMPUTE_SHADER, shader_access(entry.access, uniform))
}

/// CopyPass 中的访问
pub(crate) fn copy_access(entry: &RgPassResource) -> RgAccessState {
    let access = match entry.access {
        RgAccessMode::Read => vk::AccessFlags2::TRANSFER_READ,
        RgAccessMode::Write => vk::AccessFlags2::TRANSFER_WRITE,
        RgAccessMode::ReadWrite => vk::AccessFlags2::TRANSFER_READ | vk::AccessFlags2::TRANSFER_WRITE,
    };
    RgAccessState::buffer(vk::PipelineStageFlags2::TRANSFER, access)
}

fn indirect_access(pass: &RgPass, entry: &RgPassResource, resource: &RgResource) -> RgAccessState {
    if !resource.is_buffer_like() || entry.access.writes() {
        panic!("pass {}: indirect buffer {} must be a read-only buffer", pass.name(), entry.resource);
    }
    RgAccessState::buffer(vk::PipelineStageFlags2::DRAW_INDIRECT, vk::AccessFlags2::INDIRECT_COMMAND_READ)
}

fn shader_access(mode: RgAccessMode, uniform: bool) -> vk::AccessFlags2 {
    match mode {
        RgAccessMode::Read if uniform => vk::AccessFlags2::UNIFORM_READ,
        RgAccessMode::Read => vk::AccessFlags2::SHADER_READ,
        RgAccessMode::Write => vk::AccessFlags2::SHADER_WRITE,
        RgAccessMode::ReadWrite => vk::AccessFlags2::SHADER_READ | vk::AccessFlags2::SHADER_WRITE,
    }
}

/// shader 可见性转换为 pipeline stage
pub(crate) fn shader_stages(visibility: vk::ShaderStageFlags) -> vk::PipelineStageFlags2 {
    const MAPPING: [(vk::ShaderStageFlags, vk::PipelineStageFlags2); 8] = [
        (vk::ShaderStageFlags::VERTEX, vk::PipelineStageFlags2::VERTEX_SHADER),
        (vk::ShaderStageFlags::TESSELLATION_CONTROL, vk::PipelineStageFlags2::TESSELLATION_CONTROL_SHADER),
        (vk::ShaderStageFlags::TESSELLATION_EVALUATION, vk::PipelineStageFlags2::TESSELLATION_EVALUATION_SHADER),
        (vk::ShaderStageFlags::GEOMETRY, vk::PipelineStageFlags2::GEOMETRY_SHADER),
        (vk::ShaderStageFlags::FRAGMENT, vk::PipelineStageFlags2::FRAGMENT_SHADER),
        (vk::ShaderStageFlags::COMPUTE, vk::PipelineStageFlags2::COMPUTE_SHADER),
        (vk::ShaderStageFlags::TASK_EXT, vk::PipelineStageFlags2::TASK_SHADER_EXT),
        (vk::ShaderStageFlags::MESH_EXT, vk::PipelineStageFlags2::MESH_SHADER_EXT),
    ];

    let stages = MAPPING
        .iter()
        .filter(|(shader_stage, _)| visibility.contains(*shader_stage))
        .fold(vk::PipelineStageFlags2::NONE, |acc, (_, stage)| acc | *stage);

    if stages == vk::PipelineStageFlags2::NONE {
        log::warn!("binding visibility {:?} maps to no shader stage, fall back to ALL_GRAPHICS", visibility);
        return vk::PipelineStageFlags2::ALL_GRAPHICS;
    }
    stages
}

/// 由 access 推导 image layout
///
/// transfer 与 shader 访问优先于 attachment 访问
pub(crate) fn image_layout(access: vk::AccessFlags2, format: vk::Format) -> vk::ImageLayout {
    if access.contains(vk::AccessFlags2::TRANSFER_WRITE) {
        vk::ImageLayout::TRANSFER_DST_OPTIMAL
    } else if access.contains(vk::AccessFlags2::TRANSFER_READ) {
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL
    } else if access.intersects(SHADER_WRITE_ACCESS) {
        vk::ImageLayout::GENERAL
    } else if access.intersects(SHADER_READ_ACCESS) {
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
    } else if access.contains(vk::AccessFlags2::INPUT_ATTACHMENT_READ) {
        vk::ImageLayout::GENERAL
    } else if access.contains(vk::AccessFlags2::COLOR_ATTACHMENT_WRITE) {
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
    } else if access.contains(vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE) {
        if VulkanFormatUtils::has_stencil(format) {
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        } else {
            vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL
        }
    } else if access.contains(vk::AccessFlags2::FRAGMENT_SHADING_RATE_ATTACHMENT_READ_KHR) {
        vk::ImageLayout::FRAGMENT_SHADING_RATE_ATTACHMENT_OPTIMAL_KHR
    } else {
        vk::ImageLayout::UNDEFINED
    }
}
