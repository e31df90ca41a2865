//! 帧编译
//!
//! 对一帧的 Pass 图做访问分析，并通过 [`RgObjectCache`] 实例化 render pass、framebuffer
//! 以及 DrawBatch 的 pipeline，得到按执行顺序排列的 [`RgExecutionPlan`]。
//! 命令录制由调用者完成：在录制第 N 个 Pass 之前提交 `steps[N].barriers`，
//! 所有 Pass 结束后提交 `end_of_frame`。

use ash::prelude::VkResult;
use ash::vk;
use itertools::Itertools;
use truvis_gfx::backend::GfxBackend;
use truvis_gfx::pipelines::graphics_pipeline::GfxGraphicsPipelineDesc;
use truvis_gfx::pipelines::layout::GfxPipelineLayoutDesc;
use truvis_shader_registry::registry::ShaderResourceRegistry;

use crate::access_analyzer::{AccessAnalyzer, RgAnalysis, RgPassBarriers, RgRenderPassInfo};
use crate::object_cache::RgObjectCache;
use crate::pass_graph::{PassGraph, RgPassKind};
use crate::resource_graph::ResourceGraph;
use crate::resource_state::RgAccessState;

/// DrawBatch 使用的 pipeline 相关对象
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgPipelineObjects {
    pub set_layout: vk::DescriptorSetLayout,
    pub layout: vk::PipelineLayout,
    pub pipeline: vk::Pipeline,
}

/// 执行计划中的一个 Pass
#[derive(Clone, Debug)]
pub struct RgPlanStep {
    pub pass_index: usize,
    pub name: String,
    pub kind: RgPassKind,
    /// 在该 Pass 之前提交
    pub barriers: RgPassBarriers,
    /// 该 Pass 对每个资源的（合并后的）访问
    pub accesses: Vec<(String, RgAccessState)>,

    pub render_pass: Option<vk::RenderPass>,
    pub framebuffer: Option<vk::Framebuffer>,
    pub extent: Option<vk::Extent2D>,

    /// DrawBatch 所属的 RenderPass
    pub owner: Option<usize>,
    pub pipeline: Option<RgPipelineObjects>,
}

/// 一帧的执行计划
#[derive(Clone, Debug)]
pub struct RgExecutionPlan {
    /// 生成计划时 Pass 图的 generation
    pub generation: u64,
    pub steps: Vec<RgPlanStep>,
    pub end_of_frame: RgPassBarriers,
}

impl RgExecutionPlan {
    pub fn barrier_count(&self) -> usize {
        self.steps.iter().map(|step| step.barriers.len()).sum::<usize>() + self.end_of_frame.len()
    }

    #[inline]
    pub fn step(&self, name: &str) -> Option<&RgPlanStep> {
        self.steps.iter().find(|step| step.name == name)
    }
}

pub struct RenderGraphCompiler;

impl RenderGraphCompiler {
    /// 编译一帧
    ///
    /// Pass 引用的资源必须已经 mount；DrawBatch 的 shader 已经编译时才会创建 pipeline。
    pub fn compile_frame<B: GfxBackend + ?Sized>(
        passes: &PassGraph,
        resources: &mut ResourceGraph,
        shaders: &ShaderResourceRegistry,
        cache: &mut RgObjectCache,
        backend: &mut B,
    ) -> VkResult<RgExecutionPlan> {
        let analysis = AccessAnalyzer::analyze(passes, resources, shaders);

        let mut steps: Vec<RgPlanStep> = Vec::with_capacity(passes.len());
        for (pass_index, pass) in passes.passes().iter().enumerate() {
            let mut step = RgPlanStep {
                pass_index,
                name: pass.name().to_string(),
                kind: pass.kind().clone(),
                barriers: analysis.pass_barriers(pass_index).clone(),
                accesses: Self::pass_accesses(&analysis, pass_index),
                render_pass: None,
                framebuffer: None,
                extent: None,
                owner: None,
                pipeline: None,
            };

            match pass.kind() {
                RgPassKind::RenderPass => {
                    if let Some(info) = analysis.render_pass(pass_index).filter(|info| !info.attachments.is_empty()) {
                        let render_pass = cache.get_or_create(&info.render_pass_desc(), backend)?;
                        step.framebuffer = Some(cache.get_or_create(&info.framebuffer_desc(render_pass), backend)?);
                        step.render_pass = Some(render_pass);
                        step.extent = Some(info.extent);
                    }
                }
                RgPassKind::DrawBatch { phase } => {
                    step.owner = passes.owner_render_pass(pass_index);
                    let owner = step.owner.and_then(|owner| Some((steps[owner].render_pass?, analysis.render_pass(owner)?)));
                    match owner {
                        Some((render_pass, info)) => {
                            step.pipeline = Self::realize_pipeline(phase, render_pass, info, shaders, cache, backend)?;
                        }
                        None => log::warn!("draw batch {} has no render pass with attachments", pass.name()),
                    }
                }
                RgPassKind::ComputePass { .. } | RgPassKind::CopyPass => {}
            }
            steps.push(step);
        }

        Ok(RgExecutionPlan {
            generation: passes.generation(),
            steps,
            end_of_frame: analysis.end_of_frame().clone(),
        })
    }

    fn pass_accesses(analysis: &RgAnalysis, pass_index: usize) -> Vec<(String, RgAccessState)> {
        analysis
            .timelines()
            .filter_map(|(name, timeline)| {
                timeline.iter().find(|entry| entry.pass_index == pass_index).map(|entry| (name.to_string(), entry.state))
            })
            .collect()
    }

    /// descriptor set layout -> pipeline layout -> graphics pipeline，全部走缓存
    fn realize_pipeline<B: GfxBackend + ?Sized>(
        phase: &str,
        render_pass: vk::RenderPass,
        info: &RgRenderPassInfo,
        shaders: &ShaderResourceRegistry,
        cache: &mut RgObjectCache,
        backend: &mut B,
    ) -> VkResult<Option<RgPipelineObjects>> {
        let shader = shaders.layout(phase);
        if !shader.is_compiled() {
            log::debug!("shader {} is not compiled, skip pipeline", phase);
            return Ok(None);
        }

        let set_layout = cache.get_or_create(&shader.descriptor_set_layout_desc(), backend)?;
        let layout = cache.get_or_create(
            &GfxPipelineLayoutDesc {
                set_layouts: vec![set_layout],
                push_constant_ranges: Vec::new(),
            },
            backend,
        )?;

        let mut desc = GfxGraphicsPipelineDesc::new(shader.stage_descs(), layout, render_pass, info.color_attachments.len());
        if let Some(first) = info.attachments.first() {
            desc.samples = first.samples;
        }
        if info.depth_attachment.is_none() {
            desc.depth_stencil.depth_test_enable = false;
            desc.depth_stencil.depth_write_enable = false;
        }
        let pipeline = cache.get_or_create(&desc, backend)?;

        Ok(Some(RgPipelineObjects {
            set_layout,
            layout,
            pipeline,
        }))
    }
}

// 调试输出
impl RgExecutionPlan {
    /// 打印执行计划
    ///
    /// 每个 Pass 输出其资源访问、barrier（layout 转换、stage、access）以及实例化的对象
    pub fn print_execution_plan(&self) {
        log::info!("╔══════════════════════════════════════════════════════════════════╗");
        log::info!("║              RenderGraph Execution Plan                          ║");
        log::info!("╠══════════════════════════════════════════════════════════════════╣");
        log::info!(
            "║ Generation: {}  |  Passes: {}  |  Barriers: {}",
            self.generation,
            self.steps.len(),
            self.barrier_count()
        );
        log::info!("║ Order: [{}]", self.steps.iter().map(|step| step.name.as_str()).join(" → "));
        log::info!("╚══════════════════════════════════════════════════════════════════╝");

        for step in &self.steps {
            log::info!("");
            log::info!("┌─────────────────────────────────────────────────────────────────┐");
            log::info!("│ [{}/{}] {} \"{}\"", step.pass_index + 1, self.steps.len(), step.kind.label(), step.name);
            match &step.kind {
                RgPassKind::DrawBatch { phase } | RgPassKind::ComputePass { phase: Some(phase) } => {
                    log::info!("│ Shader: {}", phase);
                }
                _ => {}
            }
            log::info!("├─────────────────────────────────────────────────────────────────┤");

            for (name, state) in &step.accesses {
                let icon = if state.is_write() { "✏️ " } else { "📖" };
                log::info!(
                    "│   {} \"{}\" @ {:?} (stage: {}, access: {})",
                    icon,
                    name,
                    state.layout,
                    format_pipeline_stage(state.stage),
                    format_access_flags(state.access)
                );
            }

            if let (Some(render_pass), Some(framebuffer), Some(extent)) = (step.render_pass, step.framebuffer, step.extent)
            {
                log::info!(
                    "│ RenderPass: {:?}  Framebuffer: {:?}  Extent: {}x{}",
                    render_pass,
                    framebuffer,
                    extent.width,
                    extent.height
                );
            }
            if let Some(owner) = step.owner {
                log::info!("│ Owner: \"{}\"", self.steps[owner].name);
            }
            if let Some(pipeline) = step.pipeline {
                log::info!("│ Pipeline: {:?} (layout: {:?})", pipeline.pipeline, pipeline.layout);
            }

            Self::print_barriers(&step.barriers);
            log::info!("└─────────────────────────────────────────────────────────────────┘");
        }

        if self.end_of_frame.has_barriers() {
            log::info!("");
            log::info!("┌─────────────────────────────────────────────────────────────────┐");
            log::info!("│ End of frame");
            Self::print_barriers(&self.end_of_frame);
            log::info!("└─────────────────────────────────────────────────────────────────┘");
        }

        log::info!("");
        log::info!("═══════════════════════ End of Execution Plan ═══════════════════════");
    }

    fn print_barriers(barriers: &RgPassBarriers) {
        if !barriers.has_barriers() {
            log::info!("│ No barriers required");
            return;
        }

        log::info!("├─────────────────────────────────────────────────────────────────┤");
        log::info!(
            "│ Barriers: {} image, {} buffer",
            barriers.image_barrier_count(),
            barriers.buffer_barrier_count()
        );
        for barrier in &barriers.image_barriers {
            let layout_change = if barrier.has_layout_transition() {
                format!("{:?} → {:?}", barrier.src_state.layout, barrier.dst_state.layout)
            } else {
                format!("{:?} (no layout change)", barrier.src_state.layout)
            };
            log::info!("│   🔒 Image \"{}\":", barrier.resource);
            log::info!("│       Layout: {}", layout_change);
            log::info!(
                "│       Stage:  {} → {}",
                format_pipeline_stage(barrier.src_state.stage),
                format_pipeline_stage(barrier.dst_state.stage)
            );
            log::info!(
                "│       Access: {} → {}",
                format_access_flags(barrier.src_state.src_access()),
                format_access_flags(barrier.dst_state.access)
            );
            log::info!("│       Aspect: {:?}", barrier.aspect);
        }
        for barrier in &barriers.buffer_barriers {
            log::info!("│   🔒 Buffer \"{}\":", barrier.resource);
            log::info!(
                "│       Stage:  {} → {}",
                format_pipeline_stage(barrier.src_state.stage),
                format_pipeline_stage(barrier.dst_state.stage)
            );
            log::info!(
                "│       Access: {} → {}",
                format_access_flags(barrier.src_state.src_access()),
                format_access_flags(barrier.dst_state.access)
            );
        }
    }
}

const STAGE_NAMES: &[(vk::PipelineStageFlags2, &str)] = &[
    (vk::PipelineStageFlags2::TOP_OF_PIPE, "TOP_OF_PIPE"),
    (vk::PipelineStageFlags2::DRAW_INDIRECT, "DRAW_INDIRECT"),
    (vk::PipelineStageFlags2::VERTEX_INPUT, "VERTEX_INPUT"),
    (vk::PipelineStageFlags2::VERTEX_SHADER, "VERTEX_SHADER"),
    (vk::PipelineStageFlags2::TASK_SHADER_EXT, "TASK_SHADER"),
    (vk::PipelineStageFlags2::MESH_SHADER_EXT, "MESH_SHADER"),
    (vk::PipelineStageFlags2::FRAGMENT_SHADING_RATE_ATTACHMENT_KHR, "SHADING_RATE"),
    (vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS, "EARLY_FRAGMENT_TESTS"),
    (vk::PipelineStageFlags2::FRAGMENT_SHADER, "FRAGMENT_SHADER"),
    (vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS, "LATE_FRAGMENT_TESTS"),
    (vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT, "COLOR_ATTACHMENT_OUTPUT"),
    (vk::PipelineStageFlags2::COMPUTE_SHADER, "COMPUTE_SHADER"),
    (vk::PipelineStageFlags2::TRANSFER, "TRANSFER"),
    (vk::PipelineStageFlags2::BOTTOM_OF_PIPE, "BOTTOM_OF_PIPE"),
    (vk::PipelineStageFlags2::ALL_GRAPHICS, "ALL_GRAPHICS"),
    (vk::PipelineStageFlags2::ALL_COMMANDS, "ALL_COMMANDS"),
];

const ACCESS_NAMES: &[(vk::AccessFlags2, &str)] = &[
    (vk::AccessFlags2::INDIRECT_COMMAND_READ, "INDIRECT_CMD_READ"),
    (vk::AccessFlags2::UNIFORM_READ, "UNIFORM_READ"),
    (vk::AccessFlags2::INPUT_ATTACHMENT_READ, "INPUT_ATTACH_READ"),
    (vk::AccessFlags2::SHADER_READ, "SHADER_READ"),
    (vk::AccessFlags2::SHADER_WRITE, "SHADER_WRITE"),
    (vk::AccessFlags2::COLOR_ATTACHMENT_READ, "COLOR_ATTACH_READ"),
    (vk::AccessFlags2::COLOR_ATTACHMENT_WRITE, "COLOR_ATTACH_WRITE"),
    (vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ, "DEPTH_ATTACH_READ"),
    (vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE, "DEPTH_ATTACH_WRITE"),
    (vk::AccessFlags2::FRAGMENT_SHADING_RATE_ATTACHMENT_READ_KHR, "SHADING_RATE_READ"),
    (vk::AccessFlags2::TRANSFER_READ, "TRANSFER_READ"),
    (vk::AccessFlags2::TRANSFER_WRITE, "TRANSFER_WRITE"),
    (vk::AccessFlags2::MEMORY_READ, "MEMORY_READ"),
    (vk::AccessFlags2::MEMORY_WRITE, "MEMORY_WRITE"),
];

/// PipelineStageFlags2 转为可读字符串
fn format_pipeline_stage(stage: vk::PipelineStageFlags2) -> String {
    let names = STAGE_NAMES.iter().filter(|(flag, _)| stage.contains(*flag)).map(|(_, name)| *name).collect_vec();
    if names.is_empty() { format!("{:?}", stage) } else { names.join(" | ") }
}

/// AccessFlags2 转为可读字符串
fn format_access_flags(access: vk::AccessFlags2) -> String {
    if access == vk::AccessFlags2::NONE {
        return "NONE".to_string();
    }
    let names = ACCESS_NAMES.iter().filter(|(flag, _)| access.contains(*flag)).map(|(_, name)| *name).collect_vec();
    if names.is_empty() { format!("{:?}", access) } else { names.join(" | ") }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;
    use truvis_gfx::headless::GfxHeadlessBackend;

    use super::*;
    use crate::pass_graph::RgAccessMode;
    use crate::resource_graph::RgSwapchainImport;
    use crate::test_fixtures::{deferred_resources, deferred_shaders};

    fn declare_frame(passes: &mut PassGraph) {
        passes.clear();
        passes
            .add_compute_pass_with_phase("cull", "deferred/cull")
            .add_resource("instances", "Instances", RgAccessMode::Read)
            .add_resource("draws", "DrawCommands", RgAccessMode::Write)
            .add_resource("camera", "Camera", RgAccessMode::Read);
        passes.add_render_pass("gbuffer").add_color("albedo").add_color("normal").add_depth_stencil("depth");
        passes
            .add_draw_batch("gbuffer/opaque", "deferred/gbuffer")
            .add_resource("camera", "Camera", RgAccessMode::Read)
            .add_resource("instances", "Instances", RgAccessMode::Read)
            .add_indirect_buffer("draws");
        passes.add_render_pass("lighting").add_color("swapchain");
        passes
            .add_draw_batch("lighting/fullscreen", "deferred/lighting")
            .add_resource("camera", "Camera", RgAccessMode::Read)
            .add_resource("albedo", "albedo", RgAccessMode::Read)
            .add_resource("normal", "normal", RgAccessMode::Read)
            .add_resource("depth", "depth", RgAccessMode::Read)
            .add_resource("lights", "Lights", RgAccessMode::Read);
    }

    fn setup(backend: &mut GfxHeadlessBackend) -> ResourceGraph {
        let mut resources = deferred_resources();
        let images = (0..2).map(|_| backend.external_image()).collect();
        resources.import(
            "swapchain",
            RgSwapchainImport {
                swapchain: vk::SwapchainKHR::from_raw(1),
                images,
                format: vk::Format::B8G8R8A8_UNORM,
                extent: vk::Extent2D { width: 128, height: 64 },
            },
        );
        let names = resources.iter().filter(|r| r.payload().origin().is_none()).map(|r| r.name().to_string()).collect_vec();
        for name in names {
            resources.mount(&name, backend).unwrap();
        }
        resources
    }

    #[test]
    fn test_compile_frame_reuses_cached_objects() {
        let (_dir, mut shaders) = deferred_shaders();
        let mut backend = GfxHeadlessBackend::new();
        let mut resources = setup(&mut backend);
        shaders.compile("deferred", &mut backend).unwrap();
        let mut cache = RgObjectCache::new();
        let mut passes = PassGraph::new();

        declare_frame(&mut passes);
        resources.set_acquired_image("swapchain", 0);
        let first = RenderGraphCompiler::compile_frame(&passes, &mut resources, &shaders, &mut cache, &mut backend)
            .unwrap();
        let created = backend.created();
        assert_eq!(created.render_passes, 2);
        assert_eq!(created.framebuffers, 2);
        assert_eq!(created.graphics_pipelines, 2);

        declare_frame(&mut passes);
        let second = RenderGraphCompiler::compile_frame(&passes, &mut resources, &shaders, &mut cache, &mut backend)
            .unwrap();
        assert_eq!(backend.created(), created);
        assert_eq!(second.generation, first.generation + 1);
        assert_eq!(first.step("gbuffer").unwrap().framebuffer, second.step("gbuffer").unwrap().framebuffer);

        // 换一张 swapchain image 只会多一个 framebuffer
        resources.set_acquired_image("swapchain", 1);
        declare_frame(&mut passes);
        let third = RenderGraphCompiler::compile_frame(&passes, &mut resources, &shaders, &mut cache, &mut backend)
            .unwrap();
        assert_eq!(backend.created().render_passes, 2);
        assert_eq!(backend.created().framebuffers, 3);
        assert_ne!(second.step("lighting").unwrap().framebuffer, third.step("lighting").unwrap().framebuffer);
    }

    #[test]
    fn test_plan_steps_follow_declaration_order() {
        let (_dir, mut shaders) = deferred_shaders();
        let mut backend = GfxHeadlessBackend::new();
        let mut resources = setup(&mut backend);
        shaders.compile("deferred", &mut backend).unwrap();
        let mut cache = RgObjectCache::new();
        let mut passes = PassGraph::new();
        declare_frame(&mut passes);

        let plan = RenderGraphCompiler::compile_frame(&passes, &mut resources, &shaders, &mut cache, &mut backend)
            .unwrap();
        plan.print_execution_plan();

        assert_eq!(
            plan.steps.iter().map(|step| step.name.as_str()).collect_vec(),
            vec!["cull", "gbuffer", "gbuffer/opaque", "lighting", "lighting/fullscreen"]
        );

        let opaque = plan.step("gbuffer/opaque").unwrap();
        assert_eq!(opaque.owner, Some(1));
        assert!(opaque.pipeline.is_some());
        // cull 写入 draws 之后作为 indirect 参数读取
        assert_eq!(opaque.barriers.buffer_barrier_count(), 1);
        assert_eq!(opaque.barriers.buffer_barriers[0].resource, "draws");

        let fullscreen = plan.step("lighting/fullscreen").unwrap();
        assert_eq!(fullscreen.owner, Some(3));
        assert_eq!(fullscreen.barriers.image_barrier_count(), 3);
        assert_eq!(fullscreen.accesses.len(), 5);

        assert_eq!(plan.step("gbuffer").unwrap().extent, Some(vk::Extent2D { width: 128, height: 64 }));
        assert_eq!(plan.end_of_frame.image_barrier_count(), 1);
        assert_eq!(plan.end_of_frame.image_barriers[0].dst_state, RgAccessState::PRESENT);
    }

    #[test]
    fn test_uncompiled_shader_skips_pipeline() {
        let (_dir, shaders) = deferred_shaders();
        let mut backend = GfxHeadlessBackend::new();
        let mut resources = setup(&mut backend);
        let mut cache = RgObjectCache::new();
        let mut passes = PassGraph::new();
        declare_frame(&mut passes);

        let plan = RenderGraphCompiler::compile_frame(&passes, &mut resources, &shaders, &mut cache, &mut backend)
            .unwrap();
        assert!(plan.steps.iter().all(|step| step.pipeline.is_none()));
        assert_eq!(backend.created().graphics_pipelines, 0);
        assert_eq!(backend.created().render_passes, 2);
    }

    #[test]
    fn test_format_flags() {
        assert_eq!(
            format_pipeline_stage(vk::PipelineStageFlags2::VERTEX_SHADER | vk::PipelineStageFlags2::FRAGMENT_SHADER),
            "VERTEX_SHADER | FRAGMENT_SHADER"
        );
        assert_eq!(format_access_flags(vk::AccessFlags2::NONE), "NONE");
        assert_eq!(format_access_flags(vk::AccessFlags2::UNIFORM_READ), "UNIFORM_READ");
    }
}
