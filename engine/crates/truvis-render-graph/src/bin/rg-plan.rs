//! 对一个示例延迟渲染帧做离线规划，并打印执行计划
//!
//! 使用 headless 后端，不需要 GPU。

use std::path::PathBuf;

use anyhow::Context;
use ash::vk;
use ash::vk::Handle;
use clap::Parser;
use truvis_crate_tools::init_log::init_log;
use truvis_crate_tools::resource::TruvisPath;
use truvis_gfx::headless::GfxHeadlessBackend;
use truvis_gfx::resources::buffer::GfxBufferDesc;
use truvis_gfx::resources::image::GfxImageDesc;
use truvis_render_graph::compiler::{RenderGraphCompiler, RgExecutionPlan};
use truvis_render_graph::object_cache::RgObjectCache;
use truvis_render_graph::pass_graph::{PassGraph, RgAccessMode};
use truvis_render_graph::resource_graph::{RgResidency, RgSwapchainImport, ResourceGraph};
use truvis_render_graph::settings::RenderGraphSettings;
use truvis_shader_registry::compiler::GlslcCompiler;
use truvis_shader_registry::registry::ShaderResourceRegistry;

const SHADERS: [&str; 3] = ["deferred/cull", "deferred/gbuffer", "deferred/lighting"];

#[derive(Parser, Debug)]
#[command(name = "rg-plan")]
#[command(about = "Plan a sample deferred frame with the render graph compiler")]
struct Cli {
    /// 配置文件，默认为 config/render-graph.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// 覆盖配置中的帧数
    #[arg(long)]
    frames: Option<u32>,

    /// 覆盖配置中的 shader 目录
    #[arg(long)]
    shader_dir: Option<PathBuf>,

    /// 调用 glslc 编译 shader，并为 DrawBatch 创建 pipeline
    #[arg(long)]
    compile: bool,
}

fn main() -> anyhow::Result<()> {
    init_log();
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(|| TruvisPath::config_path("render-graph.toml"));
    let mut settings = RenderGraphSettings::load(&config_path)?;
    if let Some(frames) = cli.frames {
        settings.frames = frames;
    }
    if let Some(dir) = cli.shader_dir {
        settings.shader_root = dir;
    }
    anyhow::ensure!(settings.swapchain_image_count > 0, "swapchain_image_count 必须大于 0");
    log::info!("settings: {:?}", settings);

    let mut backend = GfxHeadlessBackend::new();

    let shader_root = settings.shader_root_path();
    let compiler = GlslcCompiler::new().with_include_dir(shader_root.join("include"));
    let mut shaders = ShaderResourceRegistry::new(Box::new(compiler));
    for name in SHADERS {
        shaders.load(&shader_root, name)?;
    }
    if cli.compile {
        let compiled = shaders.compile("deferred", &mut backend)?;
        log::info!("compiled {} shader modules", compiled);
    }

    let mut resources = declare_resources(&settings, &mut backend);
    let roots = resources.iter().filter(|r| r.is_root()).map(|r| r.name().to_string()).collect::<Vec<_>>();

    let mut passes = PassGraph::new();
    let mut cache = RgObjectCache::new();

    for frame in 0..settings.frames {
        passes.clear();
        declare_frame(&mut passes);

        let frame_life = resources.life() + 1;
        for name in &roots {
            resources.mount(name, &mut backend).with_context(|| format!("mount {} 失败", name))?;
        }
        resources.set_acquired_image("swapchain", (frame % settings.swapchain_image_count) as usize);

        let plan = RenderGraphCompiler::compile_frame(&passes, &mut resources, &shaders, &mut cache, &mut backend)
            .with_context(|| format!("编译第 {} 帧失败", frame))?;
        if settings.print_plan {
            plan.print_execution_plan();
        }
        record_frame(&plan);
        log::info!(
            "frame {}: {} passes, {} barriers, cache {:?}",
            frame,
            plan.steps.len(),
            plan.barrier_count(),
            cache.stats()
        );

        // 本帧没有 mount 的资源
        let released = resources.unmount_expired(frame_life, &mut backend);
        if released > 0 {
            log::info!("frame {}: released {} expired resources", frame, released);
        }
    }

    let released = resources.unmount_expired(u64::MAX, &mut backend);
    log::info!("released {} resources, backend objects: {:?}", released, backend.created());
    Ok(())
}

/// 模拟录制：按顺序把每个 step 的 barrier 转换为 `vkCmdPipelineBarrier2` 的参数
fn record_frame(plan: &RgExecutionPlan) {
    let barriers = plan.steps.iter().map(|step| (step.name.as_str(), &step.barriers));
    for (name, barriers) in barriers.chain(std::iter::once(("end of frame", &plan.end_of_frame))) {
        let (image_barriers, buffer_barriers) = barriers.to_gfx_barriers();
        let images = image_barriers.iter().map(|b| *b.inner()).collect::<Vec<_>>();
        let buffers = buffer_barriers.iter().map(|b| *b.inner()).collect::<Vec<_>>();
        let dependency = vk::DependencyInfo::default().image_memory_barriers(&images).buffer_memory_barriers(&buffers);
        log::debug!(
            "record {}: {} image barriers, {} buffer barriers",
            name,
            dependency.image_memory_barrier_count,
            dependency.buffer_memory_barrier_count
        );
    }
}

fn declare_resources(settings: &RenderGraphSettings, backend: &mut GfxHeadlessBackend) -> ResourceGraph {
    let extent = settings.extent();
    let mut resources = ResourceGraph::new();

    let color = |format| {
        GfxImageDesc::new_2d(
            extent.width,
            extent.height,
            format,
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
        )
    };
    resources.add_image("albedo", color(vk::Format::R8G8B8A8_UNORM), RgResidency::Transient);
    resources.add_image("normal", color(vk::Format::R16G16B16A16_SFLOAT), RgResidency::Transient);
    resources.add_image(
        "depth",
        GfxImageDesc::new_2d(
            extent.width,
            extent.height,
            vk::Format::D32_SFLOAT,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT | vk::ImageUsageFlags::SAMPLED,
        ),
        RgResidency::Transient,
    );

    let storage = vk::BufferUsageFlags::STORAGE_BUFFER | vk::BufferUsageFlags::TRANSFER_DST;
    resources.add_buffer("camera", GfxBufferDesc::uniform(256), RgResidency::Persistent);
    resources.add_buffer(
        "light_upload",
        GfxBufferDesc::new(64 * 32, vk::BufferUsageFlags::TRANSFER_SRC),
        RgResidency::Persistent,
    );
    resources.add_buffer("lights", GfxBufferDesc::new(64 * 32, storage), RgResidency::Persistent);
    resources.add_buffer("instances", GfxBufferDesc::new(1024 * 80, storage), RgResidency::Persistent);
    resources.add_buffer(
        "draws",
        GfxBufferDesc::new(1024 * 20, storage | vk::BufferUsageFlags::INDIRECT_BUFFER),
        RgResidency::DontCare,
    );

    // 模拟 swapchain，image 由外部持有
    let images = (0..settings.swapchain_image_count).map(|_| backend.external_image()).collect();
    resources.import(
        "swapchain",
        RgSwapchainImport {
            swapchain: vk::SwapchainKHR::from_raw(1),
            images,
            format: vk::Format::B8G8R8A8_UNORM,
            extent,
        },
    );

    resources
}

/// 延迟渲染：上传灯光 -> 剔除 -> gbuffer -> 光照
fn declare_frame(passes: &mut PassGraph) {
    passes.add_copy_pass("upload/lights").copy("light_upload", "lights");

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
