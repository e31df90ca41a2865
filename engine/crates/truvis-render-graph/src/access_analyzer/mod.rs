//! 访问分析
//!
//! 分两个阶段：
//!
//! 1. 按声明顺序访问每个 Pass 一次，把每次资源访问转换为 stage / access / layout，
//!    追加到该资源的时间线上；同时收集 RenderPass 的 attachment 信息。
//! 2. 沿每条时间线比较相邻两次访问，生成 barrier，并挂在后一次访问所在的 Pass 上。
//!
//! view 的访问记录在其所属的资源上，swapchain 的访问记录在当前 acquire 的 image 上。

mod attachment;
mod barrier;
mod classify;

pub use attachment::*;
pub use barrier::*;

use std::collections::BTreeMap;

use ash::vk;
use indexmap::IndexMap;
use truvis_gfx::resources::image::VulkanFormatUtils;
use truvis_shader_registry::registry::ShaderResourceRegistry;

use crate::pass_graph::{PassGraph, RgPass, RgPassKind, RgPassResource, RgResourceKind};
use crate::resource_graph::{RgResidency, RgResourcePayload, ResourceGraph};
use crate::resource_state::RgAccessState;

/// 时间线上的一次访问
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RgTimelineEntry {
    pub pass_index: usize,
    pub state: RgAccessState,
}

/// 一帧的分析结果
#[derive(Clone, Debug, Default)]
pub struct RgAnalysis {
    /// 与 Pass 一一对应，需要在 Pass 执行之前提交
    pass_barriers: Vec<RgPassBarriers>,
    /// 所有 Pass 结束之后提交（swapchain 转换到 PRESENT）
    end_of_frame: RgPassBarriers,
    /// key 为 RenderPass 的 pass 序号
    render_passes: BTreeMap<usize, RgRenderPassInfo>,
    /// key 为记录访问状态的资源名
    timelines: IndexMap<String, Vec<RgTimelineEntry>>,
}

// getters
impl RgAnalysis {
    #[inline]
    pub fn pass_barriers(&self, pass_index: usize) -> &RgPassBarriers {
        &self.pass_barriers[pass_index]
    }

    #[inline]
    pub fn all_pass_barriers(&self) -> &[RgPassBarriers] {
        &self.pass_barriers
    }

    #[inline]
    pub fn end_of_frame(&self) -> &RgPassBarriers {
        &self.end_of_frame
    }

    #[inline]
    pub fn render_pass(&self, pass_index: usize) -> Option<&RgRenderPassInfo> {
        self.render_passes.get(&pass_index)
    }

    #[inline]
    pub fn render_passes(&self) -> impl Iterator<Item = &RgRenderPassInfo> {
        self.render_passes.values()
    }

    #[inline]
    pub fn timeline(&self, resource: &str) -> Option<&[RgTimelineEntry]> {
        self.timelines.get(resource).map(Vec::as_slice)
    }

    /// 所有时间线，按第一次访问的顺序
    #[inline]
    pub fn timelines(&self) -> impl Iterator<Item = (&str, &[RgTimelineEntry])> {
        self.timelines.iter().map(|(name, timeline)| (name.as_str(), timeline.as_slice()))
    }

    /// 所有 barrier 的数量，包括帧末尾的
    pub fn barrier_count(&self) -> usize {
        self.pass_barriers.iter().map(RgPassBarriers::len).sum::<usize>() + self.end_of_frame.len()
    }
}

/// 访问分析器
pub struct AccessAnalyzer;

impl AccessAnalyzer {
    /// 分析一帧的 Pass 图
    ///
    /// 所有被 Pass 引用的资源都必须已经 mount。分析结束后，非 DontCare 资源的 `current_access`
    /// 更新为本帧最后一次访问的状态，作为下一帧的起点。
    pub fn analyze(passes: &PassGraph, resources: &mut ResourceGraph, shaders: &ShaderResourceRegistry) -> RgAnalysis {
        let mut timelines: IndexMap<usize, Vec<RgTimelineEntry>> = IndexMap::new();
        let mut render_passes = BTreeMap::new();

        // 阶段 1：时间线
        for (pass_index, pass) in passes.passes().iter().enumerate() {
            let mut render_pass = matches!(pass.kind(), RgPassKind::RenderPass).then(|| RgRenderPassInfo::new(pass_index));

            for entry in pass.resources() {
                let tracked = resources.tracked_index(&entry.resource);
                let node = resources.node(tracked);
                assert!(node.is_backed(), "pass {}: resource {} is not mounted", pass.name(), entry.resource);

                let mut state = Self::classify(pass, entry, resources, tracked, shaders);
                if let Some(desc) = node.image_desc() {
                    state.layout = classify::image_layout(state.access, desc.format);
                }
                Self::push_access(&mut timelines, resources, tracked, pass_index, state);

                if let Some(info) = render_pass.as_mut() {
                    Self::collect_attachment(info, entry, resources, tracked);
                }
            }

            if let Some(info) = render_pass {
                render_passes.insert(pass_index, info);
            }
        }

        for info in render_passes.values_mut() {
            Self::finalize_attachments(info, &timelines, resources);
        }

        // 阶段 2：barrier
        let mut analysis = RgAnalysis {
            pass_barriers: vec![RgPassBarriers::default(); passes.len()],
            end_of_frame: RgPassBarriers::default(),
            render_passes,
            timelines: IndexMap::new(),
        };
        let mut final_states = Vec::with_capacity(timelines.len());
        for (&tracked, timeline) in &timelines {
            let last = Self::reduce_timeline(&mut analysis, resources, tracked, timeline);
            final_states.push((tracked, last));
        }

        for (tracked, state) in final_states {
            if resources.node(tracked).residency() != RgResidency::DontCare {
                resources.set_current_access(tracked, state);
            }
        }

        analysis.timelines =
            timelines.into_iter().map(|(tracked, timeline)| (resources.node(tracked).name().to_string(), timeline)).collect();

        log::debug!(
            "analyze {} passes: {} resources, {} barriers, {} render passes",
            passes.len(),
            analysis.timelines.len(),
            analysis.barrier_count(),
            analysis.render_passes.len()
        );
        analysis
    }

    fn classify(
        pass: &RgPass,
        entry: &RgPassResource,
        resources: &ResourceGraph,
        tracked: usize,
        shaders: &ShaderResourceRegistry,
    ) -> RgAccessState {
        let node = resources.node(tracked);
        match pass.kind() {
            RgPassKind::RenderPass => classify::render_pass_access(pass, entry, node),
            RgPassKind::DrawBatch { phase } => classify::draw_batch_access(pass, entry, node, shaders.layout(phase)),
            RgPassKind::ComputePass { phase } => {
                classify::compute_access(pass, entry, node, phase.as_deref().map(|phase| shaders.layout(phase)))
            }
            RgPassKind::CopyPass => classify::copy_access(entry),
        }
    }

    /// 同一个 Pass 对同一资源的多次访问合并为一次
    fn push_access(
        timelines: &mut IndexMap<usize, Vec<RgTimelineEntry>>,
        resources: &ResourceGraph,
        tracked: usize,
        pass_index: usize,
        state: RgAccessState,
    ) {
        let timeline = timelines.entry(tracked).or_default();
        match timeline.last_mut() {
            Some(last) if last.pass_index == pass_index => {
                last.state.stage |= state.stage;
                last.state.access |= state.access;
                if let Some(desc) = resources.node(tracked).image_desc() {
                    last.state.layout = classify::image_layout(last.state.access, desc.format);
                }
            }
            _ => timeline.push(RgTimelineEntry { pass_index, state }),
        }
    }

    fn collect_attachment(info: &mut RgRenderPassInfo, entry: &RgPassResource, resources: &ResourceGraph, tracked: usize) {
        let node = resources.node(tracked);
        let Some(desc) = node.image_desc() else {
            return;
        };

        let role = if entry.is_attachment_output() {
            RgAttachmentRole::Output
        } else if entry.kind == RgResourceKind::ShadingRate {
            RgAttachmentRole::ShadingRate
        } else {
            RgAttachmentRole::Input
        };

        let index = info.attachment_index(RgAttachmentInfo {
            resource: entry.resource.clone(),
            view: resources.get_image_view(&entry.resource),
            role,
            kind: entry.kind,
            format: desc.format,
            samples: desc.samples,
            load_op: vk::AttachmentLoadOp::LOAD,
            store_op: vk::AttachmentStoreOp::STORE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout: vk::ImageLayout::UNDEFINED,
            layout: vk::ImageLayout::UNDEFINED,
            tracked,
        });
        if info.attachments.len() == 1 {
            info.extent = vk::Extent2D {
                width: desc.width,
                height: desc.height,
            };
        }

        match role {
            RgAttachmentRole::Output if entry.kind.is_depth_or_stencil() => {
                if let Some(existing) = info.depth_attachment.filter(|&existing| existing != index) {
                    panic!(
                        "render pass {} has two depth attachments: {} and {}",
                        info.pass_index, info.attachments[existing].resource, entry.resource
                    );
                }
                info.depth_attachment = Some(index);
            }
            RgAttachmentRole::Output => {
                if !info.color_attachments.contains(&index) {
                    info.color_attachments.push(index);
                }
            }
            RgAttachmentRole::Input => {
                if !info.input_attachments.contains(&index) {
                    info.input_attachments.push(index);
                }
            }
            RgAttachmentRole::ShadingRate => info.shading_rate_attachment = Some(index),
        }
    }

    /// 根据完整的时间线确定 load/store 与 layout
    fn finalize_attachments(
        info: &mut RgRenderPassInfo,
        timelines: &IndexMap<usize, Vec<RgTimelineEntry>>,
        resources: &ResourceGraph,
    ) {
        const ATTACHMENT_READS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
            vk::AccessFlags2::COLOR_ATTACHMENT_READ.as_raw()
                | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ.as_raw()
                | vk::AccessFlags2::INPUT_ATTACHMENT_READ.as_raw(),
        );

        let pass_index = info.pass_index;
        for attachment in &mut info.attachments {
            let timeline = &timelines[&attachment.tracked];
            let Some(position) = timeline.iter().position(|e| e.pass_index == pass_index) else {
                continue;
            };
            let state = timeline[position].state;
            let residency = resources.node(attachment.tracked).residency();
            let used_later = position + 1 < timeline.len();

            let clear = attachment.role == RgAttachmentRole::Output
                && position == 0
                && residency != RgResidency::Persistent
                && !state.access.intersects(ATTACHMENT_READS);
            let discard = attachment.role == RgAttachmentRole::Output
                && attachment.kind.is_depth_or_stencil()
                && matches!(residency, RgResidency::Transient | RgResidency::DontCare)
                && !used_later;

            attachment.layout = state.layout;
            attachment.load_op = if clear { vk::AttachmentLoadOp::CLEAR } else { vk::AttachmentLoadOp::LOAD };
            attachment.store_op = if discard { vk::AttachmentStoreOp::DONT_CARE } else { vk::AttachmentStoreOp::STORE };
            if VulkanFormatUtils::has_stencil(attachment.format) {
                attachment.stencil_load_op = attachment.load_op;
                attachment.stencil_store_op = attachment.store_op;
            }
            attachment.initial_layout = if clear { vk::ImageLayout::UNDEFINED } else { state.layout };
            attachment.final_layout = state.layout;
        }
    }

    /// 生成一条时间线上的 barrier，返回最终状态
    fn reduce_timeline(
        analysis: &mut RgAnalysis,
        resources: &ResourceGraph,
        tracked: usize,
        timeline: &[RgTimelineEntry],
    ) -> RgAccessState {
        let node = resources.node(tracked);
        let mut prev = match node.residency() {
            RgResidency::DontCare => RgAccessState::UNDEFINED,
            _ => node.current_access(),
        };

        match node.payload() {
            RgResourcePayload::Buffer { handle, .. } => {
                let buffer = handle.unwrap_or_else(|| panic!("buffer {} is not mounted", node.name()));
                for entry in timeline {
                    // 读后读不需要同步，但要记住所有读者，后续的写需要等待它们
                    if prev.is_read_only() && entry.state.is_read_only() {
                        prev.merge_read(&entry.state);
                        continue;
                    }
                    analysis.pass_barriers[entry.pass_index].buffer_barriers.push(RgBufferBarrierDesc {
                        resource: node.name().to_string(),
                        buffer,
                        src_state: prev,
                        dst_state: entry.state,
                    });
                    prev = entry.state;
                }
            }
            RgResourcePayload::Image { desc, handle, .. } => {
                let image = handle.unwrap_or_else(|| panic!("image {} is not mounted", node.name()));
                let aspect = desc.aspect();
                let push = |bucket: &mut RgPassBarriers, src_state: RgAccessState, dst_state: RgAccessState| {
                    bucket.image_barriers.push(RgImageBarrierDesc {
                        resource: node.name().to_string(),
                        image,
                        src_state,
                        dst_state,
                        aspect,
                    });
                };

                for entry in timeline {
                    if prev.access == entry.state.access && prev.layout == entry.state.layout {
                        prev.stage |= entry.state.stage;
                        continue;
                    }
                    push(&mut analysis.pass_barriers[entry.pass_index], prev, entry.state);
                    prev = entry.state;
                }

                if node.residency() == RgResidency::SwapchainImported {
                    push(&mut analysis.end_of_frame, prev, RgAccessState::PRESENT);
                    prev = RgAccessState::PRESENT;
                }
            }
            _ => panic!("resource {} cannot carry an access timeline", node.name()),
        }
        prev
    }
}
