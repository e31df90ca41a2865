//! RenderPass 的 attachment 信息
//!
//! 分析阶段为每个 RenderPass 收集 attachment 的 load/store、layout 以及 framebuffer 的 view 列表，
//! 之后由 `render_pass_desc` / `framebuffer_desc` 转换为可以缓存的描述。

use ash::vk;
use truvis_gfx::pipelines::framebuffer::GfxFramebufferDesc;
use truvis_gfx::pipelines::render_pass::{GfxAttachmentDesc, GfxAttachmentRef, GfxRenderPassDesc, GfxSubpassDesc};

use crate::pass_graph::RgResourceKind;

/// attachment 在 subpass 中的角色
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgAttachmentRole {
    /// framebuffer 输出（color / depth）
    Output,
    /// input attachment
    Input,
    ShadingRate,
}

/// RenderPass 中的一个 attachment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgAttachmentInfo {
    /// 第一次声明时使用的资源名
    pub resource: String,
    pub view: vk::ImageView,
    pub role: RgAttachmentRole,
    pub kind: RgResourceKind,
    pub format: vk::Format,
    pub samples: vk::SampleCountFlags,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub stencil_load_op: vk::AttachmentLoadOp,
    pub stencil_store_op: vk::AttachmentStoreOp,
    pub initial_layout: vk::ImageLayout,
    pub final_layout: vk::ImageLayout,
    /// pass 内的 layout
    pub layout: vk::ImageLayout,

    /// 访问状态所在的节点
    pub(crate) tracked: usize,
}

impl RgAttachmentInfo {
    pub fn to_gfx_desc(&self) -> GfxAttachmentDesc {
        GfxAttachmentDesc {
            format: self.format,
            samples: self.samples,
            load_op: self.load_op,
            store_op: self.store_op,
            stencil_load_op: self.stencil_load_op,
            stencil_store_op: self.stencil_store_op,
            initial_layout: self.initial_layout,
            final_layout: self.final_layout,
        }
    }
}

/// 一个 RenderPass 的所有 attachment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgRenderPassInfo {
    pub pass_index: usize,
    pub attachments: Vec<RgAttachmentInfo>,
    /// 以下均为 `attachments` 中的下标
    pub color_attachments: Vec<usize>,
    pub depth_attachment: Option<usize>,
    pub input_attachments: Vec<usize>,
    pub shading_rate_attachment: Option<usize>,
    pub extent: vk::Extent2D,
}

// new & init
impl RgRenderPassInfo {
    pub(crate) fn new(pass_index: usize) -> Self {
        Self {
            pass_index,
            attachments: Vec::new(),
            color_attachments: Vec::new(),
            depth_attachment: None,
            input_attachments: Vec::new(),
            shading_rate_attachment: None,
            extent: vk::Extent2D::default(),
        }
    }

    /// 同一个 view 在一个 pass 中只占用一个 attachment
    ///
    /// 同一 image 的不同 view（不同 mip / layer）各自占用一个 attachment，但共享 image 的访问状态
    pub(crate) fn attachment_index(&mut self, info: RgAttachmentInfo) -> usize {
        if let Some(index) = self.attachments.iter().position(|a| a.view == info.view) {
            return index;
        }
        self.attachments.push(info);
        self.attachments.len() - 1
    }
}

// tools
impl RgRenderPassInfo {
    /// framebuffer 的 image view，顺序与 attachment 一致
    pub fn framebuffer_views(&self) -> Vec<vk::ImageView> {
        self.attachments.iter().map(|a| a.view).collect()
    }

    /// 单 subpass 的 render pass 描述
    pub fn render_pass_desc(&self) -> GfxRenderPassDesc {
        let to_ref = |index: usize| GfxAttachmentRef::new(index as u32, self.attachments[index].layout);

        let mut subpass = GfxSubpassDesc::graphics();
        subpass.color_attachments = self.color_attachments.iter().copied().map(to_ref).collect();
        subpass.input_attachments = self.input_attachments.iter().copied().map(to_ref).collect();
        subpass.depth_stencil_attachment = self.depth_attachment.map(to_ref);
        subpass.shading_rate_attachment = self.shading_rate_attachment.map(to_ref);

        GfxRenderPassDesc::single_subpass(self.attachments.iter().map(RgAttachmentInfo::to_gfx_desc).collect(), subpass)
    }

    pub fn framebuffer_desc(&self, render_pass: vk::RenderPass) -> GfxFramebufferDesc {
        GfxFramebufferDesc::new(render_pass, self.extent, self.framebuffer_views())
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;

    fn attachment(tracked: usize, kind: RgResourceKind, layout: vk::ImageLayout) -> RgAttachmentInfo {
        RgAttachmentInfo {
            resource: format!("res{tracked}"),
            view: vk::ImageView::from_raw(tracked as u64 + 100),
            role: RgAttachmentRole::Output,
            kind,
            format: vk::Format::R8G8B8A8_UNORM,
            samples: vk::SampleCountFlags::TYPE_1,
            load_op: vk::AttachmentLoadOp::CLEAR,
            store_op: vk::AttachmentStoreOp::STORE,
            stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
            stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
            initial_layout: vk::ImageLayout::UNDEFINED,
            final_layout: layout,
            layout,
            tracked,
        }
    }

    #[test]
    fn test_attachment_dedup_by_view() {
        let mut info = RgRenderPassInfo::new(0);
        let a = info.attachment_index(attachment(1, RgResourceKind::Color, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL));
        let b = info.attachment_index(attachment(2, RgResourceKind::Color, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL));
        let c = info.attachment_index(attachment(1, RgResourceKind::Color, vk::ImageLayout::GENERAL));
        assert_eq!((a, b, c), (0, 1, 0));

        // 同一个 image 的另一个 view
        let mut other_view = attachment(1, RgResourceKind::Color, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
        other_view.view = vk::ImageView::from_raw(500);
        let d = info.attachment_index(other_view);
        assert_eq!(d, 2);
        assert_eq!(info.attachments.len(), 3);
    }

    #[test]
    fn test_render_pass_desc_refs() {
        let mut info = RgRenderPassInfo::new(3);
        let color = info.attachment_index(attachment(1, RgResourceKind::Color, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL));
        let depth = info.attachment_index(attachment(2, RgResourceKind::Depth, vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL));
        info.color_attachments.push(color);
        info.depth_attachment = Some(depth);
        info.extent = vk::Extent2D { width: 64, height: 32 };

        let desc = info.render_pass_desc();
        assert_eq!(desc.attachments.len(), 2);
        assert_eq!(desc.subpasses.len(), 1);
        assert_eq!(
            desc.subpasses[0].color_attachments,
            vec![GfxAttachmentRef::new(0, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)]
        );
        assert_eq!(
            desc.subpasses[0].depth_stencil_attachment,
            Some(GfxAttachmentRef::new(1, vk::ImageLayout::DEPTH_ATTACHMENT_OPTIMAL))
        );

        let fb = info.framebuffer_desc(vk::RenderPass::from_raw(7));
        assert_eq!(fb.attachments, info.framebuffer_views());
        assert_eq!(fb.extent(), vk::Extent2D { width: 64, height: 32 });
    }
}
