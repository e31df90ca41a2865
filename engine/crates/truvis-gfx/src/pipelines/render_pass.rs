use ash::vk;

/// Render pass 中单个 attachment 的描述
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxAttachmentDesc {
    pub format: vk::Format,
    pub samples: vk::SampleCountFlags,
    pub load_op: vk::AttachmentLoadOp,
    pub store_op: vk::AttachmentStoreOp,
    pub stencil_load_op: vk::AttachmentLoadOp,
    pub stencil_store_op: vk::AttachmentStoreOp,
    pub initial_layout: vk::ImageLayout,
    pub final_layout: vk::ImageLayout,
}

/// subpass 对 attachment 的引用
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxAttachmentRef {
    /// 在 `GfxRenderPassDesc::attachments` 中的索引
    pub attachment: u32,
    pub layout: vk::ImageLayout,
}

impl GfxAttachmentRef {
    #[inline]
    pub fn new(attachment: u32, layout: vk::ImageLayout) -> Self {
        Self { attachment, layout }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GfxSubpassDesc {
    pub bind_point: vk::PipelineBindPoint,
    pub input_attachments: Vec<GfxAttachmentRef>,
    pub color_attachments: Vec<GfxAttachmentRef>,
    pub depth_stencil_attachment: Option<GfxAttachmentRef>,
    /// VK_KHR_fragment_shading_rate
    pub shading_rate_attachment: Option<GfxAttachmentRef>,
}

impl GfxSubpassDesc {
    pub fn graphics() -> Self {
        Self {
            bind_point: vk::PipelineBindPoint::GRAPHICS,
            input_attachments: Vec::new(),
            color_attachments: Vec::new(),
            depth_stencil_attachment: None,
            shading_rate_attachment: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxSubpassDependency {
    pub src_subpass: u32,
    pub dst_subpass: u32,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub flags: vk::DependencyFlags,
}

/// Render pass 描述
///
/// 作为缓存 key 时，attachments、subpasses、dependencies 全部参与比较。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GfxRenderPassDesc {
    pub attachments: Vec<GfxAttachmentDesc>,
    pub subpasses: Vec<GfxSubpassDesc>,
    pub dependencies: Vec<GfxSubpassDependency>,
}

impl GfxRenderPassDesc {
    /// 仅有一个 graphics subpass 的 render pass
    pub fn single_subpass(attachments: Vec<GfxAttachmentDesc>, subpass: GfxSubpassDesc) -> Self {
        Self {
            attachments,
            subpasses: vec![subpass],
            dependencies: Vec::new(),
        }
    }
}
