use ash::vk;

/// Framebuffer 描述
///
/// `attachments` 保存的是 image view 的 handle，因此比较的是 view 的身份而不是 view 的描述：
/// 两个描述完全相同但来自不同 image 的 view 不会命中同一个 framebuffer。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GfxFramebufferDesc {
    pub render_pass: vk::RenderPass,
    pub width: u32,
    pub height: u32,
    pub layers: u32,
    pub attachments: Vec<vk::ImageView>,
}

impl GfxFramebufferDesc {
    pub fn new(render_pass: vk::RenderPass, extent: vk::Extent2D, attachments: Vec<vk::ImageView>) -> Self {
        Self {
            render_pass,
            width: extent.width,
            height: extent.height,
            layers: 1,
            attachments,
        }
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.width,
            height: self.height,
        }
    }
}
