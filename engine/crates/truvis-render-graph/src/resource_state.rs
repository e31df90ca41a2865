//! 资源访问状态
//!
//! 封装 Vulkan 的 pipeline stage、access mask 和 image layout，
//! 提供预定义的常用状态组合。buffer 的状态中 layout 恒为 UNDEFINED。

use ash::vk;

/// 资源在某个 Pass 中的访问方式，也是资源在帧与帧之间携带的 "当前状态"
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RgAccessState {
    /// Pipeline stage
    pub stage: vk::PipelineStageFlags2,
    /// Access mask
    pub access: vk::AccessFlags2,
    /// Image layout
    pub layout: vk::ImageLayout,
}

impl Default for RgAccessState {
    fn default() -> Self {
        Self::UNDEFINED
    }
}

// new & 常量定义
impl RgAccessState {
    #[inline]
    pub const fn new(stage: vk::PipelineStageFlags2, access: vk::AccessFlags2, layout: vk::ImageLayout) -> Self {
        Self { stage, access, layout }
    }

    /// buffer 的访问状态
    #[inline]
    pub const fn buffer(stage: vk::PipelineStageFlags2, access: vk::AccessFlags2) -> Self {
        Self::new(stage, access, vk::ImageLayout::UNDEFINED)
    }

    // ============ 预定义状态常量 ============

    /// 未定义状态（初始状态或不关心内容）
    pub const UNDEFINED: Self =
        Self::new(vk::PipelineStageFlags2::TOP_OF_PIPE, vk::AccessFlags2::NONE, vk::ImageLayout::UNDEFINED);

    /// 颜色附件输出
    pub const COLOR_ATTACHMENT_WRITE: Self = Self::new(
        vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT,
        vk::AccessFlags2::COLOR_ATTACHMENT_WRITE,
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
    );

    /// 着色器只读采样（片段着色器）
    pub const SHADER_READ_FRAGMENT: Self = Self::new(
        vk::PipelineStageFlags2::FRAGMENT_SHADER,
        vk::AccessFlags2::SHADER_READ,
        vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
    );

    /// 传输源
    pub const TRANSFER_SRC: Self = Self::new(
        vk::PipelineStageFlags2::TRANSFER,
        vk::AccessFlags2::TRANSFER_READ,
        vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
    );

    /// 传输目标
    pub const TRANSFER_DST: Self = Self::new(
        vk::PipelineStageFlags2::TRANSFER,
        vk::AccessFlags2::TRANSFER_WRITE,
        vk::ImageLayout::TRANSFER_DST_OPTIMAL,
    );

    /// 呈现（swapchain image）
    pub const PRESENT: Self =
        Self::new(vk::PipelineStageFlags2::BOTTOM_OF_PIPE, vk::AccessFlags2::NONE, vk::ImageLayout::PRESENT_SRC_KHR);

    // ============ 辅助方法 ============

    /// 写操作的 access flags
    pub const WRITE_ACCESS: vk::AccessFlags2 = vk::AccessFlags2::from_raw(
        vk::AccessFlags2::SHADER_WRITE.as_raw()
            | vk::AccessFlags2::SHADER_STORAGE_WRITE.as_raw()
            | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE.as_raw()
            | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE.as_raw()
            | vk::AccessFlags2::TRANSFER_WRITE.as_raw()
            | vk::AccessFlags2::HOST_WRITE.as_raw()
            | vk::AccessFlags2::MEMORY_WRITE.as_raw(),
    );

    /// 检查是否为写操作
    #[inline]
    pub fn is_write(&self) -> bool {
        self.access.intersects(Self::WRITE_ACCESS)
    }

    /// 检查是否为只读操作
    #[inline]
    pub fn is_read_only(&self) -> bool {
        !self.is_write()
    }

    /// 获取用于 barrier src 的 access（只保留写操作，读操作不需要 make available）
    #[inline]
    pub fn src_access(&self) -> vk::AccessFlags2 {
        self.access & Self::WRITE_ACCESS
    }

    /// 合并两个连续的只读访问，保证后续写操作会等待所有读者
    #[inline]
    pub fn merge_read(&mut self, other: &Self) {
        self.stage |= other.stage;
        self.access |= other.access;
    }
}
