use ash::vk;
use truvis_gfx::resources::buffer::{GfxBufferDesc, GfxBufferViewDesc};
use truvis_gfx::resources::image::GfxImageDesc;
use truvis_gfx::resources::image_view::GfxImageViewDesc;

use crate::resource_state::RgAccessState;

/// 资源在帧与帧之间的持久策略
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgResidency {
    /// 只在一帧内有意义，但 handle 可以跨帧复用
    Transient,
    /// 内容需要跨帧保留
    Persistent,
    /// 每一帧都从 UNDEFINED 开始，不记录访问状态
    DontCare,
    /// 从 swapchain 导入
    SwapchainImported,
}

/// 从外部导入的 swapchain
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgSwapchainImport {
    pub swapchain: vk::SwapchainKHR,
    pub images: Vec<vk::Image>,
    pub format: vk::Format,
    pub extent: vk::Extent2D,
}

impl RgSwapchainImport {
    /// swapchain image 的描述
    pub fn image_desc(&self) -> GfxImageDesc {
        GfxImageDesc::new_2d(
            self.extent.width,
            self.extent.height,
            self.format,
            vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST,
        )
    }
}

/// 资源的具体内容
#[derive(Clone, Debug)]
pub enum RgResourcePayload {
    Buffer {
        desc: GfxBufferDesc,
        handle: Option<vk::Buffer>,
    },
    BufferView {
        desc: GfxBufferViewDesc,
        origin: String,
        handle: Option<vk::BufferView>,
    },
    Image {
        desc: GfxImageDesc,
        handle: Option<vk::Image>,
        /// 外部创建的 image（swapchain image）不由资源图销毁
        external: bool,
    },
    ImageView {
        desc: GfxImageViewDesc,
        origin: String,
        handle: Option<vk::ImageView>,
    },
    Swapchain {
        import: RgSwapchainImport,
        /// 当前 acquire 到的 image 序号
        acquired: usize,
    },
}

/// 资源类型，不携带数据
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgResourceType {
    Buffer,
    BufferView,
    Image,
    ImageView,
    Swapchain,
}

impl RgResourcePayload {
    #[inline]
    pub fn resource_type(&self) -> RgResourceType {
        match self {
            RgResourcePayload::Buffer { .. } => RgResourceType::Buffer,
            RgResourcePayload::BufferView { .. } => RgResourceType::BufferView,
            RgResourcePayload::Image { .. } => RgResourceType::Image,
            RgResourcePayload::ImageView { .. } => RgResourceType::ImageView,
            RgResourcePayload::Swapchain { .. } => RgResourceType::Swapchain,
        }
    }

    /// 是否已经有物理 handle
    pub fn is_backed(&self) -> bool {
        match self {
            RgResourcePayload::Buffer { handle, .. } => handle.is_some(),
            RgResourcePayload::BufferView { handle, .. } => handle.is_some(),
            RgResourcePayload::Image { handle, .. } => handle.is_some(),
            RgResourcePayload::ImageView { handle, .. } => handle.is_some(),
            RgResourcePayload::Swapchain { .. } => true,
        }
    }

    /// view 所属的资源名
    #[inline]
    pub fn origin(&self) -> Option<&str> {
        match self {
            RgResourcePayload::BufferView { origin, .. } | RgResourcePayload::ImageView { origin, .. } => {
                Some(origin.as_str())
            }
            _ => None,
        }
    }
}

/// 资源图中的一个节点
#[derive(Clone, Debug)]
pub struct RgResource {
    pub(crate) name: String,
    /// 最近一次 mount 时的 life
    pub(crate) life: u64,
    pub(crate) residency: RgResidency,
    pub(crate) payload: RgResourcePayload,
    /// 上一次访问留下的状态，DontCare 的资源不维护
    pub(crate) current_access: RgAccessState,

    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<usize>,
}

// new & init
impl RgResource {
    pub(crate) fn new(name: impl Into<String>, residency: RgResidency, payload: RgResourcePayload) -> Self {
        Self {
            name: name.into(),
            life: 0,
            residency,
            payload,
            current_access: RgAccessState::UNDEFINED,
            parent: None,
            children: Vec::new(),
        }
    }
}

// getters
impl RgResource {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn life(&self) -> u64 {
        self.life
    }

    #[inline]
    pub fn residency(&self) -> RgResidency {
        self.residency
    }

    #[inline]
    pub fn payload(&self) -> &RgResourcePayload {
        &self.payload
    }

    #[inline]
    pub fn resource_type(&self) -> RgResourceType {
        self.payload.resource_type()
    }

    #[inline]
    pub fn current_access(&self) -> RgAccessState {
        self.current_access
    }

    /// 顶层资源（不是 view，也不是 swapchain 展开的 image）
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[inline]
    pub fn is_backed(&self) -> bool {
        self.payload.is_backed()
    }

    /// buffer 与 buffer view 都按 buffer 处理
    #[inline]
    pub fn is_buffer_like(&self) -> bool {
        matches!(self.resource_type(), RgResourceType::Buffer | RgResourceType::BufferView)
    }

    #[inline]
    pub fn image_desc(&self) -> Option<&GfxImageDesc> {
        match &self.payload {
            RgResourcePayload::Image { desc, .. } => Some(desc),
            _ => None,
        }
    }

    #[inline]
    pub fn buffer_desc(&self) -> Option<&GfxBufferDesc> {
        match &self.payload {
            RgResourcePayload::Buffer { desc, .. } => Some(desc),
            _ => None,
        }
    }
}
