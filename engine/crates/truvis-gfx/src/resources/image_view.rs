use ash::vk;

/// 图像视图描述
///
/// 只描述"如何解释" image，不包含 image 本身；同一个描述作用在不同 image 上会得到不同的 view。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxImageViewDesc {
    /// format 可以基于 vk::Image 重解释
    pub(crate) format: vk::Format,
    /// view type 可以基于 vk::Image 重解释
    pub(crate) view_type: vk::ImageViewType,
    /// aspect 可以基于 vk::Image 重解释
    pub(crate) aspect_mask: vk::ImageAspectFlags,
    /// base mip level 和 mip level count
    pub(crate) mip: (u8, u8),
    /// base layer 和 layer count
    pub(crate) layer: (u8, u8),
}
impl GfxImageViewDesc {
    pub fn new_2d(format: vk::Format, aspect: vk::ImageAspectFlags) -> Self {
        Self {
            format,
            view_type: vk::ImageViewType::TYPE_2D,
            aspect_mask: aspect,
            mip: (0, 1),
            layer: (0, 1),
        }
    }

    /// 创建完整的视图描述
    ///
    /// # 参数
    /// - `format`: 图像格式（可重解释）
    /// - `view_type`: 视图类型（2D, 3D, Cube, Array 等）
    /// - `aspect_mask`: 图像 aspect（COLOR, DEPTH, STENCIL）
    /// - `mip_range`: (base_mip_level, level_count)
    /// - `layer_range`: (base_array_layer, layer_count)
    pub fn new(
        format: vk::Format,
        view_type: vk::ImageViewType,
        aspect_mask: vk::ImageAspectFlags,
        mip_range: (u8, u8),
        layer_range: (u8, u8),
    ) -> Self {
        Self { format, view_type, aspect_mask, mip: mip_range, layer: layer_range }
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn view_type(&self) -> vk::ImageViewType {
        self.view_type
    }

    #[inline]
    pub fn aspect_mask(&self) -> vk::ImageAspectFlags {
        self.aspect_mask
    }

    /// 获取 mip 范围 (base, count)
    #[inline]
    pub fn mip_range(&self) -> (u8, u8) {
        self.mip
    }

    /// 获取 layer 范围 (base, count)
    #[inline]
    pub fn layer_range(&self) -> (u8, u8) {
        self.layer
    }

    /// 转换为 subresource range，供 barrier 与 view 创建使用
    pub fn subresource_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.aspect_mask,
            base_mip_level: self.mip.0 as u32,
            level_count: self.mip.1 as u32,
            base_array_layer: self.layer.0 as u32,
            layer_count: self.layer.1 as u32,
        }
    }
}
