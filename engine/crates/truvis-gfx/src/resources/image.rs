use ash::vk;

use crate::resources::image_view::GfxImageViewDesc;

/// Vulkan 格式相关的工具类
pub struct VulkanFormatUtils;
impl VulkanFormatUtils {
    /// 从格式推断 aspect
    pub fn infer_aspect(format: vk::Format) -> vk::ImageAspectFlags {
        match format {
            vk::Format::D16_UNORM | vk::Format::D32_SFLOAT | vk::Format::X8_D24_UNORM_PACK32 => {
                vk::ImageAspectFlags::DEPTH
            }
            vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,
            vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
                vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
            }
            _ => vk::ImageAspectFlags::COLOR,
        }
    }

    #[inline]
    pub fn is_depth_or_stencil(format: vk::Format) -> bool {
        Self::infer_aspect(format).intersects(vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL)
    }

    #[inline]
    pub fn has_stencil(format: vk::Format) -> bool {
        Self::infer_aspect(format).contains(vk::ImageAspectFlags::STENCIL)
    }
}

/// 图像描述
///
/// 包含创建 `vk::Image` 所需的所有信息
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxImageDesc {
    /// 图像宽度
    pub width: u32,
    /// 图像高度
    pub height: u32,
    /// 图像深度（3D 纹理）
    pub depth: u32,
    /// Mip 级别数
    pub mip_levels: u32,
    /// 数组层数
    pub array_layers: u32,
    /// 图像格式
    pub format: vk::Format,
    /// 图像用途
    pub usage: vk::ImageUsageFlags,
    /// 采样数
    pub samples: vk::SampleCountFlags,
    /// 图像类型
    pub image_type: vk::ImageType,
}

impl Default for GfxImageDesc {
    fn default() -> Self {
        Self {
            width: 1,
            height: 1,
            depth: 1,
            mip_levels: 1,
            array_layers: 1,
            format: vk::Format::R8G8B8A8_UNORM,
            usage: vk::ImageUsageFlags::SAMPLED | vk::ImageUsageFlags::STORAGE,
            samples: vk::SampleCountFlags::TYPE_1,
            image_type: vk::ImageType::TYPE_2D,
        }
    }
}

// new & init & builder
impl GfxImageDesc {
    /// 创建 2D 图像描述
    #[inline]
    pub fn new_2d(width: u32, height: u32, format: vk::Format, usage: vk::ImageUsageFlags) -> Self {
        Self { width, height, format, usage, ..Default::default() }
    }

    /// 设置采样数（链式调用）
    #[inline]
    pub fn with_samples(mut self, samples: vk::SampleCountFlags) -> Self {
        self.samples = samples;
        self
    }

    /// 设置用途（链式调用）
    #[inline]
    pub fn with_usage(mut self, usage: vk::ImageUsageFlags) -> Self {
        self.usage = usage;
        self
    }

    #[inline]
    pub fn aspect(&self) -> vk::ImageAspectFlags {
        VulkanFormatUtils::infer_aspect(self.format)
    }

    /// 自动推断并生成默认视图描述
    ///
    /// 根据图像格式和类型推断 aspect 和 view_type
    pub fn infer_default_view(&self) -> GfxImageViewDesc {
        let view_type = Self::infer_view_type(self.image_type, self.array_layers);

        GfxImageViewDesc::new(
            self.format,
            view_type,
            self.aspect(),
            (0, self.mip_levels.min(u8::MAX as u32) as u8),
            (0, self.array_layers.min(u8::MAX as u32) as u8),
        )
    }

    /// 从图像类型推断视图类型
    fn infer_view_type(image_type: vk::ImageType, array_layers: u32) -> vk::ImageViewType {
        match image_type {
            vk::ImageType::TYPE_1D => {
                if array_layers > 1 {
                    vk::ImageViewType::TYPE_1D_ARRAY
                } else {
                    vk::ImageViewType::TYPE_1D
                }
            }
            vk::ImageType::TYPE_3D => vk::ImageViewType::TYPE_3D,
            _ => {
                if array_layers > 1 {
                    vk::ImageViewType::TYPE_2D_ARRAY
                } else {
                    vk::ImageViewType::TYPE_2D
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_aspect() {
        assert_eq!(VulkanFormatUtils::infer_aspect(vk::Format::D32_SFLOAT), vk::ImageAspectFlags::DEPTH);
        assert_eq!(
            VulkanFormatUtils::infer_aspect(vk::Format::D24_UNORM_S8_UINT),
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        );
        assert_eq!(VulkanFormatUtils::infer_aspect(vk::Format::R16G16B16A16_SFLOAT), vk::ImageAspectFlags::COLOR);
        assert!(VulkanFormatUtils::has_stencil(vk::Format::S8_UINT));
    }

    #[test]
    fn test_default_view_of_array_image() {
        let desc = GfxImageDesc {
            array_layers: 6,
            ..GfxImageDesc::new_2d(64, 64, vk::Format::R8G8B8A8_UNORM, vk::ImageUsageFlags::SAMPLED)
        };
        let view = desc.infer_default_view();
        assert_eq!(view.view_type(), vk::ImageViewType::TYPE_2D_ARRAY);
        assert_eq!(view.layer_range(), (0, 6));
        assert_eq!(view.aspect_mask(), vk::ImageAspectFlags::COLOR);
    }
}
