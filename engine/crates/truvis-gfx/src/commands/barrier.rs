//! 录制阶段提交给 `vkCmdPipelineBarrier2` 的 barrier
//!
//! 只使用同一个 queue family，barrier 覆盖整个资源。

use ash::vk;

/// 一次同步的两端
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GfxBarrierMask {
    pub src_stage: vk::PipelineStageFlags2,
    pub src_access: vk::AccessFlags2,
    pub dst_stage: vk::PipelineStageFlags2,
    pub dst_access: vk::AccessFlags2,
}

pub struct GfxImageBarrier {
    inner: vk::ImageMemoryBarrier2<'static>,
}

impl GfxImageBarrier {
    /// 覆盖 image 的所有 mip 和 layer
    pub fn new(
        image: vk::Image,
        aspect: vk::ImageAspectFlags,
        layouts: (vk::ImageLayout, vk::ImageLayout),
        mask: GfxBarrierMask,
    ) -> Self {
        Self {
            inner: vk::ImageMemoryBarrier2 {
                src_stage_mask: mask.src_stage,
                src_access_mask: mask.src_access,
                dst_stage_mask: mask.dst_stage,
                dst_access_mask: mask.dst_access,
                old_layout: layouts.0,
                new_layout: layouts.1,
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                image,
                subresource_range: vk::ImageSubresourceRange {
                    aspect_mask: aspect,
                    base_mip_level: 0,
                    level_count: vk::REMAINING_MIP_LEVELS,
                    base_array_layer: 0,
                    layer_count: vk::REMAINING_ARRAY_LAYERS,
                },
                ..Default::default()
            },
        }
    }

    #[inline]
    pub fn inner(&self) -> &vk::ImageMemoryBarrier2<'static> {
        &self.inner
    }
}

pub struct GfxBufferBarrier {
    inner: vk::BufferMemoryBarrier2<'static>,
}

impl GfxBufferBarrier {
    /// 覆盖整个 buffer
    pub fn whole(buffer: vk::Buffer, mask: GfxBarrierMask) -> Self {
        Self {
            inner: vk::BufferMemoryBarrier2 {
                src_stage_mask: mask.src_stage,
                src_access_mask: mask.src_access,
                dst_stage_mask: mask.dst_stage,
                dst_access_mask: mask.dst_access,
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                buffer,
                offset: 0,
                size: vk::WHOLE_SIZE,
                ..Default::default()
            },
        }
    }

    #[inline]
    pub fn inner(&self) -> &vk::BufferMemoryBarrier2<'static> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;

    use super::*;

    const COMPUTE_TO_FRAGMENT: GfxBarrierMask = GfxBarrierMask {
        src_stage: vk::PipelineStageFlags2::COMPUTE_SHADER,
        src_access: vk::AccessFlags2::SHADER_WRITE,
        dst_stage: vk::PipelineStageFlags2::FRAGMENT_SHADER,
        dst_access: vk::AccessFlags2::SHADER_READ,
    };

    #[test]
    fn test_image_barrier_covers_whole_image() {
        let barrier = GfxImageBarrier::new(
            vk::Image::from_raw(7),
            vk::ImageAspectFlags::COLOR,
            (vk::ImageLayout::GENERAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
            COMPUTE_TO_FRAGMENT,
        );

        let inner = barrier.inner();
        assert_eq!(inner.image.as_raw(), 7);
        assert_eq!(inner.new_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(inner.src_stage_mask, vk::PipelineStageFlags2::COMPUTE_SHADER);
        assert_eq!(inner.subresource_range.level_count, vk::REMAINING_MIP_LEVELS);
        assert_eq!(inner.src_queue_family_index, vk::QUEUE_FAMILY_IGNORED);
    }

    #[test]
    fn test_buffer_barrier_covers_whole_buffer() {
        let barrier = GfxBufferBarrier::whole(vk::Buffer::from_raw(3), COMPUTE_TO_FRAGMENT);
        assert_eq!(barrier.inner().offset, 0);
        assert_eq!(barrier.inner().size, vk::WHOLE_SIZE);
        assert_eq!(barrier.inner().dst_access_mask, vk::AccessFlags2::SHADER_READ);
    }
}
