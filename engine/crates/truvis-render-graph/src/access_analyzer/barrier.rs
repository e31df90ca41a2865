//! Barrier 描述
//!
//! 分析阶段只记录状态转换，录制时再通过 `to_gfx_barrier` 转换为 Vulkan barrier。

use ash::vk;
use truvis_gfx::commands::barrier::{GfxBarrierMask, GfxBufferBarrier, GfxImageBarrier};

use crate::resource_state::RgAccessState;

/// 图像 Barrier 描述
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgImageBarrierDesc {
    /// 资源名（view 已经解析到所属 image）
    pub resource: String,
    pub image: vk::Image,
    /// 源状态
    pub src_state: RgAccessState,
    /// 目标状态
    pub dst_state: RgAccessState,
    /// 图像 aspect（COLOR / DEPTH / STENCIL）
    pub aspect: vk::ImageAspectFlags,
}

impl RgImageBarrierDesc {
    #[inline]
    pub fn has_layout_transition(&self) -> bool {
        self.src_state.layout != self.dst_state.layout
    }

    /// 转换为 GfxImageBarrier
    pub fn to_gfx_barrier(&self) -> GfxImageBarrier {
        GfxImageBarrier::new(
            self.image,
            self.aspect,
            (self.src_state.layout, self.dst_state.layout),
            barrier_mask(&self.src_state, &self.dst_state),
        )
    }
}

/// 缓冲区 Barrier 描述
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RgBufferBarrierDesc {
    pub resource: String,
    pub buffer: vk::Buffer,
    /// 源状态
    pub src_state: RgAccessState,
    /// 目标状态
    pub dst_state: RgAccessState,
}

impl RgBufferBarrierDesc {
    /// 转换为 GfxBufferBarrier，覆盖整个缓冲区
    pub fn to_gfx_barrier(&self) -> GfxBufferBarrier {
        GfxBufferBarrier::whole(self.buffer, barrier_mask(&self.src_state, &self.dst_state))
    }
}

/// 源状态只保留写访问
fn barrier_mask(src: &RgAccessState, dst: &RgAccessState) -> GfxBarrierMask {
    GfxBarrierMask {
        src_stage: src.stage,
        src_access: src.src_access(),
        dst_stage: dst.stage,
        dst_access: dst.access,
    }
}

/// Pass 执行前需要的 Barrier 集合
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RgPassBarriers {
    /// 图像 barriers
    pub image_barriers: Vec<RgImageBarrierDesc>,
    /// 缓冲区 barriers
    pub buffer_barriers: Vec<RgBufferBarrierDesc>,
}

impl RgPassBarriers {
    /// 检查是否有 barrier
    #[inline]
    pub fn has_barriers(&self) -> bool {
        !self.image_barriers.is_empty() || !self.buffer_barriers.is_empty()
    }

    /// 获取图像 barrier 数量
    #[inline]
    pub fn image_barrier_count(&self) -> usize {
        self.image_barriers.len()
    }

    /// 获取缓冲区 barrier 数量
    #[inline]
    pub fn buffer_barrier_count(&self) -> usize {
        self.buffer_barriers.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.image_barriers.len() + self.buffer_barriers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.has_barriers()
    }

    /// 转换为可以直接提交给 `vkCmdPipelineBarrier2` 的结构
    pub fn to_gfx_barriers(&self) -> (Vec<GfxImageBarrier>, Vec<GfxBufferBarrier>) {
        (
            self.image_barriers.iter().map(RgImageBarrierDesc::to_gfx_barrier).collect(),
            self.buffer_barriers.iter().map(RgBufferBarrierDesc::to_gfx_barrier).collect(),
        )
    }
}
