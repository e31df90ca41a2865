//! 后端对象缓存
//!
//! 以完整的对象描述为 key 缓存后端对象：结构相同的两个描述命中同一个对象，
//! 因此每帧重新声明的 Pass 图可以复用之前创建的 render pass、framebuffer 和 pipeline。
//!
//! 缓存只增不减，生命周期与 device 相同。

use std::collections::HashMap;
use std::hash::Hash;

use ash::prelude::VkResult;
use ash::vk;
use truvis_gfx::backend::GfxBackend;
use truvis_gfx::pipelines::framebuffer::GfxFramebufferDesc;
use truvis_gfx::pipelines::graphics_pipeline::GfxGraphicsPipelineDesc;
use truvis_gfx::pipelines::layout::{GfxDescriptorSetLayoutDesc, GfxPipelineLayoutDesc};
use truvis_gfx::pipelines::render_pass::GfxRenderPassDesc;

/// 可以被 [`RgObjectCache`] 缓存的对象描述
pub trait RgCacheable: Hash + Eq + Clone {
    type Handle: Copy;

    /// 日志中使用的类型名
    const KIND: &'static str;

    fn table(cache: &mut RgObjectCache) -> &mut HashMap<Self, Self::Handle>;

    fn create<B: GfxBackend + ?Sized>(&self, backend: &mut B) -> VkResult<Self::Handle>;
}

/// 缓存命中统计
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RgCacheStats {
    pub hits: usize,
    pub misses: usize,
}

#[derive(Default)]
pub struct RgObjectCache {
    render_passes: HashMap<GfxRenderPassDesc, vk::RenderPass>,
    framebuffers: HashMap<GfxFramebufferDesc, vk::Framebuffer>,
    graphics_pipelines: HashMap<GfxGraphicsPipelineDesc, vk::Pipeline>,
    descriptor_set_layouts: HashMap<GfxDescriptorSetLayoutDesc, vk::DescriptorSetLayout>,
    pipeline_layouts: HashMap<GfxPipelineLayoutDesc, vk::PipelineLayout>,

    stats: RgCacheStats,
}

// new & init
impl RgObjectCache {
    pub fn new() -> Self {
        Self::default()
    }
}

// get or create
impl RgObjectCache {
    /// 查找结构相同的描述，没有时通过 backend 创建并记录
    pub fn get_or_create<T: RgCacheable, B: GfxBackend + ?Sized>(
        &mut self,
        desc: &T,
        backend: &mut B,
    ) -> VkResult<T::Handle> {
        if let Some(&handle) = T::table(self).get(desc) {
            self.stats.hits += 1;
            return Ok(handle);
        }

        let handle = desc.create(backend)?;
        T::table(self).insert(desc.clone(), handle);
        self.stats.misses += 1;
        log::debug!("object cache: create {} (#{})", T::KIND, T::table(self).len());
        Ok(handle)
    }
}

// getters
impl RgObjectCache {
    #[inline]
    pub fn stats(&self) -> RgCacheStats {
        self.stats
    }

    #[inline]
    pub fn render_pass_count(&self) -> usize {
        self.render_passes.len()
    }

    #[inline]
    pub fn framebuffer_count(&self) -> usize {
        self.framebuffers.len()
    }

    #[inline]
    pub fn graphics_pipeline_count(&self) -> usize {
        self.graphics_pipelines.len()
    }

    #[inline]
    pub fn descriptor_set_layout_count(&self) -> usize {
        self.descriptor_set_layouts.len()
    }

    #[inline]
    pub fn pipeline_layout_count(&self) -> usize {
        self.pipeline_layouts.len()
    }
}

impl RgCacheable for GfxRenderPassDesc {
    type Handle = vk::RenderPass;
    const KIND: &'static str = "render pass";

    #[inline]
    fn table(cache: &mut RgObjectCache) -> &mut HashMap<Self, Self::Handle> {
        &mut cache.render_passes
    }

    fn create<B: GfxBackend + ?Sized>(&self, backend: &mut B) -> VkResult<Self::Handle> {
        backend.create_render_pass(self)
    }
}

impl RgCacheable for GfxFramebufferDesc {
    type Handle = vk::Framebuffer;
    const KIND: &'static str = "framebuffer";

    #[inline]
    fn table(cache: &mut RgObjectCache) -> &mut HashMap<Self, Self::Handle> {
        &mut cache.framebuffers
    }

    fn create<B: GfxBackend + ?Sized>(&self, backend: &mut B) -> VkResult<Self::Handle> {
        backend.create_framebuffer(self)
    }
}

impl RgCacheable for GfxGraphicsPipelineDesc {
    type Handle = vk::Pipeline;
    const KIND: &'static str = "graphics pipeline";

    #[inline]
    fn table(cache: &mut RgObjectCache) -> &mut HashMap<Self, Self::Handle> {
        &mut cache.graphics_pipelines
    }

    fn create<B: GfxBackend + ?Sized>(&self, backend: &mut B) -> VkResult<Self::Handle> {
        backend.create_graphics_pipeline(self)
    }
}

impl RgCacheable for GfxDescriptorSetLayoutDesc {
    type Handle = vk::DescriptorSetLayout;
    const KIND: &'static str = "descriptor set layout";

    #[inline]
    fn table(cache: &mut RgObjectCache) -> &mut HashMap<Self, Self::Handle> {
        &mut cache.descriptor_set_layouts
    }

    fn create<B: GfxBackend + ?Sized>(&self, backend: &mut B) -> VkResult<Self::Handle> {
        backend.create_descriptor_set_layout(self)
    }
}

impl RgCacheable for GfxPipelineLayoutDesc {
    type Handle = vk::PipelineLayout;
    const KIND: &'static str = "pipeline layout";

    #[inline]
    fn table(cache: &mut RgObjectCache) -> &mut HashMap<Self, Self::Handle> {
        &mut cache.pipeline_layouts
    }

    fn create<B: GfxBackend + ?Sized>(&self, backend: &mut B) -> VkResult<Self::Handle> {
        backend.create_pipeline_layout(self)
    }
}

#[cfg(test)]
mod tests {
    use ash::vk::Handle;
    use truvis_gfx::headless::GfxHeadlessBackend;
    use truvis_gfx::pipelines::layout::GfxDescriptorBindingDesc;
    use truvis_gfx::pipelines::render_pass::{GfxAttachmentDesc, GfxAttachmentRef, GfxSubpassDesc};

    use super::*;

    fn color_pass(load_op: vk::AttachmentLoadOp) -> GfxRenderPassDesc {
        let mut subpass = GfxSubpassDesc::graphics();
        subpass.color_attachments.push(GfxAttachmentRef::new(0, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL));
        GfxRenderPassDesc::single_subpass(
            vec![GfxAttachmentDesc {
                format: vk::Format::R8G8B8A8_UNORM,
                samples: vk::SampleCountFlags::TYPE_1,
                load_op,
                store_op: vk::AttachmentStoreOp::STORE,
                stencil_load_op: vk::AttachmentLoadOp::DONT_CARE,
                stencil_store_op: vk::AttachmentStoreOp::DONT_CARE,
                initial_layout: vk::ImageLayout::UNDEFINED,
                final_layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            }],
            subpass,
        )
    }

    #[test]
    fn test_structurally_equal_descs_share_handle() {
        let mut backend = GfxHeadlessBackend::new();
        let mut cache = RgObjectCache::new();

        let a = cache.get_or_create(&color_pass(vk::AttachmentLoadOp::CLEAR), &mut backend).unwrap();
        let b = cache.get_or_create(&color_pass(vk::AttachmentLoadOp::CLEAR), &mut backend).unwrap();
        assert_eq!(a, b);
        assert_eq!(backend.created().render_passes, 1);
        assert_eq!(cache.stats(), RgCacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn test_single_field_difference_creates_new_object() {
        let mut backend = GfxHeadlessBackend::new();
        let mut cache = RgObjectCache::new();

        let clear = cache.get_or_create(&color_pass(vk::AttachmentLoadOp::CLEAR), &mut backend).unwrap();
        let load = cache.get_or_create(&color_pass(vk::AttachmentLoadOp::LOAD), &mut backend).unwrap();
        assert_ne!(clear, load);
        assert_eq!(cache.render_pass_count(), 2);

        let binding = GfxDescriptorBindingDesc {
            binding: 0,
            descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
            count: 1,
            stages: vk::ShaderStageFlags::VERTEX,
            flags: vk::DescriptorBindingFlags::empty(),
        };
        let vertex = GfxDescriptorSetLayoutDesc {
            bindings: vec![binding],
            flags: vk::DescriptorSetLayoutCreateFlags::empty(),
        };
        let mut fragment = vertex.clone();
        fragment.bindings[0].stages = vk::ShaderStageFlags::FRAGMENT;

        let a = cache.get_or_create(&vertex, &mut backend).unwrap();
        let b = cache.get_or_create(&fragment, &mut backend).unwrap();
        assert_ne!(a, b);
        assert_eq!(cache.descriptor_set_layout_count(), 2);
    }

    #[test]
    fn test_framebuffer_keyed_by_view_identity() {
        let mut backend = GfxHeadlessBackend::new();
        let mut cache = RgObjectCache::new();
        let render_pass = cache.get_or_create(&color_pass(vk::AttachmentLoadOp::CLEAR), &mut backend).unwrap();
        let extent = vk::Extent2D { width: 64, height: 64 };

        let first = GfxFramebufferDesc::new(render_pass, extent, vec![vk::ImageView::from_raw(100)]);
        let second = GfxFramebufferDesc::new(render_pass, extent, vec![vk::ImageView::from_raw(101)]);

        let a = cache.get_or_create(&first, &mut backend).unwrap();
        let b = cache.get_or_create(&second, &mut backend).unwrap();
        let c = cache.get_or_create(&first.clone(), &mut backend).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!(backend.created().framebuffers, 2);
    }
}
