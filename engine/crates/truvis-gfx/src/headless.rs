//! 不依赖 GPU 的后端
//!
//! 所有 create 调用只分配一个唯一的非空 handle，并记录对象之间的依赖关系。
//! 用于离线生成执行计划以及单元测试。

use std::collections::HashMap;

use ash::prelude::VkResult;
use ash::vk;
use ash::vk::Handle;

use crate::backend::GfxBackend;
use crate::pipelines::framebuffer::GfxFramebufferDesc;
use crate::pipelines::graphics_pipeline::GfxGraphicsPipelineDesc;
use crate::pipelines::layout::{GfxDescriptorSetLayoutDesc, GfxPipelineLayoutDesc};
use crate::pipelines::render_pass::GfxRenderPassDesc;
use crate::resources::buffer::{GfxBufferDesc, GfxBufferViewDesc};
use crate::resources::image::GfxImageDesc;
use crate::resources::image_view::GfxImageViewDesc;

/// 被销毁的对象，按销毁顺序记录
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GfxDestroyed {
    Buffer(vk::Buffer),
    BufferView(vk::BufferView),
    Image(vk::Image),
    ImageView(vk::ImageView),
}

/// 各类对象的创建次数
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GfxCreateCounters {
    pub buffers: usize,
    pub buffer_views: usize,
    pub images: usize,
    pub image_views: usize,
    pub render_passes: usize,
    pub framebuffers: usize,
    pub graphics_pipelines: usize,
    pub descriptor_set_layouts: usize,
    pub pipeline_layouts: usize,
    pub shader_modules: usize,
}

#[derive(Default)]
pub struct GfxHeadlessBackend {
    next_handle: u64,

    created: GfxCreateCounters,

    live_buffers: HashMap<vk::Buffer, String>,
    /// view -> 所属 buffer
    live_buffer_views: HashMap<vk::BufferView, vk::Buffer>,
    live_images: HashMap<vk::Image, String>,
    /// view -> 所属 image
    live_image_views: HashMap<vk::ImageView, vk::Image>,

    destroy_log: Vec<GfxDestroyed>,
}

// new & getters
impl GfxHeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn created(&self) -> GfxCreateCounters {
        self.created
    }

    #[inline]
    pub fn destroy_log(&self) -> &[GfxDestroyed] {
        &self.destroy_log
    }

    #[inline]
    pub fn live_image_count(&self) -> usize {
        self.live_images.len()
    }

    #[inline]
    pub fn live_image_view_count(&self) -> usize {
        self.live_image_views.len()
    }

    #[inline]
    pub fn live_buffer_count(&self) -> usize {
        self.live_buffers.len()
    }

    /// 模拟外部创建的 image（例如 swapchain image），不计入 live 表
    pub fn external_image(&mut self) -> vk::Image {
        vk::Image::from_raw(self.mint())
    }

    fn mint(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl GfxBackend for GfxHeadlessBackend {
    fn create_buffer(&mut self, desc: &GfxBufferDesc, name: &str) -> VkResult<vk::Buffer> {
        if desc.size == 0 {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }
        let buffer = vk::Buffer::from_raw(self.mint());
        self.live_buffers.insert(buffer, name.to_string());
        self.created.buffers += 1;
        Ok(buffer)
    }

    fn destroy_buffer(&mut self, buffer: vk::Buffer) {
        assert!(
            !self.live_buffer_views.values().any(|b| *b == buffer),
            "buffer {:?} destroyed while a view still references it",
            self.live_buffers.get(&buffer)
        );
        self.live_buffers.remove(&buffer);
        self.destroy_log.push(GfxDestroyed::Buffer(buffer));
    }

    fn create_buffer_view(
        &mut self,
        buffer: vk::Buffer,
        _desc: &GfxBufferViewDesc,
        _name: &str,
    ) -> VkResult<vk::BufferView> {
        let view = vk::BufferView::from_raw(self.mint());
        self.live_buffer_views.insert(view, buffer);
        self.created.buffer_views += 1;
        Ok(view)
    }

    fn destroy_buffer_view(&mut self, view: vk::BufferView) {
        self.live_buffer_views.remove(&view);
        self.destroy_log.push(GfxDestroyed::BufferView(view));
    }

    fn create_image(&mut self, desc: &GfxImageDesc, name: &str) -> VkResult<vk::Image> {
        if desc.width == 0 || desc.height == 0 {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }
        let image = vk::Image::from_raw(self.mint());
        self.live_images.insert(image, name.to_string());
        self.created.images += 1;
        Ok(image)
    }

    fn destroy_image(&mut self, image: vk::Image) {
        assert!(
            !self.live_image_views.values().any(|i| *i == image),
            "image {:?} destroyed while a view still references it",
            self.live_images.get(&image)
        );
        self.live_images.remove(&image);
        self.destroy_log.push(GfxDestroyed::Image(image));
    }

    fn create_image_view(
        &mut self,
        image: vk::Image,
        _desc: &GfxImageViewDesc,
        _name: &str,
    ) -> VkResult<vk::ImageView> {
        let view = vk::ImageView::from_raw(self.mint());
        self.live_image_views.insert(view, image);
        self.created.image_views += 1;
        Ok(view)
    }

    fn destroy_image_view(&mut self, view: vk::ImageView) {
        self.live_image_views.remove(&view);
        self.destroy_log.push(GfxDestroyed::ImageView(view));
    }

    fn create_render_pass(&mut self, desc: &GfxRenderPassDesc) -> VkResult<vk::RenderPass> {
        log::debug!("headless: create render pass with {} attachments", desc.attachments.len());
        self.created.render_passes += 1;
        Ok(vk::RenderPass::from_raw(self.mint()))
    }

    fn create_framebuffer(&mut self, desc: &GfxFramebufferDesc) -> VkResult<vk::Framebuffer> {
        if desc.render_pass.is_null() {
            return Err(vk::Result::ERROR_INITIALIZATION_FAILED);
        }
        self.created.framebuffers += 1;
        Ok(vk::Framebuffer::from_raw(self.mint()))
    }

    fn create_graphics_pipeline(&mut self, _desc: &GfxGraphicsPipelineDesc) -> VkResult<vk::Pipeline> {
        self.created.graphics_pipelines += 1;
        Ok(vk::Pipeline::from_raw(self.mint()))
    }

    fn create_descriptor_set_layout(
        &mut self,
        _desc: &GfxDescriptorSetLayoutDesc,
    ) -> VkResult<vk::DescriptorSetLayout> {
        self.created.descriptor_set_layouts += 1;
        Ok(vk::DescriptorSetLayout::from_raw(self.mint()))
    }

    fn create_pipeline_layout(&mut self, _desc: &GfxPipelineLayoutDesc) -> VkResult<vk::PipelineLayout> {
        self.created.pipeline_layouts += 1;
        Ok(vk::PipelineLayout::from_raw(self.mint()))
    }

    fn create_shader_module(&mut self, spirv: &[u32], name: &str) -> VkResult<vk::ShaderModule> {
        // SPIR-V magic number
        if spirv.first() != Some(&0x0723_0203) {
            log::warn!("headless: shader module '{}' is not valid SPIR-V", name);
            return Err(vk::Result::ERROR_INVALID_SHADER_NV);
        }
        self.created.shader_modules += 1;
        Ok(vk::ShaderModule::from_raw(self.mint()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let mut backend = GfxHeadlessBackend::new();
        let desc = GfxImageDesc::default();
        let a = backend.create_image(&desc, "a").unwrap();
        let b = backend.create_image(&desc, "b").unwrap();
        assert_ne!(a, b);
        assert!(!a.is_null());
        assert_eq!(backend.created().images, 2);
    }

    #[test]
    #[should_panic(expected = "still references it")]
    fn test_destroy_image_before_view_panics() {
        let mut backend = GfxHeadlessBackend::new();
        let desc = GfxImageDesc::default();
        let image = backend.create_image(&desc, "color").unwrap();
        let _view = backend.create_image_view(image, &desc.infer_default_view(), "color/color").unwrap();
        backend.destroy_image(image);
    }

    #[test]
    fn test_rejects_non_spirv() {
        let mut backend = GfxHeadlessBackend::new();
        assert!(backend.create_shader_module(&[1, 2, 3], "bad").is_err());
        assert!(backend.create_shader_module(&[0x0723_0203, 0], "good").is_ok());
    }
}
