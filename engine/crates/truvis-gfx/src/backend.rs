use ash::prelude::VkResult;
use ash::vk;

use crate::pipelines::framebuffer::GfxFramebufferDesc;
use crate::pipelines::graphics_pipeline::GfxGraphicsPipelineDesc;
use crate::pipelines::layout::{GfxDescriptorSetLayoutDesc, GfxPipelineLayoutDesc};
use crate::pipelines::render_pass::GfxRenderPassDesc;
use crate::resources::buffer::{GfxBufferDesc, GfxBufferViewDesc};
use crate::resources::image::GfxImageDesc;
use crate::resources::image_view::GfxImageViewDesc;

/// 图形 API 后端
///
/// 渲染图只负责"什么时候需要什么对象"，对象的真正创建、内存分配以及命令录制都由后端完成。
/// 返回的 handle 的生命周期由调用者管理，渲染图不会假设后端会自动回收。
pub trait GfxBackend {
    fn create_buffer(&mut self, desc: &GfxBufferDesc, name: &str) -> VkResult<vk::Buffer>;
    fn destroy_buffer(&mut self, buffer: vk::Buffer);

    fn create_buffer_view(
        &mut self,
        buffer: vk::Buffer,
        desc: &GfxBufferViewDesc,
        name: &str,
    ) -> VkResult<vk::BufferView>;
    fn destroy_buffer_view(&mut self, view: vk::BufferView);

    fn create_image(&mut self, desc: &GfxImageDesc, name: &str) -> VkResult<vk::Image>;
    fn destroy_image(&mut self, image: vk::Image);

    fn create_image_view(
        &mut self,
        image: vk::Image,
        desc: &GfxImageViewDesc,
        name: &str,
    ) -> VkResult<vk::ImageView>;
    fn destroy_image_view(&mut self, view: vk::ImageView);

    fn create_render_pass(&mut self, desc: &GfxRenderPassDesc) -> VkResult<vk::RenderPass>;

    fn create_framebuffer(&mut self, desc: &GfxFramebufferDesc) -> VkResult<vk::Framebuffer>;

    fn create_graphics_pipeline(&mut self, desc: &GfxGraphicsPipelineDesc) -> VkResult<vk::Pipeline>;

    fn create_descriptor_set_layout(&mut self, desc: &GfxDescriptorSetLayoutDesc)
    -> VkResult<vk::DescriptorSetLayout>;

    fn create_pipeline_layout(&mut self, desc: &GfxPipelineLayoutDesc) -> VkResult<vk::PipelineLayout>;

    /// `spirv` 是已经编译好的 SPIR-V 字节码
    fn create_shader_module(&mut self, spirv: &[u32], name: &str) -> VkResult<vk::ShaderModule>;
}
