use ash::vk;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GfxShaderStageDesc {
    pub stage: vk::ShaderStageFlags,
    pub module: vk::ShaderModule,
    pub entry_point: String,
}

impl GfxShaderStageDesc {
    pub fn main(stage: vk::ShaderStageFlags, module: vk::ShaderModule) -> Self {
        Self {
            stage,
            module,
            entry_point: "main".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxVertexBindingDesc {
    pub binding: u32,
    pub stride: u32,
    pub input_rate: vk::VertexInputRate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxVertexAttributeDesc {
    pub location: u32,
    pub binding: u32,
    pub format: vk::Format,
    pub offset: u32,
}

/// 光栅化状态
///
/// 浮点数字段以 bit pattern 存储，保证描述可以参与 Hash/Eq。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxRasterDesc {
    pub polygon_mode: vk::PolygonMode,
    pub cull_mode: vk::CullModeFlags,
    pub front_face: vk::FrontFace,
    pub depth_bias_enable: bool,
    line_width_bits: u32,
}

impl Default for GfxRasterDesc {
    fn default() -> Self {
        Self {
            polygon_mode: vk::PolygonMode::FILL,
            cull_mode: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
            depth_bias_enable: false,
            line_width_bits: 1.0f32.to_bits(),
        }
    }
}

impl GfxRasterDesc {
    #[inline]
    pub fn with_line_width(mut self, line_width: f32) -> Self {
        self.line_width_bits = line_width.to_bits();
        self
    }

    #[inline]
    pub fn line_width(&self) -> f32 {
        f32::from_bits(self.line_width_bits)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxDepthStencilDesc {
    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
    pub depth_compare_op: vk::CompareOp,
    pub stencil_test_enable: bool,
}

impl Default for GfxDepthStencilDesc {
    fn default() -> Self {
        Self {
            depth_test_enable: true,
            depth_write_enable: true,
            depth_compare_op: vk::CompareOp::LESS,
            stencil_test_enable: false,
        }
    }
}

/// 每个 color attachment 的混合状态
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxColorBlendDesc {
    pub blend_enable: bool,
    pub src_color_factor: vk::BlendFactor,
    pub dst_color_factor: vk::BlendFactor,
    pub color_op: vk::BlendOp,
    pub src_alpha_factor: vk::BlendFactor,
    pub dst_alpha_factor: vk::BlendFactor,
    pub alpha_op: vk::BlendOp,
    pub write_mask: vk::ColorComponentFlags,
}

impl Default for GfxColorBlendDesc {
    fn default() -> Self {
        Self::opaque()
    }
}

impl GfxColorBlendDesc {
    pub fn opaque() -> Self {
        Self {
            blend_enable: false,
            src_color_factor: vk::BlendFactor::ONE,
            dst_color_factor: vk::BlendFactor::ZERO,
            color_op: vk::BlendOp::ADD,
            src_alpha_factor: vk::BlendFactor::ONE,
            dst_alpha_factor: vk::BlendFactor::ZERO,
            alpha_op: vk::BlendOp::ADD,
            write_mask: vk::ColorComponentFlags::RGBA,
        }
    }

    pub fn alpha_blend() -> Self {
        Self {
            blend_enable: true,
            src_color_factor: vk::BlendFactor::SRC_ALPHA,
            dst_color_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
            ..Self::opaque()
        }
    }
}

/// Graphics pipeline 的完整描述
///
/// 包含全部固定管线状态、shader 组合、layout 以及兼容的 render pass。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GfxGraphicsPipelineDesc {
    pub stages: Vec<GfxShaderStageDesc>,

    pub vertex_bindings: Vec<GfxVertexBindingDesc>,
    pub vertex_attributes: Vec<GfxVertexAttributeDesc>,
    pub topology: vk::PrimitiveTopology,

    pub raster: GfxRasterDesc,
    pub depth_stencil: GfxDepthStencilDesc,
    /// 需要为每个 color attachment 分别指定
    pub color_blends: Vec<GfxColorBlendDesc>,
    pub samples: vk::SampleCountFlags,
    /// viewport 和 scissor 默认由 dynamic state 决定
    pub dynamic_states: Vec<vk::DynamicState>,

    pub layout: vk::PipelineLayout,
    pub render_pass: vk::RenderPass,
    pub subpass: u32,
}

impl GfxGraphicsPipelineDesc {
    pub fn new(
        stages: Vec<GfxShaderStageDesc>,
        layout: vk::PipelineLayout,
        render_pass: vk::RenderPass,
        color_attachment_count: usize,
    ) -> Self {
        Self {
            stages,
            vertex_bindings: Vec::new(),
            vertex_attributes: Vec::new(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            raster: GfxRasterDesc::default(),
            depth_stencil: GfxDepthStencilDesc::default(),
            color_blends: vec![GfxColorBlendDesc::opaque(); color_attachment_count],
            samples: vk::SampleCountFlags::TYPE_1,
            dynamic_states: vec![vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR],
            layout,
            render_pass,
            subpass: 0,
        }
    }
}
