use ash::vk;

/// descriptor set layout 中的一个 binding
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxDescriptorBindingDesc {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub count: u32,
    pub stages: vk::ShaderStageFlags,
    pub flags: vk::DescriptorBindingFlags,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct GfxDescriptorSetLayoutDesc {
    pub bindings: Vec<GfxDescriptorBindingDesc>,
    pub flags: vk::DescriptorSetLayoutCreateFlags,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxPushConstantRangeDesc {
    pub stages: vk::ShaderStageFlags,
    pub offset: u32,
    pub size: u32,
}

/// 因为多个 pipeline 可以使用同一个 pipeline layout，所以 layout 也走缓存
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct GfxPipelineLayoutDesc {
    pub set_layouts: Vec<vk::DescriptorSetLayout>,
    pub push_constant_ranges: Vec<GfxPushConstantRangeDesc>,
}
