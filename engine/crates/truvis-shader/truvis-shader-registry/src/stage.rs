use ash::vk;

/// Shader 的执行阶段，由源码文件的后缀决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
    Task,
    Mesh,
}

impl ShaderStage {
    pub const ALL: [ShaderStage; 5] = [
        ShaderStage::Vertex,
        ShaderStage::Fragment,
        ShaderStage::Compute,
        ShaderStage::Task,
        ShaderStage::Mesh,
    ];

    /// 源码文件的扩展名（不含 `.`）
    #[inline]
    pub fn suffix(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vert",
            ShaderStage::Fragment => "frag",
            ShaderStage::Compute => "comp",
            ShaderStage::Task => "task",
            ShaderStage::Mesh => "mesh",
        }
    }

    /// 根据文件名解析 shader stage，不支持的后缀返回 None
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let ext = file_name.rsplit_once('.')?.1;
        Self::ALL.into_iter().find(|stage| stage.suffix() == ext)
    }

    #[inline]
    pub fn vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
            ShaderStage::Compute => vk::ShaderStageFlags::COMPUTE,
            ShaderStage::Task => vk::ShaderStageFlags::TASK_EXT,
            ShaderStage::Mesh => vk::ShaderStageFlags::MESH_EXT,
        }
    }

    /// glslc 的 `-fshader-stage` 参数
    #[inline]
    pub fn glslc_stage(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
            ShaderStage::Compute => "compute",
            ShaderStage::Task => "task",
            ShaderStage::Mesh => "mesh",
        }
    }
}
