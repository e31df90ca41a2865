/// Pass 的类型
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RgPassKind {
    RenderPass,
    /// 可选的 shader 名称，用于查询 binding 是否为 uniform
    ComputePass { phase: Option<String> },
    CopyPass,
    /// `phase` 是 shader 注册表中的名字，用于查询 binding 的可见性
    DrawBatch { phase: String },
}

impl RgPassKind {
    #[inline]
    pub fn label(&self) -> &'static str {
        match self {
            RgPassKind::RenderPass => "RenderPass",
            RgPassKind::ComputePass { .. } => "ComputePass",
            RgPassKind::CopyPass => "CopyPass",
            RgPassKind::DrawBatch { .. } => "DrawBatch",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgAccessMode {
    Read,
    Write,
    ReadWrite,
}

impl RgAccessMode {
    #[inline]
    pub fn is_read_only(self) -> bool {
        self == RgAccessMode::Read
    }

    #[inline]
    pub fn writes(self) -> bool {
        !self.is_read_only()
    }
}

/// 资源在 Pass 中的用途
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RgResourceKind {
    Color,
    Depth,
    Stencil,
    DepthStencil,
    ShadingRate,
    IndirectBuffer,
}

impl RgResourceKind {
    #[inline]
    pub fn is_depth_or_stencil(self) -> bool {
        matches!(self, RgResourceKind::Depth | RgResourceKind::Stencil | RgResourceKind::DepthStencil)
    }
}

/// Pass 对某个资源的一次访问声明
///
/// 对 RenderPass 而言，`binding` 为空表示该资源是 framebuffer 的输出 attachment；
/// 非空表示 shader 可见的 binding（input attachment、shading rate 等）。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RgPassResource {
    pub resource: String,
    pub binding: String,
    pub access: RgAccessMode,
    pub kind: RgResourceKind,
}

impl RgPassResource {
    #[inline]
    pub fn is_attachment_output(&self) -> bool {
        self.binding.is_empty()
    }
}

/// Pass 节点
#[derive(Clone, Debug)]
pub struct RgPass {
    pub(crate) name: String,
    pub(crate) kind: RgPassKind,
    pub(crate) resources: Vec<RgPassResource>,
}

// getters
impl RgPass {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> &RgPassKind {
        &self.kind
    }

    #[inline]
    pub fn resources(&self) -> &[RgPassResource] {
        &self.resources
    }
}
