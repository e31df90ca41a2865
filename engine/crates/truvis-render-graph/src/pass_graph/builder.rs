//! Pass 构建器
//!
//! 构建器可变借用 [`super::PassGraph`] 中的 Pass 节点，
//! 因此在 `PassGraph::clear()` 之后不可能继续通过旧的构建器修改 Pass。

use super::pass::{RgAccessMode, RgPass, RgPassResource, RgResourceKind};

/// shading rate attachment 使用的 binding 名
pub const SHADING_RATE_BINDING: &str = "shading_rate";

fn push(pass: &mut RgPass, resource: &str, binding: &str, access: RgAccessMode, kind: RgResourceKind) {
    pass.resources.push(RgPassResource {
        resource: resource.to_string(),
        binding: binding.to_string(),
        access,
        kind,
    });
}

pub struct RgRenderPassBuilder<'a> {
    pub(crate) pass: &'a mut RgPass,
}

impl RgRenderPassBuilder<'_> {
    /// 颜色输出
    pub fn add_color(&mut self, resource: &str) -> &mut Self {
        push(self.pass, resource, "", RgAccessMode::Write, RgResourceKind::Color);
        self
    }

    /// 深度/模板输出
    pub fn add_depth_stencil(&mut self, resource: &str) -> &mut Self {
        push(self.pass, resource, "", RgAccessMode::Write, RgResourceKind::DepthStencil);
        self
    }

    /// shading rate attachment，以保留的 binding 名只读访问
    pub fn add_shading_rate(&mut self, resource: &str) -> &mut Self {
        push(self.pass, resource, SHADING_RATE_BINDING, RgAccessMode::Read, RgResourceKind::ShadingRate);
        self
    }

    /// shader 可见的 binding（input attachment）
    pub fn add_resource(&mut self, resource: &str, binding: &str, access: RgAccessMode) -> &mut Self {
        push(self.pass, resource, binding, access, RgResourceKind::Color);
        self
    }

    /// 同 [`Self::add_resource`]，显式指定资源用途（例如读取深度作为 input attachment）
    pub fn add_resource_with_kind(
        &mut self,
        resource: &str,
        binding: &str,
        access: RgAccessMode,
        kind: RgResourceKind,
    ) -> &mut Self {
        push(self.pass, resource, binding, access, kind);
        self
    }
}

pub struct RgComputePassBuilder<'a> {
    pub(crate) pass: &'a mut RgPass,
}

impl RgComputePassBuilder<'_> {
    pub fn add_resource(&mut self, resource: &str, binding: &str, access: RgAccessMode) -> &mut Self {
        push(self.pass, resource, binding, access, RgResourceKind::Color);
        self
    }

    /// dispatch indirect 的参数 buffer
    pub fn add_indirect_buffer(&mut self, resource: &str) -> &mut Self {
        push(self.pass, resource, "", RgAccessMode::Read, RgResourceKind::IndirectBuffer);
        self
    }
}

pub struct RgCopyPassBuilder<'a> {
    pub(crate) pass: &'a mut RgPass,
}

impl RgCopyPassBuilder<'_> {
    /// 从 `src` 拷贝到 `dst`
    pub fn copy(&mut self, src: &str, dst: &str) -> &mut Self {
        push(self.pass, src, "", RgAccessMode::Read, RgResourceKind::Color);
        push(self.pass, dst, "", RgAccessMode::Write, RgResourceKind::Color);
        self
    }
}

pub struct RgDrawBatchBuilder<'a> {
    pub(crate) pass: &'a mut RgPass,
}

impl RgDrawBatchBuilder<'_> {
    /// `binding` 必须存在于该 DrawBatch 的 shader 布局中
    pub fn add_resource(&mut self, resource: &str, binding: &str, access: RgAccessMode) -> &mut Self {
        push(self.pass, resource, binding, access, RgResourceKind::Color);
        self
    }

    /// draw indirect 的参数 buffer
    pub fn add_indirect_buffer(&mut self, resource: &str) -> &mut Self {
        push(self.pass, resource, "", RgAccessMode::Read, RgResourceKind::IndirectBuffer);
        self
    }
}
