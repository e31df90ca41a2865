//! Pass 图
//!
//! 按声明顺序记录一帧内的 Pass，声明顺序即执行顺序，不做依赖排序或环检测。

mod builder;
mod pass;

pub use builder::*;
pub use pass::*;

#[derive(Default)]
pub struct PassGraph {
    passes: Vec<RgPass>,
    /// 每次 clear 递增
    generation: u64,
}

// new & init
impl PassGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// 丢弃所有 Pass，开始新的一帧
    pub fn clear(&mut self) {
        self.passes.clear();
        self.generation += 1;
    }
}

// add pass
impl PassGraph {
    pub fn add_render_pass(&mut self, name: &str) -> RgRenderPassBuilder<'_> {
        RgRenderPassBuilder {
            pass: self.push(name, RgPassKind::RenderPass),
        }
    }

    pub fn add_compute_pass(&mut self, name: &str) -> RgComputePassBuilder<'_> {
        RgComputePassBuilder {
            pass: self.push(name, RgPassKind::ComputePass { phase: None }),
        }
    }

    /// 带 shader 名称的 compute pass，binding 的 uniform 判断来自该 shader 的布局
    pub fn add_compute_pass_with_phase(&mut self, name: &str, phase: &str) -> RgComputePassBuilder<'_> {
        RgComputePassBuilder {
            pass: self.push(
                name,
                RgPassKind::ComputePass {
                    phase: Some(phase.to_string()),
                },
            ),
        }
    }

    pub fn add_copy_pass(&mut self, name: &str) -> RgCopyPassBuilder<'_> {
        RgCopyPassBuilder {
            pass: self.push(name, RgPassKind::CopyPass),
        }
    }

    pub fn add_draw_batch(&mut self, name: &str, phase: &str) -> RgDrawBatchBuilder<'_> {
        RgDrawBatchBuilder {
            pass: self.push(
                name,
                RgPassKind::DrawBatch {
                    phase: phase.to_string(),
                },
            ),
        }
    }

    fn push(&mut self, name: &str, kind: RgPassKind) -> &mut RgPass {
        self.passes.push(RgPass {
            name: name.to_string(),
            kind,
            resources: Vec::new(),
        });
        let index = self.passes.len() - 1;
        &mut self.passes[index]
    }
}

// getters
impl PassGraph {
    #[inline]
    pub fn passes(&self) -> &[RgPass] {
        &self.passes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// DrawBatch 所属的 RenderPass：声明顺序上在它之前最近的一个 RenderPass
    pub fn owner_render_pass(&self, pass_index: usize) -> Option<usize> {
        self.passes[..pass_index].iter().rposition(|pass| pass.kind == RgPassKind::RenderPass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declaration_order_is_execution_order() {
        let mut graph = PassGraph::new();
        graph.add_copy_pass("upload").copy("staging", "lights");
        graph.add_render_pass("gbuffer").add_color("albedo").add_depth_stencil("depth");
        graph.add_draw_batch("opaque", "deferred/gbuffer").add_resource("camera", "Camera", RgAccessMode::Read);

        let names: Vec<_> = graph.passes().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["upload", "gbuffer", "opaque"]);
        assert_eq!(graph.owner_render_pass(2), Some(1));
        assert_eq!(graph.owner_render_pass(1), None);
    }

    #[test]
    fn test_builder_records_resources() {
        let mut graph = PassGraph::new();
        graph
            .add_render_pass("lighting")
            .add_color("hdr")
            .add_shading_rate("vrs")
            .add_resource("albedo", "gbuffer_albedo", RgAccessMode::Read);

        let resources = graph.passes()[0].resources();
        assert_eq!(resources.len(), 3);
        assert!(resources[0].is_attachment_output());
        assert_eq!(resources[0].access, RgAccessMode::Write);
        assert_eq!(resources[1].binding, SHADING_RATE_BINDING);
        assert_eq!(resources[1].kind, RgResourceKind::ShadingRate);
        assert_eq!(resources[2].access, RgAccessMode::Read);
    }

    #[test]
    fn test_copy_declares_read_then_write() {
        let mut graph = PassGraph::new();
        graph.add_copy_pass("blit").copy("a", "b");
        let resources = graph.passes()[0].resources();
        assert_eq!((resources[0].resource.as_str(), resources[0].access), ("a", RgAccessMode::Read));
        assert_eq!((resources[1].resource.as_str(), resources[1].access), ("b", RgAccessMode::Write));
    }

    #[test]
    fn test_clear_advances_generation() {
        let mut graph = PassGraph::new();
        graph.add_compute_pass("cull").add_indirect_buffer("args");
        assert_eq!(graph.generation(), 0);

        graph.clear();
        assert!(graph.is_empty());
        assert_eq!(graph.generation(), 1);
    }
}
