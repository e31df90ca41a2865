//! 经过校验的 shader binding 描述

use anyhow::{Context, bail};
use ash::vk;

use crate::layout_doc::{RawBinding, RawElement, RawResourceKind, ShaderUpdateRate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderBindingKind {
    Buffer,
    Image,
    Sampler,
    Bindless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderScalarType {
    Float,
    Double,
    Int,
    Uint,
    Bool,
}

impl ShaderScalarType {
    #[inline]
    pub fn size(self) -> u32 {
        match self {
            ShaderScalarType::Double => 8,
            _ => 4,
        }
    }
}

/// buffer 中的一个成员类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderElementType {
    Scalar(ShaderScalarType),
    Vector(ShaderScalarType, u8),
    /// (列数, 行数)
    Matrix(ShaderScalarType, u8, u8),
}

impl ShaderElementType {
    /// 解析 GLSL 风格的类型名：`float`、`uvec4`、`mat4`、`dmat3x4` 等
    pub fn parse(ty: &str) -> anyhow::Result<Self> {
        let scalar = match ty {
            "float" => return Ok(Self::Scalar(ShaderScalarType::Float)),
            "double" => return Ok(Self::Scalar(ShaderScalarType::Double)),
            "int" => return Ok(Self::Scalar(ShaderScalarType::Int)),
            "uint" => return Ok(Self::Scalar(ShaderScalarType::Uint)),
            "bool" => return Ok(Self::Scalar(ShaderScalarType::Bool)),
            _ => ty,
        };

        let (scalar, rest) = match scalar.as_bytes().first() {
            Some(b'd') => (ShaderScalarType::Double, &scalar[1..]),
            Some(b'i') => (ShaderScalarType::Int, &scalar[1..]),
            Some(b'u') => (ShaderScalarType::Uint, &scalar[1..]),
            Some(b'b') => (ShaderScalarType::Bool, &scalar[1..]),
            _ => (ShaderScalarType::Float, scalar),
        };

        let dim = |s: &str| -> Option<u8> { s.parse::<u8>().ok().filter(|n| (2..=4).contains(n)) };

        if let Some(n) = rest.strip_prefix("vec").and_then(dim) {
            return Ok(Self::Vector(scalar, n));
        }
        if let Some(shape) = rest.strip_prefix("mat") {
            if matches!(scalar, ShaderScalarType::Float | ShaderScalarType::Double) {
                let parsed = match shape.split_once('x') {
                    Some((c, r)) => dim(c).zip(dim(r)),
                    None => dim(shape).map(|n| (n, n)),
                };
                if let Some((cols, rows)) = parsed {
                    return Ok(Self::Matrix(scalar, cols, rows));
                }
            }
        }
        bail!("不支持的 buffer 成员类型: {}", ty)
    }

    /// 紧密排列时的字节大小
    pub fn size(&self) -> u32 {
        match *self {
            Self::Scalar(s) => s.size(),
            Self::Vector(s, n) => s.size() * n as u32,
            Self::Matrix(s, c, r) => s.size() * c as u32 * r as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderBufferElement {
    pub ty: ShaderElementType,
    pub count: u32,
}

/// 不同资源类型各自的描述
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShaderBindingDetail {
    Buffer {
        elements: Vec<ShaderBufferElement>,
    },
    Image {
        view_type: vk::ImageViewType,
        format: Option<vk::Format>,
    },
    Sampler {
        immutable: bool,
    },
    Bindless,
}

/// 一个具名的 shader binding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderBinding {
    pub name: String,
    pub slot: u32,
    /// 可以访问该 binding 的 stage
    pub visibility: vk::ShaderStageFlags,
    pub rate: ShaderUpdateRate,
    pub count: u32,
    pub descriptor_type: vk::DescriptorType,
    pub detail: ShaderBindingDetail,
}

// new & init
impl ShaderBinding {
    /// 校验原始描述并转换为 binding
    pub fn from_raw(name: String, raw: &RawBinding, visibility: vk::ShaderStageFlags) -> anyhow::Result<Self> {
        let usage = raw.usage.as_deref();
        let (descriptor_type, detail) = match raw.resource {
            RawResourceKind::Buffer => {
                let elements = raw
                    .elements
                    .iter()
                    .map(|RawElement { ty, count }| -> anyhow::Result<ShaderBufferElement> {
                        Ok(ShaderBufferElement {
                            ty: ShaderElementType::parse(ty)?,
                            count: *count,
                        })
                    })
                    .collect::<anyhow::Result<Vec<_>>>()
                    .with_context(|| format!("binding {} 的 elements 无效", name))?;
                (buffer_descriptor_type(usage.unwrap_or("uniform"))?, ShaderBindingDetail::Buffer { elements })
            }
            RawResourceKind::Image => (
                image_descriptor_type(usage.unwrap_or("sampled"))?,
                ShaderBindingDetail::Image {
                    view_type: image_view_type(raw.dimension.as_deref().unwrap_or("2d"))?,
                    format: raw.format.as_deref().map(image_format).transpose()?,
                },
            ),
            RawResourceKind::Sampler => (
                vk::DescriptorType::SAMPLER,
                ShaderBindingDetail::Sampler {
                    immutable: raw.immutable,
                },
            ),
            RawResourceKind::Bindless => {
                let usage = usage.unwrap_or("combined");
                let descriptor_type = image_descriptor_type(usage).or_else(|_| buffer_descriptor_type(usage))?;
                (descriptor_type, ShaderBindingDetail::Bindless)
            }
        };

        Ok(Self {
            name,
            slot: raw.slot,
            visibility,
            rate: raw.rate,
            count: raw.count,
            descriptor_type,
            detail,
        })
    }
}

// getters
impl ShaderBinding {
    #[inline]
    pub fn kind(&self) -> ShaderBindingKind {
        match self.detail {
            ShaderBindingDetail::Buffer { .. } => ShaderBindingKind::Buffer,
            ShaderBindingDetail::Image { .. } => ShaderBindingKind::Image,
            ShaderBindingDetail::Sampler { .. } => ShaderBindingKind::Sampler,
            ShaderBindingDetail::Bindless => ShaderBindingKind::Bindless,
        }
    }

    /// 是否以 uniform 方式读取
    #[inline]
    pub fn is_uniform(&self) -> bool {
        matches!(
            self.descriptor_type,
            vk::DescriptorType::UNIFORM_BUFFER
                | vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC
                | vk::DescriptorType::UNIFORM_TEXEL_BUFFER
        )
    }

    /// buffer 成员紧密排列时的总大小
    pub fn buffer_size(&self) -> Option<u32> {
        match &self.detail {
            ShaderBindingDetail::Buffer { elements } => Some(elements.iter().map(|e| e.ty.size() * e.count).sum()),
            _ => None,
        }
    }
}

fn buffer_descriptor_type(usage: &str) -> anyhow::Result<vk::DescriptorType> {
    Ok(match usage {
        "uniform" => vk::DescriptorType::UNIFORM_BUFFER,
        "uniform_dynamic" => vk::DescriptorType::UNIFORM_BUFFER_DYNAMIC,
        "storage" => vk::DescriptorType::STORAGE_BUFFER,
        "storage_dynamic" => vk::DescriptorType::STORAGE_BUFFER_DYNAMIC,
        "uniform_texel" => vk::DescriptorType::UNIFORM_TEXEL_BUFFER,
        "storage_texel" => vk::DescriptorType::STORAGE_TEXEL_BUFFER,
        _ => bail!("未知的 buffer usage: {}", usage),
    })
}

fn image_descriptor_type(usage: &str) -> anyhow::Result<vk::DescriptorType> {
    Ok(match usage {
        "sampled" => vk::DescriptorType::SAMPLED_IMAGE,
        "combined" => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
        "storage" => vk::DescriptorType::STORAGE_IMAGE,
        "input_attachment" => vk::DescriptorType::INPUT_ATTACHMENT,
        _ => bail!("未知的 image usage: {}", usage),
    })
}

fn image_view_type(dimension: &str) -> anyhow::Result<vk::ImageViewType> {
    Ok(match dimension {
        "1d" => vk::ImageViewType::TYPE_1D,
        "2d" => vk::ImageViewType::TYPE_2D,
        "3d" => vk::ImageViewType::TYPE_3D,
        "cube" => vk::ImageViewType::CUBE,
        "2d_array" => vk::ImageViewType::TYPE_2D_ARRAY,
        _ => bail!("未知的 image 维度: {}", dimension),
    })
}

/// GLSL image format 限定符
fn image_format(format: &str) -> anyhow::Result<vk::Format> {
    Ok(match format {
        "rgba8" => vk::Format::R8G8B8A8_UNORM,
        "rgba8_snorm" => vk::Format::R8G8B8A8_SNORM,
        "rgba16f" => vk::Format::R16G16B16A16_SFLOAT,
        "rgba32f" => vk::Format::R32G32B32A32_SFLOAT,
        "rg16f" => vk::Format::R16G16_SFLOAT,
        "rg32f" => vk::Format::R32G32_SFLOAT,
        "r16f" => vk::Format::R16_SFLOAT,
        "r32f" => vk::Format::R32_SFLOAT,
        "r32ui" => vk::Format::R32_UINT,
        "r32i" => vk::Format::R32_SINT,
        "r8" => vk::Format::R8_UNORM,
        "r11f_g11f_b10f" => vk::Format::B10G11R11_UFLOAT_PACK32,
        _ => bail!("未知的 image format: {}", format),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout_doc::RawLayoutDoc;

    fn raw(json: &str) -> RawBinding {
        let doc = RawLayoutDoc::parse(&format!(r#"{{ "bindings": [{}] }}"#, json)).unwrap();
        doc.bindings.into_iter().next().unwrap()
    }

    #[test]
    fn test_parse_element_types() {
        assert_eq!(ShaderElementType::parse("mat4").unwrap(), ShaderElementType::Matrix(ShaderScalarType::Float, 4, 4));
        assert_eq!(ShaderElementType::parse("uvec2").unwrap(), ShaderElementType::Vector(ShaderScalarType::Uint, 2));
        assert_eq!(ShaderElementType::parse("dmat3x4").unwrap().size(), 8 * 12);
        assert!(ShaderElementType::parse("imat4").is_err());
        assert!(ShaderElementType::parse("vec5").is_err());
    }

    #[test]
    fn test_uniform_buffer_binding() {
        let binding = ShaderBinding::from_raw(
            "Camera".to_string(),
            &raw(r#"{ "slot": 0, "resource": "buffer", "usage": "uniform", "elements": [{ "type": "mat4", "count": 2 }, { "type": "vec4" }] }"#),
            vk::ShaderStageFlags::VERTEX,
        )
        .unwrap();

        assert_eq!(binding.kind(), ShaderBindingKind::Buffer);
        assert!(binding.is_uniform());
        assert_eq!(binding.buffer_size(), Some(64 * 2 + 16));
    }

    #[test]
    fn test_image_binding() {
        let binding = ShaderBinding::from_raw(
            "hdr".to_string(),
            &raw(r#"{ "slot": 3, "resource": "image", "usage": "storage", "type": "2d", "format": "rgba16f" }"#),
            vk::ShaderStageFlags::COMPUTE,
        )
        .unwrap();

        assert_eq!(binding.descriptor_type, vk::DescriptorType::STORAGE_IMAGE);
        assert_eq!(
            binding.detail,
            ShaderBindingDetail::Image {
                view_type: vk::ImageViewType::TYPE_2D,
                format: Some(vk::Format::R16G16B16A16_SFLOAT)
            }
        );
        assert!(!binding.is_uniform());
    }

    #[test]
    fn test_unknown_usage_fails() {
        let result = ShaderBinding::from_raw(
            "x".to_string(),
            &raw(r#"{ "slot": 0, "resource": "buffer", "usage": "constant" }"#),
            vk::ShaderStageFlags::VERTEX,
        );
        assert!(result.is_err());

        let result = ShaderBinding::from_raw(
            "x".to_string(),
            &raw(r#"{ "slot": 0, "resource": "bindless", "usage": "whatever" }"#),
            vk::ShaderStageFlags::VERTEX,
        );
        assert!(result.is_err());
    }
}
