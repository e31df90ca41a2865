use ash::vk;

/// 缓冲区描述
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxBufferDesc {
    /// 缓冲区大小（字节）
    pub size: vk::DeviceSize,
    /// 缓冲区用途
    pub usage: vk::BufferUsageFlags,
}

impl Default for GfxBufferDesc {
    fn default() -> Self {
        Self {
            size: 0,
            usage: vk::BufferUsageFlags::STORAGE_BUFFER,
        }
    }
}

// new & init
impl GfxBufferDesc {
    #[inline]
    pub fn new(size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> Self {
        Self { size, usage }
    }

    /// uniform buffer 常用的用途组合
    #[inline]
    pub fn uniform(size: vk::DeviceSize) -> Self {
        Self::new(size, vk::BufferUsageFlags::UNIFORM_BUFFER | vk::BufferUsageFlags::TRANSFER_DST)
    }

    /// 缓冲区是否会作为 uniform buffer 使用
    #[inline]
    pub fn is_uniform(&self) -> bool {
        self.usage.intersects(vk::BufferUsageFlags::UNIFORM_BUFFER | vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER)
    }
}

/// Texel buffer view 描述
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GfxBufferViewDesc {
    pub format: vk::Format,
    pub offset: vk::DeviceSize,
    /// WHOLE_SIZE 表示到缓冲区末尾
    pub range: vk::DeviceSize,
}

impl GfxBufferViewDesc {
    #[inline]
    pub fn whole(format: vk::Format) -> Self {
        Self {
            format,
            offset: 0,
            range: vk::WHOLE_SIZE,
        }
    }
}
