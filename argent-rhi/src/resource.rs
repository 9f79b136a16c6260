/// Stable identity of a GPU resource registered with a state table.
///
/// The value is backend-defined (a heap offset, a native handle, a slot
/// index); the tracking layer only requires it to be unique and stable for
/// the lifetime of the resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub u64);

/// Addresses either a single subresource or the resource as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subresource {
    /// Every subresource at once.
    Whole,
    /// One mip of one array layer, flattened (see
    /// [`TextureDescription::subresource_index`]).
    Index(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferDescription {
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDescription {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub array_layers: u32,
}

impl TextureDescription {
    #[inline]
    pub fn subresource_count(&self) -> u32 {
        self.mip_levels * self.array_layers
    }

    /// Flat index of one mip of one array layer, or `None` when either
    /// coordinate is out of range.
    pub fn subresource_index(&self, mip: u32, array_layer: u32) -> Option<u32> {
        (mip < self.mip_levels && array_layer < self.array_layers)
            .then(|| mip + array_layer * self.mip_levels)
    }
}

/// Backend-generic shape of a trackable resource.
///
/// Backends register whichever of the closed set of shapes matches their
/// native object; the tracking layer never inspects anything beyond the
/// subresource layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceDescription {
    Buffer(BufferDescription),
    Texture(TextureDescription),
}

impl ResourceDescription {
    pub fn subresource_count(&self) -> u32 {
        match self {
            Self::Buffer(_) => 1,
            Self::Texture(texture) => texture.subresource_count(),
        }
    }

    #[inline]
    pub fn as_buffer(&self) -> Option<&BufferDescription> {
        match self {
            Self::Buffer(buffer) => Some(buffer),
            _ => None,
        }
    }

    #[inline]
    pub fn as_texture(&self) -> Option<&TextureDescription> {
        match self {
            Self::Texture(texture) => Some(texture),
            _ => None,
        }
    }
}
