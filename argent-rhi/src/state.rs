bitflags::bitflags! {
    /// Access bits describing how a resource may currently be used by the
    /// GPU. A resource can hold several read bits at once; write bits are
    /// exclusive barrier boundaries.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ResourceStates: u32 {
        const VERTEX_AND_CONSTANT_BUFFER = 1 << 0;
        const INDEX_BUFFER = 1 << 1;
        const RENDER_TARGET = 1 << 2;
        const UNORDERED_ACCESS = 1 << 3;
        const DEPTH_WRITE = 1 << 4;
        const DEPTH_READ = 1 << 5;
        const NON_PIXEL_SHADER_RESOURCE = 1 << 6;
        const PIXEL_SHADER_RESOURCE = 1 << 7;
        const STREAM_OUT = 1 << 8;
        const INDIRECT_ARGUMENT = 1 << 9;
        const COPY_DEST = 1 << 10;
        const COPY_SOURCE = 1 << 11;

        const GENERIC_READ = Self::VERTEX_AND_CONSTANT_BUFFER.bits()
            | Self::INDEX_BUFFER.bits()
            | Self::DEPTH_READ.bits()
            | Self::NON_PIXEL_SHADER_RESOURCE.bits()
            | Self::PIXEL_SHADER_RESOURCE.bits()
            | Self::INDIRECT_ARGUMENT.bits()
            | Self::COPY_SOURCE.bits();
    }
}

impl ResourceStates {
    /// The implicit state of a freshly created resource.
    pub const COMMON: Self = Self::empty();

    const WRITE_MASK: Self = Self::RENDER_TARGET
        .union(Self::UNORDERED_ACCESS)
        .union(Self::DEPTH_WRITE)
        .union(Self::STREAM_OUT)
        .union(Self::COPY_DEST);

    /// Whether this state already covers every bit `required` asks for.
    ///
    /// This is a subset test, not equality: a resource readable as
    /// `GENERIC_READ` needs no transition before a `COPY_SOURCE` read.
    #[inline]
    pub fn implies(self, required: Self) -> bool {
        self.contains(required)
    }

    #[inline]
    pub fn is_write(self) -> bool {
        self.intersects(Self::WRITE_MASK)
    }

    #[inline]
    pub fn is_read_only(self) -> bool {
        !self.is_empty() && !self.is_write()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn implies_is_a_subset_test() {
        assert!(ResourceStates::GENERIC_READ.implies(ResourceStates::COPY_SOURCE));
        assert!(!ResourceStates::COPY_SOURCE.implies(ResourceStates::GENERIC_READ));
        assert!(ResourceStates::RENDER_TARGET.implies(ResourceStates::RENDER_TARGET));
        // Every state trivially implies the common state.
        assert!(ResourceStates::COPY_DEST.implies(ResourceStates::COMMON));
    }

    #[test]
    fn write_and_read_classification() {
        assert!(ResourceStates::RENDER_TARGET.is_write());
        assert!(ResourceStates::COPY_DEST.is_write());
        assert!(ResourceStates::UNORDERED_ACCESS.is_write());
        assert!(!ResourceStates::PIXEL_SHADER_RESOURCE.is_write());

        assert!(ResourceStates::GENERIC_READ.is_read_only());
        assert!(!ResourceStates::COMMON.is_read_only());
        assert!(!(ResourceStates::COPY_SOURCE | ResourceStates::COPY_DEST).is_read_only());
    }
}
