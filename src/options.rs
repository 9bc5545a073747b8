use bitflags::bitflags;

/// Open options for [`crate::Dataset`]
#[derive(Debug, Default)]
pub struct DatasetOptions<'a> {
    pub open_flags: OpenFlags,
    pub allowed_drivers: Option<&'a [&'a str]>,
    pub open_options: Option<&'a [&'a str]>,
    pub sibling_files: Option<&'a [&'a str]>,
}

bitflags! {
    /// Open flags used by [`Dataset::open_ex`](crate::Dataset::open_ex).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        /// Open in read-only mode (default).
        const READONLY = 0x00;
        /// Open in update mode.
        const UPDATE = 0x01;
        /// Allow raster drivers to be used.
        const RASTER = 0x02;
        /// Allow vector drivers to be used.
        const VECTOR = 0x04;
        /// Reuse an already open handle for the same resource and access mode
        /// on the calling thread. The handle is reference counted.
        const SHARED = 0x20;
        /// Report a failed open through the error handler.
        const VERBOSE_ERROR = 0x40;
    }
}

impl Default for OpenFlags {
    fn default() -> OpenFlags {
        OpenFlags::READONLY
    }
}

impl OpenFlags {
    pub fn access(&self) -> Access {
        if self.contains(OpenFlags::UPDATE) {
            Access::Update
        } else {
            Access::ReadOnly
        }
    }
}

/// Access mode of an open dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Access {
    #[default]
    ReadOnly,
    Update,
}

impl From<Access> for OpenFlags {
    fn from(val: Access) -> OpenFlags {
        match val {
            Access::Update => OpenFlags::UPDATE,
            Access::ReadOnly => OpenFlags::READONLY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_from_flags() {
        assert_eq!(OpenFlags::default().access(), Access::ReadOnly);
        assert_eq!(
            (OpenFlags::UPDATE | OpenFlags::RASTER).access(),
            Access::Update
        );
        assert_eq!(OpenFlags::from(Access::Update), OpenFlags::UPDATE);
    }
}
