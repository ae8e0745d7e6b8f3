//! Byte streams and embedded resources.

use std::fmt;
use std::collections::HashMap;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

use crate::error::ImageError;

/// A readable, seekable byte source images can be decoded from.
pub trait ImageStream: Read + Seek {}

impl<T: Read + Seek + ?Sized> ImageStream for T {}

/// Read everything from the current position to the end of `stream`.
pub(crate) fn read_remaining(stream: &mut dyn ImageStream) -> io::Result<Vec<u8>> {
    let start = stream.stream_position()?;
    let end = stream.seek(SeekFrom::End(0))?;
    stream.seek(SeekFrom::Start(start))?;
    let mut data = Vec::with_capacity(end.saturating_sub(start) as usize);
    stream.read_to_end(&mut data)?;
    Ok(data)
}

/// Identifier of a resource type or name: either a string or a small
/// integer id.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceId {
    Name(String),
    Id(u16),
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Id(id) => write!(f, "#{id}"),
        }
    }
}

impl From<&str> for ResourceId {
    fn from(name: &str) -> Self {
        Self::Name(name.into())
    }
}

impl From<String> for ResourceId {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<u16> for ResourceId {
    fn from(id: u16) -> Self {
        Self::Id(id)
    }
}

/// A module carrying embedded resources.
pub trait ResourceModule {
    /// Bytes of the resource, if the module has one with this type and name.
    fn find_resource(&self, res_type: &ResourceId, name: &ResourceId) -> Option<&[u8]>;
}

/// In-memory resource module.
#[derive(Clone, Debug, Default)]
pub struct ResourceTable {
    entries: HashMap<(ResourceId, ResourceId), Vec<u8>>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a resource.
    pub fn insert(
        &mut self,
        res_type: impl Into<ResourceId>,
        name: impl Into<ResourceId>,
        data: impl Into<Vec<u8>>,
    ) -> &mut Self {
        self.entries
            .insert((res_type.into(), name.into()), data.into());
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceModule for ResourceTable {
    fn find_resource(&self, res_type: &ResourceId, name: &ResourceId) -> Option<&[u8]> {
        self.entries
            .get(&(res_type.clone(), name.clone()))
            .map(Vec::as_slice)
    }
}

/// Read-only seekable stream over borrowed bytes.
#[derive(Debug)]
pub struct MemStream<'a> {
    inner: Cursor<&'a [u8]>,
}

impl<'a> MemStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            inner: Cursor::new(data),
        }
    }

    /// Wrap the resource `name` of type `res_type` found in `module`.
    pub fn from_resource(
        module: &'a dyn ResourceModule,
        res_type: &ResourceId,
        name: &ResourceId,
    ) -> Result<Self, ImageError> {
        module
            .find_resource(res_type, name)
            .map(Self::new)
            .ok_or_else(|| ImageError::ResourceNotFound {
                res_type: res_type.to_string(),
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.inner.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.get_ref().is_empty()
    }
}

impl Read for MemStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for MemStream<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl Drop for MemStream<'_> {
    fn drop(&mut self) {
        log::trace!("memory stream released ({} bytes)", self.len());
    }
}
