use enough::StopReason;

use crate::legacy::Status;

/// Errors from image acquisition, decoding and pixel ingestion.
///
/// Every failed acquisition returns one of these instead of a handle; no
/// partially built image is ever handed back.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ImageError {
    #[error("image API unavailable: the imaging factory was not created")]
    ImagingUnavailable,

    #[error("{op}: allocation failed")]
    Allocation { op: &'static str },

    #[error("{op}: surface lock failed")]
    Lock { op: &'static str },

    #[error("{op}: legacy backend returned {status}")]
    Legacy { op: &'static str, status: Status },

    #[error("unrecognized format magic bytes")]
    UnrecognizedFormat,

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("unsupported format variant: {0}")]
    UnsupportedVariant(String),

    #[error("invalid pixel data: {0}")]
    InvalidData(String),

    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("frame {index} out of range (decoder has {count})")]
    FrameOutOfRange { index: u32, count: u32 },

    #[error("dimensions too large: {width}x{height}")]
    DimensionsTooLarge { width: u32, height: u32 },

    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    #[error("palette pixel format requires a palette")]
    MissingPalette,

    #[error("resource {name} of type {res_type} not found")]
    ResourceNotFound { res_type: String, name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("operation cancelled")]
    Cancelled(StopReason),
}

/// Coarse failure classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A native object (factory, decoder, bitmap) could not be created.
    Allocation,
    /// The source data is malformed, unsupported or unreadable.
    Decode,
    /// A freshly created surface could not be locked.
    Lock,
    /// The caller passed arguments the operation cannot work with.
    Caller,
}

impl ImageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ImagingUnavailable
            | Self::Allocation { .. }
            | Self::DimensionsTooLarge { .. }
            | Self::LimitExceeded(_) => ErrorKind::Allocation,
            Self::Lock { .. } => ErrorKind::Lock,
            Self::Legacy { status, .. } => match status {
                Status::OutOfMemory | Status::ValueOverflow => ErrorKind::Allocation,
                Status::ObjectBusy | Status::WrongState => ErrorKind::Lock,
                Status::InvalidParameter => ErrorKind::Caller,
                _ => ErrorKind::Decode,
            },
            Self::BufferTooSmall { .. } | Self::MissingPalette | Self::ResourceNotFound { .. } => {
                ErrorKind::Caller
            }
            Self::UnrecognizedFormat
            | Self::InvalidHeader(_)
            | Self::UnsupportedVariant(_)
            | Self::InvalidData(_)
            | Self::UnexpectedEof
            | Self::FrameOutOfRange { .. }
            | Self::Io(_)
            | Self::Cancelled(_) => ErrorKind::Decode,
        }
    }
}

impl From<StopReason> for ImageError {
    fn from(r: StopReason) -> Self {
        ImageError::Cancelled(r)
    }
}
