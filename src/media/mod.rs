pub mod image;
pub mod pdq;
pub mod video;

pub use self::image::{ImageDecoder, StdImageDecoder};
pub use self::pdq::{DihedralHashes, Hash256};
pub use self::video::{FrameStream, VideoDecoder, VideoError, VideoFrame};
