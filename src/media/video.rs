use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    /// The stream has no more frames. Normal termination, not a failure.
    #[error("End of video stream")]
    EndOfStream,
    #[error("Failed to open video: {0}")]
    Open(String),
    #[error("Failed to decode video frame: {0}")]
    Decode(String),
}

/// A single decoded frame as an 8-bit luminance plane, which is all the
/// perceptual hasher needs.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    pub width: usize,
    pub height: usize,
    pub luma: Vec<u8>,
}

/// An open decode session for one video. Dropping the stream releases any
/// decoder resources.
pub trait FrameStream: Send {
    /// Native frame rate of the stream, in frames per second.
    fn frame_rate(&self) -> f64;

    /// Decode the next frame, or [`VideoError::EndOfStream`] at exhaustion.
    fn next_frame(&mut self) -> Result<VideoFrame, VideoError>;
}

/// Collaborator seam for video decoding. No default implementation ships;
/// callers plug in a backend (ffmpeg bindings, gstreamer, a test fake).
pub trait VideoDecoder: Send + Sync {
    fn open(&self, path: &Path, threads: usize) -> Result<Box<dyn FrameStream>, VideoError>;
}

/// Drain a stream, handing roughly `target_fps` frames per second of footage
/// to `on_frame`. Frames are decoded sequentially; the skip factor decides
/// which ones are processed.
pub fn sample_frames<F>(
    stream: &mut dyn FrameStream,
    target_fps: f64,
    mut on_frame: F,
) -> Result<(), VideoError>
where
    F: FnMut(VideoFrame),
{
    let native = stream.frame_rate();
    let skip = if native > 0.0 {
        native / target_fps.min(native).max(f64::MIN_POSITIVE)
    } else {
        1.0
    };

    let mut index: u64 = 0;
    loop {
        match stream.next_frame() {
            Ok(frame) => {
                if (index as f64) % skip == 0.0 {
                    on_frame(frame);
                }
                index += 1;
            }
            Err(VideoError::EndOfStream) => return Ok(()),
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeStream {
        frame_rate: f64,
        remaining: usize,
        fail_at: Option<usize>,
        decoded: usize,
    }

    impl FakeStream {
        fn new(frame_rate: f64, frames: usize) -> Self {
            Self {
                frame_rate,
                remaining: frames,
                fail_at: None,
                decoded: 0,
            }
        }
    }

    impl FrameStream for FakeStream {
        fn frame_rate(&self) -> f64 {
            self.frame_rate
        }

        fn next_frame(&mut self) -> Result<VideoFrame, VideoError> {
            if Some(self.decoded) == self.fail_at {
                return Err(VideoError::Decode("corrupt packet".into()));
            }
            if self.remaining == 0 {
                return Err(VideoError::EndOfStream);
            }
            self.remaining -= 1;
            self.decoded += 1;
            Ok(VideoFrame {
                width: 2,
                height: 2,
                luma: vec![self.decoded as u8; 4],
            })
        }
    }

    #[test]
    fn samples_at_the_requested_rate() {
        // 30 fps native, 1 fps target: every 30th frame.
        let mut stream = FakeStream::new(30.0, 90);
        let mut sampled = 0;
        sample_frames(&mut stream, 1.0, |_| sampled += 1).unwrap();
        assert_eq!(sampled, 3);
    }

    #[test]
    fn target_above_native_keeps_every_frame() {
        let mut stream = FakeStream::new(24.0, 10);
        let mut sampled = 0;
        sample_frames(&mut stream, 60.0, |_| sampled += 1).unwrap();
        assert_eq!(sampled, 10);
    }

    #[test]
    fn end_of_stream_is_not_an_error() {
        let mut stream = FakeStream::new(30.0, 0);
        let result = sample_frames(&mut stream, 1.0, |_| {});
        assert!(result.is_ok());
    }

    #[test]
    fn decode_failure_propagates() {
        let mut stream = FakeStream::new(30.0, 10);
        stream.fail_at = Some(4);
        let result = sample_frames(&mut stream, 60.0, |_| {});
        assert!(matches!(result, Err(VideoError::Decode(_))));
    }
}
