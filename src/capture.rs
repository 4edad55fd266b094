use std::fs;
use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;

use crate::error::{Error, Result};

/// One captured frame, opaque to the scoring pipeline.
///
/// The bytes are reference counted so the session, the detection worker and
/// the caller can hold the same frame without copying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    data: Arc<[u8]>,
    media_type: Option<String>,
}

impl ImageArtifact {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: data.into(),
            media_type: None,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Read an image file. The media type is inferred from the extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        if data.is_empty() {
            return Err(Error::InvalidImage(format!("{} is empty", path.display())));
        }

        let artifact = Self::new(data);
        let media_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(media_type_for_extension);
        Ok(match media_type {
            Some(mt) => artifact.with_media_type(mt),
            None => artifact,
        })
    }

    /// Decode a base64 `data:` URI, as handed out by browser and mobile
    /// camera APIs, e.g. `data:image/jpeg;base64,/9j/4AAQ...`.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidImage(format!("data URI {}", reason));

        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| invalid("must start with `data:`"))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| invalid("has no payload"))?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| invalid("is not base64 encoded"))?;

        let data = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| invalid(&format!("payload is malformed: {}", e)))?;
        if data.is_empty() {
            return Err(invalid("is empty"));
        }

        let artifact = Self::new(data);
        Ok(if media_type.is_empty() {
            artifact
        } else {
            artifact.with_media_type(media_type)
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }
}

fn media_type_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

/// A camera or other source of frames.
///
/// Returns `None` when the device could not produce a frame.
pub trait FrameSource {
    fn capture_frame(&mut self) -> Option<ImageArtifact>;
}

/// A source that hands out a fixed frame every time.
#[derive(Debug, Clone)]
pub struct StillFrame {
    frame: Option<ImageArtifact>,
}

impl StillFrame {
    pub fn new(frame: ImageArtifact) -> Self {
        Self { frame: Some(frame) }
    }

    /// A source that never produces a frame.
    pub fn unavailable() -> Self {
        Self { frame: None }
    }
}

impl FrameSource for StillFrame {
    fn capture_frame(&mut self) -> Option<ImageArtifact> {
        self.frame.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn media_type_from_extension() {
        let mut file = tempfile::Builder::new().suffix(".JPG").tempfile().unwrap();
        file.write_all(&[0xFF, 0xD8, 0xFF]).unwrap();

        let image = ImageArtifact::from_file(file.path()).unwrap();
        assert_eq!(image.media_type(), Some("image/jpeg"));
        assert_eq!(image.data(), &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn unknown_extension_has_no_media_type() {
        let mut file = tempfile::Builder::new().suffix(".raw").tempfile().unwrap();
        file.write_all(&[1, 2, 3]).unwrap();

        let image = ImageArtifact::from_file(file.path()).unwrap();
        assert_eq!(image.media_type(), None);
        assert_eq!(image.len(), 3);
    }

    #[test]
    fn empty_file_is_rejected() {
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        assert!(matches!(
            ImageArtifact::from_file(file.path()),
            Err(Error::InvalidImage(_))
        ));
    }

    #[test]
    fn decodes_data_uri() {
        let image = ImageArtifact::from_data_uri("data:image/jpeg;base64,/9j/").unwrap();
        assert_eq!(image.data(), &[0xFF, 0xD8, 0xFF]);
        assert_eq!(image.media_type(), Some("image/jpeg"));

        let untyped = ImageArtifact::from_data_uri("data:;base64,AQID").unwrap();
        assert_eq!(untyped.data(), &[1, 2, 3]);
        assert_eq!(untyped.media_type(), None);
    }

    #[test]
    fn malformed_data_uri_is_rejected() {
        for uri in [
            "not a uri",
            "data:image/png;base64",
            "data:image/png,AQID",
            "data:image/png;base64,***",
            "data:image/png;base64,",
        ] {
            assert!(
                matches!(ImageArtifact::from_data_uri(uri), Err(Error::InvalidImage(_))),
                "{} was accepted",
                uri
            );
        }
    }

    #[test]
    fn clones_share_bytes() {
        let a = ImageArtifact::new(vec![7; 1024]);
        let b = a.clone();
        assert_eq!(a.data().as_ptr(), b.data().as_ptr());
    }

    #[test]
    fn still_frame_sources() {
        let mut source = StillFrame::new(ImageArtifact::new(vec![1]));
        assert!(source.capture_frame().is_some());
        assert!(source.capture_frame().is_some());

        assert!(StillFrame::unavailable().capture_frame().is_none());
    }
}
