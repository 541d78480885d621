//! OCR collaborator.
//!
//! An [`OcrProvider`] hands out independent [`OcrEngine`] handles; most
//! engines are not safe for concurrent calls, so every worker acquires its
//! own. [`OcrSession`] scopes a handle and releases it on every exit path.

pub mod bridge;

use image::RgbaImage;
use tracing::warn;

use crate::error::OcrError;

pub use bridge::{TesseractBridge, TesseractEngine};

/// One OCR handle. Reusable across many sequential calls.
pub trait OcrEngine {
    fn extract_text(&mut self, image: &RgbaImage) -> Result<String, OcrError>;

    /// Frees the underlying resource. Called once by [`OcrSession`].
    fn release(&mut self) -> Result<(), OcrError> {
        Ok(())
    }

    /// Runs the engine on `image` and trims surrounding whitespace. Empty
    /// bitmaps fail without reaching the engine.
    fn recognize(&mut self, image: &RgbaImage) -> Result<String, OcrError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OcrError::EmptyInput {
                width: image.width(),
                height: image.height(),
            });
        }
        let text = self.extract_text(image)?;
        Ok(text.trim().to_string())
    }
}

pub trait OcrProvider: Sync {
    type Engine: OcrEngine;

    fn acquire(&self) -> Result<Self::Engine, OcrError>;
}

/// Scoped OCR handle: acquired on `open`, released by `finish` or on drop.
pub struct OcrSession<E: OcrEngine> {
    engine: E,
    released: bool,
}

impl<E: OcrEngine> OcrSession<E> {
    pub fn open<P>(provider: &P) -> Result<Self, OcrError>
    where
        P: OcrProvider<Engine = E>,
    {
        Ok(Self {
            engine: provider.acquire()?,
            released: false,
        })
    }

    pub fn engine(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Releases the handle and reports the outcome.
    pub fn finish(mut self) -> Result<(), OcrError> {
        self.released = true;
        self.engine.release()
    }
}

impl<E: OcrEngine> Drop for OcrSession<E> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.engine.release() {
            warn!("OCR engine release failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingEngine {
        releases: Arc<AtomicUsize>,
    }

    impl OcrEngine for CountingEngine {
        fn extract_text(&mut self, _image: &RgbaImage) -> Result<String, OcrError> {
            Ok("  ADM \n".to_string())
        }

        fn release(&mut self) -> Result<(), OcrError> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingProvider {
        releases: Arc<AtomicUsize>,
    }

    impl OcrProvider for CountingProvider {
        type Engine = CountingEngine;

        fn acquire(&self) -> Result<CountingEngine, OcrError> {
            Ok(CountingEngine {
                releases: Arc::clone(&self.releases),
            })
        }
    }

    #[test]
    fn recognize_trims_and_rejects_empty() {
        let releases = Arc::new(AtomicUsize::new(0));
        let mut engine = CountingEngine { releases };

        let text = engine.recognize(&RgbaImage::new(3, 3)).unwrap();
        assert_eq!(text, "ADM");
        assert!(matches!(
            engine.recognize(&RgbaImage::new(0, 4)),
            Err(OcrError::EmptyInput { width: 0, height: 4 })
        ));
    }

    #[test]
    fn session_releases_exactly_once() {
        let releases = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            releases: Arc::clone(&releases),
        };

        let session = OcrSession::open(&provider).unwrap();
        session.finish().unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        {
            let mut session = OcrSession::open(&provider).unwrap();
            let _ = session.engine().recognize(&RgbaImage::new(1, 1));
        }
        assert_eq!(releases.load(Ordering::SeqCst), 2);
    }
}
