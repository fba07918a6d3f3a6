//! Test and helper mocks for the image hand-off seams.

use std::path::{Path, PathBuf};

use arctic_traits::{DeinterlaceAlgorithm, Deinterlacer, HwResult, ImageWriter};

/// Leaves pixels untouched; records the last call.
#[derive(Debug, Default)]
pub struct NoopDeinterlacer {
    pub calls: usize,
    pub last: Option<(u32, u32, DeinterlaceAlgorithm)>,
}

impl Deinterlacer for NoopDeinterlacer {
    fn run(
        &mut self,
        _pixels: &mut [u8],
        rows: u32,
        cols: u32,
        algorithm: DeinterlaceAlgorithm,
    ) -> HwResult<()> {
        self.calls += 1;
        self.last = Some((rows, cols, algorithm));
        Ok(())
    }
}

/// Keeps the written image in memory.
#[derive(Debug, Default)]
pub struct MemoryImageWriter {
    pub path: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl ImageWriter for MemoryImageWriter {
    fn create(&mut self, path: &Path, width: u32, height: u32) -> HwResult<()> {
        self.path = Some(path.to_path_buf());
        self.width = width;
        self.height = height;
        self.pixels.clear();
        Ok(())
    }

    fn write(&mut self, pixels: &[u8]) -> HwResult<()> {
        let expected = self.width as usize * self.height as usize * 2;
        if pixels.len() != expected {
            return Err(Box::new(std::io::Error::other(format!(
                "got {} bytes for a {}x{} image",
                pixels.len(),
                self.width,
                self.height
            ))));
        }
        self.pixels = pixels.to_vec();
        Ok(())
    }
}

/// A writer whose output can never be created, e.g. a full disk.
#[derive(Debug, Default)]
pub struct FailingImageWriter;

impl ImageWriter for FailingImageWriter {
    fn create(&mut self, path: &Path, _width: u32, _height: u32) -> HwResult<()> {
        Err(Box::new(std::io::Error::other(format!(
            "cannot create {}",
            path.display()
        ))))
    }

    fn write(&mut self, _pixels: &[u8]) -> HwResult<()> {
        Err(Box::new(std::io::Error::other("not created")))
    }
}
