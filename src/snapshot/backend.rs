//! Browser driver abstraction for page capture.
//!
//! This module provides a unified interface over the automation surface:
//! - `WebDriverSession` (see `webdriver`) for a real browser
//! - `MockBrowser` for testing with scripted pages rendered from a `Framebuffer`

use image::{ImageBuffer, RgbImage};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use super::types::{SnapshotError, SnapshotResult};

/// Trait for browser drivers
///
/// A driver models a single browser session: one page is loaded at a time and
/// `find_anchor_hrefs` / `screenshot` always act on the most recently loaded page.
pub trait BrowserDriver {
    /// Resize the viewport so captures are pixel-comparable
    fn resize_viewport(&mut self, width: u32, height: u32) -> SnapshotResult<()>;

    /// Navigate to an absolute URL
    fn load_page(&mut self, url: &str) -> SnapshotResult<()>;

    /// Absolute `href` values of every anchor on the current page
    fn find_anchor_hrefs(&mut self) -> SnapshotResult<Vec<String>>;

    /// PNG screenshot of the current page
    fn screenshot(&mut self) -> SnapshotResult<Vec<u8>>;
}

/// An RGB drawing surface for synthesizing page screenshots
///
/// - `fill()` - Fill entire buffer with a color
/// - `draw_rect()` - Draw a filled rectangle
/// - `get_pixel()` / `set_pixel()` - Direct pixel access
#[derive(Debug, Clone, PartialEq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    /// RGB pixel buffer (row-major, 3 bytes per pixel)
    buffer: Vec<u8>,
}

impl Framebuffer {
    /// Create a new framebuffer with the given dimensions, initialized to black
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            buffer: vec![0u8; buffer_len(width, height)],
        }
    }

    /// Create a framebuffer initialized to a specific color
    pub fn with_color(width: u32, height: u32, color: [u8; 3]) -> Self {
        let mut fb = Self::new(width, height);
        fb.fill(color);
        fb
    }

    /// Load a framebuffer from PNG image bytes
    pub fn from_png_bytes(data: &[u8]) -> SnapshotResult<Self> {
        let rgb = image::load_from_memory(data)?.to_rgb8();
        Ok(Self {
            width: rgb.width(),
            height: rgb.height(),
            buffer: rgb.into_raw(),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Fill the entire framebuffer with a color
    pub fn fill(&mut self, color: [u8; 3]) {
        for chunk in self.buffer.chunks_exact_mut(3) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Draw a filled rectangle, clipped to the buffer
    pub fn draw_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        for py in y..(y + h).min(self.height) {
            for px in x..(x + w).min(self.width) {
                self.set_pixel(px, py, color);
            }
        }
    }

    /// Get the color of a pixel (black outside the buffer)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let idx = self.offset(x, y);
        [self.buffer[idx], self.buffer[idx + 1], self.buffer[idx + 2]]
    }

    /// Set the color of a pixel
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let idx = self.offset(x, y);
        self.buffer[idx..idx + 3].copy_from_slice(&color);
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 3
    }

    /// Encode the framebuffer as PNG bytes
    pub fn to_png(&self) -> SnapshotResult<Vec<u8>> {
        let img: RgbImage = ImageBuffer::from_raw(self.width, self.height, self.buffer.clone())
            .ok_or_else(|| SnapshotError::Image("Buffer size does not match dimensions".to_string()))?;
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)?;
        Ok(bytes)
    }
}

/// A scripted page served by `MockBrowser`
#[derive(Debug, Clone)]
struct MockPage {
    screenshot: Vec<u8>,
    anchors: Vec<String>,
}

/// In-memory browser with scripted pages
///
/// Pages are registered per absolute URL. Loading an unknown URL, or a URL
/// marked with `fail_on`, returns a driver error just like a failed navigation.
#[derive(Debug, Clone, Default)]
pub struct MockBrowser {
    pages: HashMap<String, MockPage>,
    failing: HashSet<String>,
    current: Option<String>,
    viewport: Option<(u32, u32)>,
    loads: Vec<String>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a page whose screenshot is the given framebuffer
    pub fn page(
        mut self,
        url: impl Into<String>,
        screen: &Framebuffer,
        anchors: impl IntoIterator<Item = impl Into<String>>,
    ) -> SnapshotResult<Self> {
        let page = MockPage {
            screenshot: screen.to_png()?,
            anchors: anchors.into_iter().map(Into::into).collect(),
        };
        self.pages.insert(url.into(), page);
        Ok(self)
    }

    /// Register a page with raw screenshot bytes (which need not be a valid image)
    pub fn raw_page(mut self, url: impl Into<String>, screenshot: Vec<u8>) -> Self {
        self.pages.insert(
            url.into(),
            MockPage {
                screenshot,
                anchors: Vec::new(),
            },
        );
        self
    }

    /// Make navigation to `url` fail
    pub fn fail_on(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// Last viewport requested through `resize_viewport`
    pub fn viewport(&self) -> Option<(u32, u32)> {
        self.viewport
    }

    /// Every URL passed to `load_page`, in order
    pub fn loads(&self) -> &[String] {
        &self.loads
    }

    fn current_page(&self) -> SnapshotResult<&MockPage> {
        let url = self
            .current
            .as_ref()
            .ok_or_else(|| SnapshotError::Driver("no page loaded".to_string()))?;
        self.pages
            .get(url)
            .ok_or_else(|| SnapshotError::Driver(format!("no such page: {}", url)))
    }
}

impl BrowserDriver for MockBrowser {
    fn resize_viewport(&mut self, width: u32, height: u32) -> SnapshotResult<()> {
        self.viewport = Some((width, height));
        Ok(())
    }

    fn load_page(&mut self, url: &str) -> SnapshotResult<()> {
        self.loads.push(url.to_string());
        if self.failing.contains(url) || !self.pages.contains_key(url) {
            self.current = None;
            return Err(SnapshotError::Driver(format!("navigation to {} failed", url)));
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    fn find_anchor_hrefs(&mut self) -> SnapshotResult<Vec<String>> {
        Ok(self.current_page()?.anchors.clone())
    }

    fn screenshot(&mut self) -> SnapshotResult<Vec<u8>> {
        Ok(self.current_page()?.screenshot.clone())
    }
}

/// Byte length of an RGB buffer, computed in `usize` so large captures do not wrap
fn buffer_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}
