pub mod backend;
pub mod diff;
pub mod store;
pub mod types;
pub mod webdriver;

pub use backend::{BrowserDriver, Framebuffer, MockBrowser};
pub use diff::{DiffOutcome, ImageDiffer, PixelDiff};
pub use store::{ArtifactStore, content_digest};
pub use types::{ArtifactCategory, ArtifactRef, SnapshotError, SnapshotResult};
pub use webdriver::WebDriverSession;
