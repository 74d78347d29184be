pub mod config;
pub mod crawler;
pub mod epub;
pub mod extractor;
pub mod logger;
pub mod navigator;
pub mod paginator;
pub mod utils;

pub use crawler::{BookTokiCrawler, ConsoleCaptchaGate};
pub use epub::{Chapter, Epub};
pub use navigator::Navigator;
pub use navigator::chrome::ChromeLauncher;
pub use paginator::{JpegRenderer, Paginator};
pub use utils::{display_elapsed_time, prompt};
