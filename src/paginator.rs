pub mod layout;
pub mod render;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use rayon::prelude::*;
use tracing::{error, info, instrument};

pub use layout::{TextMeasure, process_line, process_text, split_into_pages};
pub use render::JpegRenderer;

use crate::config::PaginatorConfig;

/// 测量并渲染一页
pub trait PageRenderer: TextMeasure + Sync {
    fn render_page(&self, lines: &[String], path: &Path) -> Result<()>;
}

/// 一个待转换的文本文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionTask {
    pub source: PathBuf,
    pub images_dir: PathBuf,
}

#[derive(Debug, Default)]
pub struct ConversionReport {
    pub converted: Vec<(PathBuf, usize)>,
    pub failed: Vec<(PathBuf, String)>,
}

pub struct Paginator<R: PageRenderer> {
    renderer: R,
    config: PaginatorConfig,
    fallback: &'static Encoding,
}

impl<R: PageRenderer> Paginator<R> {
    pub fn new(renderer: R, config: PaginatorConfig) -> Result<Self> {
        let fallback = Encoding::for_label(config.fallback_encoding.as_bytes())
            .with_context(|| format!("未知的编码: {}", config.fallback_encoding))?;
        Ok(Self {
            renderer,
            config,
            fallback,
        })
    }

    /// 根目录下每个子目录里的 `.txt`，输出到该子目录的 `images`
    pub fn discover(root: &Path) -> Result<Vec<ConversionTask>> {
        let mut subdirs = read_sorted(root)?;
        subdirs.retain(|path| path.is_dir());

        let mut tasks = Vec::new();
        for sub in subdirs {
            let images_dir = sub.join("images");
            for source in read_sorted(&sub)? {
                if source.is_file() && source.extension().is_some_and(|ext| ext == "txt") {
                    tasks.push(ConversionTask {
                        source,
                        images_dir: images_dir.clone(),
                    });
                }
            }
        }
        Ok(tasks)
    }

    /// 并行转换整个目录，单个文件的失败只记录不中断
    #[instrument(skip(self))]
    pub fn convert_folder(&self, root: &Path) -> Result<ConversionReport> {
        let tasks = Self::discover(root)?;
        let workers = self.config.worker_count();
        info!("共 {} 个文本文件, 使用 {} 个线程", tasks.len(), workers);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build()
            .context("线程池创建失败")?;
        let results: Vec<_> = pool.install(|| {
            tasks
                .par_iter()
                .map(|task| (task.source.clone(), self.convert_file(task)))
                .collect()
        });

        let mut report = ConversionReport::default();
        for (source, result) in results {
            match result {
                Ok(pages) => {
                    println!("[INFO] {} -> {} 页", source.display(), pages);
                    report.converted.push((source, pages));
                }
                Err(e) => {
                    println!("[ERROR] {} 转换失败: {:#}", source.display(), e);
                    error!("{} 转换失败: {:#}", source.display(), e);
                    report.failed.push((source, format!("{:#}", e)));
                }
            }
        }
        Ok(report)
    }

    /// 返回生成的页数
    pub fn convert_file(&self, task: &ConversionTask) -> Result<usize> {
        let bytes = fs::read(&task.source)
            .with_context(|| format!("无法读取: {}", task.source.display()))?;
        let text = decode_text(&bytes, self.fallback).with_context(|| {
            format!(
                "UTF-8 与 {} 解码均失败: {}",
                self.fallback.name(),
                task.source.display()
            )
        })?;

        let pages = self.paginate(&text);
        fs::create_dir_all(&task.images_dir)
            .with_context(|| format!("无法创建目录: {}", task.images_dir.display()))?;

        let basename = task
            .source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        for (index, page) in pages.iter().enumerate() {
            let path = task.images_dir.join(page_file_name(&basename, index + 1));
            self.renderer.render_page(page, &path)?;
        }
        Ok(pages.len())
    }

    pub fn paginate(&self, text: &str) -> Vec<Vec<String>> {
        let lines = process_text(text, &self.renderer, self.config.available_width());
        split_into_pages(lines, self.config.lines_per_page())
    }
}

pub fn page_file_name(basename: &str, index: usize) -> String {
    format!("{}_p{:03}.jpg", basename, index)
}

/// 先按 UTF-8（去掉 BOM），再按备用编码严格解码
pub fn decode_text(bytes: &[u8], fallback: &'static Encoding) -> Option<String> {
    let without_bom = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(without_bom) {
        return Some(text.to_owned());
    }
    fallback
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

fn read_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)
        .with_context(|| format!("无法读取目录: {}", dir.display()))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();
    Ok(paths)
}
