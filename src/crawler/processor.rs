use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, instrument};

use crate::crawler::parser::{Episode, NovelInfo};
use crate::utils::sanitize_filename;

/// 负责把解析结果落盘
#[derive(Clone, Debug)]
pub struct Processor {
    output_dir: PathBuf,
    max_line_length: usize,
}

impl Processor {
    pub fn new(output_dir: PathBuf, max_line_length: usize) -> Self {
        Self {
            output_dir,
            max_line_length,
        }
    }

    /// `[작가][장르][제목]`，缺失字段用占位词补齐
    #[instrument(skip_all)]
    pub async fn make_base_folder(&self, info: &NovelInfo) -> Result<PathBuf> {
        let folder = self.output_dir.join(base_folder_name(info));
        fs::create_dir_all(&folder)
            .await
            .with_context(|| format!("无法创建作品目录: {}", folder.display()))?;
        info!("作品目录: {}", folder.display());
        Ok(folder)
    }

    pub async fn make_episode_folder(&self, base: &Path, episode: &Episode) -> Result<PathBuf> {
        let folder = base.join(sanitize_filename(&episode.label()));
        fs::create_dir_all(&folder)
            .await
            .with_context(|| format!("无法创建回次目录: {}", folder.display()))?;
        Ok(folder)
    }

    #[instrument(skip_all)]
    pub async fn write_chapter(
        &self,
        folder: &Path,
        episode: &Episode,
        raw_text: &str,
    ) -> Result<PathBuf> {
        let text = format_text_for_readability(raw_text, self.max_line_length);
        let path = folder.join(sanitize_filename(&format!("{}차.txt", episode.label())));
        fs::write(&path, text)
            .await
            .with_context(|| format!("章节写入失败: {}", path.display()))?;
        info!("正在保存章节: {} -> {}", episode.title, path.display());
        Ok(path)
    }
}

pub fn base_folder_name(info: &NovelInfo) -> String {
    let or = |value: &str, fallback: &str| {
        if value.is_empty() {
            fallback.to_owned()
        } else {
            value.to_owned()
        }
    };
    sanitize_filename(&format!(
        "[{}][{}][{}]",
        or(&info.author, "NoWriter"),
        or(&info.genre, "NoGenre"),
        or(&info.title, "NoTitle"),
    ))
}

/// 去掉行尾空白，合并连续空行，并把超长行按字符数切开
pub fn format_text_for_readability(text: &str, max_line_length: usize) -> String {
    let max = max_line_length.max(1);
    let mut out: Vec<String> = Vec::new();
    let mut previous_blank = false;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            if !previous_blank {
                out.push(String::new());
            }
            previous_blank = true;
            continue;
        }
        previous_blank = false;

        let chars: Vec<char> = line.chars().collect();
        out.extend(chars.chunks(max).map(|chunk| chunk.iter().collect::<String>()));
    }

    out.join("\n")
}
