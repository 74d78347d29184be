pub mod chapter;
pub mod compression;
pub mod metadata;

pub use chapter::Chapter;
pub use compression::Compressor;
pub use metadata::Metadata;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::crawler::NovelInfo;
use crate::utils::sanitize_filename;

#[derive(Debug, Clone)]
pub struct Epub {
    pub id: String,
    pub title: String,
    pub author: String,
    pub publisher: String,
    pub genre: String, // 写入 dc:subject
    pub lang: String,
    pub chapters: Vec<Chapter>,
    pub output: PathBuf,
}

impl Epub {
    /// 从作品目录收集章节：子目录按名称排序，每个子目录取第一个 `.txt`
    #[instrument(skip(info))]
    pub async fn from_folder(folder: &Path, info: &NovelInfo, lang: &str) -> Result<Self> {
        let folder_name = folder
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "novel".to_owned());

        let mut chapters = Vec::new();
        for sub in sorted_entries(folder, |path| path.is_dir()).await? {
            let txt_files = sorted_entries(&sub, |path| {
                path.is_file() && path.extension().is_some_and(|ext| ext == "txt")
            })
            .await?;
            let Some(txt_path) = txt_files.first() else {
                continue;
            };

            let content = match fs::read_to_string(txt_path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("章节读取失败, 跳过 {}: {}", txt_path.display(), e);
                    continue;
                }
            };
            let title = sub
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            chapters.push(Chapter::new(chapters.len() + 1, title, content));
        }

        if chapters.is_empty() {
            anyhow::bail!("没有可打包的章节: {}", folder.display());
        }
        info!("共收集到 {} 个章节", chapters.len());

        let or = |value: &str, fallback: &str| {
            if value.is_empty() {
                fallback.to_owned()
            } else {
                value.to_owned()
            }
        };
        Ok(Self {
            id: format!("booktoki:{}", folder_name),
            title: or(&info.title, "제목없음"),
            author: or(&info.author, "작가미상"),
            publisher: info.publisher.clone(),
            genre: info.genre.clone(),
            lang: lang.to_owned(),
            chapters,
            output: folder.join(sanitize_filename(&format!("{}.epub", folder_name))),
        })
    }

    #[instrument(skip_all)]
    pub async fn generate(&self) -> Result<PathBuf> {
        info!("正在生成EPUB文件: {}", self.title);
        Compressor::write_epub(self, &self.output).await?;
        info!("EPUB文件生成成功: {}", self.output.display());
        Ok(self.output.clone())
    }
}

async fn sorted_entries(dir: &Path, keep: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .await
        .with_context(|| format!("无法读取目录: {}", dir.display()))?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if keep(&path) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

pub(crate) fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use std::fs as stdfs;

    use super::*;

    fn info() -> NovelInfo {
        NovelInfo {
            title: "T".to_owned(),
            publisher: "P".to_owned(),
            genre: "G".to_owned(),
            author: String::new(),
        }
    }

    #[test]
    fn escapes_markup_chars() {
        assert_eq!(escape_xml(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&apos;");
    }

    #[tokio::test]
    async fn collects_first_txt_of_each_sorted_subfolder() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("[A][G][T]");
        for (sub, file, text) in [
            ("2회", "2회차.txt", "둘"),
            ("1회", "1회차.txt", "하나"),
            ("1회", "z.txt", "무시"),
        ] {
            stdfs::create_dir_all(base.join(sub)).unwrap();
            stdfs::write(base.join(sub).join(file), text).unwrap();
        }
        stdfs::create_dir_all(base.join("3회")).unwrap();
        stdfs::write(base.join("notes.txt"), "root file").unwrap();

        let epub = Epub::from_folder(&base, &info(), "ko").await.unwrap();
        let titles: Vec<_> = epub.chapters.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, ["1회", "2회"]);
        assert_eq!(epub.chapters[0].content, "하나");
        assert_eq!(epub.chapters[1].filename, "chap_2.xhtml");
        assert_eq!(epub.author, "작가미상");
        assert_eq!(epub.output, base.join("[A][G][T].epub"));

        let path = epub.generate().await.unwrap();
        let bytes = stdfs::read(path).unwrap();
        assert_eq!(&bytes[..4], b"PK\x03\x04");
        assert_eq!(&bytes[30..38], b"mimetype");
    }

    #[tokio::test]
    async fn empty_folder_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Epub::from_folder(dir.path(), &info(), "ko").await.is_err());
    }
}
