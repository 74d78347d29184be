use std::path::Path;

use anyhow::{Context, Result};
use async_zip::tokio::write::ZipFileWriter;
use async_zip::{Compression, ZipEntryBuilder};
use tokio::fs::File;
use tracing::debug;

use super::Epub;
use super::metadata::{CONTAINER_XML, Metadata};

pub struct Compressor;

impl Compressor {
    /// 直接把EPUB写成zip，`mimetype` 必须是第一个且不压缩
    pub async fn write_epub(epub: &Epub, epub_path: &Path) -> Result<()> {
        let file = File::create(epub_path)
            .await
            .with_context(|| format!("无法创建EPUB文件: {}", epub_path.display()))?;
        let mut writer = ZipFileWriter::with_tokio(file);

        Self::add_entry(
            &mut writer,
            "mimetype",
            b"application/epub+zip",
            Compression::Stored,
        )
        .await?;
        Self::add_text(&mut writer, "META-INF/container.xml", CONTAINER_XML).await?;
        Self::add_text(&mut writer, "OEBPS/content.opf", &Metadata::content_opf(epub)).await?;
        Self::add_text(&mut writer, "OEBPS/toc.ncx", &Metadata::toc_ncx(epub)).await?;

        for chapter in &epub.chapters {
            let zip_path = format!("OEBPS/Text/{}", chapter.filename);
            Self::add_text(&mut writer, &zip_path, &chapter.xhtml(&epub.lang)).await?;
        }

        writer.close().await?;
        Ok(())
    }

    async fn add_text(writer: &mut ZipFileWriter<File>, zip_path: &str, text: &str) -> Result<()> {
        Self::add_entry(writer, zip_path, text.as_bytes(), Compression::Deflate).await
    }

    async fn add_entry(
        writer: &mut ZipFileWriter<File>,
        zip_path: &str,
        content: &[u8],
        compression: Compression,
    ) -> Result<()> {
        debug!("正在添加文件: {}", zip_path);
        let entry = ZipEntryBuilder::new(zip_path.to_owned().into(), compression);
        writer
            .write_entry_whole(entry, content)
            .await
            .with_context(|| format!("写入zip条目失败: {}", zip_path))?;
        Ok(())
    }
}
