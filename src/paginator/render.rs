use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use ab_glyph::{Font, FontArc, FontVec, GlyphId, PxScale, ScaleFont};
use anyhow::{Context, Result};
use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_text_mut;
use tracing::{debug, info, warn};

use super::PageRenderer;
use super::layout::TextMeasure;
use crate::config::PaginatorConfig;

/// 用 TrueType 字体把文字页渲染为 JPEG
pub struct JpegRenderer {
    font: FontArc,
    scale: PxScale,
    config: PaginatorConfig,
    background: Rgb<u8>,
    foreground: Rgb<u8>,
}

impl JpegRenderer {
    /// 依次尝试候选字体，全部不可用时报错
    pub fn from_candidates(config: &PaginatorConfig) -> Result<Self> {
        for candidate in &config.font_candidates {
            if !candidate.is_file() {
                debug!("字体不存在: {}", candidate.display());
                continue;
            }
            match Self::load(candidate, config) {
                Ok(renderer) => {
                    info!("使用字体: {}", candidate.display());
                    return Ok(renderer);
                }
                Err(e) => warn!("字体加载失败 {}: {:#}", candidate.display(), e),
            }
        }
        anyhow::bail!(
            "找不到可用字体, 已尝试: {:?}",
            config.font_candidates
        )
    }

    pub fn load(path: &Path, config: &PaginatorConfig) -> Result<Self> {
        let data = fs::read(path).with_context(|| format!("无法读取字体: {}", path.display()))?;
        let font = FontArc::new(FontVec::try_from_vec_and_index(data, 0)?);

        // 字号按 em 大小换算成 ab_glyph 的行高比例
        let units_per_em = font.units_per_em().unwrap_or(1000.0);
        let scale = PxScale::from(config.font_size * font.height_unscaled() / units_per_em);

        Ok(Self {
            font,
            scale,
            background: parse_hex_color(&config.background)?,
            foreground: parse_hex_color(&config.foreground)?,
            config: config.clone(),
        })
    }
}

impl TextMeasure for JpegRenderer {
    fn text_width(&self, text: &str) -> f32 {
        let font = self.font.as_scaled(self.scale);
        let mut width = 0.0;
        let mut previous: Option<GlyphId> = None;
        for c in text.chars() {
            let glyph = font.glyph_id(c);
            if let Some(previous) = previous {
                width += font.kern(previous, glyph);
            }
            width += font.h_advance(glyph);
            previous = Some(glyph);
        }
        width
    }
}

impl PageRenderer for JpegRenderer {
    fn render_page(&self, lines: &[String], path: &Path) -> Result<()> {
        let height = self.config.page_height(lines.len());
        let mut image = RgbImage::from_pixel(self.config.width, height, self.background);

        let x = self.config.margin_left as i32;
        let pitch = self.config.line_pitch() as i32;
        let mut y = self.config.margin_top as i32;
        for line in lines {
            draw_text_mut(&mut image, self.foreground, x, y, self.scale, &self.font, line);
            y += pitch;
        }

        let file = File::create(path).with_context(|| format!("无法创建图片: {}", path.display()))?;
        let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), self.config.jpeg_quality);
        image
            .write_with_encoder(encoder)
            .with_context(|| format!("JPEG 编码失败: {}", path.display()))?;
        Ok(())
    }
}

/// `#RRGGBB`
pub fn parse_hex_color(value: &str) -> Result<Rgb<u8>> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        anyhow::bail!("颜色格式无效: {}", value);
    }
    let channel = |range: std::ops::Range<usize>| {
        u8::from_str_radix(&hex[range], 16).with_context(|| format!("颜色格式无效: {}", value))
    };
    Ok(Rgb([channel(0..2)?, channel(2..4)?, channel(4..6)?]))
}
