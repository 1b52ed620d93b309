use std::path::Path;

use anyhow::{Context, Result, anyhow};
use image::RgbImage;

use super::ColorExtractor;

/// 8 位 HSV 中色相的取值范围，与 OpenCV 一致
const HUE_RANGE: u32 = 180;

/// 色相直方图
///
/// 将图片转换到 HSV 空间，对色相通道统计 bins 个等宽区间，并按像素数归一化。
#[derive(Debug, Clone, Copy)]
pub struct HueHistogram {
    bins: usize,
}

impl Default for HueHistogram {
    fn default() -> Self {
        Self { bins: 8 }
    }
}

impl HueHistogram {
    pub fn new(bins: usize) -> Self {
        assert!(bins > 0 && bins <= HUE_RANGE as usize, "bins must be in 1..=180");
        Self { bins }
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    /// 计算图片的色相直方图
    pub fn histogram(&self, image: &RgbImage) -> Result<Vec<f32>> {
        let total = image.width() as usize * image.height() as usize;
        if total == 0 {
            return Err(anyhow!("图片为空"));
        }
        let mut counts = vec![0u64; self.bins];
        for pixel in image.pixels() {
            let [r, g, b] = pixel.0;
            let h = hue(r, g, b);
            counts[h as usize * self.bins / HUE_RANGE as usize] += 1;
        }
        Ok(counts.into_iter().map(|c| (c as f64 / total as f64) as f32).collect())
    }
}

/// 计算 8 位 RGB 像素的色相，范围为 0..180
///
/// 灰色像素（饱和度为 0）的色相为 0
pub fn hue(r: u8, g: u8, b: u8) -> u32 {
    let (r, g, b) = (r as f32, g as f32, b as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = max - min;
    if diff == 0.0 {
        return 0;
    }
    let mut h = if max == r {
        60.0 * (g - b) / diff
    } else if max == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
        h += 360.0;
    }
    (h / 2.0).round() as u32 % HUE_RANGE
}

impl ColorExtractor for HueHistogram {
    fn extract_color_signal(&self, path: &Path) -> Result<Vec<f32>> {
        let image =
            image::open(path).with_context(|| format!("无法读取图片: {}", path.display()))?;
        self.histogram(&image.to_rgb8())
    }
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    #[test]
    fn test_hue_primary_colors() {
        assert_eq!(hue(255, 0, 0), 0);
        assert_eq!(hue(0, 255, 0), 60);
        assert_eq!(hue(0, 0, 255), 120);
        assert_eq!(hue(255, 255, 0), 30);
        assert_eq!(hue(128, 128, 128), 0);
        // 接近 360 度的红色回到 0
        assert_eq!(hue(255, 0, 1), 0);
    }

    #[test]
    fn test_histogram_normalized() {
        let mut image = RgbImage::from_pixel(4, 4, Rgb([255, 0, 0]));
        for x in 0..4 {
            image.put_pixel(x, 0, Rgb([0, 0, 255]));
        }
        let hist = HueHistogram::default().histogram(&image).unwrap();
        assert_eq!(hist.len(), 8);
        // 红色 -> 0 号桶，蓝色 120 -> 120 * 8 / 180 = 5 号桶
        assert!((hist[0] - 0.75).abs() < 1e-6);
        assert!((hist[5] - 0.25).abs() < 1e-6);
        assert!((hist.iter().sum::<f32>() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_histogram_empty_image() {
        let image = RgbImage::new(0, 0);
        assert!(HueHistogram::new(4).histogram(&image).is_err());
    }
}
