//! 图像的持久化存储.

use super::slice::MaskSlice;
use super::window::MetricWindow;
use crate::consts::gray::*;
use image::ImageResult;
use ndarray::ArrayView2;
use std::path::Path;

/// 表明一个可以通过 **可视化友好** 模式持久化存储的图像对象.
///
/// `ImgWriteVis` trait 的意图是, 图像将以 "可视化友好"
/// 的方式保存, 而不是 "as is" 的方式. 对于二值掩膜切片,
/// 背景和模体会分别映射为黑色和白色; 对于以物理量存储的几何真值切片,
/// 在保存时会用指定的度量窗口规范化.
pub trait ImgWriteVis {
    /// 按照一定的可视化规则将图片保存到 `path` 路径.
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// 表明一个可以通过 **按原样** 模式持久化存储的图像对象.
///
/// 对于掩膜切片这类像素值仅为 0, 1 的图像可以直接按原值存储,
/// 但对以 `f64` 物理量存储的真值切片无能为力.
pub trait ImgWriteRaw {
    /// 按原样将图片保存到 `path` 路径.
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// 使掩膜像素更有利于单通道可视化.
#[inline]
pub(crate) fn pretty(pixel: u8) -> u8 {
    match pixel {
        // 背景为黑色
        MASK_BACKGROUND => BLACK,

        // 模体为白色
        MASK_PHANTOM => WHITE,

        any_else => panic!("只允许掩膜存在 0, 1 像素, 但发现了 `{any_else}`"),
    }
}

/// 会将背景/模体像素分别映射为黑色/白色. 不允许其他像素值.
impl ImgWriteVis for MaskSlice<'_> {
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        let (height, width) = self.shape();
        let mut buf = image::GrayImage::new(width as u32, height as u32);
        for ((h, w), &pix) in self.indexed_iter() {
            buf.put_pixel(w as u32, h as u32, image::Luma([pretty(pix)]));
        }
        buf.save(path)
    }
}

/// 按原样存储.
impl ImgWriteRaw for MaskSlice<'_> {
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        let (height, width) = self.shape();
        let mut buf = image::GrayImage::new(width as u32, height as u32);
        for ((h, w), &pix) in self.indexed_iter() {
            buf.put_pixel(w as u32, h as u32, image::Luma([pix]));
        }
        buf.save(path)
    }
}

/// 几何真值场水平切片的可视化包装.
///
/// 持有一个 `f64` 真值切片视图和一个度量窗口, 保存时逐像素规范化.
#[derive(Debug, Clone)]
pub struct FieldSliceVis<'a> {
    view: ArrayView2<'a, f64>,
    window: MetricWindow,
}

impl<'a> FieldSliceVis<'a> {
    /// 由真值切片视图和度量窗口构建可视化包装.
    #[inline]
    pub fn new(view: ArrayView2<'a, f64>, window: MetricWindow) -> Self {
        Self { view, window }
    }
}

/// 按照构造时给定的度量窗口规范化存储.
impl ImgWriteVis for FieldSliceVis<'_> {
    fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        let (height, width) = self.view.dim();
        let mut buf = image::GrayImage::new(width as u32, height as u32);
        for ((h, w), &v) in self.view.indexed_iter() {
            // NaN/inf 不应出现于真值场.
            let gray = self.window.eval(v as f32).unwrap();
            buf.put_pixel(w as u32, h as u32, image::Luma([gray]));
        }
        buf.save(path)
    }
}
