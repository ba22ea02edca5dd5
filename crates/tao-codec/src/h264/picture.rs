//! YUV 4:2:0 图像平面.
//!
//! 平面尺寸按宏块对齐, 显示尺寸以外的区域在载入时复制边缘像素填充,
//! 输出时按显示尺寸裁剪.

use tao_core::{PixelFormat, TaoError, TaoResult};

use crate::frame::VideoFrame;

/// 单个采样平面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plane {
    data: Vec<u8>,
    stride: usize,
    width: usize,
    height: usize,
}

impl Plane {
    /// 创建填充为 `value` 的平面
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            data: vec![value; width * height],
            stride: width,
            width,
            height,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.stride + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.stride + x] = v;
    }

    /// 越界坐标钳位到平面边缘
    #[inline]
    pub fn get_clamped(&self, x: i32, y: i32) -> u8 {
        let cx = x.clamp(0, self.width as i32 - 1) as usize;
        let cy = y.clamp(0, self.height as i32 - 1) as usize;
        self.data[cy * self.stride + cx]
    }

    fn load_block(&self, x0: usize, y0: usize, size: usize, out: &mut [u8]) {
        for (row, dst) in out.chunks_exact_mut(size).enumerate() {
            let off = (y0 + row) * self.stride + x0;
            dst.copy_from_slice(&self.data[off..off + size]);
        }
    }

    fn store_block(&mut self, x0: usize, y0: usize, size: usize, src: &[u8]) {
        for (row, s) in src.chunks_exact(size).enumerate() {
            let off = (y0 + row) * self.stride + x0;
            self.data[off..off + size].copy_from_slice(s);
        }
    }

    /// 从外部行数据载入, 超出 `src_w x src_h` 的区域复制边缘
    fn fill_from(&mut self, src: &[u8], src_stride: usize, src_w: usize, src_h: usize) -> TaoResult<()> {
        if src_w == 0 || src_h == 0 || src.len() < (src_h - 1) * src_stride + src_w {
            return Err(TaoError::InvalidArgument(format!(
                "平面数据不足: 需要 {src_w}x{src_h}, stride={src_stride}, 实际 {} 字节",
                src.len()
            )));
        }
        for y in 0..self.height {
            let sy = y.min(src_h - 1);
            let row = &src[sy * src_stride..sy * src_stride + src_w];
            let off = y * self.stride;
            self.data[off..off + src_w.min(self.width)].copy_from_slice(&row[..src_w.min(self.width)]);
            let edge = row[src_w - 1];
            for x in src_w..self.width {
                self.data[off + x] = edge;
            }
        }
        Ok(())
    }

    /// 裁剪输出为紧凑数据
    fn crop(&self, w: usize, h: usize) -> Vec<u8> {
        let mut out = Vec::with_capacity(w * h);
        for y in 0..h {
            out.extend_from_slice(&self.data[y * self.stride..y * self.stride + w]);
        }
        out
    }
}

/// 一个宏块的采样 (16x16 亮度 + 两个 8x8 色度)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MbSamples {
    pub luma: [u8; 256],
    pub cb: [u8; 64],
    pub cr: [u8; 64],
}

impl Default for MbSamples {
    fn default() -> Self {
        Self::filled(128)
    }
}

impl MbSamples {
    pub fn filled(v: u8) -> Self {
        Self {
            luma: [v; 256],
            cb: [v; 64],
            cr: [v; 64],
        }
    }

    /// 色度平面 (0 = Cb, 1 = Cr)
    pub fn chroma(&self, plane: usize) -> &[u8; 64] {
        if plane == 0 { &self.cb } else { &self.cr }
    }

    pub fn chroma_mut(&mut self, plane: usize) -> &mut [u8; 64] {
        if plane == 0 { &mut self.cb } else { &mut self.cr }
    }

    /// 亮度平方误差和
    pub fn luma_ssd(&self, other: &Self) -> u64 {
        ssd(&self.luma, &other.luma)
    }

    /// 亮度 + 色度平方误差和
    pub fn ssd(&self, other: &Self) -> u64 {
        ssd(&self.luma, &other.luma) + ssd(&self.cb, &other.cb) + ssd(&self.cr, &other.cr)
    }
}

/// 两段采样的平方误差和
pub fn ssd(a: &[u8], b: &[u8]) -> u64 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = i64::from(x) - i64::from(y);
            (d * d) as u64
        })
        .sum()
}

/// 宏块对齐的 YUV 4:2:0 图像
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YuvPicture {
    width: u32,
    height: u32,
    mb_width: usize,
    mb_height: usize,
    planes: [Plane; 3],
}

impl YuvPicture {
    /// 创建指定显示尺寸的图像, 采样初始化为 `value`
    ///
    /// 宽高必须为非零偶数.
    pub fn filled(width: u32, height: u32, value: u8) -> TaoResult<Self> {
        if width == 0 || height == 0 || width % 2 != 0 || height % 2 != 0 {
            return Err(TaoError::InvalidArgument(format!(
                "图像尺寸必须为非零偶数: {width}x{height}"
            )));
        }
        let mb_width = (width as usize).div_ceil(16);
        let mb_height = (height as usize).div_ceil(16);
        let (lw, lh) = (mb_width * 16, mb_height * 16);
        Ok(Self {
            width,
            height,
            mb_width,
            mb_height,
            planes: [
                Plane::filled(lw, lh, value),
                Plane::filled(lw / 2, lh / 2, value),
                Plane::filled(lw / 2, lh / 2, value),
            ],
        })
    }

    /// 创建全零图像
    pub fn new(width: u32, height: u32) -> TaoResult<Self> {
        Self::filled(width, height, 0)
    }

    /// 从三个平面的行数据构造
    pub fn from_planes(
        width: u32,
        height: u32,
        planes: [(&[u8], usize); 3],
    ) -> TaoResult<Self> {
        let mut pic = Self::new(width, height)?;
        let (w, h) = (width as usize, height as usize);
        for (i, (data, stride)) in planes.iter().enumerate() {
            let (pw, ph) = if i == 0 { (w, h) } else { (w / 2, h / 2) };
            pic.planes[i].fill_from(data, *stride, pw, ph)?;
        }
        Ok(pic)
    }

    /// 从 YUV420P 视频帧构造
    pub fn from_video_frame(frame: &VideoFrame) -> TaoResult<Self> {
        if frame.pixel_format != PixelFormat::Yuv420p {
            return Err(TaoError::Unsupported(format!(
                "仅支持 yuv420p 输入, 实际为 {}",
                frame.pixel_format
            )));
        }
        if frame.data.len() < 3 || frame.linesize.len() < 3 {
            return Err(TaoError::InvalidArgument("YUV420P 帧缺少平面".into()));
        }
        Self::from_planes(
            frame.width,
            frame.height,
            [
                (&frame.data[0], frame.linesize[0]),
                (&frame.data[1], frame.linesize[1]),
                (&frame.data[2], frame.linesize[2]),
            ],
        )
    }

    /// 按显示尺寸裁剪为 YUV420P 视频帧
    pub fn to_video_frame(&self) -> VideoFrame {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut frame = VideoFrame::new(self.width, self.height, PixelFormat::Yuv420p);
        frame.data = vec![
            self.planes[0].crop(w, h),
            self.planes[1].crop(w / 2, h / 2),
            self.planes[2].crop(w / 2, h / 2),
        ];
        frame.linesize = vec![w, w / 2, w / 2];
        frame
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn mb_width(&self) -> usize {
        self.mb_width
    }

    pub fn mb_height(&self) -> usize {
        self.mb_height
    }

    pub fn mb_count(&self) -> usize {
        self.mb_width * self.mb_height
    }

    /// 0 = Y, 1 = Cb, 2 = Cr
    pub fn plane(&self, idx: usize) -> &Plane {
        &self.planes[idx]
    }

    pub fn plane_mut(&mut self, idx: usize) -> &mut Plane {
        &mut self.planes[idx]
    }

    /// 读取一个宏块的采样
    pub fn load_mb(&self, mb_x: usize, mb_y: usize) -> MbSamples {
        let mut mb = MbSamples::filled(0);
        self.planes[0].load_block(mb_x * 16, mb_y * 16, 16, &mut mb.luma);
        self.planes[1].load_block(mb_x * 8, mb_y * 8, 8, &mut mb.cb);
        self.planes[2].load_block(mb_x * 8, mb_y * 8, 8, &mut mb.cr);
        mb
    }

    /// 写回一个宏块的采样
    pub fn store_mb(&mut self, mb_x: usize, mb_y: usize, mb: &MbSamples) {
        self.planes[0].store_block(mb_x * 16, mb_y * 16, 16, &mb.luma);
        self.planes[1].store_block(mb_x * 8, mb_y * 8, 8, &mb.cb);
        self.planes[2].store_block(mb_x * 8, mb_y * 8, 8, &mb.cr);
    }

    /// 显示区域内的亮度峰值信噪比 (dB)
    pub fn luma_psnr(&self, other: &Self) -> f64 {
        let (w, h) = (self.width as usize, self.height as usize);
        let a = self.planes[0].crop(w, h);
        let b = other.planes[0].crop(w, h);
        let mse = ssd(&a, &b) as f64 / (w * h) as f64;
        if mse == 0.0 {
            f64::INFINITY
        } else {
            10.0 * (255.0 * 255.0 / mse).log10()
        }
    }
}
