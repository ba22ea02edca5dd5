//! RGB24 ↔ YUV420P 颜色空间转换.
//!
//! 编码器按 `incolour` 接受 RGB24 输入, 解码器按 `outcolour` 输出 RGB24,
//! 转换都经由 [`ColourConverter`] 完成.

use tao_core::{PixelFormat, TaoError, TaoResult};

use crate::frame::VideoFrame;

/// 颜色空间转换
pub trait ColourConverter: Send + Sync {
    /// RGB24 帧转换为 YUV420P 帧
    fn rgb_to_yuv420(&self, frame: &VideoFrame) -> TaoResult<VideoFrame>;

    /// YUV420P 帧转换为 RGB24 帧
    fn yuv420_to_rgb(&self, frame: &VideoFrame) -> TaoResult<VideoFrame>;
}

// ============================================================
// BT.601 颜色空间转换常量 (定点数, 缩放 256 倍)
// ============================================================

const Y_R: i32 = 77;
const Y_G: i32 = 150;
const Y_B: i32 = 29;

const CB_R: i32 = -43;
const CB_G: i32 = -85;
const CB_B: i32 = 128;

const CR_R: i32 = 128;
const CR_G: i32 = -107;
const CR_B: i32 = -21;

/// BT.601 有限精度定点转换
#[derive(Debug, Clone, Copy, Default)]
pub struct Bt601Converter;

fn expect_format(frame: &VideoFrame, format: PixelFormat) -> TaoResult<()> {
    if frame.pixel_format != format {
        return Err(TaoError::InvalidArgument(format!(
            "颜色转换需要 {format:?} 输入, 实际为 {:?}",
            frame.pixel_format
        )));
    }
    let planes = format.plane_count() as usize;
    if frame.data.len() < planes || frame.linesize.len() < planes {
        return Err(TaoError::InvalidArgument("视频帧平面数量不足".into()));
    }
    for plane in 0..planes {
        let rows = format.plane_height(plane, frame.height).unwrap_or(0);
        let row_bytes = format.plane_linesize(plane, frame.width).unwrap_or(0);
        let stride = frame.linesize[plane];
        if stride < row_bytes || (rows > 0 && frame.data[plane].len() < (rows - 1) * stride + row_bytes) {
            return Err(TaoError::InvalidArgument(format!("视频帧平面 {plane} 数据不足")));
        }
    }
    Ok(())
}

impl ColourConverter for Bt601Converter {
    fn rgb_to_yuv420(&self, frame: &VideoFrame) -> TaoResult<VideoFrame> {
        expect_format(frame, PixelFormat::Rgb24)?;
        let (w, h) = (frame.width as usize, frame.height as usize);
        let rgb = &frame.data[0];
        let stride = frame.linesize[0];

        let mut out = VideoFrame::new(frame.width, frame.height, PixelFormat::Yuv420p);
        out.pts = frame.pts;
        let (cw, ch) = (out.linesize[1], out.data[1].len() / out.linesize[1].max(1));

        for row in 0..h {
            for col in 0..w {
                let off = row * stride + col * 3;
                let (r, g, b) = (
                    i32::from(rgb[off]),
                    i32::from(rgb[off + 1]),
                    i32::from(rgb[off + 2]),
                );
                out.data[0][row * w + col] = ((Y_R * r + Y_G * g + Y_B * b + 128) >> 8).clamp(0, 255) as u8;
            }
        }

        for cy in 0..ch {
            for cx in 0..cw {
                let (mut sr, mut sg, mut sb, mut n) = (0i32, 0i32, 0i32, 0i32);
                for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let (x, y) = (cx * 2 + dx, cy * 2 + dy);
                    if x < w && y < h {
                        let off = y * stride + x * 3;
                        sr += i32::from(rgb[off]);
                        sg += i32::from(rgb[off + 1]);
                        sb += i32::from(rgb[off + 2]);
                        n += 1;
                    }
                }
                let (r, g, b) = (sr / n, sg / n, sb / n);
                let cb = ((CB_R * r + CB_G * g + CB_B * b + 128) >> 8) + 128;
                let cr = ((CR_R * r + CR_G * g + CR_B * b + 128) >> 8) + 128;
                out.data[1][cy * cw + cx] = cb.clamp(0, 255) as u8;
                out.data[2][cy * cw + cx] = cr.clamp(0, 255) as u8;
            }
        }
        Ok(out)
    }

    fn yuv420_to_rgb(&self, frame: &VideoFrame) -> TaoResult<VideoFrame> {
        expect_format(frame, PixelFormat::Yuv420p)?;
        let (w, h) = (frame.width as usize, frame.height as usize);
        let mut out = VideoFrame::new(frame.width, frame.height, PixelFormat::Rgb24);
        out.pts = frame.pts;
        out.is_keyframe = frame.is_keyframe;
        out.picture_type = frame.picture_type;
        let dst_stride = out.linesize[0];

        for row in 0..h {
            for col in 0..w {
                let y = i32::from(frame.data[0][row * frame.linesize[0] + col]);
                let u = i32::from(frame.data[1][(row / 2) * frame.linesize[1] + col / 2]) - 128;
                let v = i32::from(frame.data[2][(row / 2) * frame.linesize[2] + col / 2]) - 128;

                let r = (y + ((v * 359 + 128) >> 8)).clamp(0, 255);
                let g = (y - ((u * 88 + v * 183 + 128) >> 8)).clamp(0, 255);
                let b = (y + ((u * 454 + 128) >> 8)).clamp(0, 255);

                let off = row * dst_stride + col * 3;
                out.data[0][off] = r as u8;
                out.data[0][off + 1] = g as u8;
                out.data[0][off + 2] = b as u8;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_rgb(w: u32, h: u32, rgb: [u8; 3]) -> VideoFrame {
        let mut frame = VideoFrame::new(w, h, PixelFormat::Rgb24);
        for px in frame.data[0].chunks_exact_mut(3) {
            px.copy_from_slice(&rgb);
        }
        frame
    }

    #[test]
    fn test_纯红转换() {
        let yuv = Bt601Converter.rgb_to_yuv420(&solid_rgb(4, 4, [255, 0, 0])).unwrap();
        assert_eq!(yuv.pixel_format, PixelFormat::Yuv420p);
        assert!((i32::from(yuv.data[0][0]) - 76).abs() <= 2, "Y={}", yuv.data[0][0]);
        assert!((i32::from(yuv.data[1][0]) - 84).abs() <= 2, "Cb={}", yuv.data[1][0]);
        assert!((i32::from(yuv.data[2][0]) - 255).abs() <= 2, "Cr={}", yuv.data[2][0]);
    }

    #[test]
    fn test_灰色往返() {
        let rgb = solid_rgb(6, 4, [100, 100, 100]);
        let yuv = Bt601Converter.rgb_to_yuv420(&rgb).unwrap();
        let back = Bt601Converter.yuv420_to_rgb(&yuv).unwrap();
        for (a, b) in rgb.data[0].iter().zip(&back.data[0]) {
            assert!(a.abs_diff(*b) <= 2, "{a} vs {b}");
        }
    }

    #[test]
    fn test_格式不符报错() {
        let yuv = VideoFrame::new(4, 4, PixelFormat::Yuv420p);
        assert!(Bt601Converter.rgb_to_yuv420(&yuv).is_err());
        let rgb = VideoFrame::new(4, 4, PixelFormat::Rgb24);
        assert!(Bt601Converter.yuv420_to_rgb(&rgb).is_err());
    }
}
