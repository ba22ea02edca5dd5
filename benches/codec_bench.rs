//! tao-avc 性能基准测试.
//!
//! 覆盖 CIF 尺寸下的 I/P 图像编码 (含 QP 搜索与运动估计) 以及解码.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tao_avc::codec::h264::{H264Config, PictureDecoder, PictureEncoder, YuvPicture};

const W: u32 = 352;
const H: u32 = 288;

/// 平移纹理, `t` 为帧序号
fn make_picture(t: usize) -> YuvPicture {
    let mut pic = YuvPicture::new(W, H).unwrap();
    for plane in 0..3 {
        let p = pic.plane_mut(plane);
        for y in 0..p.height() {
            for x in 0..p.width() {
                let gx = (x + t * 3) as f64;
                let v = 128.0 + 60.0 * (gx * 0.11).sin() + 40.0 * ((y as f64) * 0.07).cos();
                p.set(x, y, v as u8);
            }
        }
    }
    pic
}

fn config() -> H264Config {
    H264Config {
        width: W,
        height: H,
        ..H264Config::default()
    }
}

fn bench_encode_i(c: &mut Criterion) {
    let picture = make_picture(0);
    c.bench_function("h264_encode_i_cif_64kbit", |b| {
        b.iter(|| {
            let mut encoder = PictureEncoder::new(config()).unwrap();
            black_box(encoder.encode(&picture, 64_000).unwrap());
        });
    });
}

fn bench_encode_p(c: &mut Criterion) {
    let first = make_picture(0);
    let second = make_picture(1);
    c.bench_function("h264_encode_p_cif_32kbit", |b| {
        b.iter_batched(
            || {
                let mut encoder = PictureEncoder::new(config()).unwrap();
                encoder.encode(&first, 0).unwrap();
                encoder
            },
            |mut encoder| black_box(encoder.encode(&second, 32_000).unwrap()),
            criterion::BatchSize::SmallInput,
        );
    });
}

fn bench_decode_ip(c: &mut Criterion) {
    let mut encoder = PictureEncoder::new(config()).unwrap();
    let packets: Vec<Vec<u8>> = (0..4)
        .map(|t| encoder.encode(&make_picture(t), 48_000).unwrap().data)
        .collect();
    c.bench_function("h264_decode_ippp_cif", |b| {
        b.iter(|| {
            let mut decoder = PictureDecoder::new();
            for pkt in &packets {
                black_box(decoder.decode(pkt).unwrap());
            }
        });
    });
}

criterion_group!(benches, bench_encode_i, bench_encode_p, bench_decode_ip);
criterion_main!(benches);
