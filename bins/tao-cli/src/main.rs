//! tao-avc - H.264 baseline 编解码命令行工具
//!
//! - `encode`: 原始 YUV420P/RGB24 帧序列 → Annex B 码流
//! - `decode`: Annex B 码流 → 原始帧序列
//! - `info`: 列出码流中的 NAL 单元与参数集

mod commands;
mod logging;
mod options;

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use tao_core::PixelFormat;

use options::{parse_option, parse_rate, parse_size};

#[derive(Parser, Debug)]
#[command(name = "tao-avc", version, about = "H.264 baseline 编解码工具")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// 日志级别 (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 编码原始帧序列
    Encode(EncodeArgs),
    /// 解码 Annex B 码流
    Decode(DecodeArgs),
    /// 显示码流信息
    Info(InfoArgs),
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// 输入原始帧文件
    input: PathBuf,

    /// 输出 Annex B 文件
    output: PathBuf,

    /// 图像尺寸 (如 "176x144")
    #[arg(short = 's', long, value_parser = parse_size)]
    size: (u32, u32),

    /// 输入像素格式 (yuv420p 或 rgb24)
    #[arg(long = "pix-fmt", default_value = "yuv420p")]
    pix_fmt: PixelFormat,

    /// 帧率 (如 "25" 或 "30000/1001")
    #[arg(short = 'r', long, default_value = "25", value_parser = parse_rate)]
    rate: (u32, u32),

    /// 码率 (bit/s), 0 表示不限; `-o "bit budget=N"` 优先
    #[arg(short = 'b', long = "bitrate", default_value_t = 0)]
    bit_rate: u64,

    /// 最多编码的帧数
    #[arg(short = 'n', long)]
    frames: Option<usize>,

    /// 编码参数 (可重复, 如 -o quality=24 -o "intra period=10")
    #[arg(short = 'o', long = "option", value_parser = parse_option)]
    options: Vec<(String, String)>,

    /// 输出 JSON 统计报告
    #[arg(long)]
    stats: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// 输入 Annex B 文件
    input: PathBuf,

    /// 输出原始帧文件
    output: PathBuf,

    /// 解码参数 (如 -o outcolour=rgb24)
    #[arg(short = 'o', long = "option", value_parser = parse_option)]
    options: Vec<(String, String)>,

    /// 输出 JSON 统计报告
    #[arg(long)]
    stats: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// 输入 Annex B 文件
    input: PathBuf,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init("tao-avc", cli.verbose) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    let result = match &cli.command {
        Command::Encode(args) => commands::encode(args),
        Command::Decode(args) => commands::decode(args),
        Command::Info(args) => commands::info(args),
    };
    if let Err(e) = result {
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}
