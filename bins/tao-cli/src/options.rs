//! 命令行参数值解析.

/// 解析 `key=value` 形式的编解码参数, 键名可以带空格 (如 `loop filter=0`)
pub fn parse_option(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("参数需要 key=value 形式: \"{s}\""))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("参数缺少键名: \"{s}\""));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// 解析分辨率 (如 "176x144")
pub fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("分辨率需要 WxH 形式: \"{s}\""))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("宽度非法: \"{w}\""))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("高度非法: \"{h}\""))?;
    if w == 0 || h == 0 || w % 2 != 0 || h % 2 != 0 {
        return Err(format!("分辨率必须为非零偶数: {w}x{h}"));
    }
    Ok((w, h))
}

/// 解析帧率 (如 "25" 或 "30000/1001")
pub fn parse_rate(s: &str) -> Result<(u32, u32), String> {
    let (num, den) = match s.split_once('/') {
        Some((n, d)) => (n.trim(), d.trim()),
        None => (s.trim(), "1"),
    };
    let num: u32 = num.parse().map_err(|_| format!("帧率非法: \"{s}\""))?;
    let den: u32 = den.parse().map_err(|_| format!("帧率非法: \"{s}\""))?;
    if num == 0 || den == 0 {
        return Err(format!("帧率不能为 0: \"{s}\""));
    }
    Ok((num, den))
}
