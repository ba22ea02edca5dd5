//! 按比特预算逐宏块选择 QP 的率失真搜索.
//!
//! 目标: 总码率不超过 `allowed`, 同时使各宏块失真的**最大值**最小.
//!
//! 1. 全部宏块以 QP 51 探测一遍, 得到可行下界 `(Rl, Dl)`; 若仍超预算则转入截断.
//!    再二分出预算内最小的统一 QP, 其最大失真更小时用它收紧下界.
//! 2. 以幂律 `D = a * R^-b` 预测目标码率下的失真上限, 预测落在 `(Du, Dl)`
//!    之外时改用线性插值, 再不行就取中点; 结果向可行一侧偏移.
//!    预测值与已试过的上限重复时改取中点.
//! 3. 每个宏块从当前 QP 只向下走, 直到失真不超过上限. 大步长越过的 QP
//!    会回头补试, 取满足上限的最高 QP.
//!    上游宏块变化后, 下游缓存的码率全部失效 (nC、QP 差值、跳过游程都依赖前面的宏块).
//! 4. 可行则以实际最大失真更新下界, 否则以本轮上限更新上界并把工作向量退回
//!    最近一次可行的向量. 括号每轮严格收缩.
//!
//! 宏块的实际编码由 [`MacroblockProbe`] 完成, 本模块只负责搜索.

use log::{debug, trace, warn};
use tao_core::{TaoError, TaoResult};

use super::transform::MAX_QP;

/// 宏块的 QP 选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QpChoice {
    /// 按该 QP 正常编码
    Full(u8),
    /// 空编码: I slice 中为 DC 预测零残差, P slice 中为 P_Skip
    Null,
}

impl QpChoice {
    pub fn qp(&self) -> Option<u8> {
        match self {
            Self::Full(qp) => Some(*qp),
            Self::Null => None,
        }
    }
}

/// 一次探测的码率与失真
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RdPoint {
    /// 比特数
    pub rate: usize,
    /// 平方误差和
    pub distortion: u64,
}

/// 宏块探测接口
///
/// `probe` 按光栅顺序调用时, 以当前宏块网格中前面宏块的状态为上下文,
/// 对第 `idx` 个宏块试编码并更新网格与重建图像.
pub trait MacroblockProbe {
    fn mb_count(&self) -> usize;

    fn probe(&mut self, idx: usize, choice: QpChoice) -> TaoResult<RdPoint>;

    /// `[from, N)` 的宏块全部空编码时所需比特的上界 (含 slice 末尾的跳过游程)
    fn null_cost(&self, from: usize) -> usize;
}

/// 搜索参数
#[derive(Debug, Clone, PartialEq)]
pub struct RdoTuning {
    /// 安全余量占预算的比例
    pub margin_ratio: f64,
    /// 安全余量下限 (比特)
    pub margin_min_bits: usize,
    /// 可行一轮之后, 新预测与上一轮上限相差小于该值即停止
    pub distortion_epsilon: u64,
    /// 最大迭代次数
    pub max_iterations: u32,
    /// 可行偏移: 预测值向 `Dl` 移动差距的 1/n
    pub feasible_bias_div: u64,
    /// QP 下降步长表: `(QP 下限, 步长)`, 按 QP 从高到低排列
    pub qp_steps: [(u8, u8); 4],
}

impl Default for RdoTuning {
    fn default() -> Self {
        Self {
            margin_ratio: 0.004,
            margin_min_bits: 16,
            distortion_epsilon: 8,
            max_iterations: 20,
            feasible_bias_div: 16,
            qp_steps: [(40, 1), (30, 2), (20, 3), (0, 4)],
        }
    }
}

impl RdoTuning {
    /// 当前 QP 下一次下降的步长
    pub fn step(&self, qp: u8) -> u8 {
        self.qp_steps
            .iter()
            .find(|(min, _)| qp >= *min)
            .map(|&(_, step)| step.max(1))
            .unwrap_or(1)
    }

    /// 预算的安全余量
    pub fn margin(&self, allowed: usize) -> usize {
        ((allowed as f64 * self.margin_ratio) as usize).max(self.margin_min_bits)
    }
}

/// 搜索结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QpPlan {
    pub choices: Vec<QpChoice>,
    /// 探测得到的总码率 (含 slice 末尾跳过游程)
    pub rate: usize,
    pub max_distortion: u64,
    pub iterations: u32,
    /// 是否进入了截断
    pub truncated: bool,
}

impl QpPlan {
    /// 正常编码宏块的 QP 范围
    pub fn qp_range(&self) -> Option<(u8, u8)> {
        let qps = self.choices.iter().filter_map(QpChoice::qp);
        let min = qps.clone().min()?;
        let max = qps.max()?;
        Some((min, max))
    }

    /// 空编码宏块个数
    pub fn null_count(&self) -> usize {
        self.choices.iter().filter(|c| **c == QpChoice::Null).count()
    }
}

// ============================================================
// 搜索
// ============================================================

/// 码率/失真括号的一端
#[derive(Debug, Clone, Copy)]
struct Bound {
    rate: usize,
    distortion: u64,
}

/// 搜索的工作状态
struct Walk {
    qps: Vec<u8>,
    points: Vec<RdPoint>,
    /// 最早失效的宏块下标, 之前的缓存结果与网格状态都有效
    dirty_from: usize,
}

impl Walk {
    fn new(n: usize) -> Self {
        Self {
            qps: vec![MAX_QP; n],
            points: vec![RdPoint::default(); n],
            dirty_from: 0,
        }
    }

    /// 在 `qps[idx]` 处探测, 比特耗尽时逐级提高 QP
    fn reprobe<P: MacroblockProbe>(&mut self, probe: &mut P, idx: usize) -> TaoResult<()> {
        loop {
            match probe.probe(idx, QpChoice::Full(self.qps[idx])) {
                Ok(p) => {
                    self.points[idx] = p;
                    return Ok(());
                }
                Err(e) if e.is_bit_exhausted() && self.qps[idx] < MAX_QP => self.qps[idx] += 1,
                Err(e) => return Err(e),
            }
        }
    }

    /// 一遍向下行走, 返回 (总码率, 最大失真)
    fn pass<P: MacroblockProbe>(
        &mut self,
        probe: &mut P,
        dmax: u64,
        floor: u8,
        tuning: &RdoTuning,
    ) -> TaoResult<(usize, u64)> {
        let n = self.qps.len();
        for i in 0..n {
            if i >= self.dirty_from {
                self.reprobe(probe, i)?;
            }
            while self.points[i].distortion > dmax && self.qps[i] > floor {
                let qp = self.qps[i];
                let next = qp.saturating_sub(tuning.step(qp)).max(floor);
                self.dirty_from = self.dirty_from.min(i + 1);
                match probe.probe(i, QpChoice::Full(next)) {
                    Ok(p) => {
                        self.qps[i] = next;
                        self.points[i] = p;
                        if p.distortion <= dmax && qp - next > 1 {
                            self.backfill(probe, i, qp, dmax)?;
                        }
                    }
                    Err(e) if e.is_bit_exhausted() => {
                        // 更低的 QP 放不下, 恢复到当前 QP
                        self.reprobe(probe, i)?;
                        break;
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        self.dirty_from = n;

        let rate = self.points.iter().map(|p| p.rate).sum::<usize>() + probe.null_cost(n);
        let dist = self.points.iter().map(|p| p.distortion).max().unwrap_or(0);
        Ok((rate, dist))
    }

    /// 从 `qp` 一步降到 `qps[idx]` 后, 在两者之间找满足上限的最高 QP
    ///
    /// 都不满足时保留 `qps[idx]`, 并重新探测以恢复网格状态.
    fn backfill<P: MacroblockProbe>(
        &mut self,
        probe: &mut P,
        idx: usize,
        qp: u8,
        dmax: u64,
    ) -> TaoResult<()> {
        for q in (self.qps[idx] + 1..qp).rev() {
            match probe.probe(idx, QpChoice::Full(q)) {
                Ok(p) if p.distortion <= dmax => {
                    self.qps[idx] = q;
                    self.points[idx] = p;
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) if e.is_bit_exhausted() => {}
                Err(e) => return Err(e),
            }
        }
        self.reprobe(probe, idx)
    }
}

/// 预测目标码率下的失真上限
fn predict_dmax(lower: Bound, upper: Bound, target: usize, tuning: &RdoTuning) -> u64 {
    let (rl, dl) = (lower.rate as f64, lower.distortion as f64);
    let (ru, du) = (upper.rate as f64, upper.distortion as f64);
    let t = target as f64;
    let inside = |d: f64| d.is_finite() && d > du && d < dl;

    let mut predicted = None;
    if rl > 0.0 && ru > rl && du > 0.0 && dl > du && t > 0.0 {
        let beta = (dl / du).ln() / (ru / rl).ln();
        let d = dl * (rl / t).powf(beta);
        if inside(d) {
            predicted = Some(d);
        }
    }
    if predicted.is_none() && ru > rl {
        let d = dl + (du - dl) * (t - rl) / (ru - rl);
        if inside(d) {
            predicted = Some(d);
        }
    }
    let d = match predicted {
        Some(d) => d.round() as u64,
        None => midpoint(lower, upper),
    };

    let bias = lower.distortion.saturating_sub(d) / tuning.feasible_bias_div.max(1);
    (d + bias).clamp(upper.distortion + 1, lower.distortion - 1)
}

/// 括号中点, 调用方保证 `Dl >= Du + 2`
fn midpoint(lower: Bound, upper: Bound) -> u64 {
    (upper.distortion + lower.distortion + 1) / 2
}

/// 二分出预算内最小的统一 QP
///
/// 码率随 QP 单调时即为所有可行统一 QP 中失真最小的一个.
fn best_uniform<P: MacroblockProbe>(
    probe: &mut P,
    allowed: usize,
    floor: u8,
) -> TaoResult<Option<QpPlan>> {
    let (mut lo, mut hi) = (floor, MAX_QP);
    let mut best = None;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        match fixed_qp(probe, allowed, mid)? {
            Some(plan) => {
                best = Some(plan);
                hi = mid;
            }
            None => lo = mid + 1,
        }
    }
    Ok(best)
}

/// 最小最大失真 QP 搜索
///
/// `floor` 为允许的最小 QP. QP 51 都放不下时自动转入 [`truncate`].
pub fn search<P: MacroblockProbe>(
    probe: &mut P,
    allowed: usize,
    floor: u8,
    tuning: &RdoTuning,
) -> TaoResult<QpPlan> {
    let n = probe.mb_count();
    let floor = floor.min(MAX_QP);
    let margin = tuning.margin(allowed);

    let mut walk = Walk::new(n);
    let (rl, dl) = match walk.pass(probe, u64::MAX, MAX_QP, tuning) {
        Ok(v) => v,
        Err(e) if e.is_bit_exhausted() => (usize::MAX, u64::MAX),
        Err(e) => return Err(e),
    };
    if rl > allowed {
        warn!("QP 51 需要 {rl} 比特, 超出预算 {allowed}, 进入截断");
        return truncate(probe, allowed);
    }

    let mut best = QpPlan {
        choices: vec![QpChoice::Full(MAX_QP); n],
        rate: rl,
        max_distortion: dl,
        iterations: 0,
        truncated: false,
    };
    let mut lower = Bound {
        rate: rl,
        distortion: dl,
    };
    if let Some(uniform) = best_uniform(probe, allowed, floor)? {
        trace!(
            "统一 QP {:?}: R={}, D={}",
            uniform.qp_range(),
            uniform.rate,
            uniform.max_distortion
        );
        if uniform.max_distortion < best.max_distortion {
            lower = Bound {
                rate: uniform.rate,
                distortion: uniform.max_distortion,
            };
            best = uniform;
        }
        walk.dirty_from = 0;
    }
    // 失败后退回的向量: 最近一次可行行走的结果, 其上限不小于之后的任何候选
    let mut restart = walk.qps.clone();
    let mut upper = Bound {
        rate: (n * 3072 * 2).max(allowed + 1),
        distortion: dl.min(1),
    };
    let mut tried: Vec<u64> = Vec::new();
    let mut last_feasible: Option<u64> = None;
    let mut iterations = 0;

    while iterations < tuning.max_iterations {
        let at_floor = best
            .choices
            .iter()
            .all(|c| c.qp().is_some_and(|qp| qp <= floor));
        if at_floor || lower.distortion <= upper.distortion + 1 {
            break;
        }
        if upper.rate.saturating_sub(lower.rate) <= 4 * margin {
            break;
        }

        let target = allowed.saturating_sub(margin).max(lower.rate);
        let mut dmax = predict_dmax(lower, upper, target, tuning);
        if tried.contains(&dmax) {
            dmax = midpoint(lower, upper);
            if tried.contains(&dmax) {
                break;
            }
        }
        if let Some(prev) = last_feasible {
            if prev.abs_diff(dmax) < tuning.distortion_epsilon {
                break;
            }
        }
        tried.push(dmax);
        iterations += 1;

        let (rate, dist) = walk.pass(probe, dmax, floor, tuning)?;
        debug!(
            "QP 搜索第 {iterations} 轮: Dmax={dmax}, R={rate}/{allowed}, D={dist}, 括号 [{}, {}]",
            lower.distortion, upper.distortion
        );
        if rate <= allowed {
            lower = Bound {
                rate,
                distortion: dist.min(dmax),
            };
            restart.clone_from(&walk.qps);
            if dist < best.max_distortion || (dist == best.max_distortion && rate < best.rate) {
                best = QpPlan {
                    choices: walk.qps.iter().copied().map(QpChoice::Full).collect(),
                    rate,
                    max_distortion: dist,
                    iterations: 0,
                    truncated: false,
                };
            }
            last_feasible = Some(dmax);
        } else {
            // 上限 dmax 不可行, 目标一定在 dmax 之上
            upper = Bound {
                rate,
                distortion: dmax,
            };
            walk.qps.clone_from(&restart);
            walk.dirty_from = 0;
            last_feasible = None;
        }
    }

    trace!(
        "QP 搜索结束: {iterations} 轮, R={}, D={}",
        best.rate, best.max_distortion
    );
    best.iterations = iterations;
    Ok(best)
}

/// 所有宏块使用同一 QP; 超出预算时返回 `None`
pub fn fixed_qp<P: MacroblockProbe>(
    probe: &mut P,
    allowed: usize,
    qp: u8,
) -> TaoResult<Option<QpPlan>> {
    let n = probe.mb_count();
    let qp = qp.min(MAX_QP);
    let mut rate = 0;
    let mut max_distortion = 0;
    for i in 0..n {
        match probe.probe(i, QpChoice::Full(qp)) {
            Ok(p) => {
                rate += p.rate;
                max_distortion = max_distortion.max(p.distortion);
            }
            Err(e) if e.is_bit_exhausted() => return Ok(None),
            Err(e) => return Err(e),
        }
    }
    rate += probe.null_cost(n);
    if rate > allowed {
        debug!("固定 QP {qp} 需要 {rate} 比特, 超出预算 {allowed}");
        return Ok(None);
    }
    Ok(Some(QpPlan {
        choices: vec![QpChoice::Full(qp); n],
        rate,
        max_distortion,
        iterations: 0,
        truncated: false,
    }))
}

/// 截断: 尽量多的宏块保持 QP 51, 从第一个放不下的宏块起全部空编码
///
/// 全部空编码都放不下时返回 `BudgetUnsatisfiable`.
pub fn truncate<P: MacroblockProbe>(probe: &mut P, allowed: usize) -> TaoResult<QpPlan> {
    let n = probe.mb_count();

    let mut required = 0;
    for i in 0..n {
        required += probe.probe(i, QpChoice::Null)?.rate;
    }
    required += probe.null_cost(n);
    if required > allowed {
        return Err(TaoError::BudgetUnsatisfiable {
            required,
            available: allowed,
        });
    }

    let mut choices = vec![QpChoice::Null; n];
    let mut used = 0;
    let mut max_distortion = 0;
    let mut cut = n;
    for i in 0..n {
        let fits = match probe.probe(i, QpChoice::Full(MAX_QP)) {
            Ok(p) if used + p.rate + probe.null_cost(i + 1) <= allowed => {
                used += p.rate;
                max_distortion = max_distortion.max(p.distortion);
                true
            }
            Ok(_) => false,
            Err(e) if e.is_bit_exhausted() => false,
            Err(e) => return Err(e),
        };
        if !fits {
            cut = i;
            break;
        }
        choices[i] = QpChoice::Full(MAX_QP);
    }
    for i in cut..n {
        let p = probe.probe(i, QpChoice::Null)?;
        used += p.rate;
        max_distortion = max_distortion.max(p.distortion);
    }
    if cut < n {
        warn!(
            "比特预算不足: 宏块 {cut}..{n} 使用空编码 (预算 {allowed}, 最小需求 {required})"
        );
    }

    Ok(QpPlan {
        choices,
        rate: used + probe.null_cost(n),
        max_distortion,
        iterations: 0,
        truncated: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 合成探测器: 码率随 QP 指数下降, 失真随 QP 指数上升;
    /// 前一个宏块的 QP 差值计入码率, 模拟上下文依赖.
    struct Synthetic {
        complexity: Vec<u64>,
        current: Vec<Option<QpChoice>>,
        null_bits: usize,
        probes: usize,
    }

    impl Synthetic {
        fn new(complexity: Vec<u64>) -> Self {
            let n = complexity.len();
            Self {
                complexity,
                current: vec![None; n],
                null_bits: 3,
                probes: 0,
            }
        }

        fn point(&self, idx: usize, choice: QpChoice) -> RdPoint {
            let c = self.complexity[idx];
            match choice {
                QpChoice::Null => RdPoint {
                    rate: self.null_bits,
                    distortion: c * 4000,
                },
                QpChoice::Full(qp) => {
                    let scale = 2f64.powf(f64::from(51 - qp) / 6.0);
                    let prev = match idx.checked_sub(1).and_then(|p| self.current[p]) {
                        Some(QpChoice::Full(p)) => p,
                        _ => 26,
                    };
                    let delta_bits = if prev == qp { 1 } else { 5 };
                    RdPoint {
                        rate: 8 + delta_bits + (c as f64 * scale) as usize,
                        distortion: (c as f64 * 400.0 / scale) as u64,
                    }
                }
            }
        }

        fn total(&self, choices: &[QpChoice]) -> usize {
            let mut replay = Self::new(self.complexity.clone());
            let mut total = 0;
            for (i, &c) in choices.iter().enumerate() {
                total += replay.probe(i, c).unwrap().rate;
            }
            total
        }
    }

    impl MacroblockProbe for Synthetic {
        fn mb_count(&self) -> usize {
            self.complexity.len()
        }

        fn probe(&mut self, idx: usize, choice: QpChoice) -> TaoResult<RdPoint> {
            self.probes += 1;
            let p = self.point(idx, choice);
            self.current[idx] = Some(choice);
            Ok(p)
        }

        fn null_cost(&self, from: usize) -> usize {
            (self.complexity.len() - from) * self.null_bits
        }
    }

    fn mixed(n: usize) -> Vec<u64> {
        (0..n).map(|i| 20 + (i as u64 * 37) % 90).collect()
    }

    #[test]
    fn test_步长表() {
        let t = RdoTuning::default();
        assert_eq!(t.step(51), 1);
        assert_eq!(t.step(40), 1);
        assert_eq!(t.step(35), 2);
        assert_eq!(t.step(20), 3);
        assert_eq!(t.step(5), 4);
        assert_eq!(t.margin(1000), 16);
        assert_eq!(t.margin(100_000), 400);
    }

    #[test]
    fn test_结果不超预算() {
        let tuning = RdoTuning::default();
        for allowed in [4_000usize, 8_000, 20_000, 60_000] {
            let mut probe = Synthetic::new(mixed(40));
            let plan = search(&mut probe, allowed, 0, &tuning).unwrap();
            assert!(!plan.truncated);
            assert!(plan.rate <= allowed, "rate={} allowed={allowed}", plan.rate);
            assert_eq!(probe.total(&plan.choices), plan.rate);
        }
    }

    #[test]
    fn test_预算越多失真越小() {
        let tuning = RdoTuning::default();
        let mut small = Synthetic::new(mixed(30));
        let mut large = Synthetic::new(mixed(30));
        let a = search(&mut small, 3_000, 0, &tuning).unwrap();
        let b = search(&mut large, 30_000, 0, &tuning).unwrap();
        assert!(b.max_distortion < a.max_distortion);
    }

    #[test]
    fn test_预算充足时停在下限() {
        let mut probe = Synthetic::new(mixed(10));
        let plan = search(&mut probe, usize::MAX / 4, 16, &RdoTuning::default()).unwrap();
        assert!(plan.choices.iter().all(|c| *c == QpChoice::Full(16)));
        assert_eq!(plan.qp_range(), Some((16, 16)));
    }

    #[test]
    fn test_截断后仍满足预算() {
        let mut probe = Synthetic::new(mixed(20));
        // QP 51 的总码率约 1500 比特, 只给一半
        let plan = search(&mut probe, 700, 0, &RdoTuning::default()).unwrap();
        assert!(plan.truncated);
        assert!(plan.null_count() > 0);
        assert!(plan.rate <= 700);
        assert_eq!(plan.choices[0], QpChoice::Full(51));
        // 空编码只出现在尾部
        let first_null = plan.choices.iter().position(|c| *c == QpChoice::Null).unwrap();
        assert!(plan.choices[first_null..].iter().all(|c| *c == QpChoice::Null));
    }

    #[test]
    fn test_预算低于空编码报错() {
        let mut probe = Synthetic::new(mixed(20));
        let err = search(&mut probe, 50, 0, &RdoTuning::default()).unwrap_err();
        match err {
            TaoError::BudgetUnsatisfiable {
                required,
                available,
            } => {
                assert_eq!(required, 60);
                assert_eq!(available, 50);
            }
            other => panic!("意外错误: {other:?}"),
        }
    }

    #[test]
    fn test_固定qp() {
        let mut probe = Synthetic::new(vec![30; 4]);
        let plan = fixed_qp(&mut probe, 100_000, 20).unwrap().unwrap();
        assert_eq!(plan.choices, vec![QpChoice::Full(20); 4]);
        let mut probe = Synthetic::new(vec![30; 4]);
        assert!(fixed_qp(&mut probe, 10, 20).unwrap().is_none());
    }

    #[test]
    fn test_大步长越过的qp会补试() {
        let tuning = RdoTuning::default();
        let mut probe = Synthetic::new(vec![100]);
        // 从 51 起的步长序列为 ..., 40, 39, 37, 35, 33; 上限取 QP 34 的失真
        let dmax = probe.point(0, QpChoice::Full(34)).distortion;
        assert!(probe.point(0, QpChoice::Full(35)).distortion > dmax);
        let mut walk = Walk::new(1);
        let (_, dist) = walk.pass(&mut probe, dmax, 0, &tuning).unwrap();
        assert_eq!(walk.qps, vec![34]);
        assert_eq!(dist, dmax);
        // 网格状态与选中的 QP 一致
        assert_eq!(probe.current[0], Some(QpChoice::Full(34)));
    }

    #[test]
    fn test_不劣于任何可行的统一qp() {
        let tuning = RdoTuning::default();
        for allowed in [4_000usize, 8_000, 20_000] {
            let mut probe = Synthetic::new(mixed(40));
            let plan = search(&mut probe, allowed, 0, &tuning).unwrap();
            assert!(plan.rate <= allowed);
            for qp in 0..=MAX_QP {
                let mut probe = Synthetic::new(mixed(40));
                if let Some(fixed) = fixed_qp(&mut probe, allowed, qp).unwrap() {
                    assert!(
                        plan.max_distortion <= fixed.max_distortion,
                        "预算 {allowed}: 搜索 D={} 劣于统一 QP {qp} 的 D={}",
                        plan.max_distortion,
                        fixed.max_distortion
                    );
                }
            }
        }
    }

    #[test]
    fn test_关闭提前停止后迭代更多不会变差() {
        let mut tuning = RdoTuning::default();
        tuning.distortion_epsilon = 0;
        let mut probe = Synthetic::new(mixed(30));
        let plan = search(&mut probe, 5_000, 0, &tuning).unwrap();
        tuning.max_iterations = 60;
        let mut probe = Synthetic::new(mixed(30));
        let longer = search(&mut probe, 5_000, 0, &tuning).unwrap();
        assert!(longer.iterations >= plan.iterations);
        assert!(longer.max_distortion <= plan.max_distortion);
        assert!(longer.rate <= 5_000);
    }

    #[test]
    fn test_空图像() {
        let mut probe = Synthetic::new(Vec::new());
        let plan = search(&mut probe, 100, 10, &RdoTuning::default()).unwrap();
        assert!(plan.choices.is_empty());
    }
}
