/// 三边定位求解器
///
/// 固定使用 3 个信标：用 (1,2)、(1,3) 两组圆方程相减消去二次项，
/// 得到 2x2 线性方程组后按克莱姆法则求解。
/// 坐标与距离必须使用同一单位（米），这里不做单位换算。

use tracing::{debug, warn};

use crate::algorithms::{AnchorPoint, AnchorRegistry, RangingTriplet, ResolvedPosition};

/// 相对容差：|M| 不超过该值乘以两条基线长度之积时视为三点共线
pub const DEGENERATE_EPSILON: f64 = 1e-12;

/// 三边定位求解器
pub struct TrilaterationSolver;

impl TrilaterationSolver {
    /// 由 3 组（信标, 距离）求解位置
    ///
    /// 三点共线时返回 (0, 0) 且 `valid = false`；
    /// 负坐标视为数值误差，截断为 0。
    pub fn solve(measurements: &[(AnchorPoint, f64); 3]) -> ResolvedPosition {
        let (a1, r1) = measurements[0];
        let (a2, r2) = measurements[1];
        let (a3, r3) = measurements[2];
        let (x1, y1) = a1.coordinates();
        let (x2, y2) = a2.coordinates();
        let (x3, y3) = a3.coordinates();

        let a = x1 - x2;
        let b = y1 - y2;
        let d = x1 - x3;
        let e = y1 - y3;

        let t = r1 * r1 - x1 * x1 - y1 * y1;
        let c = (r2 * r2 - x2 * x2 - y2 * y2) - t;
        let f = (r3 * r3 - x3 * x3 - y3 * y3) - t;

        let mx = (c * e - b * f) / 2.0;
        let my = (a * f - d * c) / 2.0;
        let m = a * e - d * b;

        // M 是两条基线向量的叉积，容差随信标间距缩放
        let scale = a.hypot(b) * d.hypot(e);
        if m == 0.0 || m.abs() <= DEGENERATE_EPSILON * scale {
            warn!(
                anchors = ?[a1.id, a2.id, a3.id],
                "信标共线，无法定位，返回 (0, 0)"
            );
            return ResolvedPosition::degenerate();
        }

        let x = (mx / m).max(0.0);
        let y = (my / m).max(0.0);
        debug!(x, y, "三边定位结果");

        ResolvedPosition::new(x, y, true)
    }

    /// 由一帧中的 3 个三元组求解，信标坐标从注册表查找
    ///
    /// 任何一个标识未注册时返回 None。
    pub fn solve_triplets(
        registry: &AnchorRegistry,
        triplets: &[RangingTriplet; 3],
    ) -> Option<ResolvedPosition> {
        let mut measurements = [(AnchorPoint::new(0, 0.0, 0.0), 0.0); 3];
        for (slot, triplet) in measurements.iter_mut().zip(triplets) {
            let anchor = registry.get(triplet.anchor_id)?;
            *slot = (*anchor, f64::from(triplet.distance));
        }
        Some(Self::solve(&measurements))
    }

    /// 平均残差：求解位置到各信标距离与测量距离之差的均方根
    pub fn residual(measurements: &[(AnchorPoint, f64); 3], x: f64, y: f64) -> f64 {
        let sum: f64 = measurements
            .iter()
            .map(|(anchor, distance)| {
                let error = anchor.distance_to(x, y) - distance;
                error * error
            })
            .sum();
        (sum / measurements.len() as f64).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact_measurements(anchors: [(f64, f64); 3], px: f64, py: f64) -> [(AnchorPoint, f64); 3] {
        std::array::from_fn(|i| {
            let anchor = AnchorPoint::new(0xF1 + i as u8, anchors[i].0, anchors[i].1);
            let distance = anchor.distance_to(px, py);
            (anchor, distance)
        })
    }

    fn assert_close(actual: f64, expected: f64) {
        let tolerance = 1e-9 * expected.abs().max(1.0);
        assert!(
            (actual - expected).abs() <= tolerance,
            "expected {}, got {}",
            expected,
            actual
        );
    }

    #[test]
    fn test_exact_distances_recover_point() {
        let cases = [
            ([(0.0, 0.0), (6.0, 0.0), (5.0, 4.0)], (3.0, 2.0)),
            ([(0.0, 0.0), (6.0, 0.0), (5.0, 4.0)], (0.5, 3.7)),
            ([(13.8, 0.0), (17.9, 4.3), (5.0, 10.8)], (12.0, 6.5)),
            ([(5.0, 19.0), (0.6, 14.5), (11.0, 19.8)], (4.2, 17.25)),
            ([(0.0, 21.9), (5.0, 26.9), (10.6, 32.6)], (6.1, 25.0)),
        ];

        for (anchors, (px, py)) in cases {
            let measurements = exact_measurements(anchors, px, py);
            let position = TrilaterationSolver::solve(&measurements);
            assert!(position.valid);
            assert_close(position.x, px);
            assert_close(position.y, py);
            assert!(TrilaterationSolver::residual(&measurements, position.x, position.y) < 1e-9);
        }
    }

    #[test]
    fn test_colinear_anchors_return_origin() {
        let anchors = [
            AnchorPoint::new(0xF1, 0.0, 0.0),
            AnchorPoint::new(0xF2, 5.0, 0.0),
            AnchorPoint::new(0xF3, 10.0, 0.0),
        ];
        for distances in [[1.0, 2.0, 3.0], [7.5, 0.0, 12.25]] {
            let measurements = [
                (anchors[0], distances[0]),
                (anchors[1], distances[1]),
                (anchors[2], distances[2]),
            ];
            let position = TrilaterationSolver::solve(&measurements);
            assert_eq!((position.x, position.y), (0.0, 0.0));
            assert!(!position.valid);
        }
    }

    #[test]
    fn test_small_baseline_is_not_colinear() {
        // 信标相距 1 微米，|M| = 1e-12 但几何并不退化
        let measurements = exact_measurements([(0.0, 0.0), (1e-6, 0.0), (0.0, 1e-6)], 3e-7, 2e-7);
        let position = TrilaterationSolver::solve(&measurements);
        assert!(position.valid);
        assert!((position.x - 3e-7).abs() < 1e-12);
        assert!((position.y - 2e-7).abs() < 1e-12);
    }

    #[test]
    fn test_nearly_colinear_large_baseline() {
        // 第三个信标偏离直线 1e-14 米，相对叉积远小于容差
        let anchors = [(0.0, 0.0), (10.0, 0.0), (20.0, 1e-14)];
        let measurements = exact_measurements(anchors, 5.0, 5.0);
        let position = TrilaterationSolver::solve(&measurements);
        assert!(!position.valid);
        assert_eq!(position.xy(), (0.0, 0.0));
    }

    #[test]
    fn test_negative_result_floored() {
        // 真实点在 (-2, 1)，x 截断为 0
        let measurements = exact_measurements([(0.0, 0.0), (6.0, 0.0), (5.0, 4.0)], -2.0, 1.0);
        let position = TrilaterationSolver::solve(&measurements);
        assert_eq!(position.x, 0.0);
        assert_close(position.y, 1.0);
        assert!(position.valid);
    }

    #[test]
    fn test_solve_is_deterministic() {
        let measurements = exact_measurements([(0.0, 0.0), (6.0, 0.0), (5.0, 4.0)], 1.25, 2.5);
        let first = TrilaterationSolver::solve(&measurements);
        let second = TrilaterationSolver::solve(&measurements);
        assert_eq!(first, second);
    }

    #[test]
    fn test_solve_triplets_uses_registry() {
        let registry = AnchorRegistry::default();
        let triplets = [
            RangingTriplet::new(0xF1, -60, 13f32.sqrt()),
            RangingTriplet::new(0xF2, -61, 13f32.sqrt()),
            RangingTriplet::new(0xF3, -55, 8f32.sqrt()),
        ];
        let position = TrilaterationSolver::solve_triplets(&registry, &triplets).unwrap();
        assert!((position.x - 3.0).abs() < 1e-5);
        assert!((position.y - 2.0).abs() < 1e-5);

        let unknown = [
            RangingTriplet::new(0xF1, -60, 1.0),
            RangingTriplet::new(0x10, -61, 1.0),
            RangingTriplet::new(0xF3, -55, 1.0),
        ];
        assert!(TrilaterationSolver::solve_triplets(&registry, &unknown).is_none());
    }
}
