/// 楼层平面约束
///
/// 建筑外轮廓为 [0, width] x [0, height] 的矩形；内部若干禁入区域，
/// 每个区域是若干半平面的交集，并带有各自的回推策略。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::algorithms::{ResolvedPosition, SafePosition};

/// 坐标轴
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    X,
    Y,
}

/// 半平面约束：`axis >= value` 或 `axis <= value`（含边界）
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HalfPlane {
    AtLeast { axis: Axis, value: f64 },
    AtMost { axis: Axis, value: f64 },
}

impl HalfPlane {
    pub fn at_least(axis: Axis, value: f64) -> Self {
        HalfPlane::AtLeast { axis, value }
    }

    pub fn at_most(axis: Axis, value: f64) -> Self {
        HalfPlane::AtMost { axis, value }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        let pick = |axis: Axis| match axis {
            Axis::X => x,
            Axis::Y => y,
        };
        match *self {
            HalfPlane::AtLeast { axis, value } => pick(axis) >= value,
            HalfPlane::AtMost { axis, value } => pick(axis) <= value,
        }
    }
}

/// 进入禁入区域后的处理策略
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ClampPolicy {
    /// 只标记无效，不移动位置
    FlagOnly,
    /// 只把 x 推回到入口边界，y 不变
    ClampX { x: f64 },
    /// 只把 y 推回到入口边界，x 不变
    ClampY { y: f64 },
    ClampBoth { x: f64, y: f64 },
}

impl ClampPolicy {
    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        match *self {
            ClampPolicy::FlagOnly => (x, y),
            ClampPolicy::ClampX { x: bound } => (bound, y),
            ClampPolicy::ClampY { y: bound } => (x, bound),
            ClampPolicy::ClampBoth { x: bx, y: by } => (bx, by),
        }
    }
}

/// 禁入区域
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExclusionRegion {
    pub name: String,
    /// 所有约束同时满足即在区域内
    pub constraints: Vec<HalfPlane>,
    pub policy: ClampPolicy,
}

impl ExclusionRegion {
    pub fn new(name: impl Into<String>, constraints: Vec<HalfPlane>, policy: ClampPolicy) -> Self {
        ExclusionRegion {
            name: name.into(),
            constraints,
            policy,
        }
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        !self.constraints.is_empty() && self.constraints.iter().all(|c| c.contains(x, y))
    }

    /// 办公室的 3 个禁入区域
    pub fn office_defaults() -> Vec<ExclusionRegion> {
        vec![
            ExclusionRegion::new(
                "meeting rooms",
                vec![
                    HalfPlane::at_least(Axis::Y, 4.3),
                    HalfPlane::at_most(Axis::Y, 15.1),
                    HalfPlane::at_least(Axis::X, 10.0),
                ],
                ClampPolicy::FlagOnly,
            ),
            // 厨房只有一个门，越界时推回门口
            ExclusionRegion::new(
                "kitchen",
                vec![
                    HalfPlane::at_least(Axis::Y, 15.1),
                    HalfPlane::at_least(Axis::X, 12.35),
                ],
                ClampPolicy::ClampX { x: 12.35 },
            ),
            ExclusionRegion::new(
                "hardware lab",
                vec![
                    HalfPlane::at_least(Axis::Y, 30.0),
                    HalfPlane::at_most(Axis::X, 7.6),
                ],
                ClampPolicy::FlagOnly,
            ),
        ]
    }
}

/// 建筑外轮廓（米）
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub width: f64,
    pub height: f64,
}

impl Envelope {
    pub fn new(width: f64, height: f64) -> Self {
        Envelope { width, height }
    }

    /// 边界上的点属于轮廓内
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (0.0..=self.width).contains(&x) && (0.0..=self.height).contains(&y)
    }

    /// 各轴独立截断到最近边界；NaN 视为 0
    pub fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (clamp_axis(x, self.width), clamp_axis(y, self.height))
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Envelope::new(21.0, 38.0)
    }
}

fn clamp_axis(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

/// 位置校验器
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialValidator {
    envelope: Envelope,
    regions: Vec<ExclusionRegion>,
}

impl SpatialValidator {
    pub fn new(envelope: Envelope, regions: Vec<ExclusionRegion>) -> Self {
        SpatialValidator { envelope, regions }
    }

    /// 只有外轮廓、没有禁入区域
    pub fn envelope_only(envelope: Envelope) -> Self {
        Self::new(envelope, Vec::new())
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    pub fn regions(&self) -> &[ExclusionRegion] {
        &self.regions
    }

    /// 位置是否合法（在轮廓内且不在任何禁入区域）
    pub fn is_valid(&self, x: f64, y: f64) -> bool {
        self.envelope.contains(x, y) && !self.regions.iter().any(|r| r.contains(x, y))
    }

    /// 校验求解结果
    pub fn validate_position(&self, position: &ResolvedPosition) -> SafePosition {
        self.validate(position.x, position.y)
    }

    /// 校验并回推位置
    ///
    /// 先截断到外轮廓，再依次应用命中区域的策略，最后再截断一次，
    /// 保证结果始终在轮廓内。多次调用结果不变。
    pub fn validate(&self, x: f64, y: f64) -> SafePosition {
        let inside = self.envelope.contains(x, y);
        let (mut cx, mut cy) = self.envelope.clamp(x, y);

        let mut hit: Option<&ExclusionRegion> = None;
        for region in &self.regions {
            if region.contains(cx, cy) {
                (cx, cy) = region.policy.apply(cx, cy);
                hit.get_or_insert(region);
            }
        }
        let (cx, cy) = self.envelope.clamp(cx, cy);

        let was_clamped = cx != x || cy != y;
        let valid = inside && hit.is_none();
        if !valid {
            debug!(
                x,
                y,
                safe_x = cx,
                safe_y = cy,
                region = ?hit.map(|r| r.name.as_str()),
                "位置无效"
            );
        }

        SafePosition {
            x: cx,
            y: cy,
            was_clamped,
            valid,
            region: hit.map(|r| r.name.clone()),
        }
    }
}

impl Default for SpatialValidator {
    fn default() -> Self {
        SpatialValidator::new(Envelope::default(), ExclusionRegion::office_defaults())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_boundary() {
        let validator = SpatialValidator::envelope_only(Envelope::default());

        let corner = validator.validate(21.0, 38.0);
        assert_eq!((corner.x, corner.y), (21.0, 38.0));
        assert!(corner.valid);
        assert!(!corner.was_clamped);

        let outside = validator.validate(21.0001, 38.0);
        assert_eq!((outside.x, outside.y), (21.0, 38.0));
        assert!(!outside.valid);
        assert!(outside.was_clamped);

        let origin = validator.validate(0.0, 0.0);
        assert!(origin.valid && !origin.was_clamped);
    }

    #[test]
    fn test_axes_clamped_independently() {
        let validator = SpatialValidator::envelope_only(Envelope::default());
        let p = validator.validate(-3.0, 50.0);
        assert_eq!((p.x, p.y), (0.0, 38.0));
        let p = validator.validate(8.0, -0.5);
        assert_eq!((p.x, p.y), (8.0, 0.0));
        let p = validator.validate(f64::NAN, f64::INFINITY);
        assert_eq!((p.x, p.y), (0.0, 38.0));
    }

    #[test]
    fn test_meeting_rooms_flag_only() {
        let validator = SpatialValidator::default();
        let p = validator.validate(15.0, 10.0);
        assert_eq!((p.x, p.y), (15.0, 10.0));
        assert!(!p.valid);
        assert!(!p.was_clamped);
        assert_eq!(p.region.as_deref(), Some("meeting rooms"));
    }

    #[test]
    fn test_kitchen_pushes_back_to_doorway() {
        let validator = SpatialValidator::default();
        let p = validator.validate(18.0, 25.0);
        assert_eq!((p.x, p.y), (12.35, 25.0));
        assert!(!p.valid);
        assert!(p.was_clamped);
        assert_eq!(p.region.as_deref(), Some("kitchen"));

        // 轮廓角点位于厨房内
        let corner = validator.validate(21.0, 38.0);
        assert_eq!((corner.x, corner.y), (12.35, 38.0));
    }

    #[test]
    fn test_hardware_lab_flag_only() {
        let validator = SpatialValidator::default();
        let p = validator.validate(3.0, 33.0);
        assert_eq!((p.x, p.y), (3.0, 33.0));
        assert!(!p.valid);
        assert_eq!(p.region.as_deref(), Some("hardware lab"));
    }

    #[test]
    fn test_corridor_is_valid() {
        let validator = SpatialValidator::default();
        for (x, y) in [(3.0, 2.0), (9.9, 10.0), (12.0, 20.0), (8.0, 35.0)] {
            let p = validator.validate(x, y);
            assert!(p.valid, "({}, {}) should be valid", x, y);
            assert!(!p.was_clamped);
            assert!(p.region.is_none());
            assert!(validator.is_valid(x, y));
        }
    }

    #[test]
    fn test_validate_is_idempotent() {
        let validator = SpatialValidator::default();
        let mut x = -5.0;
        while x <= 26.0 {
            let mut y = -5.0;
            while y <= 43.0 {
                let once = validator.validate(x, y);
                let twice = validator.validate(once.x, once.y);
                assert_eq!((once.x, once.y), (twice.x, twice.y), "at ({}, {})", x, y);
                assert!(validator.envelope().contains(once.x, once.y));
                y += 0.35;
            }
            x += 0.45;
        }
    }

    #[test]
    fn test_clamp_y_policy() {
        let region = ExclusionRegion::new(
            "stairwell",
            vec![HalfPlane::at_least(Axis::Y, 30.0), HalfPlane::at_least(Axis::X, 15.0)],
            ClampPolicy::ClampY { y: 30.0 },
        );
        let validator = SpatialValidator::new(Envelope::default(), vec![region]);
        let p = validator.validate(17.0, 36.0);
        assert_eq!((p.x, p.y), (17.0, 30.0));
        assert!(p.was_clamped);
    }

    #[test]
    fn test_region_serde() {
        let json = serde_json::to_string(&ExclusionRegion::office_defaults()[1]).unwrap();
        assert!(json.contains("\"policy\":\"clamp_x\""));
        let back: ExclusionRegion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ExclusionRegion::office_defaults()[1]);
    }
}
