/// 站点配置
///
/// 信标坐标、建筑轮廓、禁入区域、参考经纬度等固定参数。
/// 默认值即办公室的实际布置，也可以从 JSON 文件加载，缺省字段使用默认值。

use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::algorithms::{
    ANCHOR_COUNT, AnchorRegistry, EARTH_RADIUS_M, Envelope, ExclusionRegion, GeoCoordinate,
    GeodeticProjector, HalfPlane, SpatialValidator,
};
use crate::error::{PositioningError, Result};

/// 关联的测距发起端地址
pub const DEFAULT_INITIATOR_ADDRESS: &str = "48:23:35:00:00:AA";

/// 扫描周期（毫秒）
pub const DEFAULT_CYCLE_INTERVAL_MS: u64 = 500;

const MAC_PATTERN: &str = r"^([0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}$";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// 12 个信标坐标 [x, y]（米），下标 0 对应 0xF1
    pub anchors: Vec<[f64; 2]>,
    pub envelope: Envelope,
    pub exclusion_regions: Vec<ExclusionRegion>,
    /// 建筑原点的经纬度
    pub reference: GeoCoordinate,
    pub earth_radius_m: f64,
    pub initiator_address: String,
    pub cycle_interval_ms: u64,
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            anchors: AnchorRegistry::default()
                .iter()
                .map(|a| [a.x, a.y])
                .collect(),
            envelope: Envelope::default(),
            exclusion_regions: ExclusionRegion::office_defaults(),
            reference: GeoCoordinate::office_origin(),
            earth_radius_m: EARTH_RADIUS_M,
            initiator_address: DEFAULT_INITIATOR_ADDRESS.to_string(),
            cycle_interval_ms: DEFAULT_CYCLE_INTERVAL_MS,
        }
    }
}

impl SiteConfig {
    /// 从 JSON 字符串加载并校验
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SiteConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载并校验
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        info!(path = %path.display(), "已加载站点配置");
        Ok(config)
    }

    /// 序列化为格式化 JSON
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 校验配置的合理性
    pub fn validate(&self) -> Result<()> {
        if self.anchors.len() != ANCHOR_COUNT {
            return Err(PositioningError::config(format!(
                "expected {} anchors, got {}",
                ANCHOR_COUNT,
                self.anchors.len()
            )));
        }
        AnchorRegistry::from_slice(&self.anchors)?;

        let Envelope { width, height } = self.envelope;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(PositioningError::config(format!(
                "envelope must be positive, got {} x {}",
                width, height
            )));
        }

        for region in &self.exclusion_regions {
            if region.constraints.is_empty() {
                return Err(PositioningError::config(format!(
                    "exclusion region {:?} has no constraints",
                    region.name
                )));
            }
            let finite = region.constraints.iter().all(|c| match *c {
                HalfPlane::AtLeast { value, .. } | HalfPlane::AtMost { value, .. } => {
                    value.is_finite()
                }
            });
            if !finite {
                return Err(PositioningError::config(format!(
                    "exclusion region {:?} has a non-finite bound",
                    region.name
                )));
            }
        }

        let GeoCoordinate {
            latitude,
            longitude,
        } = self.reference;
        if !(-90.0..=90.0).contains(&latitude) || !longitude.is_finite() {
            return Err(PositioningError::config(format!(
                "reference coordinate out of range: {}",
                self.reference
            )));
        }

        if !(self.earth_radius_m.is_finite() && self.earth_radius_m > 0.0) {
            return Err(PositioningError::config("earth radius must be positive"));
        }

        let mac = Regex::new(MAC_PATTERN)
            .map_err(|e| PositioningError::config(format!("bad address pattern: {}", e)))?;
        if !mac.is_match(&self.initiator_address) {
            return Err(PositioningError::config(format!(
                "initiator address {:?} is not a MAC address",
                self.initiator_address
            )));
        }

        if self.cycle_interval_ms == 0 {
            return Err(PositioningError::config("cycle interval must be non-zero"));
        }

        Ok(())
    }

    /// 信标注册表
    pub fn registry(&self) -> Result<AnchorRegistry> {
        AnchorRegistry::from_slice(&self.anchors)
    }

    /// 位置校验器
    pub fn validator(&self) -> SpatialValidator {
        SpatialValidator::new(self.envelope, self.exclusion_regions.clone())
    }

    /// 经纬度投影器
    pub fn projector(&self) -> GeodeticProjector {
        GeodeticProjector::new(self.reference, self.earth_radius_m)
    }
}
