/// 定位结果数据结构
///
/// 求解结果、校验后位置、测量记录以及按时间倒序保存的测量历史

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::algorithms::{GeoCoordinate, RangingTriplet};

/// 三边定位求解结果（校验前）
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPosition {
    /// X 坐标（米）
    pub x: f64,
    /// Y 坐标（米）
    pub y: f64,
    /// 求解是否成功；信标共线时为 false，坐标为 (0, 0)
    pub valid: bool,
}

impl ResolvedPosition {
    pub fn new(x: f64, y: f64, valid: bool) -> Self {
        ResolvedPosition { x, y, valid }
    }

    /// 共线信标的名义结果
    pub fn degenerate() -> Self {
        ResolvedPosition::new(0.0, 0.0, false)
    }

    /// 获取 2D 坐标
    pub fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

/// 校验后的位置，始终位于建筑轮廓内
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafePosition {
    /// X 坐标（米）
    pub x: f64,
    /// Y 坐标（米）
    pub y: f64,
    /// 位置是否被回推过
    pub was_clamped: bool,
    /// 原始位置是否合法（在轮廓内且不在禁入区域）
    pub valid: bool,
    /// 命中的第一个禁入区域
    pub region: Option<String>,
}

impl SafePosition {
    /// 获取 2D 坐标
    pub fn xy(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// 与另一位置的 2D 距离
    pub fn distance_to(&self, other: &SafePosition) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for SafePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)?;
        if !self.valid {
            write!(f, " [invalid")?;
            if let Some(region) = &self.region {
                write!(f, ": {}", region)?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// 一个上报周期的测量记录，创建后不再修改
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// 时间戳
    pub timestamp: DateTime<Utc>,
    /// 产生该记录的广播计数器
    pub counter: u64,
    pub position: SafePosition,
    pub geo: GeoCoordinate,
    /// 参与定位的测距三元组（最多 3 个）
    pub triplets: Vec<RangingTriplet>,
}

impl MeasurementRecord {
    pub fn new(
        timestamp: DateTime<Utc>,
        counter: u64,
        position: SafePosition,
        geo: GeoCoordinate,
        triplets: Vec<RangingTriplet>,
    ) -> Self {
        MeasurementRecord {
            timestamp,
            counter,
            position,
            geo,
            triplets,
        }
    }

    /// 获取详细描述
    pub fn detailed_description(&self) -> String {
        format!(
            "#{} 位置: {}, 经纬度: {}, 信标数: {}",
            self.counter,
            self.position,
            self.geo,
            self.triplets.len()
        )
    }
}

/// 测量历史，最新的记录在最前
///
/// 只追加，不设上限，只能通过 `clear` 清空。
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MeasurementHistory {
    records: VecDeque<MeasurementRecord>,
}

impl MeasurementHistory {
    /// 创建空历史
    pub fn new() -> Self {
        MeasurementHistory {
            records: VecDeque::new(),
        }
    }

    /// 添加记录（插入到最前）
    pub fn push(&mut self, record: MeasurementRecord) {
        self.records.push_front(record);
    }

    /// 最新记录
    pub fn latest(&self) -> Option<&MeasurementRecord> {
        self.records.front()
    }

    /// 从新到旧迭代
    pub fn iter(&self) -> impl Iterator<Item = &MeasurementRecord> {
        self.records.iter()
    }

    /// 从新到旧的记录副本
    pub fn to_vec(&self) -> Vec<MeasurementRecord> {
        self.records.iter().cloned().collect()
    }

    /// 记录数量
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 清空历史
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
