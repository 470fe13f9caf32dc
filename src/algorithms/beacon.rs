/// 固定信标（锚点）定义和信标注册表
///
/// 办公室内固定安装 12 个辅助信标，广播报文里用一个字节标识：
/// 0xF1 ~ 0xFC 依次对应 1 ~ 12 号信标。

use serde::{Deserialize, Serialize};

use crate::error::{PositioningError, Result};

/// 信标数量（固定）
pub const ANCHOR_COUNT: usize = 12;

/// 1 号信标的标识字节
pub const FIRST_ANCHOR_ID: u8 = 0xF1;

/// 12 号信标的标识字节
pub const LAST_ANCHOR_ID: u8 = 0xFC;

/// 单个固定信标
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    /// 报文中的标识字节（0xF1 ~ 0xFC）
    pub id: u8,
    /// X 坐标（米）
    pub x: f64,
    /// Y 坐标（米）
    pub y: f64,
}

impl AnchorPoint {
    pub fn new(id: u8, x: f64, y: f64) -> Self {
        AnchorPoint { id, x, y }
    }

    /// 获取信标的 2D 坐标
    pub fn coordinates(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    /// 信标编号（1 ~ 12），标识不在 0xF1 ~ 0xFC 内时为 None
    pub fn number(&self) -> Option<usize> {
        AnchorRegistry::index_of(self.id).map(|i| i + 1)
    }

    /// 到某一点的欧几里得距离
    pub fn distance_to(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 信标注册表 - 标识字节到坐标的直接查表
#[derive(Clone, Debug, PartialEq)]
pub struct AnchorRegistry {
    anchors: [AnchorPoint; ANCHOR_COUNT],
}

impl AnchorRegistry {
    /// 从 12 个坐标创建注册表，下标 0 对应 0xF1
    pub fn new(coordinates: [(f64, f64); ANCHOR_COUNT]) -> Self {
        let anchors = std::array::from_fn(|i| {
            let (x, y) = coordinates[i];
            AnchorPoint::new(FIRST_ANCHOR_ID + i as u8, x, y)
        });
        AnchorRegistry { anchors }
    }

    /// 从坐标切片创建，数量必须正好是 12
    pub fn from_slice(coordinates: &[[f64; 2]]) -> Result<Self> {
        if coordinates.len() != ANCHOR_COUNT {
            return Err(PositioningError::config(format!(
                "expected {} anchor coordinates, got {}",
                ANCHOR_COUNT,
                coordinates.len()
            )));
        }
        if let Some(bad) = coordinates
            .iter()
            .position(|c| !c[0].is_finite() || !c[1].is_finite())
        {
            return Err(PositioningError::config(format!(
                "anchor {} has a non-finite coordinate",
                bad + 1
            )));
        }
        Ok(Self::new(std::array::from_fn(|i| {
            (coordinates[i][0], coordinates[i][1])
        })))
    }

    /// 标识字节对应的下标（0 ~ 11），未知标识返回 None
    pub fn index_of(id: u8) -> Option<usize> {
        if (FIRST_ANCHOR_ID..=LAST_ANCHOR_ID).contains(&id) {
            Some((id - FIRST_ANCHOR_ID) as usize)
        } else {
            None
        }
    }

    /// 标识字节是否属于已知信标
    pub fn is_known(id: u8) -> bool {
        Self::index_of(id).is_some()
    }

    /// 按标识字节查找信标
    pub fn get(&self, id: u8) -> Option<&AnchorPoint> {
        Self::index_of(id).map(|i| &self.anchors[i])
    }

    /// 按下标查找信标
    pub fn by_index(&self, index: usize) -> Option<&AnchorPoint> {
        self.anchors.get(index)
    }

    /// 获取所有信标
    pub fn all(&self) -> &[AnchorPoint; ANCHOR_COUNT] {
        &self.anchors
    }

    /// 信标数量
    pub fn len(&self) -> usize {
        ANCHOR_COUNT
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnchorPoint> {
        self.anchors.iter()
    }
}

impl Default for AnchorRegistry {
    /// 办公室实际安装位置
    fn default() -> Self {
        AnchorRegistry::new([
            (0.0, 0.0),
            (6.0, 0.0),
            (5.0, 4.0),
            (13.8, 0.0),
            (17.9, 4.3),
            (5.0, 10.8),
            (5.0, 19.0),
            (0.6, 14.5),
            (11.0, 19.8),
            (0.0, 21.9),
            (5.0, 26.9),
            (10.6, 32.6),
        ])
    }
}
