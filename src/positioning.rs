/// 实时定位会话
///
/// 一个上报周期：解析 -> 三边定位 -> 平面校验 -> 经纬度投影 -> 生成记录。
/// 各步骤本身无状态；会话只保存上一帧计数器、当前激活信标、
/// 最近一次经纬度、测量历史和暂停标志。

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::algorithms::{
    ANCHOR_COUNT, AdvertisementDecoder, AnchorRegistry, DecodeOutcome, GeoCoordinate,
    GeodeticProjector, MeasurementHistory, MeasurementRecord, RangingTriplet, RawAdvertisement,
    ResolvedPosition, SafePosition, SpatialValidator, TRIPLETS_PER_FRAME, TrilaterationSolver,
};
use crate::config::SiteConfig;
use crate::error::Result;
use crate::report::format_distance;

// ============================================================================
// 定位流水线（无状态）
// ============================================================================

/// 一次定位的中间结果
#[derive(Clone, Debug, PartialEq)]
pub struct PositionFix {
    /// 求解器原始输出
    pub resolved: ResolvedPosition,
    /// 校验后的位置
    pub position: SafePosition,
    pub geo: GeoCoordinate,
}

/// 求解 + 校验 + 投影
#[derive(Clone, Debug, PartialEq)]
pub struct PositioningPipeline {
    registry: AnchorRegistry,
    validator: SpatialValidator,
    projector: GeodeticProjector,
}

impl PositioningPipeline {
    pub fn new(
        registry: AnchorRegistry,
        validator: SpatialValidator,
        projector: GeodeticProjector,
    ) -> Self {
        PositioningPipeline {
            registry,
            validator,
            projector,
        }
    }

    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            config.registry()?,
            config.validator(),
            config.projector(),
        ))
    }

    pub fn registry(&self) -> &AnchorRegistry {
        &self.registry
    }

    pub fn validator(&self) -> &SpatialValidator {
        &self.validator
    }

    pub fn projector(&self) -> &GeodeticProjector {
        &self.projector
    }

    /// 由 3 个已识别的三元组计算位置
    pub fn locate(&self, triplets: &[RangingTriplet; TRIPLETS_PER_FRAME]) -> Option<PositionFix> {
        let resolved = TrilaterationSolver::solve_triplets(&self.registry, triplets)?;
        let position = self.validator.validate_position(&resolved);
        let geo = self.projector.project(position.x, position.y);
        Some(PositionFix {
            resolved,
            position,
            geo,
        })
    }
}

impl Default for PositioningPipeline {
    fn default() -> Self {
        PositioningPipeline::new(
            AnchorRegistry::default(),
            SpatialValidator::default(),
            GeodeticProjector::default(),
        )
    }
}

// ============================================================================
// 周期结果
// ============================================================================

/// 生成记录的周期输出
#[derive(Clone, Debug, PartialEq)]
pub struct CycleReport {
    pub record: MeasurementRecord,
    /// 求解器原始输出（`valid = false` 表示信标共线）
    pub resolved: ResolvedPosition,
    /// 本帧识别出的信标下标（0 ~ 11）
    pub active_anchors: Vec<usize>,
    /// 形如 `F1:  2.0000` 的距离字符串
    pub distances: Vec<String>,
}

/// 一个上报周期的结果
#[derive(Clone, Debug, PartialEq)]
pub enum CycleOutcome {
    /// 会话已暂停，帧被忽略
    Paused,
    /// 计数器未变化
    Duplicate,
    /// 识别出的信标不足 3 个，只输出诊断信息
    Partial {
        counter: u64,
        recognized: Vec<RangingTriplet>,
        dropped_ids: Vec<u8>,
    },
    Recorded(Box<CycleReport>),
}

impl CycleOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, CycleOutcome::Recorded(_))
    }

    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            CycleOutcome::Recorded(report) => Some(report),
            _ => None,
        }
    }
}

// ============================================================================
// 定位会话
// ============================================================================

/// 定位会话：单写者，外部负责加锁
#[derive(Clone, Debug)]
pub struct PositioningSession {
    pipeline: PositioningPipeline,
    last_counter: Option<u64>,
    active_anchors: [bool; ANCHOR_COUNT],
    last_geo: Option<GeoCoordinate>,
    history: MeasurementHistory,
    paused: bool,
}

impl PositioningSession {
    pub fn new(pipeline: PositioningPipeline) -> Self {
        PositioningSession {
            pipeline,
            last_counter: None,
            active_anchors: [false; ANCHOR_COUNT],
            last_geo: None,
            history: MeasurementHistory::new(),
            paused: false,
        }
    }

    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        Ok(Self::new(PositioningPipeline::from_config(config)?))
    }

    pub fn pipeline(&self) -> &PositioningPipeline {
        &self.pipeline
    }

    /// 处理一帧广播，时间戳取当前时间
    pub fn process(&mut self, raw: &RawAdvertisement) -> Result<CycleOutcome> {
        self.process_at(raw, Utc::now())
    }

    /// 处理一帧广播
    ///
    /// 格式错误返回 `Err`，会话状态不变；重复帧、暂停、信标不足都不是错误。
    pub fn process_at(
        &mut self,
        raw: &RawAdvertisement,
        timestamp: DateTime<Utc>,
    ) -> Result<CycleOutcome> {
        if self.paused {
            debug!(counter = raw.counter, "会话已暂停，忽略该帧");
            return Ok(CycleOutcome::Paused);
        }

        let frame = match AdvertisementDecoder::decode(raw, self.last_counter) {
            Ok(DecodeOutcome::Duplicate) => return Ok(CycleOutcome::Duplicate),
            Ok(DecodeOutcome::Fresh(frame)) => frame,
            Err(e) => {
                warn!(counter = raw.counter, error = %e, "报文格式错误，跳过本周期");
                return Err(e);
            }
        };

        if let Some(last) = self.last_counter {
            if frame.counter < last {
                warn!(last, counter = frame.counter, "计数器回退，按新帧处理");
            }
        }
        self.last_counter = Some(frame.counter);

        let indices: Vec<usize> = frame
            .triplets
            .iter()
            .filter_map(RangingTriplet::anchor_index)
            .collect();
        for (i, active) in self.active_anchors.iter_mut().enumerate() {
            *active = indices.contains(&i);
        }

        let complete: Option<[RangingTriplet; TRIPLETS_PER_FRAME]> =
            frame.triplets.as_slice().try_into().ok();
        let Some(triplets) = complete else {
            info!(
                counter = frame.counter,
                recognized = frame.triplets.len(),
                "识别出的信标不足 3 个，不更新位置"
            );
            return Ok(CycleOutcome::Partial {
                counter: frame.counter,
                recognized: frame.triplets,
                dropped_ids: frame.dropped_ids,
            });
        };

        let Some(fix) = self.pipeline.locate(&triplets) else {
            // 解析阶段已过滤未知标识，注册表必然能查到
            warn!(counter = frame.counter, "信标未注册，不更新位置");
            return Ok(CycleOutcome::Partial {
                counter: frame.counter,
                recognized: frame.triplets,
                dropped_ids: frame.dropped_ids,
            });
        };

        if !fix.resolved.valid {
            warn!(counter = frame.counter, "信标几何退化，使用名义位置 (0, 0)");
        }

        let record = MeasurementRecord::new(
            timestamp,
            frame.counter,
            fix.position,
            fix.geo,
            triplets.to_vec(),
        );
        info!(
            counter = record.counter,
            x = record.position.x,
            y = record.position.y,
            latitude = record.geo.latitude,
            longitude = record.geo.longitude,
            clamped = record.position.was_clamped,
            "定位完成"
        );

        self.last_geo = Some(fix.geo);
        self.history.push(record.clone());

        Ok(CycleOutcome::Recorded(Box::new(CycleReport {
            record,
            resolved: fix.resolved,
            active_anchors: indices,
            distances: triplets.iter().map(format_distance).collect(),
        })))
    }

    /// 暂停：之后的帧全部忽略
    pub fn pause(&mut self) {
        if !self.paused {
            self.paused = true;
            info!("定位已暂停");
        }
    }

    /// 恢复
    pub fn resume(&mut self) {
        if self.paused {
            self.paused = false;
            info!("定位已恢复");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// 重置：清除计数器、历史、激活信标、最近经纬度，并取消暂停
    pub fn reset(&mut self) {
        self.last_counter = None;
        self.active_anchors = [false; ANCHOR_COUNT];
        self.last_geo = None;
        self.history.clear();
        self.paused = false;
        info!("定位会话已重置");
    }

    /// 上一次接受的计数器
    pub fn last_counter(&self) -> Option<u64> {
        self.last_counter
    }

    /// 当前激活的信标下标
    pub fn active_anchors(&self) -> Vec<usize> {
        self.active_anchors
            .iter()
            .enumerate()
            .filter_map(|(i, &active)| active.then_some(i))
            .collect()
    }

    pub fn is_anchor_active(&self, index: usize) -> bool {
        self.active_anchors.get(index).copied().unwrap_or(false)
    }

    /// 最近一次投影的经纬度
    pub fn last_geo(&self) -> Option<GeoCoordinate> {
        self.last_geo
    }

    pub fn history(&self) -> &MeasurementHistory {
        &self.history
    }
}

impl Default for PositioningSession {
    fn default() -> Self {
        PositioningSession::new(PositioningPipeline::default())
    }
}
