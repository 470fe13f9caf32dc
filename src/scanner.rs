/// 广播帧接入
///
/// 射频扫描由外部完成，这里只负责：
/// - 按发起端地址过滤广播帧
/// - 在共享会话上逐帧执行上报周期
/// - 按固定节拍回放帧序列（测试与离线回放）

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::algorithms::{GeoCoordinate, MeasurementRecord, RawAdvertisement};
use crate::error::{PositioningError, Result};
use crate::positioning::{CycleOutcome, PositioningSession};

/// 一帧捕获到的广播
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdvertisementFrame {
    /// 发送端蓝牙地址
    pub address: String,
    /// 36 字符十六进制负载
    pub payload: String,
    pub counter: u64,
    pub received_at: DateTime<Utc>,
}

impl AdvertisementFrame {
    pub fn new(address: impl Into<String>, payload: impl Into<String>, counter: u64) -> Self {
        AdvertisementFrame {
            address: address.into(),
            payload: payload.into(),
            counter,
            received_at: Utc::now(),
        }
    }

    pub fn to_raw(&self) -> RawAdvertisement {
        RawAdvertisement::new(self.payload.clone(), self.counter)
    }
}

/// 发起端地址过滤器（大小写不敏感）
#[derive(Clone, Debug)]
pub struct InitiatorFilter {
    pattern: Regex,
}

impl InitiatorFilter {
    /// 精确匹配一个地址
    pub fn for_address(address: &str) -> Result<Self> {
        Self::from_pattern(&format!("^{}$", regex::escape(address)))
    }

    /// 自定义正则
    pub fn from_pattern(pattern: &str) -> Result<Self> {
        let pattern = Regex::new(&format!("(?i){}", pattern))
            .map_err(|e| PositioningError::config(format!("bad initiator pattern: {}", e)))?;
        Ok(InitiatorFilter { pattern })
    }

    pub fn matches(&self, address: &str) -> bool {
        self.pattern.is_match(address)
    }
}

/// 线程安全的共享会话
#[derive(Clone, Debug)]
pub struct SharedSession {
    inner: Arc<Mutex<PositioningSession>>,
}

impl SharedSession {
    pub fn new(session: PositioningSession) -> Self {
        SharedSession {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// 执行一个上报周期
    pub async fn process(&self, frame: &AdvertisementFrame) -> Result<CycleOutcome> {
        let mut session = self.inner.lock().await;
        session.process_at(&frame.to_raw(), frame.received_at)
    }

    pub async fn pause(&self) {
        self.inner.lock().await.pause();
    }

    pub async fn resume(&self) {
        self.inner.lock().await.resume();
    }

    pub async fn reset(&self) {
        self.inner.lock().await.reset();
    }

    /// 历史快照（最新在前）
    pub async fn history_snapshot(&self) -> Vec<MeasurementRecord> {
        self.inner.lock().await.history().to_vec()
    }

    pub async fn last_geo(&self) -> Option<GeoCoordinate> {
        self.inner.lock().await.last_geo()
    }

    pub async fn active_anchors(&self) -> Vec<usize> {
        self.inner.lock().await.active_anchors()
    }

    /// 在锁内访问会话
    pub async fn with<R>(&self, f: impl FnOnce(&mut PositioningSession) -> R) -> R {
        let mut session = self.inner.lock().await;
        f(&mut session)
    }
}

impl Default for SharedSession {
    fn default() -> Self {
        SharedSession::new(PositioningSession::default())
    }
}

/// 接收统计
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub received: usize,
    /// 地址不匹配
    pub ignored: usize,
    pub paused: usize,
    pub duplicates: usize,
    pub malformed: usize,
    pub partial: usize,
    pub recorded: usize,
}

/// 消费帧通道直到发送端全部关闭
pub async fn run_receiver(
    mut rx: mpsc::Receiver<AdvertisementFrame>,
    session: SharedSession,
    filter: InitiatorFilter,
) -> ReceiverStats {
    info!("帧接收任务启动");
    let mut stats = ReceiverStats::default();

    while let Some(frame) = rx.recv().await {
        stats.received += 1;

        if !filter.matches(&frame.address) {
            debug!(address = %frame.address, "非关联发起端，忽略");
            stats.ignored += 1;
            continue;
        }

        match session.process(&frame).await {
            Ok(CycleOutcome::Paused) => stats.paused += 1,
            Ok(CycleOutcome::Duplicate) => stats.duplicates += 1,
            Ok(CycleOutcome::Partial { .. }) => stats.partial += 1,
            Ok(CycleOutcome::Recorded(_)) => stats.recorded += 1,
            Err(e) => {
                warn!(counter = frame.counter, error = %e, "丢弃损坏的帧");
                stats.malformed += 1;
            }
        }
    }

    info!(
        received = stats.received,
        recorded = stats.recorded,
        "帧接收任务结束"
    );
    stats
}

/// 按固定节拍回放帧序列，返回接收端
pub fn spawn_replay(
    frames: Vec<AdvertisementFrame>,
    interval: Duration,
) -> (mpsc::Receiver<AdvertisementFrame>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(frames.len().max(1));
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        for frame in frames {
            ticker.tick().await;
            if tx.send(frame).await.is_err() {
                break;
            }
        }
    });
    (rx, handle)
}
