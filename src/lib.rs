/// 室内定位核心库
///
/// 由测距发起端广播的 BLE 报文计算办公室内的位置：
/// - `algorithms`：报文解析、三边定位、平面校验、经纬度投影
/// - `positioning`：上报周期与会话状态
/// - `scanner`：广播帧过滤与异步接收
/// - `report`：日志行与导出格式
/// - `config`：站点配置

pub mod algorithms;
pub mod config;
pub mod error;
pub mod positioning;
pub mod report;
pub mod scanner;

pub use config::SiteConfig;
pub use error::{PositioningError, Result};
pub use positioning::{CycleOutcome, CycleReport, PositioningPipeline, PositioningSession};
pub use scanner::{AdvertisementFrame, InitiatorFilter, ReceiverStats, SharedSession};
