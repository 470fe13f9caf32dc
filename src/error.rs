/// 定位流水线错误类型
///
/// 只有真正无法继续的情况才是错误：报文格式损坏、站点配置非法、读取失败。
/// 重复帧、未知信标、共线几何、越界位置都不是错误，而是通过结果值和日志体现。

use thiserror::Error;

/// 定位相关错误
#[derive(Debug, Error)]
pub enum PositioningError {
    /// 广播负载格式错误（长度不是 36 或包含非十六进制字符）
    #[error("payload format error: {reason}")]
    Format { reason: String },

    /// 站点配置不合法
    #[error("invalid site configuration: {reason}")]
    Config { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PositioningError {
    pub fn format(reason: impl Into<String>) -> Self {
        PositioningError::Format {
            reason: reason.into(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        PositioningError::Config {
            reason: reason.into(),
        }
    }

    /// 是否为报文格式错误（本周期跳过即可）
    pub fn is_format(&self) -> bool {
        matches!(self, PositioningError::Format { .. })
    }
}

pub type Result<T> = std::result::Result<T, PositioningError>;
