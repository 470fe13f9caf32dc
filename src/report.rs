/// 测量结果导出格式
///
/// 距离字符串、日志行、纯文本报告和 JSON 导出。发送（邮件等）不在此处理。

use serde::Serialize;

use crate::algorithms::{MeasurementHistory, MeasurementRecord, RangingTriplet};
use crate::error::Result;

/// 时间戳格式，如 `2022.08.31 AD at 10:15:00 UTC`
pub const TIMESTAMP_FORMAT: &str = "%Y.%m.%d AD at %H:%M:%S UTC";

/// 信标标识 + 4 位小数距离，如 `F1:  2.0000`
pub fn format_distance(triplet: &RangingTriplet) -> String {
    format!("{:02X}:  {:.4}", triplet.anchor_id, triplet.distance)
}

/// 日志页的一行
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogRow {
    pub timestamp: String,
    pub x: String,
    pub y: String,
    pub distances: Vec<String>,
}

impl LogRow {
    pub fn from_record(record: &MeasurementRecord) -> Self {
        LogRow {
            timestamp: record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            x: format!("{:.2} m", record.position.x),
            y: format!("{:.2} m", record.position.y),
            distances: record
                .triplets
                .iter()
                .map(|t| format!("{} m", format_distance(t)))
                .collect(),
        }
    }
}

/// 所有记录的日志行，最新在前
pub fn log_rows(history: &MeasurementHistory) -> Vec<LogRow> {
    history.iter().map(LogRow::from_record).collect()
}

/// 纯文本报告
pub fn render_text_report(history: &MeasurementHistory) -> String {
    if history.is_empty() {
        return "There are no measurement results to show.\n".to_string();
    }

    let mut out = format!("Measurement results ({} records, newest first):\n", history.len());
    for row in log_rows(history) {
        out.push_str(&format!("{}    x: {}    y: {}\n", row.timestamp, row.x, row.y));
        if !row.distances.is_empty() {
            out.push_str(&format!("    {}\n", row.distances.join("   ")));
        }
    }
    out
}

/// JSON 导出（最新在前）
pub fn history_to_json(history: &MeasurementHistory) -> Result<String> {
    Ok(serde_json::to_string_pretty(&history.to_vec())?)
}
