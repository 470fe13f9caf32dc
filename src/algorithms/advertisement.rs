/// 测距发起端广播报文解析
///
/// 负载固定为 36 个十六进制字符（18 字节）：
///
/// | 字符区间   | 内容                              |
/// |-----------|-----------------------------------|
/// | [0, 6)    | 3 个信标标识字节                    |
/// | [6, 12)   | 3 个原始 RSSI 字节                  |
/// | [12, 36)  | 3 个 4 字节距离（IEEE-754 单精度） |
///
/// 另有一个单独的 64 位计数器字段，用于丢弃同一帧的重复捕获。

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::algorithms::AnchorRegistry;
use crate::error::{PositioningError, Result};

/// 负载十六进制字符数
pub const PAYLOAD_HEX_LEN: usize = 36;

/// 每帧最多携带的测距三元组数量
pub const TRIPLETS_PER_FRAME: usize = 3;

const PAYLOAD_BYTES: usize = PAYLOAD_HEX_LEN / 2;
const RSSI_OFFSET: usize = 3;
const DISTANCE_OFFSET: usize = 6;

/// 原始广播：负载 + 计数器
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawAdvertisement {
    pub payload: String,
    pub counter: u64,
}

impl RawAdvertisement {
    pub fn new(payload: impl Into<String>, counter: u64) -> Self {
        RawAdvertisement {
            payload: payload.into(),
            counter,
        }
    }
}

/// 测距三元组（信标标识, RSSI, 距离）
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RangingTriplet {
    /// 信标标识字节
    pub anchor_id: u8,
    /// 信号强度 (dBm)
    pub rssi: i16,
    /// 到信标的距离（米，单精度）
    pub distance: f32,
}

impl RangingTriplet {
    pub fn new(anchor_id: u8, rssi: i16, distance: f32) -> Self {
        RangingTriplet {
            anchor_id,
            rssi,
            distance,
        }
    }

    /// 对应的注册表下标，未知信标为 None
    pub fn anchor_index(&self) -> Option<usize> {
        AnchorRegistry::index_of(self.anchor_id)
    }
}

/// 一帧解析结果
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedFrame {
    pub counter: u64,
    /// 已识别的三元组，保持负载中的顺序
    pub triplets: Vec<RangingTriplet>,
    /// 被丢弃的未知标识字节
    pub dropped_ids: Vec<u8>,
}

impl DecodedFrame {
    /// 是否正好识别出 3 个信标
    pub fn is_complete(&self) -> bool {
        self.triplets.len() == TRIPLETS_PER_FRAME
    }
}

/// 解析结果：重复帧或新数据
#[derive(Clone, Debug, PartialEq)]
pub enum DecodeOutcome {
    /// 计数器未变化，没有新数据
    Duplicate,
    Fresh(DecodedFrame),
}

/// 报文解析器（无状态，上一帧计数器由调用方保存）
pub struct AdvertisementDecoder;

impl AdvertisementDecoder {
    /// 解析一帧广播
    ///
    /// `last_counter` 为上一次接受的计数器；相等时直接返回 `Duplicate`，
    /// 不检查负载。
    pub fn decode(raw: &RawAdvertisement, last_counter: Option<u64>) -> Result<DecodeOutcome> {
        if last_counter == Some(raw.counter) {
            debug!(counter = raw.counter, "重复帧，忽略");
            return Ok(DecodeOutcome::Duplicate);
        }

        let bytes = parse_payload(&raw.payload)?;

        let mut triplets = Vec::with_capacity(TRIPLETS_PER_FRAME);
        let mut dropped_ids = Vec::new();

        for i in 0..TRIPLETS_PER_FRAME {
            let id = bytes[i];
            let rssi = decode_rssi(bytes[RSSI_OFFSET + i]);
            let start = DISTANCE_OFFSET + 4 * i;
            let distance = decode_distance([
                bytes[start],
                bytes[start + 1],
                bytes[start + 2],
                bytes[start + 3],
            ]);

            if AnchorRegistry::is_known(id) {
                debug!(
                    anchor = %format!("{:02X}", id),
                    rssi,
                    distance,
                    "解析测距三元组"
                );
                triplets.push(RangingTriplet::new(id, rssi, distance));
            } else {
                warn!(anchor = %format!("{:02X}", id), "未知信标标识，丢弃该三元组");
                dropped_ids.push(id);
            }
        }

        Ok(DecodeOutcome::Fresh(DecodedFrame {
            counter: raw.counter,
            triplets,
            dropped_ids,
        }))
    }
}

/// 将 36 个十六进制字符转换为 18 字节（大小写不敏感）
pub fn parse_payload(payload: &str) -> Result<[u8; PAYLOAD_BYTES]> {
    if payload.len() != PAYLOAD_HEX_LEN {
        return Err(PositioningError::format(format!(
            "expected {} hex characters, got {}",
            PAYLOAD_HEX_LEN,
            payload.len()
        )));
    }
    if let Some(pos) = payload.bytes().position(|b| !b.is_ascii_hexdigit()) {
        return Err(PositioningError::format(format!(
            "non-hex character at position {}",
            pos
        )));
    }

    let mut bytes = [0u8; PAYLOAD_BYTES];
    for (i, byte) in bytes.iter_mut().enumerate() {
        let pair = &payload[2 * i..2 * i + 2];
        *byte = u8::from_str_radix(pair, 16)
            .map_err(|e| PositioningError::format(format!("bad hex pair {:?}: {}", pair, e)))?;
    }
    Ok(bytes)
}

/// RSSI 解码：按有效位取反、加 1、取负
///
/// 取反只覆盖去掉前导零后的二进制位（0 按 1 位处理），
/// 结果等于 `raw - 2^位数`：
/// - 最高位为 1 的字节等价于有符号字节（0xC5 -> -59）
/// - 0x7F -> -1，0x05 -> -3，0x00 -> -2
pub fn decode_rssi(raw: u8) -> i16 {
    let bits = (u8::BITS - raw.leading_zeros()).max(1);
    i16::from(raw) - (1i16 << bits)
}

/// 编码为 8 位有效位的字节，RSSI 必须在 [-128, -1] 内
pub fn encode_rssi(rssi: i16) -> Option<u8> {
    if (-128..=-1).contains(&rssi) {
        Some((rssi + 256) as u8)
    } else {
        None
    }
}

/// 距离解码：4 字节按相反顺序重组为 32 位字，再按 IEEE-754 单精度解释
pub fn decode_distance(raw: [u8; 4]) -> f32 {
    f32::from_le_bytes(raw)
}

/// 将 3 个三元组编码为 36 字符负载（大写）
pub fn encode_payload(triplets: &[RangingTriplet; TRIPLETS_PER_FRAME]) -> Result<String> {
    let mut bytes = Vec::with_capacity(PAYLOAD_BYTES);
    bytes.extend(triplets.iter().map(|t| t.anchor_id));
    for t in triplets {
        let raw = encode_rssi(t.rssi).ok_or_else(|| {
            PositioningError::format(format!("RSSI {} dBm cannot be encoded", t.rssi))
        })?;
        bytes.push(raw);
    }
    for t in triplets {
        bytes.extend_from_slice(&t.distance.to_le_bytes());
    }
    Ok(bytes.iter().map(|b| format!("{:02X}", b)).collect())
}
