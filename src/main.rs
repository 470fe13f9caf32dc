/// 离线回放
///
/// 用法：officenav [--config site.json] [--log-level debug] [--realtime] [frames.txt]，`--help` 查看说明
///
/// 每行一帧：`<counter> <hex-payload> [address]`，空行和 `#` 开头的行忽略。
/// 不给文件时从标准输入读取。处理完后打印文本报告。

use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::{Level, info, warn};

use officenav::report::render_text_report;
use officenav::scanner::{AdvertisementFrame, InitiatorFilter, SharedSession, run_receiver, spawn_replay};
use officenav::{PositioningSession, Result, SiteConfig};

#[derive(Parser, Debug)]
#[command(name = "officenav", about = "Replay captured ranging advertisements through a positioning session")]
struct Args {
    /// 站点配置 JSON，缺省使用办公室默认布置
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// 按配置的扫描周期回放
    #[arg(long)]
    realtime: bool,

    /// 回放文件，缺省读取标准输入
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,
}

/// 解析回放文本，格式错误的行记录警告后跳过
fn parse_frames(text: &str, default_address: &str) -> Vec<AdvertisementFrame> {
    let mut frames = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut fields = line.split_whitespace();
        let counter = fields.next().and_then(|c| c.parse::<u64>().ok());
        let payload = fields.next();
        let address = fields.next().unwrap_or(default_address);

        match (counter, payload) {
            (Some(counter), Some(payload)) => {
                frames.push(AdvertisementFrame::new(address, payload, counter));
            }
            _ => warn!(line = number + 1, "无法解析的回放行，跳过"),
        }
    }
    frames
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_target(false)
        .init();

    let config = match &args.config {
        Some(path) => SiteConfig::from_file(path)?,
        None => SiteConfig::default(),
    };

    let mut text = String::new();
    match &args.input {
        Some(path) => text = std::fs::read_to_string(path)?,
        None => {
            std::io::stdin().read_to_string(&mut text)?;
        }
    }

    let frames = parse_frames(&text, &config.initiator_address);
    info!(frames = frames.len(), "开始回放");

    let interval = if args.realtime {
        Duration::from_millis(config.cycle_interval_ms)
    } else {
        Duration::from_millis(1)
    };

    let session = SharedSession::new(PositioningSession::from_config(&config)?);
    let filter = InitiatorFilter::for_address(&config.initiator_address)?;
    let (rx, replay) = spawn_replay(frames, interval);

    let stats = run_receiver(rx, session.clone(), filter).await;
    if let Err(e) = replay.await {
        warn!(error = %e, "回放任务异常退出");
    }

    info!(
        received = stats.received,
        ignored = stats.ignored,
        duplicates = stats.duplicates,
        malformed = stats.malformed,
        partial = stats.partial,
        recorded = stats.recorded,
        "回放结束"
    );

    let report = session.with(|s| render_text_report(s.history())).await;
    print!("{}", report);
    Ok(())
}
