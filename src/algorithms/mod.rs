/// 定位算法模块
///
/// 一个上报周期的各个步骤：
/// - 广播报文解析（信标标识、RSSI、距离）
/// - 信标注册表（标识 -> 坐标）
/// - 三边定位求解
/// - 楼层平面校验与回推
/// - 经纬度投影
/// - 测量记录与历史

pub mod advertisement;
pub mod beacon;
pub mod floor_plan;
pub mod geodesy;
pub mod results;
pub mod trilateration;

pub use advertisement::*;
pub use beacon::*;
pub use floor_plan::*;
pub use geodesy::*;
pub use results::*;
pub use trilateration::*;
