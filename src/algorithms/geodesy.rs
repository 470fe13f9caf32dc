/// 本地坐标到经纬度的投影
///
/// 以建筑原点处的参考经纬度为起点，按球面大圆公式沿方位角前进
/// 一段距离。本地 +x/+y 到方位角的换算：bearing = atan2(y, x) + 90°。

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// 平均地球半径（米）
pub const EARTH_RADIUS_M: f64 = 6_371_010.0;

/// |cos(lat)| 小于该值时视为参考点在极点
pub const POLE_EPSILON: f64 = 1e-6;

/// 经纬度（度）
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoCoordinate {
            latitude,
            longitude,
        }
    }

    /// 办公楼原点
    pub fn office_origin() -> Self {
        GeoCoordinate::new(38.260258, 21.748722)
    }

    /// 两点之间的大圆距离（haversine，米）
    pub fn haversine_distance(&self, other: &GeoCoordinate, radius: f64) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (other.longitude - self.longitude).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * radius * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// 从本点到另一点的初始方位角（度，0 = 正北，顺时针）
    pub fn initial_bearing_to(&self, other: &GeoCoordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlon = (other.longitude - self.longitude).to_radians();
        let y = dlon.sin() * lat2.cos();
        let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
        y.atan2(x).to_degrees().rem_euclid(360.0)
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.7}, {:.7})", self.latitude, self.longitude)
    }
}

/// 经纬度投影器
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GeodeticProjector {
    reference: GeoCoordinate,
    earth_radius: f64,
}

impl GeodeticProjector {
    pub fn new(reference: GeoCoordinate, earth_radius: f64) -> Self {
        GeodeticProjector {
            reference,
            earth_radius,
        }
    }

    pub fn reference(&self) -> GeoCoordinate {
        self.reference
    }

    pub fn earth_radius(&self) -> f64 {
        self.earth_radius
    }

    /// 本地偏移 (x, y)（米）投影为经纬度
    pub fn project(&self, x: f64, y: f64) -> GeoCoordinate {
        let distance = (x * x + y * y).sqrt();
        if distance == 0.0 {
            return self.reference;
        }

        let bearing = y.atan2(x) + PI / 2.0;
        let angular = distance / self.earth_radius;
        let lat1 = self.reference.latitude.to_radians();
        let lon1 = self.reference.longitude.to_radians();

        let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();

        let longitude = if lat1.cos().abs() < POLE_EPSILON {
            self.reference.longitude
        } else {
            let lon2 = lon1
                + (bearing.sin() * angular.sin() * lat1.cos())
                    .atan2(angular.cos() - lat1.sin() * lat2.sin());
            normalize_longitude(lon2.to_degrees())
        };

        GeoCoordinate::new(lat2.to_degrees(), longitude)
    }
}

impl Default for GeodeticProjector {
    fn default() -> Self {
        GeodeticProjector::new(GeoCoordinate::office_origin(), EARTH_RADIUS_M)
    }
}

/// 经度归一化到 (-180, 180]
pub fn normalize_longitude(longitude: f64) -> f64 {
    if longitude > -180.0 && longitude <= 180.0 {
        return longitude;
    }
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 { 180.0 } else { wrapped }
}
