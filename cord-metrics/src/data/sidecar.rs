//! BIDS 风格 JSON sidecar 元数据.

use std::fs;
use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::consts::ACQUISITION_DURATION_KEY;

/// 读取 sidecar 时的错误.
#[derive(Error, Debug)]
pub enum SidecarError {
    /// 底层 I/O 错误.
    #[error("IO error {0}")]
    Io(#[from] std::io::Error),

    /// JSON 解析错误.
    #[error("JSON parse error {0}")]
    Json(#[from] serde_json::Error),

    /// JSON 顶层不是对象.
    #[error("sidecar is not a JSON object")]
    NotAnObject,

    /// 字段存在, 但不是正的有限数值.
    #[error("field '{key}' is not a positive duration: {value}")]
    InvalidDuration {
        /// 字段名.
        key: &'static str,
        /// 原始值.
        value: Value,
    },
}

/// 一次采集的时长, 以秒为单位. 保证是正的有限数.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "f64", into = "f64")
)]
pub struct AcquisitionDuration(f64);

impl AcquisitionDuration {
    /// 构建采集时长.
    ///
    /// `secs` 必须是正的有限数, 否则返回 `None`.
    pub fn new(secs: f64) -> Option<Self> {
        (secs.is_finite() && secs > 0.0).then_some(Self(secs))
    }

    /// 时长 (秒).
    #[inline]
    pub fn secs(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for AcquisitionDuration {
    type Error = SidecarError;

    fn try_from(secs: f64) -> Result<Self, Self::Error> {
        Self::new(secs).ok_or_else(|| SidecarError::InvalidDuration {
            key: ACQUISITION_DURATION_KEY,
            value: Value::from(secs),
        })
    }
}

impl From<AcquisitionDuration> for f64 {
    #[inline]
    fn from(d: AcquisitionDuration) -> f64 {
        d.0
    }
}

/// 解析后的 JSON sidecar.
#[derive(Clone, Debug)]
pub struct Sidecar {
    fields: Map<String, Value>,
}

impl Sidecar {
    /// 打开 JSON sidecar 文件.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SidecarError> {
        Self::from_json_str(&fs::read_to_string(path.as_ref())?)
    }

    /// 从 JSON 文本解析.
    pub fn from_json_str(s: &str) -> Result<Self, SidecarError> {
        match serde_json::from_str(s)? {
            Value::Object(fields) => Ok(Self { fields }),
            _ => Err(SidecarError::NotAnObject),
        }
    }

    /// 获取名为 `key` 的字段.
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// 获取 `AcquisitionDuration` 字段.
    ///
    /// 字段缺失时返回 `Ok(None)`, 这是合法状态而不是错误. 数值字符串 (如 `"12.5"`)
    /// 也会被接受.
    pub fn acquisition_duration(&self) -> Result<Option<AcquisitionDuration>, SidecarError> {
        let Some(value) = self.get(ACQUISITION_DURATION_KEY) else {
            return Ok(None);
        };
        let secs = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        secs.and_then(AcquisitionDuration::new)
            .map(Some)
            .ok_or_else(|| SidecarError::InvalidDuration {
                key: ACQUISITION_DURATION_KEY,
                value: value.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_field() {
        let s = Sidecar::from_json_str(r#"{"AcquisitionDuration": 245.5, "EchoTime": 0.02}"#)
            .unwrap();
        assert_eq!(s.acquisition_duration().unwrap().unwrap().secs(), 245.5);

        let s = Sidecar::from_json_str(r#"{"AcquisitionDuration": "12"}"#).unwrap();
        assert_eq!(s.acquisition_duration().unwrap().unwrap().secs(), 12.0);
    }

    #[test]
    fn test_missing_field_is_not_an_error() {
        let s = Sidecar::from_json_str(r#"{"EchoTime": 0.02}"#).unwrap();
        assert_eq!(s.acquisition_duration().unwrap(), None);
    }

    #[test]
    fn test_invalid_duration() {
        for bad in [r#"{"AcquisitionDuration": 0}"#, r#"{"AcquisitionDuration": -3}"#, r#"{"AcquisitionDuration": [1]}"#] {
            let s = Sidecar::from_json_str(bad).unwrap();
            assert!(matches!(
                s.acquisition_duration(),
                Err(SidecarError::InvalidDuration { .. })
            ));
        }
        assert!(matches!(
            Sidecar::from_json_str("[1, 2]"),
            Err(SidecarError::NotAnObject)
        ));
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("sub-01_T2star.json");
        fs::write(&path, r#"{"AcquisitionDuration": 4}"#).unwrap();
        let s = Sidecar::open(&path).unwrap();
        assert_eq!(s.acquisition_duration().unwrap(), AcquisitionDuration::new(4.0));
    }

    #[test]
    fn test_duration_must_be_positive() {
        assert!(AcquisitionDuration::new(0.0).is_none());
        assert!(AcquisitionDuration::new(f64::INFINITY).is_none());
        assert!(AcquisitionDuration::new(1e-3).is_some());
    }

    #[test]
    fn test_try_from_validates() {
        assert_eq!(AcquisitionDuration::try_from(4.0).unwrap().secs(), 4.0);
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                AcquisitionDuration::try_from(bad),
                Err(SidecarError::InvalidDuration { .. })
            ));
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_deserialize_validates() {
        let d: AcquisitionDuration = serde_json::from_str("12.5").unwrap();
        assert_eq!(d.secs(), 12.5);
        assert_eq!(serde_json::to_string(&d).unwrap(), "12.5");
        assert!(serde_json::from_str::<AcquisitionDuration>("-3").is_err());
        assert!(serde_json::from_str::<AcquisitionDuration>("0").is_err());
    }
}
