//! 单位采集时间的 CNR.

use crate::AcquisitionDuration;

/// CNR 按采集时长归一化的方式.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeNormalization {
    /// `CNR / sqrt(duration)`. 噪声随平均次数按平方根下降.
    #[default]
    SqrtDuration,
    /// `CNR / duration`. 早期脚本中的写法.
    Duration,
}

impl TimeNormalization {
    /// 按采集时长归一化 `cnr`.
    #[inline]
    pub fn normalize(&self, cnr: f64, duration: AcquisitionDuration) -> f64 {
        match self {
            TimeNormalization::SqrtDuration => cnr / duration.secs().sqrt(),
            TimeNormalization::Duration => cnr / duration.secs(),
        }
    }
}

/// 单位时间 CNR. 没有采集时长时为 `None`.
#[inline]
pub fn cnr_per_time(
    cnr: f64,
    duration: Option<AcquisitionDuration>,
    normalization: TimeNormalization,
) -> Option<f64> {
    duration.map(|d| normalization.normalize(cnr, d))
}
