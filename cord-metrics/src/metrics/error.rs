use std::fmt;

use thiserror::Error;

use crate::Idx3d;

/// 参与计算的 ROI 种类.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RoiKind {
    /// 噪声 ROI.
    Noise,
    /// 白质.
    WhiteMatter,
    /// 灰质.
    GrayMatter,
    /// 脊髓 (白质 + 灰质).
    Cord,
}

impl fmt::Display for RoiKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RoiKind::Noise => "noise",
            RoiKind::WhiteMatter => "white matter",
            RoiKind::GrayMatter => "gray matter",
            RoiKind::Cord => "cord",
        };
        f.write_str(name)
    }
}

/// 指标计算错误.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricError {
    /// 掩膜形状与体数据形状不一致. 形状以 (z, y, x) 给出.
    #[error("{roi} mask shape {mask:?} differs from volume shape {volume:?}")]
    ShapeMismatch {
        /// 出错的掩膜.
        roi: RoiKind,
        /// 体数据形状.
        volume: Idx3d,
        /// 掩膜形状.
        mask: Idx3d,
    },

    /// 两次采集的体数据形状不一致.
    #[error("second acquisition shape {second:?} differs from first {first:?}")]
    AcquisitionMismatch {
        /// 第一次采集的形状.
        first: Idx3d,
        /// 第二次采集的形状.
        second: Idx3d,
    },

    /// 掩膜没有任何活跃切片.
    #[error("{0} mask has no active slice")]
    EmptyRoi(RoiKind),

    /// 各掩膜均非空, 但没有共同的活跃切片.
    #[error("{0} and {1} masks share no active slice")]
    DisjointRois(RoiKind, RoiKind),
}
