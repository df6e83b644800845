//! 体数据/掩膜读写错误.

use thiserror::Error;

use crate::Idx3d;

/// 打开、构造或保存体数据/掩膜时的错误.
#[derive(Error, Debug)]
pub enum VolumeError {
    /// 底层 nifti 读写错误.
    #[error("nifti error: {0}")]
    Nifti(#[from] nifti::NiftiError),

    /// 数组维度转换错误.
    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// 不支持的维度个数. 仅支持 2D, 3D 和 4D 文件.
    #[error("unsupported number of dimensions: {0} (expected 2, 3 or 4)")]
    Dimension(usize),

    /// 维度长度超出 nifti-1 header 可表示的范围.
    #[error("dimension length {0} does not fit in a nifti-1 header")]
    TooLarge(usize),

    /// 期望单个 3D 体数据, 但文件包含多个时间帧.
    #[error("expected a single 3D volume, found {0} frames")]
    Frames(usize),

    /// 时间帧索引越界.
    #[error("frame index {index} out of range ({len} frames)")]
    FrameIndex {
        /// 请求的索引.
        index: usize,
        /// 文件实际包含的帧数.
        len: usize,
    },

    /// 两次采集选择了同一时间帧.
    #[error("both acquisitions refer to frame {0}")]
    DuplicateFrame(usize),

    /// 掩膜中存在负数或非有限权重. `pos` 为 (z, y, x) 索引.
    #[error("invalid mask weight {value} at voxel {pos:?}")]
    InvalidWeight {
        /// 体素索引 (z, y, x).
        pos: Idx3d,
        /// 非法权重值.
        value: f64,
    },
}
