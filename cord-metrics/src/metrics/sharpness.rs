//! 基于高斯-拉普拉斯 (LoG) 响应的锐度.

use log::debug;
use ndarray::Zip;

use super::{MetricError, RoiKind};
use crate::filter::{gaussian_filter, laplacian};
use crate::{Mask, Volume};

/// 计算 `volume` 在 `mask` (通常为脊髓掩膜) 内的锐度.
///
/// 先对整个体数据做标准差为 `sigma` 体素的 3D 高斯平滑 (`sigma = 0` 时不平滑),
/// 再做 7 点离散拉普拉斯, 得到 LoG 响应; 锐度为掩膜内 (权重严格为正的体素)
/// 响应的最大值. 掩膜权重只用于选择体素, 不参与加权.
///
/// # 注意
///
/// 1. `mask` 形状与 `volume` 不一致时返回 [`MetricError::ShapeMismatch`].
/// 2. `mask` 没有正权重体素时返回 [`MetricError::EmptyRoi`].
pub fn sharpness(volume: &Volume, mask: &Mask, sigma: f64) -> Result<f64, MetricError> {
    if volume.shape() != mask.shape() {
        return Err(MetricError::ShapeMismatch {
            roi: RoiKind::Cord,
            volume: volume.shape(),
            mask: mask.shape(),
        });
    }
    let smoothed = gaussian_filter(volume.data(), sigma, &[0, 1, 2]);
    let response = laplacian(smoothed.view());
    let mut inside = 0usize;
    let max = Zip::from(&response)
        .and(mask.data())
        .fold(f64::NEG_INFINITY, |acc, &r, &w| {
            if w > 0.0 {
                inside += 1;
                acc.max(r)
            } else {
                acc
            }
        });
    debug!("sharpness over {inside} voxels");
    if inside == 0 {
        return Err(MetricError::EmptyRoi(RoiKind::Cord));
    }
    Ok(max)
}
