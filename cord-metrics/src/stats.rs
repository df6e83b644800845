//! 加权统计量.
//!
//! 所有统计量都以 z 切片为单位计算, 且只在 "活跃" 切片 (掩膜存在严格正权重) 上计算.
//! 非活跃切片不会出现在任何结果列表中, 也不会以 0 填充.

use ndarray::{ArrayView, Dimension};
use num::Float;

use crate::{Mask, Volume};

/// 单个活跃切片上的加权统计量.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SliceStatistic {
    /// 切片的 z 索引.
    pub z: usize,
    /// 加权均值.
    pub mean: f64,
    /// 加权总体标准差.
    pub std: f64,
}

/// 加权和与权重和. 若两者形状不一致, 则程序 panic.
fn weighted_sums<T: Float, D: Dimension>(
    values: &ArrayView<T, D>,
    weights: &ArrayView<T, D>,
) -> (T, T) {
    assert_eq!(values.shape(), weights.shape(), "数据与权重形状不一致");
    values
        .iter()
        .zip(weights.iter())
        .fold((T::zero(), T::zero()), |(s, ws), (&v, &w)| (s + v * w, ws + w))
}

/// 加权均值 `Σ(v·w) / Σw`.
///
/// 权重和不为正 (即掩膜不活跃) 时返回 `None`.
///
/// # 注意
///
/// 权重必须非负. 若两者形状不一致, 则程序 panic.
pub fn weighted_mean<T: Float, D: Dimension>(
    values: ArrayView<T, D>,
    weights: ArrayView<T, D>,
) -> Option<T> {
    let (sum, weight_sum) = weighted_sums(&values, &weights);
    (weight_sum > T::zero()).then(|| sum / weight_sum)
}

/// 加权均值与加权总体标准差 `sqrt(Σ(w·(v - mean)²) / Σw)`.
///
/// 采用两遍法: 先求加权均值, 再求加权二阶中心矩.
/// 权重和不为正时返回 `None`.
///
/// # 注意
///
/// 权重必须非负. 若两者形状不一致, 则程序 panic.
pub fn weighted_mean_std<T: Float, D: Dimension>(
    values: ArrayView<T, D>,
    weights: ArrayView<T, D>,
) -> Option<(T, T)> {
    let (sum, weight_sum) = weighted_sums(&values, &weights);
    if weight_sum <= T::zero() {
        return None;
    }
    let mean = sum / weight_sum;
    let moment = values
        .iter()
        .zip(weights.iter())
        .fold(T::zero(), |acc, (&v, &w)| {
            let d = v - mean;
            acc + w * d * d
        });
    Some((mean, (moment / weight_sum).sqrt()))
}

/// 列表的算术平均. 空列表返回 `None`.
///
/// 用于将逐切片的值聚合为整体值, 分母是活跃切片个数而不是切片总数.
pub fn active_mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// 逐切片计算 `volume` 在 `mask` 内的加权统计量, 按 z 升序. 非活跃切片被跳过.
///
/// 若两者形状不一致, 则程序 panic.
pub fn slice_statistics(volume: &Volume, mask: &Mask) -> Vec<SliceStatistic> {
    assert_eq!(volume.shape(), mask.shape(), "体数据与掩膜形状不一致");
    volume
        .slice_iter()
        .zip(mask.slice_iter())
        .enumerate()
        .filter_map(|(z, (v, m))| v.statistic(z, &m))
        .collect()
}

/// 逐切片计算 `volume` 在 `mask` 内的加权均值, 按 z 升序. 非活跃切片被跳过.
///
/// 若两者形状不一致, 则程序 panic.
pub fn slice_means(volume: &Volume, mask: &Mask) -> Vec<(usize, f64)> {
    assert_eq!(volume.shape(), mask.shape(), "体数据与掩膜形状不一致");
    volume
        .slice_iter()
        .zip(mask.slice_iter())
        .enumerate()
        .filter_map(|(z, (v, m))| v.weighted_mean(&m).map(|mean| (z, mean)))
        .collect()
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use ndarray::Axis;
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};

        /// [`slice_statistics`] 的并行版本. 结果同样按 z 升序.
        ///
        /// 若两者形状不一致, 则程序 panic.
        pub fn par_slice_statistics(volume: &Volume, mask: &Mask) -> Vec<SliceStatistic> {
            assert_eq!(volume.shape(), mask.shape(), "体数据与掩膜形状不一致");
            let (values, weights) = (volume.data(), mask.data());
            values
                .axis_iter(Axis(0))
                .into_par_iter()
                .zip(weights.axis_iter(Axis(0)).into_par_iter())
                .enumerate()
                .filter_map(|(z, (v, w))| {
                    weighted_mean_std(v, w).map(|(mean, std)| SliceStatistic { z, mean, std })
                })
                .collect()
        }
    }
}
