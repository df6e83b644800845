//! 体数据/掩膜水平切片对象.

use std::ops::Index;

use ndarray::ArrayView2;

use crate::stats::{self, SliceStatistic};
use crate::Idx2d;

/// 不可变、借用的二维体数据切片.
pub struct VolumeSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::Volume`].
    data: ArrayView2<'a, f64>,
}

/// 不可变、借用的二维掩膜切片.
pub struct MaskSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::Mask`].
    data: ArrayView2<'a, f64>,
}

/// 切片共用方法集合.
macro_rules! impl_slice_common {
    ($slice: ident) => {
        impl<'a> $slice<'a> {
            /// 直接初始化.
            #[inline]
            pub(crate) fn new(data: ArrayView2<'a, f64>) -> Self {
                Self { data }
            }
        }

        impl Index<Idx2d> for $slice<'_> {
            type Output = f64;

            #[inline]
            fn index(&self, index: Idx2d) -> &Self::Output {
                &self.data[index]
            }
        }
    };
}

impl_slice_common!(VolumeSlice);
impl_slice_common!(MaskSlice);

impl VolumeSlice<'_> {
    /// 以 `mask` 为权重的加权均值. `mask` 不活跃时返回 `None`.
    ///
    /// 若两者形状不一致, 则程序 panic.
    #[inline]
    pub fn weighted_mean(&self, mask: &MaskSlice) -> Option<f64> {
        stats::weighted_mean(self.data.view(), mask.data.view())
    }

    /// 以 `mask` 为权重的加权均值与加权总体标准差. `mask` 不活跃时返回 `None`.
    ///
    /// 若两者形状不一致, 则程序 panic.
    #[inline]
    pub fn weighted_mean_std(&self, mask: &MaskSlice) -> Option<(f64, f64)> {
        stats::weighted_mean_std(self.data.view(), mask.data.view())
    }

    /// 计算第 `z` 层切片在 `mask` 内的统计量. `mask` 不活跃时返回 `None`.
    #[inline]
    pub fn statistic(&self, z: usize, mask: &MaskSlice) -> Option<SliceStatistic> {
        self.weighted_mean_std(mask)
            .map(|(mean, std)| SliceStatistic { z, mean, std })
    }
}

impl MaskSlice<'_> {
    /// 切片是否 "活跃", 即存在至少一个严格正权重.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.data.iter().any(|w| *w > 0.0)
    }
}
