//! 白质/灰质对比度与对比噪声比.

use itertools::{EitherOrBoth, Itertools};
use log::warn;

use crate::stats::{active_mean, slice_means, SliceStatistic};
use crate::{Mask, Volume};

/// 对比度的分母.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ContrastDenominator {
    /// 白质均值.
    #[default]
    WhiteMatter,
    /// 白质与灰质均值中的较小者. 交换两种组织标签时结果不变.
    Min,
}

/// 同一切片上两种组织的加权均值.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TissueSlice {
    /// 切片的 z 索引.
    pub z: usize,
    /// 白质加权均值.
    pub wm: f64,
    /// 灰质加权均值.
    pub gm: f64,
}

impl TissueSlice {
    /// 两种组织的信号差 `|wm - gm|`.
    #[inline]
    pub fn difference(&self) -> f64 {
        (self.wm - self.gm).abs()
    }

    /// 相对对比度 (非百分比).
    #[inline]
    pub fn contrast(&self, denominator: ContrastDenominator) -> f64 {
        let d = match denominator {
            ContrastDenominator::WhiteMatter => self.wm,
            ContrastDenominator::Min => self.wm.min(self.gm),
        };
        self.difference() / d
    }
}

/// 逐切片计算白质与灰质的加权均值, 只保留两者都活跃的切片, 按 z 升序.
///
/// 若掩膜形状与体数据不一致, 则程序 panic.
pub fn tissue_means(volume: &Volume, wm: &Mask, gm: &Mask) -> Vec<TissueSlice> {
    let wm_means = slice_means(volume, wm);
    let gm_means = slice_means(volume, gm);
    wm_means
        .into_iter()
        .merge_join_by(gm_means, |a, b| a.0.cmp(&b.0))
        .filter_map(|pair| match pair {
            EitherOrBoth::Both((z, wm), (_, gm)) => Some(TissueSlice { z, wm, gm }),
            _ => None,
        })
        .collect()
}

/// 对比度 (百分比): `100 × mean(|wm - gm| / denominator)`. `tissue` 为空时返回 `None`.
pub fn contrast(tissue: &[TissueSlice], denominator: ContrastDenominator) -> Option<f64> {
    active_mean(tissue.iter().map(|t| t.contrast(denominator))).map(|c| 100.0 * c)
}

/// 对比噪声比: `mean(|wm - gm| / noise_std)`, 只在组织与噪声 ROI 都活跃的切片上计算.
/// 没有共同切片时返回 `None`.
pub fn cnr(tissue: &[TissueSlice], noise: &[SliceStatistic]) -> Option<f64> {
    let per_slice = tissue
        .iter()
        .merge_join_by(noise.iter(), |t, n| t.z.cmp(&n.z))
        .filter_map(|pair| match pair {
            EitherOrBoth::Both(t, n) => {
                if n.std == 0.0 {
                    warn!("zero noise on slice {}, CNR is infinite", t.z);
                }
                Some(t.difference() / n.std)
            }
            _ => None,
        });
    active_mean(per_slice)
}
