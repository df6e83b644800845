//! 图像质量指标: SNR, 对比度, CNR 及单位时间 CNR, 以及锐度.
//!
//! 所有指标都先逐切片计算, 再在活跃切片上取算术平均.
//! 入口为 [`MetricEngine::compute`].

use log::{debug, info};

use crate::stats::SliceStatistic;
use crate::{AcquisitionDuration, Mask, Volume};

mod contrast;
mod error;
mod sharpness;
mod snr;
mod timing;

pub use contrast::{cnr, contrast, tissue_means, ContrastDenominator, TissueSlice};
pub use error::{MetricError, RoiKind};
pub use sharpness::sharpness;
pub use snr::{diff_statistics, slice_snr, snr};
pub use timing::{cnr_per_time, TimeNormalization};

type Result<T> = std::result::Result<T, MetricError>;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use crate::stats::par_slice_statistics as statistics;
    } else {
        use crate::stats::slice_statistics as statistics;
    }
}

/// 指标计算配置.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricConfig {
    /// 是否对单次采集 SNR 做 Rayleigh 校正. 默认关闭, 因为噪声 ROI 位于高信噪比组织内.
    pub rayleigh_correction: bool,
    /// 对比度的分母.
    pub contrast_denominator: ContrastDenominator,
    /// 单位时间 CNR 的归一化方式.
    pub time_normalization: TimeNormalization,
}

/// 一次计算的全部输入. 所有体数据与掩膜必须在同一体素网格上.
#[derive(Copy, Clone, Debug)]
pub struct MetricInputs<'a> {
    /// 第一次采集.
    pub data1: &'a Volume,
    /// 可选的第二次 (已配准) 采集.
    pub data2: Option<&'a Volume>,
    /// 噪声 ROI.
    pub noise: &'a Mask,
    /// 白质掩膜.
    pub white_matter: &'a Mask,
    /// 灰质掩膜.
    pub gray_matter: &'a Mask,
    /// 可选的采集时长.
    pub duration: Option<AcquisitionDuration>,
}

/// 计算结果. 缺少第二次采集或采集时长时, 对应字段为 `None`.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MetricResult {
    /// 单次采集 SNR.
    pub snr_single: f64,
    /// 差分法 SNR.
    pub snr_diff: Option<f64>,
    /// 对比度 (百分比). 存在第二次采集时, 取自两次采集的平均体数据.
    pub contrast: f64,
    /// 单次采集 CNR.
    pub cnr_single: f64,
    /// 差分法 CNR.
    pub cnr_diff: Option<f64>,
    /// 单位时间的单次采集 CNR.
    pub cnr_single_per_time: Option<f64>,
    /// 单位时间的差分法 CNR.
    pub cnr_diff_per_time: Option<f64>,
}

/// 指标计算引擎. 不持有任何数据, 只持有配置.
#[derive(Copy, Clone, Debug, Default)]
pub struct MetricEngine {
    config: MetricConfig,
}

impl MetricEngine {
    /// 以给定配置创建.
    #[inline]
    pub fn new(config: MetricConfig) -> Self {
        Self { config }
    }

    /// 获取配置.
    #[inline]
    pub fn config(&self) -> &MetricConfig {
        &self.config
    }

    /// 计算全部指标.
    ///
    /// # 注意
    ///
    /// 1. 任一掩膜形状与 `data1` 不一致时返回 [`MetricError::ShapeMismatch`];
    ///   `data2` 形状不一致时返回 [`MetricError::AcquisitionMismatch`].
    /// 2. 任一掩膜没有活跃切片时返回 [`MetricError::EmptyRoi`];
    ///   组织掩膜与噪声掩膜没有共同活跃切片时返回 [`MetricError::DisjointRois`].
    /// 3. 缺少 `data2` 或 `duration` 不是错误, 对应字段为 `None`.
    pub fn compute(&self, inputs: &MetricInputs) -> Result<MetricResult> {
        validate(inputs)?;
        let data1 = inputs.data1;

        let noise_single = statistics(data1, inputs.noise);
        debug!("noise ROI: {} active slices", noise_single.len());
        let snr_single = snr(&noise_single, self.config.rayleigh_correction)
            .ok_or(MetricError::EmptyRoi(RoiKind::Noise))?;
        let (mut contrast, cnr_single) = self.tissue_metrics(data1, inputs, &noise_single)?;

        let (snr_diff, cnr_diff) = match inputs.data2 {
            Some(data2) => {
                let mean = data1.mean_with(data2);
                let diff = data1.scaled_difference(data2);
                let noise_diff = diff_statistics(
                    &statistics(&mean, inputs.noise),
                    &statistics(&diff, inputs.noise),
                );
                let snr_diff =
                    snr(&noise_diff, false).ok_or(MetricError::EmptyRoi(RoiKind::Noise))?;
                // 平均体数据的对比度估计更精确, 覆盖单次采集的结果.
                let (c, cnr_diff) = self.tissue_metrics(&mean, inputs, &noise_diff)?;
                contrast = c;
                (Some(snr_diff), Some(cnr_diff))
            }
            None => {
                info!("no second acquisition, diff metrics are undefined");
                (None, None)
            }
        };

        if inputs.duration.is_none() {
            info!("no acquisition duration, CNR per unit time is undefined");
        }
        let norm = self.config.time_normalization;
        Ok(MetricResult {
            snr_single,
            snr_diff,
            contrast,
            cnr_single,
            cnr_diff,
            cnr_single_per_time: cnr_per_time(cnr_single, inputs.duration, norm),
            cnr_diff_per_time: cnr_diff.and_then(|c| cnr_per_time(c, inputs.duration, norm)),
        })
    }

    /// 在 `volume` 上计算 (对比度, CNR).
    fn tissue_metrics(
        &self,
        volume: &Volume,
        inputs: &MetricInputs,
        noise: &[SliceStatistic],
    ) -> Result<(f64, f64)> {
        let tissue = tissue_means(volume, inputs.white_matter, inputs.gray_matter);
        let contrast = contrast(&tissue, self.config.contrast_denominator).ok_or(
            MetricError::DisjointRois(RoiKind::WhiteMatter, RoiKind::GrayMatter),
        )?;
        let cnr = cnr(&tissue, noise).ok_or(MetricError::DisjointRois(
            RoiKind::WhiteMatter,
            RoiKind::Noise,
        ))?;
        Ok((contrast, cnr))
    }
}

/// 检查形状与掩膜非空.
fn validate(inputs: &MetricInputs) -> Result<()> {
    let volume = inputs.data1.shape();
    if let Some(data2) = inputs.data2 {
        if data2.shape() != volume {
            return Err(MetricError::AcquisitionMismatch {
                first: volume,
                second: data2.shape(),
            });
        }
    }
    let masks = [
        (RoiKind::Noise, inputs.noise),
        (RoiKind::WhiteMatter, inputs.white_matter),
        (RoiKind::GrayMatter, inputs.gray_matter),
    ];
    for (roi, mask) in masks {
        if mask.shape() != volume {
            return Err(MetricError::ShapeMismatch {
                roi,
                volume,
                mask: mask.shape(),
            });
        }
    }
    for (roi, mask) in masks {
        if mask.active_slices().is_empty() {
            return Err(MetricError::EmptyRoi(roi));
        }
    }
    Ok(())
}
