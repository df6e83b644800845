//! 信噪比.

use itertools::{EitherOrBoth, Itertools};
use log::warn;

use crate::consts::rayleigh_factor;
use crate::stats::{active_mean, SliceStatistic};

/// 合并差分法的两组切片统计: 均值取自两次采集的平均体数据 `mean`,
/// 标准差取自缩放差体数据 `diff`. 以 z 对齐, 只保留两边都存在的切片.
pub fn diff_statistics(mean: &[SliceStatistic], diff: &[SliceStatistic]) -> Vec<SliceStatistic> {
    mean.iter()
        .merge_join_by(diff.iter(), |a, b| a.z.cmp(&b.z))
        .filter_map(|pair| match pair {
            EitherOrBoth::Both(m, d) => Some(SliceStatistic {
                z: m.z,
                mean: m.mean,
                std: d.std,
            }),
            _ => None,
        })
        .collect()
}

/// 逐切片 SNR `mean / std`. 噪声为 0 的切片得到 `inf`, 并记录警告.
pub fn slice_snr(noise: &[SliceStatistic]) -> Vec<(usize, f64)> {
    noise
        .iter()
        .map(|s| {
            if s.std == 0.0 {
                warn!("zero noise on slice {}, SNR is infinite", s.z);
            }
            (s.z, s.mean / s.std)
        })
        .collect()
}

/// 整体 SNR: 各活跃切片 SNR 的算术平均.
///
/// `rayleigh_correction` 为真时, 每个切片的 SNR 在平均前乘以 `sqrt((4 - π) / 2)`.
/// `noise` 为空时返回 `None`.
pub fn snr(noise: &[SliceStatistic], rayleigh_correction: bool) -> Option<f64> {
    let factor = if rayleigh_correction {
        rayleigh_factor()
    } else {
        1.0
    };
    active_mean(slice_snr(noise).into_iter().map(|(_, v)| v * factor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stat(z: usize, mean: f64, std: f64) -> SliceStatistic {
        SliceStatistic { z, mean, std }
    }

    #[test]
    fn test_snr_averages_active_slices() {
        let noise = [stat(0, 100.0, 2.0), stat(3, 90.0, 3.0)];
        assert_relative_eq!(snr(&noise, false).unwrap(), 40.0);
        assert_eq!(snr(&[], false), None);
    }

    #[test]
    fn test_rayleigh_toggle() {
        let noise = [stat(0, 100.0, 2.0), stat(1, 30.0, 1.5)];
        let plain = snr(&noise, false).unwrap();
        let corrected = snr(&noise, true).unwrap();
        assert_relative_eq!(corrected, plain * ((4.0 - std::f64::consts::PI) / 2.0).sqrt());
        assert_relative_eq!(rayleigh_factor(), 0.6551, epsilon = 1e-4);
    }

    #[test]
    fn test_zero_noise_is_infinite() {
        let noise = [stat(0, 10.0, 0.0)];
        assert_eq!(snr(&noise, false), Some(f64::INFINITY));
    }

    #[test]
    fn test_diff_statistics_alignment() {
        let mean = [stat(0, 100.0, 9.0), stat(2, 110.0, 9.0)];
        let diff = [stat(0, 0.1, 2.0), stat(1, 0.0, 1.0), stat(2, -0.1, 4.0)];
        let merged = diff_statistics(&mean, &diff);
        assert_eq!(merged, vec![stat(0, 100.0, 2.0), stat(2, 110.0, 4.0)]);
    }
}
