//! 由白质/灰质图谱生成合成体模.
//!
//! 体模 = Σ 白质 tract × `wm_value` + Σ 灰质 tract × `gm_value`, 再做 3D 高斯平滑,
//! 最后叠加高斯噪声. 每个 tract 内部信号均匀, 不引入组织内部的异质性.

use std::path::{Path, PathBuf};

use log::debug;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use thiserror::Error;

use crate::consts::phantom::ATLAS_SUBDIR;
use crate::filter::gaussian_filter;
use crate::{Idx3d, Volume, VolumeError};

mod atlas;
mod record;

pub use atlas::{Atlas, LabelFile, TractLabel};
pub use record::PhantomRecord;

/// 体模生成/读写错误.
#[derive(Error, Debug)]
pub enum PhantomError {
    /// 底层 I/O 错误.
    #[error("IO error {0}")]
    Io(#[from] std::io::Error),

    /// 体数据读写错误.
    #[error(transparent)]
    Volume(#[from] VolumeError),

    /// CSV 读写错误.
    #[error("CSV error {0}")]
    Csv(#[from] csv::Error),

    /// `info_label.txt` 中的非法行.
    #[error("malformed label line {line}: '{content}'")]
    Label {
        /// 行号, 从 1 开始.
        line: usize,
        /// 行内容.
        content: String,
    },

    /// 组合标签引用了不存在的 tract ID.
    #[error("combined label refers to unknown tract id {0}")]
    UnknownLabel(usize),

    /// 图谱没有任何 tract.
    #[error("atlas contains no tract")]
    NoTracts,

    /// tract 形状不一致.
    #[error("tract shape {found:?} differs from {expected:?}")]
    TractShape {
        /// 第一个 tract 的形状.
        expected: Idx3d,
        /// 不一致的形状.
        found: Idx3d,
    },

    /// 白质/灰质 tract 位置越界.
    #[error("tract index {index} out of range ({len} tracts)")]
    TractIndex {
        /// 越界的位置.
        index: usize,
        /// tract 个数.
        len: usize,
    },

    /// z 截取范围越界. `start` 为 `None` 表示下界为负.
    #[error("slice range {start:?}..{end} out of atlas range (z length {len:?})")]
    Crop {
        /// 下界.
        start: Option<usize>,
        /// 上界 (不含).
        end: usize,
        /// 图谱 z 长度.
        len: Option<usize>,
    },

    /// 体模参数非法.
    #[error("invalid phantom parameters: {0}")]
    InvalidParams(String),

    /// 体模元数据文件缺少字段或字段非法.
    #[error("invalid phantom record {path}: {reason}")]
    Record {
        /// 文件路径.
        path: PathBuf,
        /// 原因.
        reason: String,
    },
}

type Result<T> = std::result::Result<T, PhantomError>;

/// 单个体模的参数.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PhantomParams {
    /// 白质信号强度.
    pub wm_value: f64,
    /// 灰质信号强度.
    pub gm_value: f64,
    /// 高斯噪声标准差. 为 0 时不加噪声.
    pub noise_std: f64,
    /// 高斯平滑核标准差 (体素). 为 0 时不平滑.
    pub smoothing: f64,
}

impl PhantomParams {
    /// 检查参数: 信号强度必须有限, 噪声与平滑必须是有限非负数.
    pub fn validate(&self) -> Result<()> {
        let check = |name: &str, v: f64, non_negative: bool| {
            if !v.is_finite() || (non_negative && v < 0.0) {
                Err(PhantomError::InvalidParams(format!("{name} = {v}")))
            } else {
                Ok(())
            }
        };
        check("wm_value", self.wm_value, false)?;
        check("gm_value", self.gm_value, false)?;
        check("noise_std", self.noise_std, true)?;
        check("smoothing", self.smoothing, true)
    }

    /// 文件名主干 `phantom_WM{wm}_GM{gm}_Noise{noise}_Smooth{smooth}`.
    pub fn stem(&self) -> String {
        format!(
            "phantom_WM{}_GM{}_Noise{}_Smooth{}",
            self.wm_value, self.gm_value, self.noise_std, self.smoothing
        )
    }

    /// 以固定白质强度, 遍历灰质强度、噪声与平滑的所有组合. 顺序为灰质、噪声、平滑由外到内.
    pub fn sweep(wm_value: f64, gm_values: &[f64], noise_stds: &[f64], smoothing: &[f64]) -> Vec<Self> {
        let mut out = Vec::with_capacity(gm_values.len() * noise_stds.len() * smoothing.len());
        for &gm_value in gm_values {
            for &noise_std in noise_stds {
                for &smoothing in smoothing {
                    out.push(Self {
                        wm_value,
                        gm_value,
                        noise_std,
                        smoothing,
                    });
                }
            }
        }
        out
    }
}

/// 获取 `{用户主目录}/sct/data/PAM50/atlas` 目录.
pub fn home_atlas_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("sct");
    ans.extend(ATLAS_SUBDIR);
    Some(ans)
}

/// 生成一个体模. header 取自图谱.
pub fn generate<R: Rng + ?Sized>(atlas: &Atlas, params: &PhantomParams, rng: &mut R) -> Result<Volume> {
    params.validate()?;
    debug!("generating {}", params.stem());
    let mut data = atlas.weighted_sum(atlas.white_matter_tracts(), params.wm_value)
        + atlas.weighted_sum(atlas.gray_matter_tracts(), params.gm_value);
    if params.smoothing > 0.0 {
        data = gaussian_filter(data.view(), params.smoothing, &[0, 1, 2]);
    }
    if params.noise_std > 0.0 {
        let normal = Normal::new(0.0, params.noise_std)
            .map_err(|e| PhantomError::InvalidParams(e.to_string()))?;
        data.mapv_inplace(|v| v + normal.sample(rng));
    }
    Ok(Volume::with_header_of(atlas.reference(), data))
}

/// 生成一个体模并写入 `folder`: `{stem}.nii.gz` 与元数据 `{stem}.csv`.
pub fn write_phantom<R: Rng + ?Sized>(
    folder: &Path,
    atlas: &Atlas,
    params: &PhantomParams,
    rng: &mut R,
) -> Result<PhantomRecord> {
    let volume = generate(atlas, params, rng)?;
    let record = PhantomRecord::from_params(params);
    volume.save(folder.join(&record.file))?;
    record.save(folder)?;
    Ok(record)
}

/// 脊髓、灰质、白质掩膜文件名.
pub const MASK_FILES: [&str; 3] = ["mask_cord.nii.gz", "mask_gm.nii.gz", "mask_wm.nii.gz"];

/// 将图谱的脊髓、灰质、白质掩膜写入 `folder`, 文件名见 [`MASK_FILES`].
pub fn write_masks(folder: &Path, atlas: &Atlas) -> Result<()> {
    let [cord, gm, wm] = MASK_FILES;
    atlas.cord_mask().save(folder.join(cord))?;
    atlas.gray_matter_mask().save(folder.join(gm))?;
    atlas.white_matter_mask().save(folder.join(wm))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mask;
    use approx::assert_relative_eq;
    use ndarray::Array3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn atlas() -> Atlas {
        let tract = |x0: usize| {
            Mask::from_xyz(Array3::from_shape_fn((8, 8, 4), |(x, _, _)| (x / 2 == x0) as u8 as f64))
                .unwrap()
        };
        Atlas::from_tracts(vec![tract(0), tract(1), tract(2)], vec![0, 1], vec![2]).unwrap()
    }

    fn params(noise_std: f64, smoothing: f64) -> PhantomParams {
        PhantomParams {
            wm_value: 100.0,
            gm_value: 140.0,
            noise_std,
            smoothing,
        }
    }

    #[test]
    fn test_noiseless_phantom() {
        let mut rng = StdRng::seed_from_u64(0);
        let v = generate(&atlas(), &params(0.0, 0.0), &mut rng).unwrap();
        assert_eq!(v.shape(), (4, 8, 8));
        assert_eq!(v[(0, 0, 1)], 100.0);
        assert_eq!(v[(0, 0, 3)], 100.0);
        assert_eq!(v[(0, 0, 4)], 140.0);
        assert_eq!(v[(0, 0, 7)], 0.0);
    }

    #[test]
    fn test_smoothing_keeps_total_signal() {
        let mut rng = StdRng::seed_from_u64(0);
        let a = atlas();
        let crisp = generate(&a, &params(0.0, 0.0), &mut rng).unwrap();
        let smooth = generate(&a, &params(0.0, 1.0), &mut rng).unwrap();
        assert!(smooth[(0, 0, 4)] < 140.0);
        assert!(smooth[(0, 0, 6)] > 0.0);
        assert_relative_eq!(
            smooth.data().sum(),
            crisp.data().sum(),
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_tiny_smoothing_is_no_smoothing() {
        let mut rng = StdRng::seed_from_u64(0);
        let a = atlas();
        let crisp = generate(&a, &params(0.0, 0.0), &mut rng).unwrap();
        let tiny = generate(&a, &params(0.0, 1e-200), &mut rng).unwrap();
        assert_eq!(tiny.data(), crisp.data());
    }

    #[test]
    fn test_noise_is_seeded() {
        let a = atlas();
        let p = params(5.0, 0.0);
        let v1 = generate(&a, &p, &mut StdRng::seed_from_u64(42)).unwrap();
        let v2 = generate(&a, &p, &mut StdRng::seed_from_u64(42)).unwrap();
        let v3 = generate(&a, &p, &mut StdRng::seed_from_u64(43)).unwrap();
        assert_eq!(v1.data(), v2.data());
        assert_ne!(v1.data(), v3.data());
    }

    #[test]
    fn test_invalid_params() {
        let mut rng = StdRng::seed_from_u64(0);
        for p in [params(-1.0, 0.0), params(0.0, f64::NAN), params(f64::INFINITY, 0.0)] {
            assert!(matches!(
                generate(&atlas(), &p, &mut rng),
                Err(PhantomError::InvalidParams(_))
            ));
        }
    }

    #[test]
    fn test_sweep_and_stem() {
        let all = PhantomParams::sweep(100.0, &[120.0, 140.0], &[1.0, 5.0, 10.0], &[0.0, 0.5]);
        assert_eq!(all.len(), 12);
        assert_eq!(all[0].stem(), "phantom_WM100_GM120_Noise1_Smooth0");
        assert_eq!(all[11].stem(), "phantom_WM100_GM140_Noise10_Smooth0.5");
    }

    #[test]
    fn test_write_phantom_and_masks() {
        let dir = tempfile::TempDir::new().unwrap();
        let a = atlas();
        let record = write_phantom(dir.path(), &a, &params(1.0, 0.5), &mut StdRng::seed_from_u64(1)).unwrap();
        write_masks(dir.path(), &a).unwrap();

        let back = PhantomRecord::open(dir.path().join("phantom_WM100_GM140_Noise1_Smooth0.5.csv")).unwrap();
        assert_eq!(back, record);
        assert_eq!(Volume::open(dir.path().join(&record.file)).unwrap().shape(), (4, 8, 8));
        for name in MASK_FILES {
            let m = Mask::open(dir.path().join(name)).unwrap();
            assert!(!m.active_slices().is_empty());
        }
    }
}
