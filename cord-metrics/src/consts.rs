//! 通用常量.

/// Rayleigh (Rician 背景) 噪声校正系数 `sqrt((4 - π) / 2)`, 约为 0.6551.
///
/// 参见 Dietrich et al. 附录公式 A12.
#[inline]
pub fn rayleigh_factor() -> f64 {
    ((4.0 - std::f64::consts::PI) / 2.0).sqrt()
}

/// JSON sidecar 中记录采集时长 (秒) 的字段名.
pub const ACQUISITION_DURATION_KEY: &str = "AcquisitionDuration";

/// 部分容积图谱/掩膜二值化的默认阈值.
pub const BINARIZE_THRESHOLD: f64 = 0.5;

/// 锐度计算时, LoG 高斯核的默认标准差 (体素).
pub const DEFAULT_SHARPNESS_SIGMA: f64 = 3.0;

/// 合成体模的默认参数.
pub mod phantom {
    /// 白质信号强度.
    pub const WM_VALUE: f64 = 100.0;

    /// 灰质信号强度扫描值.
    pub const GM_VALUES: [f64; 4] = [120.0, 140.0, 160.0, 180.0];

    /// 高斯噪声标准差扫描值.
    pub const NOISE_STDS: [f64; 3] = [1.0, 5.0, 10.0];

    /// 高斯平滑核标准差扫描值 (体素).
    pub const SMOOTHING: [f64; 3] = [0.0, 0.5, 1.0];

    /// 截取图谱的中心 z 切片. 850 约对应 C4 中段 (颈膨大).
    pub const Z_CENTER: usize = 850;

    /// 截取图谱的 z 切片个数.
    pub const NUM_SLICES: usize = 10;

    /// 图谱未给出组合标签时, 白质 tract 的默认索引范围.
    pub const WM_TRACTS: std::ops::Range<usize> = 0..30;

    /// 图谱未给出组合标签时, 灰质 tract 的默认索引范围.
    pub const GM_TRACTS: std::ops::Range<usize> = 30..36;

    /// 图谱标签描述文件名.
    pub const INFO_LABEL_FILE: &str = "info_label.txt";

    /// 图谱目录相对于 SCT 安装目录的路径.
    pub const ATLAS_SUBDIR: [&str; 3] = ["data", "PAM50", "atlas"];
}
