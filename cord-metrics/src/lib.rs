#![warn(missing_docs)]

//! 核心库. 提供脊髓 MRI 体数据 (及其 ROI 掩膜) 的结构化信息和图像质量指标计算.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 外部分割/配准工具 (如 `sct_deepseg_sc`, `sct_register_multimodal`) 不在本库实现范围内.
//!   本库只消费它们的输出 (掩膜文件), 见 [`segment`].
//! 2. 所有计算均为单次调用内的纯函数式批处理, 不存在全局状态.
//!
//! # 开发计划
//!
//! ### 加权切片统计量 ✅
//!
//! 在每个 "活跃" z 切片 (掩膜上至少有一个严格正权重) 上计算加权均值与加权总体标准差.
//! 标准差使用两遍法 (先求均值, 再求二阶中心矩), 避免 `E[X²] - E[X]²` 的灾难性抵消.
//!
//! 实现位于 `cord-metrics/src/stats.rs`.
//!
//! ### SNR (single / diff) ✅
//!
//! 单次采集 SNR, 可选 Rayleigh 校正; 双次采集 (scan-rescan) 差分法 SNR.
//! 差分法噪声估计中的 `1/sqrt(2)` 因子来自 `Var(A - B) = Var(A) + Var(B)`.
//!
//! 实现位于 `cord-metrics/src/metrics/snr.rs`.
//!
//! ### 对比度, CNR, 单位时间 CNR ✅
//!
//! 白质/灰质均值差, 以百分比表示. 若存在第二次采集, 则用两次采集的平均体数据
//! 覆盖单次采集的对比度估计.
//!
//! 实现位于 `cord-metrics/src/metrics/contrast.rs` 和 `cord-metrics/src/metrics/timing.rs`.
//!
//! ### 锐度 ✅
//!
//! 脊髓掩膜内高斯-拉普拉斯 (LoG) 响应的最大值.
//!
//! 实现位于 `cord-metrics/src/metrics/sharpness.rs`.
//!
//! ### 合成体模 ✅
//!
//! 从 PAM50 白质/灰质图谱生成带噪声 (及可选平滑) 的合成体模, 以及对应的掩膜.
//!
//! 实现位于 `cord-metrics/src/phantom`.
//!
//! ### 结果表 ✅
//!
//! 追加写入的 CSV 表, 固定表头, 未定义值写为空单元格.
//!
//! 实现位于 `cord-metrics/src/sink.rs`.

/// 二维索引 (y, x).
pub type Idx2d = (usize, usize);

/// 三维索引 (z, y, x). 这是本库内部统一的访问顺序.
pub type Idx3d = (usize, usize, usize);

/// nii 体数据与掩膜的基础数据结构.
mod data;

pub use data::{
    AcquisitionDuration, Mask, MaskSlice, NiftiHeaderAttr, Sidecar, SidecarError, Volume,
    VolumeError, VolumeSlice,
};

pub mod consts;

mod filter;

pub mod metrics;

pub mod phantom;

pub mod prelude;
pub mod segment;
pub mod sink;
pub mod stats;
