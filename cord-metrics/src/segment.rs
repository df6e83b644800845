//! 分割协作者.
//!
//! 脊髓与灰质的自动分割由外部工具完成, 本库只消费其输出. [`Segmenter`] 抽象了
//! "由体数据得到掩膜" 这一能力; [`ManualSegmentation`] 直接读取已有的掩膜文件.

use std::path::PathBuf;

use log::debug;
use thiserror::Error;

use crate::{Mask, Volume, VolumeError};

/// 分割错误.
#[derive(Error, Debug)]
pub enum SegmentError {
    /// 读取掩膜失败.
    #[error("cannot load {what} segmentation from {path}: {source}")]
    Load {
        /// 掩膜种类.
        what: &'static str,
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: VolumeError,
    },

    /// 分割结果与体数据形状不一致. 形状以 (z, y, x) 给出.
    #[error("{what} segmentation shape {mask:?} differs from volume shape {volume:?}")]
    ShapeMismatch {
        /// 掩膜种类.
        what: &'static str,
        /// 体数据形状.
        volume: crate::Idx3d,
        /// 掩膜形状.
        mask: crate::Idx3d,
    },
}

type Result<T> = std::result::Result<T, SegmentError>;

/// 由体数据产生脊髓/灰质掩膜的能力.
pub trait Segmenter {
    /// 分割整个脊髓.
    fn segment_cord(&self, volume: &Volume) -> Result<Mask>;

    /// 分割灰质.
    fn segment_gray_matter(&self, volume: &Volume) -> Result<Mask>;
}

/// 从文件读取人工 (或预先计算好的) 分割结果.
#[derive(Debug, Clone)]
pub struct ManualSegmentation {
    /// 脊髓掩膜路径.
    pub cord: PathBuf,
    /// 灰质掩膜路径.
    pub gray_matter: PathBuf,
}

impl ManualSegmentation {
    /// 以两个掩膜路径创建.
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(cord: P, gray_matter: Q) -> Self {
        Self {
            cord: cord.into(),
            gray_matter: gray_matter.into(),
        }
    }

    fn load(what: &'static str, path: &PathBuf, volume: &Volume) -> Result<Mask> {
        debug!("loading {what} segmentation from {}", path.display());
        let mask = Mask::open(path).map_err(|source| SegmentError::Load {
            what,
            path: path.clone(),
            source,
        })?;
        if mask.shape() != volume.shape() {
            return Err(SegmentError::ShapeMismatch {
                what,
                volume: volume.shape(),
                mask: mask.shape(),
            });
        }
        Ok(mask)
    }
}

impl Segmenter for ManualSegmentation {
    fn segment_cord(&self, volume: &Volume) -> Result<Mask> {
        Self::load("cord", &self.cord, volume)
    }

    fn segment_gray_matter(&self, volume: &Volume) -> Result<Mask> {
        Self::load("gray matter", &self.gray_matter, volume)
    }
}

/// 白质掩膜 `max(cord - gm, 0)`.
///
/// 若两者形状不一致, 则程序 panic.
#[inline]
pub fn white_matter_mask(cord: &Mask, gray_matter: &Mask) -> Mask {
    cord.subtract_clipped(gray_matter)
}

/// 一组组织掩膜.
#[derive(Debug, Clone)]
pub struct TissueMasks {
    /// 脊髓.
    pub cord: Mask,
    /// 灰质.
    pub gray_matter: Mask,
    /// 白质, 由脊髓减去灰质得到.
    pub white_matter: Mask,
}

impl TissueMasks {
    /// 调用 `segmenter` 得到脊髓与灰质掩膜, 并推导白质掩膜.
    pub fn from_segmenter<S: Segmenter + ?Sized>(segmenter: &S, volume: &Volume) -> Result<Self> {
        let cord = segmenter.segment_cord(volume)?;
        let gray_matter = segmenter.segment_gray_matter(volume)?;
        if cord.shape() != gray_matter.shape() {
            return Err(SegmentError::ShapeMismatch {
                what: "gray matter",
                volume: cord.shape(),
                mask: gray_matter.shape(),
            });
        }
        let white_matter = white_matter_mask(&cord, &gray_matter);
        Ok(Self {
            cord,
            gray_matter,
            white_matter,
        })
    }
}
