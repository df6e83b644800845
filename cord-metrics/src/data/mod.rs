use std::ops::{Index, Range};
use std::path::Path;

use ndarray::{s, Array3, Array4, ArrayView, ArrayView3, Axis, Ix3, Ix4, Zip};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::Idx3d;

mod error;
mod sidecar;
pub mod slice;

pub use error::VolumeError;
pub use sidecar::{AcquisitionDuration, Sidecar, SidecarError};
pub use slice::{MaskSlice, VolumeSlice};

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

type Result<T> = std::result::Result<T, VolumeError>;

/// nii 文件 header 的共用属性.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;
}

/// 合成数据的最小 header. 体素分辨率为 1mm 各向同性, 维度在保存时写入.
fn synthetic_header() -> BoxedHeader {
    let mut header = Box::<NiftiHeader>::default();
    header.pixdim = [1.0; 8];
    header
}

/// (z, y, x) 形状对应的 nifti `dim` 字段. 任一维超出 `u16` 时返回 [`VolumeError::TooLarge`].
fn nifti_dim((z, y, x): Idx3d) -> Result<[u16; 8]> {
    let cast = |n: usize| u16::try_from(n).map_err(|_| VolumeError::TooLarge(n));
    Ok([3, cast(x)?, cast(y)?, cast(z)?, 1, 1, 1, 1])
}

/// 读取 nii 文件, 返回 header 和按 (x, y, z, t) 组织的数据.
///
/// 2D 文件视为 z = 1, 3D 文件视为 t = 1.
fn read_xyzt(path: &Path) -> Result<(BoxedHeader, Array4<f64>)> {
    let obj = ReaderOptions::new().read_file(path)?;
    let header = Box::new(obj.header().clone());
    let data = obj.into_volume().into_ndarray::<f64>()?;
    let data = match data.ndim() {
        2 => data.insert_axis(Axis(2)).insert_axis(Axis(3)),
        3 => data.insert_axis(Axis(3)),
        4 => data,
        n => return Err(VolumeError::Dimension(n)),
    };
    Ok((header, data.into_dimensionality::<Ix4>()?))
}

/// (x, y, z) -> (z, y, x), 并保证结果为行优先存储.
#[inline]
fn xyz_to_zyx(xyz: ArrayView3<f64>) -> Array3<f64> {
    xyz.permuted_axes([2, 1, 0]).as_standard_layout().into_owned()
}

/// 按 nifti 惯用的 (x, y, z) 顺序写出 (z, y, x) 数据. header 的维度按 `data` 改写.
fn write_zyx(path: &Path, header: &NiftiHeader, data: &Array3<f64>) -> Result<()> {
    let mut header = header.clone();
    header.dim = nifti_dim(data.dim())?;
    let xyz = data.view().permuted_axes([2, 1, 0]);
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(&xyz)?;
    Ok(())
}

/// 打开 nii 文件的所有时间帧. 每一帧的 header 被改写为 3D.
fn open_frames_raw(path: &Path) -> Result<Vec<(BoxedHeader, Array3<f64>)>> {
    let (header, data) = read_xyzt(path)?;
    let frames = data
        .axis_iter(Axis(3))
        .map(|frame| {
            let mut h = header.clone();
            h.dim[0] = 3;
            h.dim[4] = 1;
            (h, xyz_to_zyx(frame))
        })
        .collect();
    Ok(frames)
}

/// 体数据与掩膜共用的方法集合.
macro_rules! impl_volume_common {
    ($ty: ty, $slice: ident) => {
        impl NiftiHeaderAttr for $ty {
            #[inline]
            fn header(&self) -> &NiftiHeader {
                &self.header
            }
        }

        impl Index<Idx3d> for $ty {
            type Output = f64;

            #[inline]
            fn index(&self, index: Idx3d) -> &Self::Output {
                &self.data[index]
            }
        }

        impl $ty {
            /// 获取数据形状大小 (z, y, x).
            #[inline]
            pub fn shape(&self) -> Idx3d {
                self.data.dim()
            }

            /// 获取 z 切片个数.
            #[inline]
            pub fn len_z(&self) -> usize {
                self.shape().0
            }

            /// 获得数据的一份不可变 shallow copy, 按 (z, y, x) 组织.
            #[inline]
            pub fn data(&self) -> ArrayView<'_, f64, Ix3> {
                self.data.view()
            }

            /// 获取 z 空间的第 `z_index` 层切片视图.
            ///
            /// 当 `z_index` 越界时 panic.
            #[inline]
            pub fn slice_at(&self, z_index: usize) -> $slice<'_> {
                $slice::new(self.data.index_axis(Axis(0), z_index))
            }

            /// 获取能按升序迭代水平切片的迭代器.
            #[inline]
            pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = $slice<'_>> {
                self.data.axis_iter(Axis(0)).map($slice::new)
            }

            /// 以 nii 格式保存到 `path`. 数据会被转换回 nifti 惯用的 (x, y, z) 顺序.
            pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
                write_zyx(path.as_ref(), &self.header, &self.data)
            }
        }
    };
}

/// nii 格式 3D MRI 体数据, 包括 header 和信号强度. 强度以 `f64` 保存.
#[derive(Debug, Clone)]
pub struct Volume {
    header: BoxedHeader,
    data: Array3<f64>,
}

impl_volume_common!(Volume, VolumeSlice);

impl Volume {
    /// 打开 nii 文件格式的 3D 体数据. `path` 为 nii 文件的本地路径.
    ///
    /// 允许只有一个时间帧的 4D 文件. 若文件包含多个时间帧则返回
    /// [`VolumeError::Frames`], 此时应使用 [`Volume::open_frames`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut frames = Self::open_frames(path)?;
        if frames.len() != 1 {
            return Err(VolumeError::Frames(frames.len()));
        }
        Ok(frames.swap_remove(0))
    }

    /// 打开 3D 或 4D (沿时间维拼接) 的 nii 文件, 每个时间帧返回一个 `Volume`.
    pub fn open_frames<P: AsRef<Path>>(path: P) -> Result<Vec<Self>> {
        let frames = open_frames_raw(path.as_ref())?
            .into_iter()
            .map(|(header, data)| Self { header, data })
            .collect();
        Ok(frames)
    }

    /// 打开 4D 文件, 取出第 `first` 与第 `second` 个时间帧作为两次采集.
    pub fn open_pair<P: AsRef<Path>>(path: P, first: usize, second: usize) -> Result<(Self, Self)> {
        if first == second {
            return Err(VolumeError::DuplicateFrame(first));
        }
        let mut frames = Self::open_frames(path)?.into_iter().map(Some).collect::<Vec<_>>();
        let len = frames.len();
        let mut take = |index: usize| {
            frames
                .get_mut(index)
                .and_then(Option::take)
                .ok_or(VolumeError::FrameIndex { index, len })
        };
        let a = take(first)?;
        let b = take(second)?;
        Ok((a, b))
    }

    /// 根据按 nifti 惯用 (x, y, z) 顺序组织的裸数据直接创建体数据.
    /// header 为 1mm 各向同性的最小 header.
    pub fn from_xyz(data: Array3<f64>) -> Self {
        let header = synthetic_header();
        Self {
            header,
            data: xyz_to_zyx(data.view()),
        }
    }

    /// 以 `reference` 的 header (分辨率, 空间变换) 为模板, 包装已按 (z, y, x) 组织的数据.
    pub fn with_header_of<T: NiftiHeaderAttr>(reference: &T, data: Array3<f64>) -> Self {
        Self {
            header: Box::new(reference.header().clone()),
            data,
        }
    }

    /// 两次采集的体素平均 `(self + other) / 2`.
    ///
    /// 若两者形状不一致, 则程序 panic.
    pub fn mean_with(&self, other: &Volume) -> Volume {
        assert_eq!(self.shape(), other.shape(), "两次采集的体数据形状不一致");
        let data = Zip::from(&self.data)
            .and(&other.data)
            .map_collect(|a, b| (a + b) / 2.0);
        Self {
            header: self.header.clone(),
            data,
        }
    }

    /// 两次采集的缩放差 `(other - self) / sqrt(2)`.
    ///
    /// 若两次采集噪声独立同分布, 则 `Var(B - A) = 2 Var(noise)`,
    /// 因此该体数据的标准差即单次采集的噪声标准差.
    ///
    /// 若两者形状不一致, 则程序 panic.
    pub fn scaled_difference(&self, other: &Volume) -> Volume {
        assert_eq!(self.shape(), other.shape(), "两次采集的体数据形状不一致");
        let data = Zip::from(&self.data)
            .and(&other.data)
            .map_collect(|a, b| (b - a) / std::f64::consts::SQRT_2);
        Self {
            header: self.header.clone(),
            data,
        }
    }
}

/// nii 格式 3D 权重掩膜. 权重必须是有限非负数, 二值分割为 0/1,
/// 软分割 (部分容积) 为 `[0, 1]` 间的小数.
#[derive(Debug, Clone)]
pub struct Mask {
    header: BoxedHeader,
    data: Array3<f64>,
}

impl_volume_common!(Mask, MaskSlice);

impl Mask {
    /// 打开 nii 文件格式的 3D 掩膜. 如果打开失败, 或存在负数/非有限权重, 则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut frames = open_frames_raw(path.as_ref())?;
        if frames.len() != 1 {
            return Err(VolumeError::Frames(frames.len()));
        }
        let (header, data) = frames.swap_remove(0);
        Self::validated(header, data)
    }

    /// 根据按 (x, y, z) 组织的裸权重直接创建掩膜.
    pub fn from_xyz(data: Array3<f64>) -> Result<Self> {
        let header = synthetic_header();
        Self::validated(header, xyz_to_zyx(data.view()))
    }

    /// 以 `reference` 的 header 为模板, 包装已按 (z, y, x) 组织的权重.
    pub fn with_header_of<T: NiftiHeaderAttr>(reference: &T, data: Array3<f64>) -> Result<Self> {
        Self::validated(Box::new(reference.header().clone()), data)
    }

    /// 以 `reference` 的 header 为模板, 对按 (z, y, x) 组织的 `data` 阈值化:
    /// 不小于 `threshold` 的体素置 1, 其他 (包括 NaN) 置 0.
    pub fn from_threshold<T: NiftiHeaderAttr>(reference: &T, data: ArrayView3<f64>, threshold: f64) -> Self {
        Self {
            header: Box::new(reference.header().clone()),
            data: data.mapv(|w| if w >= threshold { 1.0 } else { 0.0 }),
        }
    }

    fn validated(header: BoxedHeader, data: Array3<f64>) -> Result<Self> {
        if let Some((pos, &value)) = data
            .indexed_iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(VolumeError::InvalidWeight { pos, value });
        }
        Ok(Self { header, data })
    }

    /// 第 `z_index` 层切片是否 "活跃", 即存在至少一个严格正权重.
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn is_active_slice(&self, z_index: usize) -> bool {
        self.slice_at(z_index).is_active()
    }

    /// 收集所有活跃切片的 z 索引, 升序.
    pub fn active_slices(&self) -> Vec<usize> {
        self.slice_iter()
            .enumerate()
            .filter_map(|(z, s)| s.is_active().then_some(z))
            .collect()
    }

    /// 掩膜权重总和.
    #[inline]
    pub fn total_weight(&self) -> f64 {
        self.data.sum()
    }

    /// 截取 z 范围 `range` 内的切片.
    ///
    /// 当 `range` 越界时 panic.
    pub fn crop_z(&self, range: Range<usize>) -> Mask {
        Self {
            header: self.header.clone(),
            data: self.data.slice(s![range, .., ..]).to_owned(),
        }
    }

    /// 二值化: 权重不小于 `threshold` 的体素置 1, 其他置 0.
    pub fn binarize(&self, threshold: f64) -> Mask {
        Self {
            header: self.header.clone(),
            data: self.data.mapv(|w| if w >= threshold { 1.0 } else { 0.0 }),
        }
    }

    /// 逐体素计算 `max(self - other, 0)`, 例如由脊髓掩膜减去灰质掩膜得到白质掩膜.
    ///
    /// 若两者形状不一致, 则程序 panic.
    pub fn subtract_clipped(&self, other: &Mask) -> Mask {
        assert_eq!(self.shape(), other.shape(), "掩膜形状不一致");
        let data = Zip::from(&self.data)
            .and(&other.data)
            .map_collect(|a, b| (a - b).max(0.0));
        Self {
            header: self.header.clone(),
            data,
        }
    }
}
