//! 白质/灰质 tract 图谱 (如 PAM50).

use std::fs;
use std::ops::Range;
use std::path::Path;

use log::debug;
use ndarray::Array3;

use super::PhantomError;
use crate::consts::phantom::{GM_TRACTS, INFO_LABEL_FILE, WM_TRACTS};
use crate::consts::BINARIZE_THRESHOLD;
use crate::{Idx3d, Mask};

type Result<T> = std::result::Result<T, PhantomError>;

/// `info_label.txt` 中的单个 tract 标签.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TractLabel {
    /// 标签 ID.
    pub id: usize,
    /// 名称.
    pub name: String,
    /// 部分容积图文件名, 相对于图谱目录.
    pub file: String,
}

/// 解析后的 `info_label.txt`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelFile {
    /// 单个 tract 标签, 按文件中出现顺序.
    pub tracts: Vec<TractLabel>,
    /// 白质对应的 tract ID, 来自组合标签 `white matter`.
    pub white_matter: Option<Vec<usize>>,
    /// 灰质对应的 tract ID, 来自组合标签 `gray matter`.
    pub gray_matter: Option<Vec<usize>>,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Section {
    Indiv,
    Combined,
    Other,
}

/// 解析 ID 组: `a:b` (闭区间) 或逗号分隔列表, 或二者混合.
fn parse_id_group(s: &str) -> Option<Vec<usize>> {
    let mut ids = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once(':') {
            Some((a, b)) => {
                let (a, b) = (a.trim().parse::<usize>().ok()?, b.trim().parse::<usize>().ok()?);
                if a > b {
                    return None;
                }
                ids.extend(a..=b);
            }
            None => ids.push(part.parse().ok()?),
        }
    }
    (!ids.is_empty()).then_some(ids)
}

impl LabelFile {
    /// 解析 `info_label.txt` 的文本内容.
    ///
    /// `# Keyword=IndivLabels` 之后的行为 `id, name, file`;
    /// `# Keyword=CombinedLabels` 之后的行为 `id, name, id 组`. 其他段落被忽略.
    pub fn parse(content: &str) -> Result<Self> {
        let mut section = Section::Other;
        let mut out = LabelFile::default();
        for (n, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                if let Some((_, keyword)) = comment.split_once("Keyword=") {
                    section = match keyword.split_whitespace().next() {
                        Some("IndivLabels") => Section::Indiv,
                        Some("CombinedLabels") => Section::Combined,
                        _ => Section::Other,
                    };
                }
                continue;
            }
            let malformed = || PhantomError::Label {
                line: n + 1,
                content: line.to_string(),
            };
            let mut fields = line.splitn(3, ',').map(str::trim);
            let (Some(id), Some(name), Some(rest)) = (fields.next(), fields.next(), fields.next())
            else {
                if section == Section::Other {
                    continue;
                }
                return Err(malformed());
            };
            match section {
                Section::Indiv => out.tracts.push(TractLabel {
                    id: id.parse().map_err(|_| malformed())?,
                    name: name.to_string(),
                    file: rest.to_string(),
                }),
                Section::Combined => {
                    let group = || parse_id_group(rest).ok_or_else(malformed);
                    match name.to_ascii_lowercase().as_str() {
                        "white matter" => out.white_matter = Some(group()?),
                        "gray matter" => out.gray_matter = Some(group()?),
                        _ => {}
                    }
                }
                Section::Other => {}
            }
        }
        Ok(out)
    }

    /// 将 tract ID 组转换为 `tracts` 中的位置.
    fn positions(&self, ids: &[usize]) -> Result<Vec<usize>> {
        ids.iter()
            .map(|id| {
                self.tracts
                    .iter()
                    .position(|t| t.id == *id)
                    .ok_or(PhantomError::UnknownLabel(*id))
            })
            .collect()
    }
}

/// tract 图谱. 每个 tract 是一个部分容积 (`[0, 1]`) 掩膜, 所有 tract 形状一致.
#[derive(Debug, Clone)]
pub struct Atlas {
    tracts: Vec<Mask>,
    white_matter: Vec<usize>,
    gray_matter: Vec<usize>,
}

impl Atlas {
    /// 打开图谱目录 `folder`, 截取以 `z_center` 为中心的 `num_slices` 层切片.
    ///
    /// # 注意
    ///
    /// 1. 若 `info_label.txt` 没有给出白质/灰质组合标签, 则白质为第 0 至 29 个 tract,
    ///   灰质为第 30 至 35 个 tract.
    /// 2. 截取范围为 `z_center - num_slices / 2 .. z_center + num_slices / 2`,
    ///   越界时返回 [`PhantomError::Crop`].
    pub fn open<P: AsRef<Path>>(folder: P, z_center: usize, num_slices: usize) -> Result<Self> {
        let folder = folder.as_ref();
        let labels = LabelFile::parse(&fs::read_to_string(folder.join(INFO_LABEL_FILE))?)?;
        if labels.tracts.is_empty() {
            return Err(PhantomError::NoTracts);
        }
        let half = num_slices / 2;
        let start = z_center.checked_sub(half).ok_or(PhantomError::Crop {
            start: None,
            end: z_center + half,
            len: None,
        })?;
        let range = start..z_center + half;

        let total = labels.tracts.len();
        let mut tracts = Vec::with_capacity(total);
        for (i, label) in labels.tracts.iter().enumerate() {
            debug!("loading atlas label {}/{}: {}", i + 1, total, label.name);
            let tract = Mask::open(folder.join(&label.file))?;
            tracts.push(crop(&tract, range.clone())?);
        }

        let white_matter = match &labels.white_matter {
            Some(ids) => labels.positions(ids)?,
            None => WM_TRACTS.collect(),
        };
        let gray_matter = match &labels.gray_matter {
            Some(ids) => labels.positions(ids)?,
            None => GM_TRACTS.collect(),
        };
        Self::from_tracts(tracts, white_matter, gray_matter)
    }

    /// 由内存中的 tract 构建图谱. `white_matter` 与 `gray_matter` 为 `tracts` 中的位置.
    pub fn from_tracts(
        tracts: Vec<Mask>,
        white_matter: Vec<usize>,
        gray_matter: Vec<usize>,
    ) -> Result<Self> {
        let first = tracts.first().ok_or(PhantomError::NoTracts)?.shape();
        if let Some(t) = tracts.iter().find(|t| t.shape() != first) {
            return Err(PhantomError::TractShape {
                expected: first,
                found: t.shape(),
            });
        }
        if let Some(&i) = white_matter
            .iter()
            .chain(gray_matter.iter())
            .find(|&&i| i >= tracts.len())
        {
            return Err(PhantomError::TractIndex {
                index: i,
                len: tracts.len(),
            });
        }
        Ok(Self {
            tracts,
            white_matter,
            gray_matter,
        })
    }

    /// tract 个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.tracts.len()
    }

    /// 图谱是否为空. 合法图谱总是非空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracts.is_empty()
    }

    /// 形状 (z, y, x).
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.tracts[0].shape()
    }

    /// 作为 header 模板的 tract.
    #[inline]
    pub fn reference(&self) -> &Mask {
        &self.tracts[0]
    }

    /// 白质 tract 位置.
    #[inline]
    pub fn white_matter_tracts(&self) -> &[usize] {
        &self.white_matter
    }

    /// 灰质 tract 位置.
    #[inline]
    pub fn gray_matter_tracts(&self) -> &[usize] {
        &self.gray_matter
    }

    /// 按 `weight(i)` 对第 `i` 个 tract 加权求和, 只包含 `indices` 中的 tract.
    pub(crate) fn weighted_sum<'a, I>(&self, indices: I, weight: f64) -> Array3<f64>
    where
        I: IntoIterator<Item = &'a usize>,
    {
        let mut sum = Array3::zeros(self.shape());
        for &i in indices {
            sum.scaled_add(weight, &self.tracts[i].data());
        }
        sum
    }

    fn threshold_mask<'a, I>(&self, indices: I) -> Mask
    where
        I: IntoIterator<Item = &'a usize>,
    {
        let sum = self.weighted_sum(indices, 1.0);
        Mask::from_threshold(self.reference(), sum.view(), BINARIZE_THRESHOLD)
    }

    /// 脊髓掩膜: 所有白质与灰质 tract 之和不小于 0.5 处为 1.
    pub fn cord_mask(&self) -> Mask {
        self.threshold_mask(self.white_matter.iter().chain(self.gray_matter.iter()))
    }

    /// 灰质掩膜: 灰质 tract 之和不小于 0.5 处为 1.
    pub fn gray_matter_mask(&self) -> Mask {
        self.threshold_mask(&self.gray_matter)
    }

    /// 白质掩膜: 白质 tract 之和不小于 0.5 处为 1.
    pub fn white_matter_mask(&self) -> Mask {
        self.threshold_mask(&self.white_matter)
    }
}

fn crop(tract: &Mask, range: Range<usize>) -> Result<Mask> {
    if range.end > tract.len_z() {
        return Err(PhantomError::Crop {
            start: Some(range.start),
            end: range.end,
            len: Some(tract.len_z()),
        });
    }
    Ok(tract.crop_z(range))
}
