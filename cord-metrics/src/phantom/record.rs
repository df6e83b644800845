use std::path::Path;

use super::{PhantomError, PhantomParams};

type Result<T> = std::result::Result<T, PhantomError>;

/// 元数据表头.
const HEADER: [&str; 5] = ["WM", "GM", "Noise", "Smooth", "File"];

/// 单个体模的元数据, 与体模文件放在同一目录下, 以单行 CSV 保存.
#[derive(Clone, Debug, PartialEq)]
pub struct PhantomRecord {
    /// 白质信号强度.
    pub wm: f64,
    /// 灰质信号强度.
    pub gm: f64,
    /// 噪声标准差.
    pub noise: f64,
    /// 平滑核标准差.
    pub smooth: f64,
    /// 体模文件名, 相对于所在目录.
    pub file: String,
}

impl PhantomRecord {
    /// 由体模参数构建. 体模文件名为 `{stem}.nii.gz`.
    pub fn from_params(params: &PhantomParams) -> Self {
        Self {
            wm: params.wm_value,
            gm: params.gm_value,
            noise: params.noise_std,
            smooth: params.smoothing,
            file: format!("{}.nii.gz", params.stem()),
        }
    }

    /// 体模文件名去掉扩展名后的主干.
    pub fn stem(&self) -> &str {
        self.file
            .strip_suffix(".nii.gz")
            .or_else(|| self.file.strip_suffix(".nii"))
            .unwrap_or(&self.file)
    }

    /// 写入 `folder/{stem}.csv`.
    pub fn save(&self, folder: &Path) -> Result<()> {
        let mut w = csv::Writer::from_path(folder.join(format!("{}.csv", self.stem())))?;
        w.write_record(HEADER)?;
        w.write_record([
            self.wm.to_string(),
            self.gm.to_string(),
            self.noise.to_string(),
            self.smooth.to_string(),
            self.file.clone(),
        ])?;
        w.flush()?;
        Ok(())
    }

    /// 读取元数据文件. 列顺序任意, 但必须包含全部五列.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let invalid = |reason: String| PhantomError::Record {
            path: path.to_path_buf(),
            reason,
        };
        let mut r = csv::Reader::from_path(path)?;
        let headers = r.headers()?.clone();
        let record = r
            .records()
            .next()
            .ok_or_else(|| invalid("no data row".to_string()))??;
        let field = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .and_then(|i| record.get(i))
                .map(str::trim)
                .ok_or_else(|| invalid(format!("missing column '{name}'")))
        };
        let number = |name: &str| {
            field(name)?
                .parse::<f64>()
                .map_err(|e| invalid(format!("column '{name}': {e}")))
        };
        Ok(Self {
            wm: number("WM")?,
            gm: number("GM")?,
            noise: number("Noise")?,
            smooth: number("Smooth")?,
            file: field("File")?.to_string(),
        })
    }
}
