//! 输入路径的定位.

use std::env;
use std::path::{Path, PathBuf};

use cord_metrics::consts::phantom::ATLAS_SUBDIR;

/// 获取 PAM50 图谱目录.
///
/// 1. 若环境变量 `$SCT_DIR` 非空, 则返回 `$SCT_DIR/data/PAM50/atlas`;
/// 2. 否则, 返回 `$HOME/sct/data/PAM50/atlas`. 无法确定主目录时返回 `None`.
pub fn atlas_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var_os("SCT_DIR").filter(|d| !d.is_empty()) {
        Some(d) => {
            let mut ans = PathBuf::from(d);
            ans.extend(ATLAS_SUBDIR);
            Some(ans)
        }
        None => cord_metrics::phantom::home_atlas_dir(),
    }
}

/// 与 nii 文件同名的 JSON sidecar 路径, 如 `sub-01_T2star.nii.gz` 对应 `sub-01_T2star.json`.
pub fn sidecar_path_for<P: AsRef<Path>>(nifti: P) -> PathBuf {
    let nifti = nifti.as_ref();
    let name = nifti
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = name
        .strip_suffix(".nii.gz")
        .or_else(|| name.strip_suffix(".nii"))
        .unwrap_or(&name);
    nifti.with_file_name(format!("{stem}.json"))
}
