//! 结果表: 追加写入的 CSV, 每个受试者/每次运行一行.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::metrics::MetricResult;

/// 结果表写入错误.
#[derive(Error, Debug)]
pub enum SinkError {
    /// 底层 I/O 错误.
    #[error("IO error on {path}: {source}")]
    Io {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// CSV 写入错误.
    #[error("CSV error {0}")]
    Csv(#[from] csv::Error),
}

/// 固定表头.
pub const HEADER: [&str; 8] = [
    "Subject",
    "SNR_single",
    "SNR_diff",
    "Contrast",
    "CNR_single",
    "CNR_diff",
    "CNR_single/t",
    "CNR_diff/t",
];

/// 未定义的值写为空单元格.
#[inline]
fn cell(v: Option<f64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

impl MetricResult {
    /// 按 [`HEADER`] 顺序 (不含 `Subject`) 排列的可选值.
    pub fn fields(&self) -> [Option<f64>; 7] {
        [
            Some(self.snr_single),
            self.snr_diff,
            Some(self.contrast),
            Some(self.cnr_single),
            self.cnr_diff,
            self.cnr_single_per_time,
            self.cnr_diff_per_time,
        ]
    }
}

/// 追加写入的结果表. 表头只在文件新建 (或为空) 时写入一次.
pub struct ResultTable {
    path: PathBuf,
    writer: csv::Writer<File>,
}

impl ResultTable {
    /// 打开 (或新建) 结果表.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let io = |source| SinkError::Io {
            path: path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io)?;
        let is_empty = file.metadata().map_err(io)?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_empty {
            writer.write_record(HEADER)?;
            writer.flush().map_err(io)?;
        }
        Ok(Self { path, writer })
    }

    /// 结果表路径.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一行并立即落盘.
    pub fn append(&mut self, subject: &str, result: &MetricResult) -> Result<(), SinkError> {
        let mut row = Vec::with_capacity(HEADER.len());
        row.push(subject.to_string());
        row.extend(result.fields().into_iter().map(cell));
        self.writer.write_record(&row)?;
        self.writer.flush().map_err(|source| SinkError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn result(diff: Option<f64>) -> MetricResult {
        MetricResult {
            snr_single: 12.5,
            snr_diff: diff,
            contrast: 20.0,
            cnr_single: 3.0,
            cnr_diff: diff,
            cnr_single_per_time: None,
            cnr_diff_per_time: None,
        }
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        {
            let mut t = ResultTable::open(&path).unwrap();
            t.append("sub-01", &result(None)).unwrap();
        }
        {
            let mut t = ResultTable::open(&path).unwrap();
            t.append("sub-02", &result(Some(7.0))).unwrap();
        }
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "Subject,SNR_single,SNR_diff,Contrast,CNR_single,CNR_diff,CNR_single/t,CNR_diff/t\n\
             sub-01,12.5,,20,3,,,\n\
             sub-02,12.5,7,20,3,7,,\n"
        );
    }

    #[test]
    fn test_existing_empty_file_gets_header() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("results.csv");
        fs::write(&path, "").unwrap();
        ResultTable::open(&path).unwrap();
        assert!(fs::read_to_string(&path).unwrap().starts_with("Subject,"));
    }
}
