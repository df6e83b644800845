//! `simu process`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use cord_metrics::phantom::{PhantomRecord, MASK_FILES};
use cord_metrics::prelude::*;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

/// 结果目录名.
const OUTPUT_DIR: &str = "simu_results";

/// 结果文件名.
const OUTPUT_FILE: &str = "results_all.csv";

#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Two folders generated by `simu create`, taken as scan and re-scan.
    #[arg(short, long, num_args = 2, required = true, value_names = ["FOLDER1", "FOLDER2"])]
    pub input: Vec<PathBuf>,

    /// Parent folder of the `simu_results` output folder.
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Worker threads. Defaults to the number of cores.
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,
}

/// 结果表的一行.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
struct SimuRow {
    #[serde(rename = "WM")]
    wm: f64,
    #[serde(rename = "GM")]
    gm: f64,
    noise: f64,
    smooth: f64,
    #[serde(rename = "SNR_single")]
    snr_single: f64,
    #[serde(rename = "SNR_diff")]
    snr_diff: Option<f64>,
    contrast: f64,
    #[serde(rename = "CNR_single")]
    cnr_single: f64,
    #[serde(rename = "CNR_diff")]
    cnr_diff: Option<f64>,
}

impl SimuRow {
    fn new(record: &PhantomRecord, result: &MetricResult) -> Self {
        Self {
            wm: record.wm,
            gm: record.gm,
            noise: record.noise,
            smooth: record.smooth,
            snr_single: result.snr_single,
            snr_diff: result.snr_diff,
            contrast: result.contrast,
            cnr_single: result.cnr_single,
            cnr_diff: result.cnr_diff,
        }
    }
}

/// 读取 `folder` 下全部体模元数据, 按体模文件名排序.
fn records_in(folder: &Path) -> Result<Vec<PhantomRecord>> {
    let mut out = Vec::new();
    for entry in fs::read_dir(folder).with_context(|| format!("cannot read {}", folder.display()))? {
        let path = entry?.path();
        if path.extension().is_some_and(|e| e == "csv") {
            out.push(PhantomRecord::open(&path)?);
        }
    }
    out.sort_by(|a, b| a.file.cmp(&b.file));
    Ok(out)
}

/// 组织掩膜. 噪声在白质内估计, 故噪声掩膜即白质掩膜.
struct PhantomMasks {
    gray_matter: Mask,
    white_matter: Mask,
}

impl PhantomMasks {
    fn open(folder: &Path) -> Result<Self> {
        let [_, gm, wm] = MASK_FILES;
        let load = |name: &str| {
            let p = folder.join(name);
            Mask::open(&p).with_context(|| format!("cannot load mask {}", p.display()))
        };
        Ok(Self {
            gray_matter: load(gm)?,
            white_matter: load(wm)?,
        })
    }
}

fn process_pair(
    engine: &MetricEngine,
    masks: &PhantomMasks,
    record: &PhantomRecord,
    folder1: &Path,
    folder2: &Path,
) -> Result<SimuRow> {
    debug!("processing {}", record.file);
    let open = |folder: &Path| {
        let p = folder.join(&record.file);
        Volume::open(&p).with_context(|| format!("cannot load phantom {}", p.display()))
    };
    let (data1, data2) = (open(folder1)?, open(folder2)?);
    let result = engine
        .compute(&MetricInputs {
            data1: &data1,
            data2: Some(&data2),
            noise: &masks.white_matter,
            white_matter: &masks.white_matter,
            gray_matter: &masks.gray_matter,
            duration: None,
        })
        .with_context(|| format!("metrics failed on {}", record.file))?;
    Ok(SimuRow::new(record, &result))
}

fn write_rows(path: &Path, rows: &[SimuRow]) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    for row in rows {
        w.serialize(row)?;
    }
    w.flush()?;
    Ok(())
}

pub fn run(args: &ProcessArgs) -> Result<()> {
    let [folder1, folder2] = args.input.as_slice() else {
        bail!("expected exactly two input folders");
    };
    let masks = PhantomMasks::open(folder1)?;
    let records: Vec<_> = records_in(folder1)?
        .into_iter()
        .filter(|r| {
            let present = folder2.join(&r.file).is_file();
            if !present {
                warn!("{} missing in {}, skipped", r.file, folder2.display());
            }
            present
        })
        .collect();
    if records.is_empty() {
        bail!("no phantom found in both {} and {}", folder1.display(), folder2.display());
    }
    info!("processing {} phantom pairs", records.len());

    let engine = MetricEngine::default();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs.unwrap_or_else(utils::cpus))
        .build()?;
    // `collect` 保持输入顺序, 即按文件名排序.
    let rows = pool.install(|| {
        records
            .par_iter()
            .map(|r| process_pair(&engine, &masks, r, folder1, folder2))
            .collect::<Result<Vec<_>>>()
    })?;

    let out_dir = args.output_dir.join(OUTPUT_DIR);
    fs::create_dir_all(&out_dir).with_context(|| format!("cannot create {}", out_dir.display()))?;
    let out = out_dir.join(OUTPUT_FILE);
    write_rows(&out, &rows)?;
    utils::sep();
    println!("Results written to {}", out.display());
    utils::sep();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cord_metrics::phantom::{write_masks, write_phantom, PhantomParams};
    use ndarray::Array3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// 覆盖 `x / 2 == x0` 体素的条带 tract.
    fn tract(x0: usize) -> Mask {
        Mask::from_xyz(Array3::from_shape_fn((6, 6, 3), |(x, _, _)| (x / 2 == x0) as u8 as f64)).unwrap()
    }

    fn params(gm_value: f64) -> PhantomParams {
        PhantomParams {
            wm_value: 100.0,
            gm_value,
            noise_std: 2.0,
            smoothing: 0.0,
        }
    }

    #[test]
    fn test_process_two_folders() {
        let dir = tempfile::TempDir::new().unwrap();
        let (f1, f2) = (dir.path().join("a"), dir.path().join("b"));
        let atlas = Atlas::from_tracts(vec![tract(0), tract(1), tract(2)], vec![0, 1], vec![2]).unwrap();
        for (folder, seed) in [(&f1, 1), (&f2, 2)] {
            fs::create_dir_all(folder).unwrap();
            let mut rng = StdRng::seed_from_u64(seed);
            for gm in [160.0, 120.0] {
                write_phantom(folder, &atlas, &params(gm), &mut rng).unwrap();
            }
            write_masks(folder, &atlas).unwrap();
        }
        let args = ProcessArgs {
            input: vec![f1, f2],
            output_dir: dir.path().to_path_buf(),
            jobs: Some(2),
        };
        run(&args).unwrap();

        let mut r = csv::Reader::from_path(dir.path().join(OUTPUT_DIR).join(OUTPUT_FILE)).unwrap();
        assert_eq!(
            r.headers().unwrap().iter().collect::<Vec<_>>(),
            ["WM", "GM", "Noise", "Smooth", "SNR_single", "SNR_diff", "Contrast", "CNR_single", "CNR_diff"]
        );
        let rows: Vec<_> = r.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "120");
        assert_eq!(&rows[1][1], "160");
        let contrast: f64 = rows[1][6].parse().unwrap();
        assert!((contrast - 60.0).abs() < 5.0, "contrast = {contrast}");
        assert!(!rows[0][5].is_empty());
    }
}
