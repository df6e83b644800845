//! 计算单个受试者的 SNR、对比度、CNR 与单位时间 CNR.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cord_metrics::prelude::*;
use log::{debug, info, warn};
use utils::loader;

mod args;
mod report;

use args::Args;

/// 两次采集. 第二次可能缺失.
fn load_acquisitions(args: &Args) -> Result<(Volume, Option<Volume>)> {
    if let Some((a, b)) = args.vol {
        info!("using frames {a} and {b} of {}", args.data1.display());
        let (v1, v2) = Volume::open_pair(&args.data1, a, b)
            .with_context(|| format!("cannot load frames of {}", args.data1.display()))?;
        return Ok((v1, Some(v2)));
    }
    let data1 = Volume::open(&args.data1)
        .with_context(|| format!("cannot load {}", args.data1.display()))?;
    let data2 = match &args.data2 {
        Some(p) if p.is_file() => Some(
            Volume::open(p).with_context(|| format!("cannot load {}", p.display()))?,
        ),
        Some(p) => {
            info!("{} not found, diff metrics are skipped", p.display());
            None
        }
        None => None,
    };
    Ok((data1, data2))
}

fn open_mask(what: &str, path: &Path) -> Result<Mask> {
    debug!("loading {what} mask from {}", path.display());
    Mask::open(path).with_context(|| format!("cannot load {what} mask {}", path.display()))
}

/// 采集时长. 没有 sidecar 或字段缺失时为 `None`.
fn load_duration(args: &Args) -> Result<Option<AcquisitionDuration>> {
    let path = match (&args.json, args.find_json) {
        (Some(p), _) => p.clone(),
        (None, true) => {
            let p = loader::sidecar_path_for(&args.data1);
            if !p.is_file() {
                info!("no sidecar next to {}", args.data1.display());
                return Ok(None);
            }
            p
        }
        (None, false) => return Ok(None),
    };
    let sidecar =
        Sidecar::open(&path).with_context(|| format!("cannot read sidecar {}", path.display()))?;
    let duration = sidecar
        .acquisition_duration()
        .with_context(|| format!("bad sidecar {}", path.display()))?;
    if duration.is_none() {
        info!("{} has no AcquisitionDuration field", path.display());
    }
    Ok(duration)
}

/// 一次运行的结果: 全部指标, 以及给出脊髓掩膜时的锐度.
struct Report {
    result: MetricResult,
    sharpness: Option<f64>,
}

/// 检查参数, 加载输入并计算指标. 不写任何文件.
fn compute(args: &Args) -> Result<Report> {
    if let Some(p) = &args.json {
        if !p.is_file() {
            bail!("sidecar {} does not exist", p.display());
        }
    }
    if !args.sharpness_sigma.is_finite() || args.sharpness_sigma < 0.0 {
        bail!("--sharpness-sigma must be a finite non-negative number");
    }

    let (data1, data2) = load_acquisitions(args)?;
    let noise = open_mask("noise", &args.mask_noise)?;
    let (white_matter, gray_matter, cord) = match (&args.mask_wm, &args.mask_cord) {
        (Some(wm), cord) => (
            open_mask("white matter", wm)?,
            open_mask("gray matter", &args.mask_gm)?,
            cord.as_deref().map(|c| open_mask("cord", c)).transpose()?,
        ),
        (None, Some(cord)) => {
            info!("deriving white matter mask from cord and gray matter masks");
            let masks =
                TissueMasks::from_segmenter(&ManualSegmentation::new(cord, &args.mask_gm), &data1)?;
            (masks.white_matter, masks.gray_matter, Some(masks.cord))
        }
        (None, None) => bail!("either --mask-wm or --mask-cord is required"),
    };
    let duration = load_duration(args)?;

    let engine = MetricEngine::new(args.metric_config());
    let result = engine.compute(&MetricInputs {
        data1: &data1,
        data2: data2.as_ref(),
        noise: &noise,
        white_matter: &white_matter,
        gray_matter: &gray_matter,
        duration,
    })?;

    let sharp = match &cord {
        Some(cord) => match sharpness(&data1, cord, args.sharpness_sigma) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!("sharpness skipped: {e}");
                None
            }
        },
        None => None,
    };
    Ok(Report {
        result,
        sharpness: sharp,
    })
}

fn run(args: &Args) -> Result<()> {
    let Report { result, sharpness } = compute(args)?;

    if let Some(out) = &args.output {
        let mut table = ResultTable::open(out)?;
        table.append(&args.subject, &result)?;
        info!("appended to {}", table.path().display());
    }

    utils::sep();
    let mut buf = Vec::with_capacity(512);
    report::describe_into(&args.subject, &result, sharpness, &mut buf)?;
    println!("{}", String::from_utf8_lossy(&buf));
    utils::sep();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    utils::init_logger(utils::log_level(args.verbose, args.quiet))?;
    run(&args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array3;
    use nifti::writer::WriterOptions;
    use std::fs;
    use tempfile::TempDir;

    /// 4×4×3 受试者: z = 0, 1 上白质 (x < 2) 为 100 ± 2, 灰质 (x >= 2) 为 80 ± 2; z = 2 不在掩膜内.
    fn subject(dir: &Path) {
        let volume = Array3::from_shape_fn((4, 4, 3), |(x, y, z)| {
            let base = if x < 2 { 100.0 } else { 80.0 };
            let wiggle = if (x + y) % 2 == 0 { 2.0 } else { -2.0 };
            if z < 2 {
                base + wiggle
            } else {
                0.0
            }
        });
        Volume::from_xyz(volume).save(dir.join("t2s.nii.gz")).unwrap();
        let mask = |f: fn(usize) -> bool| {
            Mask::from_xyz(Array3::from_shape_fn((4, 4, 3), |(x, _, z)| {
                (z < 2 && f(x)) as u8 as f64
            }))
            .unwrap()
        };
        mask(|_| true).save(dir.join("noise.nii.gz")).unwrap();
        mask(|_| true).save(dir.join("cord.nii.gz")).unwrap();
        mask(|x| x < 2).save(dir.join("wm.nii.gz")).unwrap();
        mask(|x| x >= 2).save(dir.join("gm.nii.gz")).unwrap();
    }

    fn args(dir: &Path, extra: &[&str]) -> Args {
        let p = |name: &str| dir.join(name).to_string_lossy().into_owned();
        let mut argv = vec![
            "compute-cnr".to_string(),
            "--data1".to_string(),
            p("t2s.nii.gz"),
            "--mask-noise".to_string(),
            p("noise.nii.gz"),
            "--mask-gm".to_string(),
            p("gm.nii.gz"),
        ];
        argv.extend(extra.iter().map(|a| a.replace("{dir}", &dir.to_string_lossy())));
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_missing_second_volume_is_soft() {
        let dir = TempDir::new().unwrap();
        subject(dir.path());
        let a = args(
            dir.path(),
            &[
                "--mask-wm",
                "{dir}/wm.nii.gz",
                "--data2",
                "{dir}/rescan.nii.gz",
                "--output",
                "{dir}/results.csv",
            ],
        );
        let report = compute(&a).unwrap();
        assert_eq!(report.result.snr_diff, None);
        assert_eq!(report.result.cnr_diff, None);
        assert_relative_eq!(report.result.contrast, 20.0, max_relative = 1e-12);

        run(&a).unwrap();
        let content = fs::read_to_string(dir.path().join("results.csv")).unwrap();
        let row: Vec<_> = content.lines().nth(1).unwrap().split(',').collect();
        assert_eq!(row.len(), 8);
        assert_eq!(row[0], "sub");
        assert_eq!(row[2], "");
        assert_eq!(row[5], "");
    }

    #[test]
    fn test_missing_json_is_a_configuration_error() {
        let dir = TempDir::new().unwrap();
        subject(dir.path());
        let a = args(
            dir.path(),
            &["--mask-wm", "{dir}/wm.nii.gz", "--json", "{dir}/nope.json"],
        );
        let err = compute(&a).err().unwrap();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_find_json() {
        let dir = TempDir::new().unwrap();
        subject(dir.path());
        let a = args(dir.path(), &["--mask-wm", "{dir}/wm.nii.gz", "--find-json"]);
        assert_eq!(compute(&a).unwrap().result.cnr_single_per_time, None);

        fs::write(dir.path().join("t2s.json"), r#"{"AcquisitionDuration": 4}"#).unwrap();
        let report = compute(&a).unwrap();
        assert_relative_eq!(
            report.result.cnr_single_per_time.unwrap(),
            report.result.cnr_single / 2.0,
            max_relative = 1e-12
        );

        fs::write(dir.path().join("t2s.json"), r#"{"AcquisitionDuration": -4}"#).unwrap();
        assert!(compute(&a).is_err());
    }

    #[test]
    fn test_white_matter_derived_from_cord() {
        let dir = TempDir::new().unwrap();
        subject(dir.path());
        let given = compute(&args(dir.path(), &["--mask-wm", "{dir}/wm.nii.gz"])).unwrap();
        let derived = compute(&args(dir.path(), &["--mask-cord", "{dir}/cord.nii.gz"])).unwrap();
        assert_eq!(given.sharpness, None);
        assert_eq!(derived.result, given.result);
        assert!(derived.sharpness.is_some());
    }

    #[test]
    fn test_frames_of_concatenated_file() {
        let dir = TempDir::new().unwrap();
        subject(dir.path());
        // 第二帧的棋盘扰动反号, 平均体数据中白质/灰质恰为 100/80.
        let concat = ndarray::Array4::from_shape_fn((4, 4, 3, 2), |(x, y, z, t)| {
            let base = if x < 2 { 100.0 } else { 80.0 };
            let wiggle = if (x + y + t) % 2 == 0 { 2.0 } else { -2.0 };
            if z < 2 {
                base + wiggle
            } else {
                0.0
            }
        });
        let path = dir.path().join("concat.nii.gz");
        WriterOptions::new(&path).write_nifti(&concat).unwrap();

        let mut a = args(dir.path(), &["--mask-wm", "{dir}/wm.nii.gz", "--vol", "0,1"]);
        a.data1 = path;
        let report = compute(&a).unwrap();
        assert!(report.result.snr_diff.is_some());
        assert_relative_eq!(report.result.contrast, 20.0, max_relative = 1e-12);

        // 3D 文件只有一帧.
        let a = args(dir.path(), &["--mask-wm", "{dir}/wm.nii.gz", "--vol", "0,1"]);
        assert!(compute(&a).is_err());
    }
}
