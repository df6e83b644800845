//! 命令行参数.

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use cord_metrics::consts::DEFAULT_SHARPNESS_SIGMA;
use cord_metrics::metrics::{ContrastDenominator, MetricConfig, TimeNormalization};

/// 对比度分母.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Denominator {
    /// 白质均值.
    Wm,
    /// 白质与灰质均值中的较小者.
    Min,
}

/// 单位时间 CNR 的归一化方式.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TimeNorm {
    /// 除以 sqrt(时长).
    Sqrt,
    /// 除以时长.
    Linear,
}

/// 形如 `0,1` 的时间帧对.
fn parse_frames(s: &str) -> Result<(usize, usize), String> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| format!("expected two comma-separated frame indices, got '{s}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<usize>()
            .map_err(|e| format!("invalid frame index '{v}': {e}"))
    };
    Ok((parse(a)?, parse(b)?))
}

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Compute SNR, contrast, CNR and CNR per unit time, slice by slice then averaged across slices.",
    long_about = "Compute SNR, contrast and CNR with the single-acquisition and the difference methods. \
                  These metrics are computed slice by slice and then averaged across slices. If a JSON \
                  sidecar with the field AcquisitionDuration is given, CNR per unit time is computed too."
)]
pub struct Args {
    /// First volume. May be a 4-D file when combined with --vol.
    #[arg(long)]
    pub data1: PathBuf,

    /// Second volume, required for the "diff" method.
    #[arg(long, conflicts_with = "vol")]
    pub data2: Option<PathBuf>,

    /// Take frames A and B of a 4-D --data1 as the two acquisitions, e.g. "0,1".
    #[arg(long, value_name = "A,B", value_parser = parse_frames)]
    pub vol: Option<(usize, usize)>,

    /// Mask where to compute noise.
    #[arg(long)]
    pub mask_noise: PathBuf,

    /// Mask of the white matter. Derived from --mask-cord minus --mask-gm when omitted.
    #[arg(long, required_unless_present = "mask_cord")]
    pub mask_wm: Option<PathBuf>,

    /// Mask of the gray matter.
    #[arg(long)]
    pub mask_gm: PathBuf,

    /// Mask of the spinal cord. Enables sharpness and, without --mask-wm, the white matter derivation.
    #[arg(long)]
    pub mask_cord: Option<PathBuf>,

    /// JSON sidecar to fetch the acquisition duration from.
    #[arg(long, conflicts_with = "find_json")]
    pub json: Option<PathBuf>,

    /// Look for a JSON sidecar with the same base name as --data1.
    #[arg(long)]
    pub find_json: bool,

    /// Subject ID written in the first column of the output table.
    #[arg(long, default_value = "sub")]
    pub subject: String,

    /// CSV output file. Rows are appended; the header is written when the file is created.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Apply the Rayleigh correction to the single-acquisition SNR.
    #[arg(long)]
    pub rayleigh: bool,

    /// Denominator of the contrast.
    #[arg(long, value_enum, default_value_t = Denominator::Wm)]
    pub contrast_denominator: Denominator,

    /// Normalization of CNR by acquisition time.
    #[arg(long, value_enum, default_value_t = TimeNorm::Sqrt)]
    pub time_normalization: TimeNorm,

    /// Gaussian sigma (voxels) of the Laplacian-of-Gaussian used by the sharpness metric.
    #[arg(long, default_value_t = DEFAULT_SHARPNESS_SIGMA)]
    pub sharpness_sigma: f64,

    /// More logs (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// 由命令行参数构建指标配置.
    pub fn metric_config(&self) -> MetricConfig {
        MetricConfig {
            rayleigh_correction: self.rayleigh,
            contrast_denominator: match self.contrast_denominator {
                Denominator::Wm => ContrastDenominator::WhiteMatter,
                Denominator::Min => ContrastDenominator::Min,
            },
            time_normalization: match self.time_normalization {
                TimeNorm::Sqrt => TimeNormalization::SqrtDuration,
                TimeNorm::Linear => TimeNormalization::Duration,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const BASE: [&str; 7] = [
        "compute-cnr",
        "--data1",
        "t2s.nii.gz",
        "--mask-noise",
        "noise.nii.gz",
        "--mask-gm",
        "gm.nii.gz",
    ];

    fn parse(extra: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(BASE.iter().chain(extra.iter()))
    }

    #[test]
    fn test_command_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--mask-wm", "wm.nii.gz"]).unwrap();
        assert_eq!(args.subject, "sub");
        assert_eq!(args.metric_config(), MetricConfig::default());
        assert_eq!(args.sharpness_sigma, 3.0);
    }

    #[test]
    fn test_white_matter_source_required() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--mask-cord", "cord.nii.gz"]).is_ok());
    }

    #[test]
    fn test_frames() {
        let args = parse(&["--mask-wm", "wm.nii.gz", "--vol", "0, 1"]).unwrap();
        assert_eq!(args.vol, Some((0, 1)));
        assert!(parse(&["--mask-wm", "wm.nii.gz", "--vol", "0"]).is_err());
        assert!(parse(&["--mask-wm", "w", "--vol", "0,1", "--data2", "b.nii"]).is_err());
    }

    #[test]
    fn test_config_flags() {
        let args = parse(&[
            "--mask-wm",
            "wm.nii.gz",
            "--rayleigh",
            "--contrast-denominator",
            "min",
            "--time-normalization",
            "linear",
            "-vv",
        ])
        .unwrap();
        let config = args.metric_config();
        assert!(config.rayleigh_correction);
        assert_eq!(config.contrast_denominator, ContrastDenominator::Min);
        assert_eq!(config.time_normalization, TimeNormalization::Duration);
        assert_eq!(args.verbose, 2);
    }
}
