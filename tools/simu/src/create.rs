//! `simu create`.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use cord_metrics::consts::phantom::{GM_VALUES, NOISE_STDS, NUM_SLICES, SMOOTHING, WM_VALUE, Z_CENTER};
use cord_metrics::phantom::{self, Atlas, PhantomParams};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use utils::loader;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Output folder.
    pub folder_out: PathBuf,

    /// White matter value.
    #[arg(long, default_value_t = WM_VALUE)]
    pub wm: f64,

    /// Gray matter values.
    #[arg(long, value_delimiter = ',', default_values_t = GM_VALUES)]
    pub gm: Vec<f64>,

    /// Standard deviations of the Gaussian noise.
    #[arg(long, value_delimiter = ',', default_values_t = NOISE_STDS)]
    pub noise: Vec<f64>,

    /// Standard deviations (voxels) of the Gaussian smoothing.
    #[arg(long, value_delimiter = ',', default_values_t = SMOOTHING)]
    pub smooth: Vec<f64>,

    /// Center slice of the atlas crop.
    #[arg(long, default_value_t = Z_CENTER)]
    pub z_center: usize,

    /// Number of slices of the atlas crop.
    #[arg(long, default_value_t = NUM_SLICES)]
    pub num_slices: usize,

    /// PAM50 atlas folder. Defaults to $SCT_DIR/data/PAM50/atlas or ~/sct/data/PAM50/atlas.
    #[arg(long)]
    pub atlas: Option<PathBuf>,

    /// Seed of the noise generator, for reproducible phantoms.
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn run(args: &CreateArgs) -> Result<()> {
    let atlas_dir = args
        .atlas
        .clone()
        .or_else(loader::atlas_dir_from_env_or_home)
        .context("cannot locate the PAM50 atlas, pass --atlas")?;
    info!("loading atlas from {}", atlas_dir.display());
    let atlas = Atlas::open(&atlas_dir, args.z_center, args.num_slices)
        .with_context(|| format!("cannot load atlas {}", atlas_dir.display()))?;

    let all = PhantomParams::sweep(args.wm, &args.gm, &args.noise, &args.smooth);
    // 先检查全部参数, 避免写出一半再失败.
    for p in &all {
        p.validate()?;
    }

    fs::create_dir_all(&args.folder_out)
        .with_context(|| format!("cannot create {}", args.folder_out.display()))?;
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    utils::sep();
    for params in &all {
        let record = phantom::write_phantom(&args.folder_out, &atlas, params, &mut rng)?;
        println!("{}", record.file);
    }
    phantom::write_masks(&args.folder_out, &atlas)?;
    utils::sep();
    info!(
        "{} phantoms written to {}",
        all.len(),
        args.folder_out.display()
    );
    Ok(())
}
