//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::{
    AcquisitionDuration, Mask, MaskSlice, NiftiHeaderAttr, Sidecar, Volume, VolumeSlice,
};

pub use crate::metrics::{
    sharpness, ContrastDenominator, MetricConfig, MetricEngine, MetricError, MetricInputs,
    MetricResult, RoiKind, TimeNormalization,
};
pub use crate::stats::{weighted_mean, weighted_mean_std, SliceStatistic};

pub use crate::segment::{white_matter_mask, ManualSegmentation, Segmenter, TissueMasks};

pub use crate::phantom::{Atlas, PhantomParams, PhantomRecord};

pub use crate::sink::ResultTable;
