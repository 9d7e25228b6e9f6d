//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx2dF, Idx3d};

pub use crate::data::{
    DerivedMap, FieldSliceVis, ImgWriteRaw, ImgWriteVis, MaskSlice, MetricWindow, NiftiVolumeAttr,
    PhantomMask,
};

pub use crate::consts::gray::{MASK_BACKGROUND, MASK_PHANTOM};
pub use crate::consts::DEFAULT_CLOSING_RADIUS;

pub use crate::infill::{Metric, Pattern};

pub use crate::study::{Phantom, ScanSession, SingleScan, Study, TubeEntry};

pub use crate::truth::{
    compare_to_pattern, find_centroid, find_centroid_with, gen_geometry_data, save_npy,
    transform_image_point, Orientation,
};

#[cfg(feature = "rayon")]
pub use crate::truth::par_gen_geometry_data;
