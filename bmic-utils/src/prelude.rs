//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx3d;
pub use crate::{Error, ErrorKind, Result};

pub use crate::data::{
    load_nii, load_nii_data, save_nii, Affine, Limits, NiiVolume, ToI16Lossy, WindowMask,
};

pub use crate::seg::{segment_3d, segment_dyn, SlicParams};

pub use crate::points::{export_points, nonzero_points, read_ply_points, Point3};

pub use crate::metrics::{hausdorff_3d, DiceLoss, DiceScore};

pub use crate::io::{
    auto_args, blob_read, blob_write, json_read, json_read_as, json_write, yaml_read,
    yaml_read_as, yaml_write, Blob, Document, EasyDict, FromArgs,
};

pub use crate::vis::{best_view_indices, save_views};

pub use crate::consts::label::{START_LABEL, UNLABELED};
