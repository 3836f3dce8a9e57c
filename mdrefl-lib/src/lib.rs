pub mod compare;
pub mod config;
pub mod constants;
pub mod error;
pub mod job;
pub mod lgt;
pub mod pdb;
pub mod qdata;
pub mod reflect;
pub mod scatlen;
pub mod sld;
pub mod snapshot;
pub mod spline;
pub mod stats;

pub use compare::{Comparison, FitResult};
pub use config::{JobConfig, TimeSelection};
pub use error::{ErrorCategory, MdReflError, Result};
pub use job::{Job, JobOutput};
pub use lgt::{format_lgt, parse_lgt, read_lgt, write_lgt};
pub use pdb::{parse_pdb, read_pdb};
pub use qdata::{DatOptions, QSet, parse_dat, read_dat};
pub use reflect::{
    AveragedPoint, AveragedReflectivity, ReflectivityCurve, ReflectivityPoint, abeles, average_ref,
    calc_ref, smeared,
};
pub use scatlen::ScatteringTable;
pub use sld::{AveragedProfile, FrameProfile, average_profiles, frame_profile};
pub use snapshot::{decode_snapshot, read_snapshot};
pub use stats::mean_stderr;
pub use mdrefl_data;
