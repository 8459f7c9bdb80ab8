pub mod nifti_io;
pub mod tiff_io;
pub mod volume;
pub mod render;
pub mod mesh_io;

pub use nifti_io::{read_nifti, write_labels_nifti, write_nifti};
pub use tiff_io::{read_tiff_stack, write_tiff_stack};
pub use volume::{read_volume, write_volume, VolumeFormat};
pub use render::{label_overlay, labels_in_plane, montage, render_plane, save_png};
pub use mesh_io::write_obj;
