mod data;
mod header;
#[allow(clippy::module_inception)]
mod record;
mod view;

pub use data::{ReadData, FLOWGRAM_MAX, FLOWGRAM_SCALE};
pub use header::{ReadHeader, SIZE_READ_HEADER};
pub use record::SffRecord;
pub use view::{QualityEncoding, Trim, View};
