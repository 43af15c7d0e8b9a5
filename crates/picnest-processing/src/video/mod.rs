//! Video probing and poster frame extraction via external tools.

pub mod poster;
pub mod probe;

pub use poster::PosterExtractor;
pub use probe::{VideoProbe, VideoProber};
