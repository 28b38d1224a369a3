pub mod extractor;
pub mod process;

pub use extractor::{ExtractedFrames, FrameExtractor, collect_frames, frame_file_name};
pub use process::{ProcessExit, ProcessRunner, SystemProcessRunner};
