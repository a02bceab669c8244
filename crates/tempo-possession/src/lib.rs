pub mod segmenter;

pub use segmenter::{segment, EndReason, Possession};
