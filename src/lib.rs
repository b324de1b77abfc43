//! tonescope library - live instrument EQ, spectrum analysis and recording

pub mod audio;
pub mod cli;
pub mod controls;
pub mod error;
pub mod params;
pub mod recording;
pub mod render_loop;
pub mod rendering;
pub mod scheduler;
pub mod session;
pub mod visualizer;
