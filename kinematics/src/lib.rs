pub mod action;
pub mod camera;
pub mod collision;
pub mod constants;
pub mod driver;
pub mod flags;
pub mod hud;
pub mod level;
pub mod pawn;
pub mod scene_file;

pub use action::{ActionBuffer, ActionConfig, ActionDebugState, FrameInput, StepIntent};
pub use camera::{CameraConfig, PresentationCamera};
pub use constants::{FIXED_DT, MAX_ACCUMULATOR_SECONDS};
pub use driver::{FixedStepClock, FixedStepDriver, FrameReport, RespawnReason, SessionConfig, Simulation};
pub use hud::HudSnapshot;
pub use level::{CubePreset, StairFixture, build_stairs, build_world};
pub use pawn::{PawnConfig, PawnState};
pub use scene_file::{LoadStatus, SceneDescription, SceneLoadError, load_scene_file, parse_scene};
