pub mod framerate;
pub mod gesture;
pub mod stepper;
pub mod transform;

pub use framerate::{DeltaSampler, FrameRateEstimate};
pub use gesture::{GestureTracker, Point, StageRect};
pub use stepper::step_target;
pub use transform::ViewTransform;
