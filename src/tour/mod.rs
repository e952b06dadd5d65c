//! Guided tour — a short, personalized walkthrough of the site.
//!
//! The sequencer picks and orders steps from the catalog based on the stored
//! profile; the runtime walks the user through them, records answers and
//! time spent, and hands off to other screens through the signal bus.

pub mod catalog;
pub mod interests;
pub mod model;
pub mod routes;
pub mod runtime;
pub mod sequencer;
pub mod state;
pub mod step;

pub use catalog::StepCatalog;
pub use model::{Answer, UserProfile};
pub use routes::{TourRouteState, tour_routes};
pub use runtime::{AnswerOutcome, TourDeps, TourRuntime, TourStatus, TourView, spawn_signal_listener};
pub use state::{Navigation, TourState};
pub use step::{StepAction, StepCategory, TourStep};
