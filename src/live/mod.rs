//! Live telemetry
//!
//! - **poller**: self-pacing loop that fetches one live reading per period
//!   and extends the temperature and humidity charts, only while the live
//!   view is showing
//! - **dispatcher**: starts the poller when the operator switches to the
//!   live view
//!
//! Starting is explicit, stopping is not: the poller checks the view (and
//! its cancellation token) every cycle and ends itself once the live view is
//! gone, a mount point disappears, or a fetch fails.

pub mod dispatcher;
pub mod poller;

pub use dispatcher::ViewChangeDispatcher;
pub use poller::{LivePoller, PollExit};
