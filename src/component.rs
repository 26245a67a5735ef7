use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Where a component wants to be placed in the setup order.
/// Components are set up from the lowest to the highest priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SetupPriority {
    /// Buses and devices.
    Hardware,

    /// Bringing up the network.
    Network,

    /// Needs the network subsystem to exist.
    /// Note that this does not mean the network is connected.
    AfterNetwork,

    /// Anything else.
    Late,
}

/// Something driven by a host scheduler.
///
/// [`Component::setup`] is called exactly once, then [`Component::tick`] repeatedly.
/// Neither may block, since all components share the same thread.
pub trait Component {
    /// One-time setup.
    fn setup(&mut self);

    /// A single non-blocking pass of work.
    fn tick(&mut self);

    /// See [`SetupPriority`].
    fn setup_priority(&self) -> SetupPriority {
        SetupPriority::Late
    }
}

/// Set up the components in priority order, then tick them all at the given cadence, forever.
///
/// The cadence is best-effort: if a round of ticks takes too long,
/// the next round starts a full cadence after it rather than catching up.
pub async fn run(components: &mut [&mut dyn Component], cadence: Duration) {
    components.sort_by_key(|component| component.setup_priority());

    for component in components.iter_mut() {
        debug!(priority = ?component.setup_priority(), "Setting up component");
        component.setup();
    }

    info!(
        "{} component(s) set up, ticking every {cadence:?}",
        components.len()
    );

    let mut interval = time::interval(cadence);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        for component in components.iter_mut() {
            component.tick();
        }
    }
}
