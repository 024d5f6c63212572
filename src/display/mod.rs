// src/display/mod.rs
//! Consumers of published navigation updates

pub mod json;
pub mod terminal;

use crate::{error::Result, publish::NavUpdate};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Trait for different display implementations
pub trait NavDisplay {
    /// Present one update. Called once per publication tick.
    fn render(&mut self, update: &NavUpdate) -> Result<()>;

    /// Restore whatever the display changed. Called once on exit.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Feed every published update to `display` until cancelled or until the
/// publisher goes away.
pub async fn drive<D: NavDisplay>(
    mut updates: watch::Receiver<NavUpdate>,
    display: &mut D,
    cancel: CancellationToken,
) -> Result<()> {
    let initial = updates.borrow_and_update().clone();
    let mut result = display.render(&initial);

    while result.is_ok() {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let update = updates.borrow_and_update().clone();
        result = display.render(&update);
    }

    display.finish()?;
    result
}
