use chrono::Local;
use std::time::Duration;
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::widget::Event;

pub const TICK: Duration = Duration::from_secs(1);

/// Wall-clock time as shown in the widget.
pub fn format_now() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Periodic task posting [`Event::Tick`] with the current time.
///
/// Runs from [`ClockTicker::start`] until [`ClockTicker::stop`] or drop,
/// whichever comes first.
#[derive(Debug)]
pub struct ClockTicker {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ClockTicker {
    pub fn start(events: UnboundedSender<Event>, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = interval.tick() => {
                        if events.send(Event::Tick(format_now())).is_err() {
                            // receiver gone, nobody to tick for
                            break;
                        }
                    }
                }
            }
            debug!("clock ticker stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    /// Cancel and wait for the task to exit.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for ClockTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
