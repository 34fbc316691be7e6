//! Server lifecycle and the single-consumer dispatch loop

use crate::error::Result;
use svckit_core::config::AppConfig;
use svckit_core::logging;
use svckit_discovery::{DiscoveryEvent, DiscoveryService};
use svckit_timer::{TimerFired, TimerScheduler};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A running svckit node.
///
/// Owns the timer scheduler, the optional discovery service, and the
/// dispatch loop consuming their events. Events are processed strictly one
/// at a time: timer callbacks and the discovery hook never run
/// concurrently with each other.
pub struct Server {
    timers: TimerScheduler,
    discovery: Option<DiscoveryService>,
    shutdown: watch::Sender<bool>,
    dispatch_task: Option<JoinHandle<()>>,
}

impl Server {
    /// Validates the configuration, bootstraps logging, and starts the
    /// framework components.
    ///
    /// `on_discovery` is invoked by the dispatch loop for every non-echo
    /// peer announcement; capture whatever context the application needs.
    /// Discovery runs only when the configuration carries a `discovery`
    /// section. On any failure, everything already started is torn down
    /// before the error is returned.
    pub async fn start(
        config: AppConfig,
        on_discovery: impl FnMut(DiscoveryEvent) + Send + 'static,
    ) -> Result<Self> {
        config.validate()?;
        logging::init(&config.logging);

        info!(service = %config.app.service_name, "starting server");

        let (timer_tx, timer_rx) =
            async_channel::bounded::<TimerFired>(config.app.event_queue_capacity);
        let mut timers = TimerScheduler::start(config.timer.scan_interval_ms, timer_tx);

        // When discovery is disabled, the dispatch loop selects on a
        // stand-in channel that never fires; its sender must stay alive
        // inside the loop or the select arm would wake immediately.
        let (discovery, discovery_rx, keep_open) = match &config.discovery {
            Some(discovery_config) => {
                let mut service = match DiscoveryService::new(discovery_config.clone()) {
                    Ok(service) => service,
                    Err(e) => {
                        timers.stop().await;
                        return Err(e.into());
                    }
                };

                if let Err(e) = service.start().await {
                    timers.stop().await;
                    return Err(e.into());
                }

                let events = service.events();
                (Some(service), events, None)
            }
            None => {
                debug!("discovery not configured, skipping");
                let (tx, rx) = async_channel::bounded::<DiscoveryEvent>(1);
                (None, rx, Some(tx))
            }
        };

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let mut hook = on_discovery;
        let dispatch_task = tokio::spawn(async move {
            let _keep_open = keep_open;

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        debug!("dispatch loop shutting down");
                        break;
                    }
                    fired = timer_rx.recv() => match fired {
                        Ok(fired) => fired.run(),
                        Err(_) => {
                            debug!("timer queue closed, dispatch loop exiting");
                            break;
                        }
                    },
                    event = discovery_rx.recv() => match event {
                        Ok(event) => hook(event),
                        Err(_) => {
                            debug!("discovery queue closed, dispatch loop exiting");
                            break;
                        }
                    },
                }
            }
        });

        info!("server started");

        Ok(Self {
            timers,
            discovery,
            shutdown,
            dispatch_task: Some(dispatch_task),
        })
    }

    /// The timer scheduler, for scheduling application timers.
    pub fn timers(&self) -> &TimerScheduler {
        &self.timers
    }

    /// The discovery service, when discovery is configured.
    pub fn discovery(&self) -> Option<&DiscoveryService> {
        self.discovery.as_ref()
    }

    /// Stops the dispatch loop, the discovery service, and the timer
    /// scheduler, in that order. Idempotent.
    pub async fn stop(&mut self) {
        let _ = self.shutdown.send(true);

        if let Some(task) = self.dispatch_task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "dispatch loop ended abnormally");
            }
        }

        if let Some(mut discovery) = self.discovery.take() {
            discovery.stop().await;
        }

        self.timers.stop().await;

        info!("server stopped");
    }
}
