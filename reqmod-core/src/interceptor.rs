//! Interception lifecycle
//!
//! The engine only runs while interception is switched on. The switch
//! is a watch channel, so every holder sees a toggle immediately and a
//! background task can follow the transitions.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::context::{Phase, RequestContext};
use crate::dispatcher::{Dispatcher, PassReport};

/// Dispatcher plus the on/off switch in front of it
#[derive(Clone)]
pub struct Interceptor {
    dispatcher: Arc<Dispatcher>,
    enabled: watch::Receiver<bool>,
}

impl Interceptor {
    pub fn new(dispatcher: Arc<Dispatcher>, enabled: watch::Receiver<bool>) -> Self {
        Self {
            dispatcher,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled.borrow()
    }

    /// Run one phase, or nothing at all while interception is off
    pub async fn intercept(&self, phase: Phase, ctx: &RequestContext) -> Option<PassReport> {
        if !self.is_enabled() {
            return None;
        }
        Some(self.dispatcher.run_pass(phase, ctx).await)
    }
}

/// Log every toggle until the sending side goes away
pub fn spawn_transition_logger(mut enabled: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while enabled.changed().await.is_ok() {
            if *enabled.borrow() {
                info!("Interception enabled, request hooks attached");
            } else {
                info!("Interception disabled, request hooks detached");
            }
        }
    })
}
