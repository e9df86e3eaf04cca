//! Shared fixtures for unit tests.

use crate::framework::Framework;
use crate::uow::{UnitOfWork, UowRegistry};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};

pub const RECORDING_UOW: &str = "recording";

/// Records performed payloads; optionally parks each task until a permit is released.
///
/// Payloads with `"fail": true` return an error, payloads with `"panic": true` panic.
pub struct RecordingUow {
    pub performed: Mutex<Vec<Value>>,
    pub gate: Option<Arc<Semaphore>>,
}

impl RecordingUow {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            performed: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    pub fn gated(gate: Arc<Semaphore>) -> Arc<Self> {
        Arc::new(Self {
            performed: Mutex::new(Vec::new()),
            gate: Some(gate),
        })
    }

    pub async fn performed(&self) -> Vec<Value> {
        self.performed.lock().await.clone()
    }
}

#[async_trait]
impl UnitOfWork for RecordingUow {
    fn name(&self) -> &str {
        RECORDING_UOW
    }

    async fn perform_task(&self, payload: Value) -> Result<()> {
        if let Some(gate) = &self.gate {
            gate.acquire().await?.forget();
        }

        if payload.get("panic").and_then(Value::as_bool).unwrap_or(false) {
            panic!("recording task asked to panic");
        }
        if payload.get("fail").and_then(Value::as_bool).unwrap_or(false) {
            return Err(anyhow::anyhow!("recording task asked to fail"));
        }

        self.performed.lock().await.push(payload);
        Ok(())
    }

    async fn orchestrate(&self, _framework: &Framework) -> Result<()> {
        Ok(())
    }
}

/// A registry holding the built-ins plus one shared `RecordingUow` under `"recording"`.
pub fn registry_with(uow: Arc<RecordingUow>) -> Arc<UowRegistry> {
    let registry = UowRegistry::with_builtins();
    registry.register(RECORDING_UOW, move |_prefix| uow.clone());
    registry
}
