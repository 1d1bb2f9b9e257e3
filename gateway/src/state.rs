//! Shared application state.

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ServerConfig;
use crate::core::llm::{SharedLLM, create_llm_provider};
use crate::core::session::{CallState, SessionCapabilities};
use crate::core::stt::{STTConfig, create_stt_provider};
use crate::core::tts::{TTSConfig, TTSProvider, create_tts_provider};
use crate::errors::{CallError, CallResult};

/// Builds the vendor capabilities for one call.
pub trait CapabilityBuilder: Send + Sync {
    fn build(&self) -> CallResult<SessionCapabilities>;
}

/// Deepgram, OpenAI and the configured synthesis vendor.
pub struct VendorCapabilities {
    stt: STTConfig,
    llm: SharedLLM,
    tts_provider: TTSProvider,
    tts: TTSConfig,
}

impl VendorCapabilities {
    pub fn from_config(config: &ServerConfig) -> CallResult<Self> {
        let stt = config.stt_config().map_err(CallError::Configuration)?;
        let llm_config = config.llm_config().map_err(CallError::Configuration)?;
        let tts = config.tts_config().map_err(CallError::Configuration)?;
        let llm = create_llm_provider(&llm_config.provider, llm_config.clone())?;

        // Surface synthesis misconfiguration at startup rather than on the first turn.
        create_tts_provider(&tts.provider, tts.clone())?;

        Ok(Self {
            stt,
            llm,
            tts_provider: config.tts_provider,
            tts,
        })
    }
}

impl CapabilityBuilder for VendorCapabilities {
    fn build(&self) -> CallResult<SessionCapabilities> {
        let stt = create_stt_provider(&self.stt.provider, self.stt.clone())?;
        let provider = self.tts_provider.to_string();
        let tts_config = self.tts.clone();

        Ok(SessionCapabilities {
            stt,
            llm: self.llm.clone(),
            tts: Arc::new(move || create_tts_provider(&provider, tts_config.clone())),
        })
    }
}

/// A call currently being served.
#[derive(Debug, Clone)]
pub struct ActiveCall {
    pub started: Instant,
    pub state: watch::Receiver<CallState>,
}

pub struct AppState {
    pub config: ServerConfig,
    /// Cancelled on process shutdown; each call runs under a child token
    pub shutdown: CancellationToken,
    pub capabilities: Arc<dyn CapabilityBuilder>,
    calls: DashMap<String, ActiveCall>,
}

impl AppState {
    /// State backed by the vendor adapters selected in `config`.
    pub fn new(config: ServerConfig, shutdown: CancellationToken) -> CallResult<Arc<Self>> {
        let capabilities = VendorCapabilities::from_config(&config)?;
        info!(
            stt = %capabilities.stt.provider,
            tts = %capabilities.tts_provider,
            llm = capabilities.llm.provider_name(),
            "Vendor capabilities configured"
        );
        Ok(Self::with_capabilities(
            config,
            shutdown,
            Arc::new(capabilities),
        ))
    }

    pub fn with_capabilities(
        config: ServerConfig,
        shutdown: CancellationToken,
        capabilities: Arc<dyn CapabilityBuilder>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            shutdown,
            capabilities,
            calls: DashMap::new(),
        })
    }

    /// Tracks a call until the returned guard is dropped.
    pub fn register_call(
        self: &Arc<Self>,
        call_id: impl Into<String>,
        state: watch::Receiver<CallState>,
    ) -> CallRegistration {
        let call_id = call_id.into();
        self.calls.insert(
            call_id.clone(),
            ActiveCall {
                started: Instant::now(),
                state,
            },
        );
        CallRegistration {
            state: self.clone(),
            call_id,
        }
    }

    pub fn active_calls(&self) -> usize {
        self.calls.len()
    }

    pub fn call_state(&self, call_id: &str) -> Option<CallState> {
        self.calls.get(call_id).map(|call| *call.state.borrow())
    }
}

/// Removes a call from the registry on drop.
pub struct CallRegistration {
    state: Arc<AppState>,
    call_id: String,
}

impl CallRegistration {
    pub fn call_id(&self) -> &str {
        &self.call_id
    }
}

impl Drop for CallRegistration {
    fn drop(&mut self) {
        self.state.calls.remove(&self.call_id);
    }
}
