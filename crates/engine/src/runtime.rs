// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine assembly: one struct owning the wired-together core.

use crate::bus::EventBus;
use crate::checkpoint::{CheckpointMachine, CheckpointRules};
use crate::dispatcher::Dispatcher;
use crate::matcher::Matcher;
use crate::ops::OperationRegistry;
use crate::queue::OperationQueue;
use crate::workflow::blocks::{
    AcquirePermitBlock, EnsureCheckpointBlock, ExtractListBlock, MatchPageBlock, NavigateBlock,
    PersistJsonlBlock, RunOperationBlock, WaitBlock,
};
use crate::workflow::{BlockRegistry, WorkflowExecutor, WorkflowRegistry};
use drover_bridge::{
    Bridge, BridgeContextProvider, ContextProvider, NoopPermitService, PermitService, WsBridge,
};
use drover_core::{CoreConfig, ErrorKind, Event, Fault, SystemClock};
use drover_library::ContainerLibrary;
use drover_storage::{ProgressStore, RunMode};
use serde_json::Value;
use std::sync::Arc;

/// The assembled core. Everything is behind `Arc`s so callers can hold
/// onto the pieces they drive.
pub struct Engine {
    pub config: CoreConfig,
    pub library: Arc<ContainerLibrary>,
    pub operations: Arc<OperationRegistry>,
    pub bus: Arc<EventBus>,
    pub queue: OperationQueue<SystemClock>,
    pub provider: Arc<dyn ContextProvider>,
    pub matcher: Arc<Matcher>,
    pub machine: Arc<CheckpointMachine>,
    pub blocks: Arc<BlockRegistry>,
    pub workflows: Arc<WorkflowRegistry>,
    pub executor: Arc<WorkflowExecutor>,
    pub dispatcher: Arc<Dispatcher<SystemClock>>,
    pub progress: Option<Arc<ProgressStore>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}

impl Engine {
    /// Publish the library-loaded event (split from `build` so assembly
    /// stays synchronous).
    pub async fn announce_library(&self) {
        if let Some(snapshot) = self.library.snapshot() {
            self.bus
                .publish(&Event::LibraryLoaded {
                    hash: snapshot.hash().to_string(),
                    containers: snapshot.len(),
                })
                .await;
        }
    }
}

/// Builds an [`Engine`] from config plus a bridge.
pub struct EngineBuilder {
    config: CoreConfig,
    bridge: Option<Arc<dyn Bridge>>,
    permits: Option<Arc<dyn PermitService>>,
    rules: Option<CheckpointRules>,
    source: String,
}

impl EngineBuilder {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            bridge: None,
            permits: None,
            rules: None,
            source: "drover".to_string(),
        }
    }

    pub fn bridge(mut self, bridge: Arc<dyn Bridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    pub fn permits(mut self, permits: Arc<dyn PermitService>) -> Self {
        self.permits = Some(permits);
        self
    }

    pub fn checkpoint_rules(mut self, rules: CheckpointRules) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Progress-record source tag (defaults to "drover").
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Connect a WebSocket bridge from `config.bridge_url`, then build.
    pub async fn connect(mut self) -> Result<Engine, Fault> {
        if self.bridge.is_none() {
            let bridge = WsBridge::connect(&self.config.bridge_url)
                .await
                .map_err(|e| e.into_fault())?;
            self.bridge = Some(Arc::new(bridge));
        }
        self.build()
    }

    /// Assemble the engine. Loads the library eagerly: an invalid library
    /// refuses to start.
    pub fn build(self) -> Result<Engine, Fault> {
        let bridge = self
            .bridge
            .ok_or_else(|| Fault::new(ErrorKind::BridgeClosed, "engine built without a bridge"))?;

        let library = Arc::new(ContainerLibrary::new(self.config.library_root.clone()));
        library
            .load()
            .map_err(|e| Fault::new(e.kind(), e.to_string()))?;

        let bus = Arc::new(EventBus::new());
        let operations = Arc::new(OperationRegistry::new());
        operations.ensure_builtin();

        let queue = OperationQueue::new(operations.clone(), bus.clone(), SystemClock);
        let provider: Arc<dyn ContextProvider> =
            Arc::new(BridgeContextProvider::new(bridge.clone()));
        queue.set_context_provider(provider.clone());

        let matcher = Arc::new(Matcher::new(library.clone()));
        let machine = Arc::new(CheckpointMachine::new(
            self.rules.unwrap_or_else(CheckpointRules::xiaohongshu),
            matcher.clone(),
        ));

        let permits = self
            .permits
            .unwrap_or_else(|| Arc::new(NoopPermitService::new()));

        let blocks = Arc::new(BlockRegistry::new());
        blocks.register_block(
            "match_page",
            Arc::new(MatchPageBlock {
                matcher: matcher.clone(),
                provider: provider.clone(),
                bus: bus.clone(),
            }),
        );
        blocks.register_block(
            "ensure_checkpoint",
            Arc::new(EnsureCheckpointBlock {
                machine: machine.clone(),
                provider: provider.clone(),
                bus: bus.clone(),
            }),
        );
        blocks.register_block(
            "run_operation",
            Arc::new(RunOperationBlock { queue: queue.clone(), library: library.clone() }),
        );
        blocks.register_block(
            "extract_list",
            Arc::new(ExtractListBlock { queue: queue.clone(), library: library.clone() }),
        );
        blocks.register_block(
            "persist_jsonl",
            Arc::new(PersistJsonlBlock { download_root: self.config.download_root.clone() }),
        );
        blocks.register_block("acquire_permit", Arc::new(AcquirePermitBlock { permits }));
        blocks.register_block("navigate", Arc::new(NavigateBlock { provider: provider.clone() }));
        blocks.register_block("wait", Arc::new(WaitBlock));

        let workflows = Arc::new(WorkflowRegistry::new());
        let executor = Arc::new(WorkflowExecutor::new(
            blocks.clone(),
            workflows.clone(),
            bus.clone(),
        ));

        let dispatcher = Arc::new(Dispatcher::new(
            queue.clone(),
            library.clone(),
            operations.clone(),
        ));
        dispatcher.install(&bus);

        let progress = self.config.progress_file.as_ref().map(|path| {
            Arc::new(
                ProgressStore::open(path.clone(), self.source.clone())
                    .with_max_replay_bytes(self.config.event_replay_max_bytes),
            )
        });
        if let Some(store) = &progress {
            let store = store.clone();
            bus.add_middleware(move |event| {
                let store = store.clone();
                async move {
                    let profile = event
                        .payload
                        .get("profile")
                        .and_then(Value::as_str)
                        .map(drover_core::ProfileId::from);
                    let run_id = event
                        .payload
                        .get("run_id")
                        .and_then(Value::as_str)
                        .map(drover_core::RunId::from_string);
                    store.append(
                        RunMode::Workflow,
                        profile.as_ref(),
                        run_id.as_ref(),
                        &event.topic,
                        event.payload.clone(),
                    );
                }
            });
        }

        Ok(Engine {
            config: self.config,
            library,
            operations,
            bus,
            queue,
            provider,
            matcher,
            machine,
            blocks,
            workflows,
            executor,
            dispatcher,
            progress,
        })
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
