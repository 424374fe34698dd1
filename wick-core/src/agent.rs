//! The agent turn loop.
//!
//! Generalized from `neuron-op-react::ReactOperator::execute`'s ReAct
//! loop — assemble context, call the provider, route any tool calls,
//! check hooks and limits at each checkpoint, compact when the
//! transcript grows too large, repeat — but reshaped around an
//! event-sourced [`wick_event_log::EventLog`] instead of an external
//! state reader, and split into a stateful `run`/`run_stream` pair
//! instead of one atomic `execute`.

use crate::activation_gate::ActivationGate;
use crate::config::AgentConfig;
use crate::convert::to_provider_messages;
use crate::error::AgentError;
use crate::persistence::CheckpointData;
use crate::response_cache::ResponseCache;
use crate::sandbox::{CodeBlockExtractor, DynamicLanguageAdapter, NullSandbox, Sandbox, SandboxResult};
use std::sync::Arc;
use tokio::sync::mpsc;
use wick_autonomy::{AutonomyController, LimitStatus};
use wick_context::compact;
use wick_event_log::EventLog;
use wick_hooks::HookRegistry;
use wick_memory::{MemoryStore, ScoredEntry};
use wick_proto::{
    Content, EventSource, EventType, HookContext, HookPoint, HookResult, MemoryId, SessionId,
};
use wick_provider::{Provider, ProviderRequest, ProviderResponse, StopReason, StreamChunk, ToolSchema};
use wick_safety::SafetyPipeline;
use wick_scheduler::{JobAction, JobId, JobSchedule, ScheduledJob, Scheduler};
use wick_tool::{PermissionClass, RemoteToolManager, ToolRegistry};

/// What `run`/`run_stream` hand back: `status` is `1` for a normal
/// completion and `-1` for any halted/blocked/errored outcome.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// `1` on success, `-1` if the turn was blocked, errored, or hit a limit.
    pub status: i32,
    /// The turn's response content (or a human-readable halt reason).
    pub data: Content,
    /// Token usage for this turn, if the provider was reached.
    pub usage: Option<wick_provider::TokenUsage>,
    /// Model that actually served the turn.
    pub model: Option<String>,
    /// Whether the response came from the response cache.
    pub cached: bool,
}

/// Per-call overrides for [`Agent::run_stream`]. Currently only a
/// model override; more fields follow the same pattern as
/// `wick_proto::TurnConfig` if this grows more per-call knobs.
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// Model override for this call only.
    pub model: Option<String>,
}

/// Outcome of routing a single tool call.
struct ToolOutcome {
    content: String,
    is_error: bool,
}

impl ToolOutcome {
    fn ok(value: serde_json::Value) -> Self {
        Self { content: value.to_string(), is_error: false }
    }

    fn failed(reason: impl Into<String>) -> Self {
        Self {
            content: serde_json::json!({ "success": false, "error": reason.into() }).to_string(),
            is_error: true,
        }
    }
}

/// A stateful, single-owner agent: event log, hooks, autonomy, safety,
/// memory, scheduler, and tools, driven by one `P: Provider`.
///
/// `Agent` is not `Clone`/`Sync`-shared by design — it's meant to be
/// owned by whatever loop is driving a single conversation. Concurrent
/// conversations get their own `Agent`.
pub struct Agent<P: Provider> {
    provider: P,
    config: AgentConfig,
    event_log: EventLog,
    hooks: HookRegistry,
    autonomy: AutonomyController,
    safety: SafetyPipeline,
    memory: MemoryStore,
    scheduler: Scheduler,
    tools: ToolRegistry,
    remote_tools: Option<Arc<dyn RemoteToolManager>>,
    sandbox: Box<dyn Sandbox>,
    code_extractor: CodeBlockExtractor,
    code_adapter: DynamicLanguageAdapter,
    activation_gate: ActivationGate,
    response_cache: Option<Arc<dyn ResponseCache>>,
    system_prompt: String,
    session: Option<SessionId>,
    pending_message: Option<Content>,
    last_hygiene_ms: i64,
}

impl<P: Provider> Agent<P> {
    /// Build an agent around a provider and configuration. Tools,
    /// hooks, and a remote tool manager are registered afterward via
    /// the `*_mut` accessors.
    pub fn new(provider: P, config: AgentConfig) -> Self {
        let now = now_ms();
        let system_prompt = config.system_prompt.clone();
        let autonomy = AutonomyController::new(config.autonomy_level, config.autonomy_budget.clone(), now);
        let safety = SafetyPipeline::new(config.vault_prefix.clone());
        let memory = MemoryStore::new(None, config.recall_cache_max);
        let sandbox_budget = config.max_result_length;
        Self {
            provider,
            config,
            event_log: EventLog::new(),
            hooks: HookRegistry::new(),
            autonomy,
            safety,
            memory,
            scheduler: Scheduler::new(),
            tools: ToolRegistry::new(),
            remote_tools: None,
            sandbox: Box::new(NullSandbox::new(sandbox_budget)),
            code_extractor: CodeBlockExtractor::new(),
            code_adapter: DynamicLanguageAdapter::new(),
            activation_gate: ActivationGate::new(),
            response_cache: None,
            system_prompt,
            session: None,
            pending_message: None,
            last_hygiene_ms: now,
        }
    }

    /// The agent's session id, if one has been assigned.
    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    /// Assign a session id (for conversation continuity across restarts).
    pub fn set_session(&mut self, session: SessionId) {
        self.session = Some(session);
    }

    /// Mutable access to the tool registry, for registering local tools.
    pub fn tools_mut(&mut self) -> &mut ToolRegistry {
        &mut self.tools
    }

    /// Mutable access to the hook registry, for registering hooks.
    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    /// Install a remote tool manager (MCP-style external tool clients).
    pub fn set_remote_tools(&mut self, manager: Arc<dyn RemoteToolManager>) {
        self.remote_tools = Some(manager);
    }

    /// Install a sandbox for the code-execution fallback path.
    pub fn set_sandbox(&mut self, sandbox: Box<dyn Sandbox>) {
        self.sandbox = sandbox;
    }

    /// Install a response cache.
    pub fn set_response_cache(&mut self, cache: Arc<dyn ResponseCache>) {
        self.response_cache = Some(cache);
    }

    /// Read-only access to the event log, e.g. for an external viewer
    /// or for computing derived history/goals/tool-call views.
    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    /// Mutable access to the event log — an escape hatch for hosts
    /// that want to append event types this crate doesn't otherwise
    /// emit. Goal tracking has its own typed API: see [`Self::add_goal`],
    /// [`Self::complete_goal`], [`Self::fail_goal`].
    pub fn event_log_mut(&mut self) -> &mut EventLog {
        &mut self.event_log
    }

    /// The agent's autonomy controller, for inspecting or adjusting
    /// the current level and budget counters.
    pub fn autonomy_mut(&mut self) -> &mut AutonomyController {
        &mut self.autonomy
    }

    /// Goals derived from the event log so far.
    pub fn goals(&self) -> Vec<wick_event_log::Goal> {
        wick_event_log::derive_goals(self.event_log.events())
    }

    /// Add a new goal in `active` status. Returns the assigned id.
    pub fn add_goal(
        &mut self,
        description: impl Into<String>,
        sub_goals: Vec<String>,
    ) -> String {
        let id = format!("goal_{}", wick_proto::id::random_id_segment());
        self.event_log.append(
            EventType::GoalAdded,
            serde_json::json!({
                "id": id,
                "description": description.into(),
                "status": "active",
                "sub_goals": sub_goals,
                "artifacts": Vec::<String>::new(),
            }),
            EventSource::Agent,
        );
        id
    }

    /// Mark a goal completed. Idempotent: completing an already-completed
    /// goal just appends another `completed` update, which `derive_goals`
    /// folds into the same terminal status.
    pub fn complete_goal(&mut self, id: impl Into<String>) {
        self.event_log.append(
            EventType::GoalUpdated,
            serde_json::json!({ "id": id.into(), "status": "completed" }),
            EventSource::Agent,
        );
    }

    /// Mark a goal failed. Idempotent, same as [`Self::complete_goal`].
    pub fn fail_goal(&mut self, id: impl Into<String>) {
        self.event_log.append(
            EventType::GoalUpdated,
            serde_json::json!({ "id": id.into(), "status": "failed" }),
            EventSource::Agent,
        );
    }

    /// Attach an artifact reference (path, url, memory key) to a goal.
    pub fn add_goal_artifact(&mut self, id: impl Into<String>, artifact: impl Into<String>) {
        let id = id.into();
        let mut artifacts: Vec<String> = self
            .goals()
            .into_iter()
            .find(|g| g.id == id)
            .map(|g| g.artifacts)
            .unwrap_or_default();
        artifacts.push(artifact.into());
        self.event_log.append(
            EventType::GoalUpdated,
            serde_json::json!({ "id": id, "artifacts": artifacts }),
            EventSource::Agent,
        );
    }

    /// Replace the base system prompt.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    /// Queue a user message for the next `run`/`run_stream` call.
    pub fn send_message(&mut self, text: impl Into<String>) {
        self.pending_message = Some(Content::text(text.into()));
    }

    // ---- memory -------------------------------------------------

    /// Store a memory entry. `core` entries are exempt from hygiene eviction.
    pub fn memory_store(
        &mut self,
        category: impl Into<String>,
        key: impl Into<String>,
        value: serde_json::Value,
        core: bool,
    ) -> MemoryId {
        let now = now_ms();
        let category = category.into();
        let key = key.into();
        let id = self.memory.store(category.clone(), key.clone(), value.clone(), None, core, now);
        self.event_log.append(
            EventType::MemoryStored,
            serde_json::json!({ "category": category, "key": key, "value": value, "core": core }),
            EventSource::Agent,
        );
        id
    }

    /// Forget a memory entry by id.
    pub fn memory_forget(&mut self, id: &MemoryId) -> bool {
        let forgotten = self.memory.forget(id);
        if forgotten {
            self.event_log.append(
                EventType::MemoryForgotten,
                serde_json::json!({ "id": id.as_str() }),
                EventSource::Agent,
            );
        }
        forgotten
    }

    /// Recall memory entries matching `query`. Opportunistically runs
    /// hygiene first if the configured TTL has elapsed since the last
    /// sweep, so a long-idle agent doesn't serve recall results from a
    /// stale, unbounded memory set.
    pub async fn memory_recall(
        &mut self,
        query: &str,
        category: Option<&str>,
        min_score: f64,
        top_k: usize,
    ) -> Vec<ScoredEntry> {
        let now = now_ms();
        if now - self.last_hygiene_ms > self.config.recall_cache_ttl_ms {
            self.memory_hygiene(now);
        }
        self.memory.recall(query, category, min_score, top_k).await
    }

    /// Run memory hygiene now (eviction by age/entry-count).
    pub fn memory_hygiene(&mut self, now_ms: i64) {
        self.memory.hygiene(7 * 24 * 60 * 60 * 1000, 10_000, now_ms);
        self.last_hygiene_ms = now_ms;
    }

    // ---- scheduler ------------------------------------------------

    /// Register a scheduled job.
    pub fn add_scheduler_job(&mut self, schedule: JobSchedule, action: JobAction) -> JobId {
        self.scheduler.add_job(schedule, action)
    }

    /// List all scheduled jobs.
    pub fn list_scheduler_jobs(&self) -> &[ScheduledJob] {
        self.scheduler.list_jobs()
    }

    /// Remove a scheduled job.
    pub fn remove_scheduler_job(&mut self, id: &JobId) -> bool {
        self.scheduler.remove_job(id)
    }

    /// Advance the scheduler. Each firing due job becomes a
    /// `scheduler_fired` event plus a synthetic user message appended
    /// to the event log, ready for the next `run` call to pick up —
    /// `wick_scheduler::Scheduler::tick` only reports firings, this is
    /// the "one layer up" it documents.
    pub fn tick(&mut self, now_ms: i64) -> Vec<JobId> {
        let firings = self.scheduler.tick(now_ms);
        let mut fired = Vec::with_capacity(firings.len());
        for firing in firings {
            let JobAction::AgentPrompt { content } = &firing.action;
            self.event_log.append(
                EventType::SchedulerFired,
                serde_json::json!({ "job_id": firing.job_id.as_str() }),
                EventSource::System,
            );
            self.event_log.append(
                EventType::UserMessage,
                serde_json::json!({ "content": content }),
                EventSource::System,
            );
            fired.push(firing.job_id);
        }
        fired
    }

    // ---- persistence ------------------------------------------------

    /// Serialize the full agent state to a checkpoint.
    pub fn checkpoint(&self) -> Result<Vec<u8>, AgentError> {
        let data = CheckpointData {
            id: format!("ckpt_{}", wick_proto::id::random_id_segment()),
            timestamp: now_ms(),
            system_prompt: self.system_prompt.clone(),
            session_history: self.event_log.events().to_vec(),
            active_goals: self.goals(),
            scheduler_snapshot: self.scheduler.snapshot(),
            version: crate::persistence::CHECKPOINT_VERSION,
        };
        Ok(serde_json::to_vec(&data).map_err(crate::persistence::PersistenceError::from)?)
    }

    /// Restore agent state from a checkpoint produced by [`Agent::checkpoint`].
    pub fn restore(&mut self, bytes: &[u8]) -> Result<(), AgentError> {
        let data: CheckpointData =
            serde_json::from_slice(bytes).map_err(crate::persistence::PersistenceError::from)?;
        self.system_prompt = data.system_prompt;
        self.event_log = EventLog::from_events(data.session_history);
        self.scheduler = Scheduler::from_jobs(data.scheduler_snapshot);
        Ok(())
    }

    // ---- the turn loop ------------------------------------------------

    /// Run one turn to completion: autonomy check, inbound hook,
    /// provider round-trips with tool execution until a final answer
    /// or `max_tool_iterations`, compacting the transcript as needed.
    pub async fn run(&mut self) -> Result<RunOutcome, AgentError> {
        tracing::info!("turn start");
        if let Some(outcome) = self.check_autonomy_limits() {
            tracing::info!(status = outcome.status, "turn end");
            return Ok(outcome);
        }

        let Some(raw_message) = self.pending_message.take() else {
            return Err(AgentError::NoPendingMessage);
        };

        match self.process_inbound(raw_message).await {
            Ok(()) => {}
            Err(outcome) => {
                tracing::info!(status = outcome.status, "turn end");
                return Ok(outcome);
            }
        }

        let outcome = self.turn_loop(None).await;
        if let Ok(outcome) = &outcome {
            tracing::info!(status = outcome.status, "turn end");
        }
        outcome
    }

    /// Like [`Agent::run`], but relays each provider chunk through a
    /// channel as it's produced. Because no provider in this workspace
    /// streams incrementally (`Provider::stream` returns its full chunk
    /// list eagerly), the channel is filled before this call returns —
    /// it exists so callers have one push-based interface regardless of
    /// transport, and so dropping the receiver mid-turn is a real,
    /// observable "stop producing" signal rather than a no-op.
    pub async fn run_stream(&mut self, options: StreamOptions) -> mpsc::UnboundedReceiver<StreamChunk> {
        let (tx, rx) = mpsc::unbounded_channel();

        if let Some(outcome) = self.check_autonomy_limits() {
            let _ = tx.send(StreamChunk::Text { delta: outcome.data.as_text().unwrap_or_default().to_string() });
            return rx;
        }

        let Some(raw_message) = self.pending_message.take() else {
            let _ = tx.send(StreamChunk::Error { message: "no pending message: call send_message first".into() });
            return rx;
        };

        if let Err(outcome) = self.process_inbound(raw_message).await {
            let _ = tx.send(StreamChunk::Error { message: outcome.data.as_text().unwrap_or_default().to_string() });
            return rx;
        }

        let _ = self.turn_loop(Some((tx, options))).await;
        rx
    }

    /// Autonomy budget/rate check. Returns `Some` blocking outcome and
    /// logs an `autonomy_blocked` event if the turn can't proceed.
    fn check_autonomy_limits(&mut self) -> Option<RunOutcome> {
        let now = now_ms();
        match self.autonomy.check_limits(now) {
            LimitStatus::Allowed => None,
            LimitStatus::Blocked { reason } => {
                self.event_log.append(
                    EventType::AutonomyBlocked,
                    serde_json::json!({ "reason": reason }),
                    EventSource::System,
                );
                Some(RunOutcome {
                    status: -1,
                    data: Content::text(reason),
                    usage: None,
                    model: None,
                    cached: false,
                })
            }
        }
    }

    /// Sanitize, run the `beforeInbound` hook, and append the user
    /// message event. `Err` carries the halt outcome if the hook blocks.
    async fn process_inbound(&mut self, raw_message: Content) -> Result<(), RunOutcome> {
        let sanitized = match raw_message.as_text() {
            Some(text) => {
                let result = self.safety.sanitize_input(text);
                if let Some(warning) = &result.warning {
                    tracing::warn!(warning, "inbound sanitizer flagged content");
                }
                Content::text(result.content)
            }
            None => raw_message,
        };

        let mut ctx = HookContext::new(HookPoint::BeforeInbound);
        ctx.message = Some(sanitized.clone());
        ctx.session = self.session.clone();
        if let HookResult::Block { reason } = self.hooks.dispatch(HookPoint::BeforeInbound, &mut ctx).await {
            let msg = reason.unwrap_or_else(|| "blocked by beforeInbound hook".to_string());
            return Err(RunOutcome {
                status: -1,
                data: Content::text(format!("Blocked: {msg}")),
                usage: None,
                model: None,
                cached: false,
            });
        }
        let final_message = ctx.message.unwrap_or(sanitized);

        self.event_log.append(
            EventType::UserMessage,
            serde_json::json!({ "content": final_message.as_text().unwrap_or_default() }),
            EventSource::User,
        );
        Ok(())
    }

    /// The iterate-until-done core, shared by `run` and `run_stream`.
    /// `stream` is `Some((sender, options))` when driven from
    /// `run_stream`; chunks are relayed as they're produced and the
    /// loop stops early if the receiver is gone.
    async fn turn_loop(
        &mut self,
        mut stream: Option<(mpsc::UnboundedSender<StreamChunk>, StreamOptions)>,
    ) -> Result<RunOutcome, AgentError> {
        let max_iterations = self.config.max_tool_iterations;
        let mut turns_used = 0u32;
        let mut fallback_ran = false;

        loop {
            turns_used += 1;
            if turns_used > max_iterations {
                let outcome = RunOutcome {
                    status: -1,
                    data: Content::text("max iterations reached"),
                    usage: None,
                    model: None,
                    cached: false,
                };
                return Ok(outcome);
            }

            let history = wick_event_log::derive_session_history(self.event_log.events(), Some(&self.system_prompt));
            let provider_messages = to_provider_messages(&history);
            let compaction = compact(
                provider_messages,
                &self.provider,
                self.config.default_model.as_deref(),
                self.config.compaction_threshold,
                self.config.max_history_messages,
            )
            .await;
            if compaction.compacted {
                self.event_log.append(
                    EventType::ContextCompacted,
                    serde_json::json!({ "used_fallback": compaction.used_fallback }),
                    EventSource::System,
                );
            }
            let messages = compaction.messages;

            let native_tools = self.provider.supports_native_tools();
            let tool_schemas = self.build_tool_schemas().await;
            let (request_tools, system) = if native_tools {
                (tool_schemas, self.system_prompt.clone())
            } else {
                (vec![], format!("{}\n\n{}", self.system_prompt, tool_prompt(&tool_schemas)))
            };

            let model = stream
                .as_ref()
                .and_then(|(_, opts)| opts.model.clone())
                .or_else(|| self.config.default_model.clone());

            let request = ProviderRequest {
                model,
                messages: messages.clone(),
                tools: request_tools,
                max_tokens: Some(self.config.default_max_tokens),
                temperature: None,
                system: Some(system),
                extra: serde_json::Value::Null,
            };

            let cache = self.response_cache.clone();
            let cache_key = cache.as_ref().map(|c| c.cache_key(&request.messages, request.model.as_deref()));
            if let (Some(cache), Some(key)) = (&cache, &cache_key) {
                if let Some(cached) = cache.get(key) {
                    self.event_log.append(EventType::CacheHit, serde_json::json!({ "key": key }), EventSource::System);
                    return Ok(self.finish_with_response(cached, true, stream).await);
                }
            }

            let response = if let Some((tx, _)) = &stream {
                match self.provider.stream(request.clone()).await {
                    Ok(chunks) => match relay_and_accumulate(chunks, tx) {
                        Some(resp) => resp,
                        None => {
                            return Ok(RunOutcome {
                                status: -1,
                                data: Content::text("stream ended without a response"),
                                usage: None,
                                model: None,
                                cached: false,
                            });
                        }
                    },
                    Err(err) => {
                        self.event_log.append(
                            EventType::StreamError,
                            serde_json::json!({ "message": err.to_string() }),
                            EventSource::System,
                        );
                        return Ok(RunOutcome { status: -1, data: Content::text(err.to_string()), usage: None, model: None, cached: false });
                    }
                }
            } else {
                tracing::debug!(model = request.model.as_deref().unwrap_or("default"), "sending completion request");
                match self.provider.complete(request).await {
                    Ok(resp) => resp,
                    Err(err) => {
                        self.event_log.append(
                            EventType::Error,
                            serde_json::json!({ "message": err.to_string() }),
                            EventSource::System,
                        );
                        return Ok(RunOutcome { status: -1, data: Content::text(err.to_string()), usage: None, model: None, cached: false });
                    }
                }
            };

            self.autonomy.record_cost(&response.model, &response.usage);
            if let (Some(cache), Some(key)) = (&cache, cache_key) {
                cache.put(key, response.clone());
            }

            match response.stop_reason {
                StopReason::MaxTokens => {
                    return Ok(self.halt("output truncated (max_tokens)", &response));
                }
                StopReason::ContentFilter => {
                    return Ok(self.halt("response filtered by provider safety system", &response));
                }
                _ => {}
            }

            let mut transform_ctx = HookContext::new(HookPoint::TransformResponse);
            transform_ctx.response = Some(Content::text(response.text()));
            if let HookResult::Block { reason } =
                self.hooks.dispatch(HookPoint::TransformResponse, &mut transform_ctx).await
            {
                let msg = reason.unwrap_or_else(|| "blocked by transformResponse hook".to_string());
                return Ok(self.halt(&format!("Blocked: {msg}"), &response));
            }
            let response_text = transform_ctx
                .response
                .and_then(|c| c.as_text().map(str::to_string))
                .unwrap_or_else(|| response.text());

            if native_tools && response.has_tool_calls() {
                self.run_tool_round(&response, &response_text, &mut stream).await?;
                continue;
            }

            if !native_tools && !fallback_ran {
                if let Some(outcome) =
                    self.run_code_execution_fallback(&response_text, &mut stream, &response).await
                {
                    fallback_ran = true;
                    return Ok(outcome);
                }
            }

            return Ok(self.finish_turn(&response_text, &response, stream).await);
        }
    }

    async fn build_tool_schemas(&self) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .all_specs()
            .into_iter()
            .map(|spec| ToolSchema { name: spec.name, description: spec.description, input_schema: spec.parameters })
            .collect();
        if let Some(remote) = &self.remote_tools {
            for spec in remote.all_tool_specs().await {
                schemas.push(ToolSchema { name: spec.name, description: spec.description, input_schema: spec.parameters });
            }
        }
        schemas
    }

    /// Append the assistant message + tool_call events, execute every
    /// requested tool, and append the matching tool_result events.
    async fn run_tool_round(
        &mut self,
        response: &ProviderResponse,
        response_text: &str,
        stream: &mut Option<(mpsc::UnboundedSender<StreamChunk>, StreamOptions)>,
    ) -> Result<(), AgentError> {
        let _ = stream;
        self.event_log.append(
            EventType::AgentMessage,
            serde_json::json!({ "content": response_text }),
            EventSource::Agent,
        );

        let calls: Vec<(String, String, serde_json::Value)> = response
            .tool_calls()
            .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
            .collect();

        for (call_id, name, args) in calls {
            self.event_log.append(
                EventType::ToolCall,
                serde_json::json!({ "call_id": call_id, "name": name, "arguments": args }),
                EventSource::Agent,
            );
            let outcome = self.execute_tool_call(&call_id, &name, args).await;
            let event_type = if outcome.content.len() > self.config.max_result_length {
                EventType::ToolResultTruncated
            } else {
                EventType::ToolResult
            };
            let truncated: String = outcome.content.chars().take(self.config.max_result_length).collect();
            self.event_log.append(
                event_type,
                serde_json::json!({ "call_id": call_id, "content": truncated, "is_error": outcome.is_error }),
                EventSource::System,
            );
        }
        Ok(())
    }

    /// The `beforeToolCall` hook → safety validation → autonomy gate →
    /// limit re-check → route-to-registry-or-remote → `scan_output`
    /// sequence a single tool call goes through.
    async fn execute_tool_call(&mut self, call_id: &str, name: &str, args: serde_json::Value) -> ToolOutcome {
        tracing::debug!(call_id, name, "executing tool call");
        let mut ctx = HookContext::new(HookPoint::BeforeToolCall);
        ctx.tool_name = Some(name.to_string());
        ctx.tool_args = Some(args.clone());
        match self.hooks.dispatch(HookPoint::BeforeToolCall, &mut ctx).await {
            HookResult::Block { reason } => {
                return ToolOutcome::failed(reason.unwrap_or_else(|| "blocked by hook".to_string()));
            }
            HookResult::Skip => {
                return ToolOutcome::ok(serde_json::json!({ "skipped": true }));
            }
            _ => {}
        }
        let name = ctx.tool_name.unwrap_or_else(|| name.to_string());
        let args = ctx.tool_args.unwrap_or(args);

        if let Some(category) = infer_tool_category(&name, &args) {
            let validation = self.safety.validate_tool_args(category, &args);
            if !validation.passed() {
                let reasons: Vec<String> = validation
                    .issues
                    .iter()
                    .filter(|i| i.severity >= wick_safety::Severity::High)
                    .map(|i| i.msg.clone())
                    .collect();
                return ToolOutcome::failed(format!("Safety: {}", reasons.join("; ")));
            }
        }

        if let Some(tool) = self.tools.get(&name) {
            if !self.autonomy.can_execute_tool(tool.permission_class()) {
                tracing::warn!(name, level = autonomy_level_label(self.autonomy.level()), "tool call denied by autonomy level");
                return ToolOutcome::failed(format!(
                    "Blocked: agent is in {} mode",
                    autonomy_level_label(self.autonomy.level())
                ));
            }
        }

        let now = now_ms();
        if let LimitStatus::Blocked { reason } = self.autonomy.check_limits(now) {
            return ToolOutcome::failed(reason);
        }

        let _ = call_id;
        let exec_result = if let Some(tool) = self.tools.get(&name).cloned() {
            let timeout = std::time::Duration::from_millis(self.config.local_tool_timeout_ms);
            match tokio::time::timeout(timeout, tool.call(args)).await {
                Ok(result) => result,
                Err(_) => Err(wick_tool::ToolError::ExecutionFailed("timed out".to_string())),
            }
        } else if let Some(remote) = self.remote_tools.clone() {
            if remote.find_client(&name) {
                let timeout = std::time::Duration::from_millis(self.config.remote_tool_timeout_ms);
                match tokio::time::timeout(timeout, remote.execute_tool(&name, args)).await {
                    Ok(result) => result,
                    Err(_) => Err(wick_tool::ToolError::ExecutionFailed("timed out".to_string())),
                }
            } else {
                Err(wick_tool::ToolError::NotFound(name.clone()))
            }
        } else {
            Err(wick_tool::ToolError::NotFound(name.clone()))
        };

        match exec_result {
            Ok(value) => {
                self.autonomy.record_action();
                let text = value.to_string();
                let scan = self.safety.scan_output(&text);
                if scan.blocked {
                    return ToolOutcome::failed("tool output failed safety scan");
                }
                ToolOutcome { content: scan.content, is_error: false }
            }
            Err(err) => ToolOutcome::failed(err.to_string()),
        }
    }

    /// Extract fenced code blocks from a non-native-tool response and
    /// run each through the sandbox, synthesizing a `_codex_eval`
    /// tool-call/tool-result event pair per block, then ask the
    /// provider for a short follow-up summarizing the results. Returns
    /// `None` (meaning "treat the turn as complete with the original
    /// text") when the response had no code blocks to run.
    async fn run_code_execution_fallback(
        &mut self,
        response_text: &str,
        stream: &mut Option<(mpsc::UnboundedSender<StreamChunk>, StreamOptions)>,
        response: &ProviderResponse,
    ) -> Option<RunOutcome> {
        let blocks = self.code_extractor.extract(response_text);
        if blocks.is_empty() {
            return None;
        }

        self.event_log.append(
            EventType::AgentMessage,
            serde_json::json!({ "content": response_text }),
            EventSource::Agent,
        );

        let mut results = Vec::with_capacity(blocks.len());
        for (language, code) in blocks {
            let code = self.code_adapter.transform(&code);
            let call_id = format!("codex_{}", wick_proto::id::random_id_segment());
            self.event_log.append(
                EventType::ToolCall,
                serde_json::json!({ "call_id": call_id, "name": "_codex_eval", "arguments": { "language": language, "code": code } }),
                EventSource::Agent,
            );
            let timeout = std::time::Duration::from_millis(self.config.sandbox_timeout_ms);
            let run = self.activation_gate.activate("sandbox", || {
                let sandbox = &self.sandbox;
                let code = code.clone();
                let language = language.clone();
                async move { sandbox.execute(&code, &language).await }
            });
            let sandbox_result = match tokio::time::timeout(timeout, run).await {
                Ok(result) => result,
                Err(_) => SandboxResult { output: "sandbox execution timed out".to_string(), success: false },
            };
            self.event_log.append(
                EventType::ToolResult,
                serde_json::json!({ "call_id": call_id, "content": sandbox_result.output, "is_error": !sandbox_result.success }),
                EventSource::System,
            );
            results.push(format!("```\n{}\n```", sandbox_result.output));
        }

        let follow_up = wick_provider::ProviderMessage {
            role: wick_provider::Role::User,
            content: vec![wick_provider::ContentPart::Text {
                text: format!(
                    "Execution results:\n{}\n\nSummarize the outcome for the user in plain text.",
                    results.join("\n\n")
                ),
            }],
        };
        let history = wick_event_log::derive_session_history(self.event_log.events(), Some(&self.system_prompt));
        let mut messages = to_provider_messages(&history);
        messages.push(follow_up);

        let summary_request = ProviderRequest {
            model: self.config.default_model.clone(),
            messages,
            tools: vec![],
            max_tokens: Some(self.config.default_max_tokens),
            temperature: None,
            system: Some(self.system_prompt.clone()),
            extra: serde_json::Value::Null,
        };

        match self.provider.complete(summary_request).await {
            Ok(summary_response) => {
                self.autonomy.record_cost(&summary_response.model, &summary_response.usage);
                let summary_text = summary_response.text();
                Some(self.finish_turn(&summary_text, &summary_response, stream.take()).await)
            }
            Err(_) => {
                let fallback_text = response_text.to_string();
                Some(self.finish_turn(&fallback_text, response, stream.take()).await)
            }
        }
    }

    /// Append the final `agent_message` event, run `beforeOutbound`,
    /// and build the returned [`RunOutcome`].
    async fn finish_turn(
        &mut self,
        text: &str,
        response: &ProviderResponse,
        stream: Option<(mpsc::UnboundedSender<StreamChunk>, StreamOptions)>,
    ) -> RunOutcome {
        self.event_log.append(
            EventType::AgentMessage,
            serde_json::json!({ "content": text }),
            EventSource::Agent,
        );

        let mut ctx = HookContext::new(HookPoint::BeforeOutbound);
        ctx.response = Some(Content::text(text));
        ctx.session = self.session.clone();
        let final_text = match self.hooks.dispatch(HookPoint::BeforeOutbound, &mut ctx).await {
            HookResult::Block { reason } => {
                let msg = reason.unwrap_or_else(|| "blocked by beforeOutbound hook".to_string());
                format!("Blocked: {msg}")
            }
            _ => ctx.response.and_then(|c| c.as_text().map(str::to_string)).unwrap_or_else(|| text.to_string()),
        };

        if let Some((tx, _)) = stream {
            let _ = tx.send(StreamChunk::Done { response: Box::new(response.clone()) });
        }

        RunOutcome {
            status: 1,
            data: Content::text(final_text),
            usage: Some(response.usage.clone()),
            model: Some(response.model.clone()),
            cached: false,
        }
    }

    async fn finish_with_response(
        &mut self,
        response: ProviderResponse,
        cached: bool,
        stream: Option<(mpsc::UnboundedSender<StreamChunk>, StreamOptions)>,
    ) -> RunOutcome {
        let text = response.text();
        let mut outcome = self.finish_turn(&text, &response, stream).await;
        outcome.cached = cached;
        outcome
    }

    fn halt(&mut self, reason: &str, response: &ProviderResponse) -> RunOutcome {
        self.event_log.append(
            EventType::Error,
            serde_json::json!({ "message": reason }),
            EventSource::System,
        );
        RunOutcome {
            status: -1,
            data: Content::text(reason),
            usage: Some(response.usage.clone()),
            model: Some(response.model.clone()),
            cached: false,
        }
    }
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

fn autonomy_level_label(level: wick_autonomy::AutonomyLevel) -> &'static str {
    match level {
        wick_autonomy::AutonomyLevel::ReadOnly => "readonly",
        wick_autonomy::AutonomyLevel::Supervised => "supervised",
        wick_autonomy::AutonomyLevel::Full => "full",
    }
}

/// Best-effort category inference for the safety validator: `ToolDyn`
/// doesn't carry a declared `ToolCategory`, so this reads the tool
/// name and argument shape the way a host's own tools would name them.
fn infer_tool_category(name: &str, args: &serde_json::Value) -> Option<wick_safety::ToolCategory> {
    use wick_safety::{FileOp, ToolCategory};
    let lower = name.to_ascii_lowercase();
    if args.get("url").is_some() || lower.contains("fetch") || lower.contains("http") || lower.contains("browser") {
        return Some(ToolCategory::Fetch);
    }
    if args.get("command").is_some() || lower.contains("shell") || lower.contains("bash") || lower.contains("exec") {
        return Some(ToolCategory::Shell);
    }
    if args.get("path").is_some() {
        let op = if lower.contains("delete") || lower.contains("remove") {
            FileOp::Delete
        } else if lower.contains("write") || lower.contains("create") {
            FileOp::Write
        } else if lower.contains("list") {
            FileOp::List
        } else {
            FileOp::Read
        };
        return Some(ToolCategory::FileOp(op));
    }
    None
}

fn tool_prompt(schemas: &[ToolSchema]) -> String {
    if schemas.is_empty() {
        return String::new();
    }
    let mut prompt = String::from(
        "You have access to the following tools. To use one, reply with a single fenced code block \
         containing a JSON object `{\"tool\": <name>, \"arguments\": <args>}` and nothing else:\n",
    );
    for schema in schemas {
        prompt.push_str(&format!("- {}: {}\n", schema.name, schema.description));
    }
    prompt
}

fn relay_and_accumulate(chunks: Vec<StreamChunk>, tx: &mpsc::UnboundedSender<StreamChunk>) -> Option<ProviderResponse> {
    let mut accumulated = None;
    for chunk in chunks {
        if let StreamChunk::Done { response } = &chunk {
            accumulated = Some((**response).clone());
        }
        if tx.send(chunk).is_err() {
            break;
        }
    }
    accumulated
}
