#![deny(missing_docs)]
//! Hook registry and pipeline dispatch for the wick agent core.
//!
//! [`HookRegistry`] collects [`Hook`] implementations into a
//! priority-ordered pipeline per [`HookPoint`]. At dispatch, hooks
//! registered for the current point run in ascending priority order
//! (lower runs first; default 100). `Block` and `Skip` short-circuit
//! the pipeline; `Modify` folds its patch into the context and the
//! pipeline continues; hook errors are logged and treated as
//! `Continue` (fail-open).

use std::collections::HashMap;
use std::sync::Arc;
use wick_proto::{Hook, HookContext, HookPoint, HookResult};

/// A hook registration paired with the factory name used to reconstruct
/// it from a [`HookDescriptor`] via [`HookRegistry::from_descriptors`].
struct Registration {
    hook: Arc<dyn Hook>,
    factory_name: String,
}

/// Serializable description of a registered hook, independent of the
/// `Arc<dyn Hook>` trait object it was built from.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HookDescriptor {
    /// The hook's name.
    pub name: String,
    /// The point it fires at.
    pub point: HookPoint,
    /// Dispatch priority.
    pub priority: i32,
    /// Whether the hook is currently active.
    pub enabled: bool,
    /// The factory name used to reconstruct this hook on deserialization.
    pub factory_name: String,
}

/// A function that constructs a fresh hook instance. Used as the value
/// type of the factory map passed to [`HookRegistry::from_descriptors`].
pub type HookFactory = Arc<dyn Fn() -> Arc<dyn Hook> + Send + Sync>;

/// A registry that dispatches hook events through an ordered pipeline.
///
/// Hooks registered for a point are sorted by ascending priority at
/// dispatch time (stable sort, so equal priorities preserve
/// registration order).
pub struct HookRegistry {
    hooks: Vec<Registration>,
}

impl HookRegistry {
    /// Create a new empty hook registry.
    pub fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Register a hook, using its own name as the factory name.
    pub fn add(&mut self, hook: Arc<dyn Hook>) {
        let factory_name = hook.name().to_string();
        self.add_with_factory(hook, factory_name);
    }

    /// Register a hook under an explicit factory name, for later
    /// reconstruction via [`HookRegistry::from_descriptors`].
    pub fn add_with_factory(&mut self, hook: Arc<dyn Hook>, factory_name: impl Into<String>) {
        self.hooks.push(Registration {
            hook,
            factory_name: factory_name.into(),
        });
    }

    /// Dispatch a hook point through the pipeline.
    ///
    /// `ctx` is mutated in place by any `Modify` results along the way,
    /// so the caller observes the folded context regardless of which
    /// result ends the dispatch.
    pub async fn dispatch(&self, point: HookPoint, ctx: &mut HookContext) -> HookResult {
        let mut active: Vec<&Registration> = self
            .hooks
            .iter()
            .filter(|r| r.hook.point() == point && r.hook.enabled())
            .collect();
        active.sort_by_key(|r| r.hook.priority());

        for reg in active {
            match reg.hook.execute(ctx).await {
                Ok(HookResult::Continue) => continue,
                Ok(HookResult::Modify { data }) => {
                    tracing::debug!(hook = reg.hook.name(), "hook modified context");
                    ctx.apply_patch(data);
                    continue;
                }
                Ok(result @ (HookResult::Skip | HookResult::Block { .. })) => {
                    tracing::debug!(hook = reg.hook.name(), ?result, "hook short-circuited dispatch");
                    return result;
                }
                Err(err) => {
                    tracing::warn!(hook = reg.hook.name(), error = %err, "hook failed, continuing (fail-open)");
                    continue;
                }
            }
        }

        HookResult::Continue
    }

    /// Describe every registered hook, for persistence.
    pub fn descriptors(&self) -> Vec<HookDescriptor> {
        self.hooks
            .iter()
            .map(|r| HookDescriptor {
                name: r.hook.name().to_string(),
                point: r.hook.point(),
                priority: r.hook.priority(),
                enabled: r.hook.enabled(),
                factory_name: r.factory_name.clone(),
            })
            .collect()
    }

    /// Rebuild a registry from descriptors and a factory map. Descriptors
    /// whose `factory_name` has no entry in `factories` are silently
    /// dropped — a hook type that's no longer compiled in should not
    /// fail the whole restore.
    pub fn from_descriptors(descriptors: &[HookDescriptor], factories: &HashMap<String, HookFactory>) -> Self {
        let mut registry = Self::new();
        for desc in descriptors {
            if let Some(factory) = factories.get(&desc.factory_name) {
                registry.add_with_factory(factory(), desc.factory_name.clone());
            } else {
                tracing::warn!(factory_name = %desc.factory_name, "no factory registered, dropping hook");
            }
        }
        registry
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl Default for HookRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use wick_proto::HookError;

    struct ContinueHook {
        point: HookPoint,
        priority: i32,
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl Hook for ContinueHook {
        fn name(&self) -> &str {
            "continue_hook"
        }
        fn point(&self) -> HookPoint {
            self.point
        }
        fn priority(&self) -> i32 {
            self.priority
        }
        async fn execute(&self, _ctx: &HookContext) -> Result<HookResult, HookError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Ok(HookResult::Continue)
        }
    }

    struct BlockHook;

    #[async_trait]
    impl Hook for BlockHook {
        fn name(&self) -> &str {
            "block_hook"
        }
        fn point(&self) -> HookPoint {
            HookPoint::BeforeToolCall
        }
        async fn execute(&self, _ctx: &HookContext) -> Result<HookResult, HookError> {
            Ok(HookResult::Block {
                reason: Some("nope".into()),
            })
        }
    }

    struct FailingHook;

    #[async_trait]
    impl Hook for FailingHook {
        fn name(&self) -> &str {
            "failing_hook"
        }
        fn point(&self) -> HookPoint {
            HookPoint::BeforeToolCall
        }
        fn priority(&self) -> i32 {
            1
        }
        async fn execute(&self, _ctx: &HookContext) -> Result<HookResult, HookError> {
            Err(HookError::Failed("boom".into()))
        }
    }

    struct ModifyHook;

    #[async_trait]
    impl Hook for ModifyHook {
        fn name(&self) -> &str {
            "modify_hook"
        }
        fn point(&self) -> HookPoint {
            HookPoint::BeforeInbound
        }
        async fn execute(&self, _ctx: &HookContext) -> Result<HookResult, HookError> {
            Ok(HookResult::Modify {
                data: serde_json::json!({"message": "patched"}),
            })
        }
    }

    #[tokio::test]
    async fn dispatch_runs_only_hooks_for_the_point() {
        let mut reg = HookRegistry::new();
        reg.add(Arc::new(ContinueHook {
            point: HookPoint::BeforeInbound,
            priority: 100,
            calls: Default::default(),
        }));
        reg.add(Arc::new(ContinueHook {
            point: HookPoint::BeforeToolCall,
            priority: 100,
            calls: Default::default(),
        }));

        let mut ctx = HookContext::new(HookPoint::BeforeInbound);
        let result = reg.dispatch(HookPoint::BeforeInbound, &mut ctx).await;
        assert!(matches!(result, HookResult::Continue));
    }

    #[tokio::test]
    async fn dispatch_short_circuits_on_block() {
        let mut reg = HookRegistry::new();
        reg.add(Arc::new(BlockHook));
        reg.add(Arc::new(ContinueHook {
            point: HookPoint::BeforeToolCall,
            priority: 200,
            calls: Default::default(),
        }));

        let mut ctx = HookContext::new(HookPoint::BeforeToolCall);
        let result = reg.dispatch(HookPoint::BeforeToolCall, &mut ctx).await;
        match result {
            HookResult::Block { reason } => assert_eq!(reason.as_deref(), Some("nope")),
            _ => panic!("expected Block"),
        }
    }

    #[tokio::test]
    async fn dispatch_is_priority_ordered() {
        let mut reg = HookRegistry::new();
        // Lower priority (1) should run before the block hook (default 100).
        reg.add(Arc::new(FailingHook));
        reg.add(Arc::new(BlockHook));

        let mut ctx = HookContext::new(HookPoint::BeforeToolCall);
        let result = reg.dispatch(HookPoint::BeforeToolCall, &mut ctx).await;
        // FailingHook errors (fail-open, continues); BlockHook still fires after it.
        assert!(matches!(result, HookResult::Block { .. }));
    }

    #[tokio::test]
    async fn dispatch_folds_modify_patch_into_context() {
        let mut reg = HookRegistry::new();
        reg.add(Arc::new(ModifyHook));

        let mut ctx = HookContext::new(HookPoint::BeforeInbound);
        let result = reg.dispatch(HookPoint::BeforeInbound, &mut ctx).await;
        assert!(matches!(result, HookResult::Continue));
        assert_eq!(ctx.message.as_ref().and_then(|c| c.as_text()), Some("patched"));
    }

    #[tokio::test]
    async fn failing_hook_is_fail_open() {
        let mut reg = HookRegistry::new();
        reg.add(Arc::new(FailingHook));

        let mut ctx = HookContext::new(HookPoint::BeforeToolCall);
        let result = reg.dispatch(HookPoint::BeforeToolCall, &mut ctx).await;
        assert!(matches!(result, HookResult::Continue));
    }

    #[test]
    fn descriptors_roundtrip_through_factory_map() {
        let mut reg = HookRegistry::new();
        reg.add_with_factory(Arc::new(BlockHook), "block_hook_factory");
        let descriptors = reg.descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].factory_name, "block_hook_factory");

        let mut factories: HashMap<String, HookFactory> = HashMap::new();
        factories.insert("block_hook_factory".into(), Arc::new(|| Arc::new(BlockHook) as Arc<dyn Hook>));

        let rebuilt = HookRegistry::from_descriptors(&descriptors, &factories);
        assert_eq!(rebuilt.len(), 1);
    }

    #[test]
    fn descriptors_with_missing_factory_are_dropped() {
        let mut reg = HookRegistry::new();
        reg.add_with_factory(Arc::new(BlockHook), "unregistered_factory");
        let descriptors = reg.descriptors();

        let factories: HashMap<String, HookFactory> = HashMap::new();
        let rebuilt = HookRegistry::from_descriptors(&descriptors, &factories);
        assert!(rebuilt.is_empty());
    }
}
