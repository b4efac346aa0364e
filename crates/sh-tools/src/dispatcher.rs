//! Tool registry and dispatcher (component C5, spec §4.C5).
//!
//! A tool is a name plus one closure that erases its own
//! `(validator, handler)` pair — each catalog entry builds that closure
//! by calling a typed `validate` then a typed `run`, so the registry
//! itself only ever stores `Fn(Value, ToolContext) -> Future<Output =
//! Result<Value>>`. This is the "existential typing" resolution the
//! design notes call for: handlers never see raw maps, but the registry
//! doesn't need generics or code generation to hold them uniformly.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use sh_domain::error::{Error, Result};
use sh_domain::session::ToolCallInfo;

use crate::context::ToolContext;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
pub type HandlerFn = Arc<dyn Fn(Value, ToolContext) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// A function invoked after a tool call succeeds, given its name and
/// result payload. Registered via [`Dispatcher::register_hook`] — the
/// design-notes resolution for the auto-enroll side effect, which would
/// otherwise create an import cycle between the analytics tools and
/// whatever consumes their results.
pub type PostToolHook = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Emits one [`ToolCallInfo`] after a single invocation completes. The
/// orchestrator passes `None` for calls it intends to batch (spec
/// §4.C5 step 6: suppressed for grouped names).
pub type EmitFn<'a> = &'a (dyn Fn(ToolCallInfo) + Send + Sync);

struct ToolEntry {
    label: &'static str,
    run: HandlerFn,
}

#[derive(Default)]
pub struct Dispatcher {
    tools: HashMap<String, ToolEntry>,
    hooks: Vec<PostToolHook>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, label: &'static str, run: HandlerFn) {
        self.tools.insert(name.to_string(), ToolEntry { label, run });
    }

    pub fn register_hook(&mut self, hook: PostToolHook) {
        self.hooks.push(hook);
    }

    /// The human-readable label for `name`, or the name itself if
    /// unregistered (§3 `ToolCallInfo.label`).
    pub fn label(&self, name: &str) -> String {
        self.tools
            .get(name)
            .map(|t| t.label.to_string())
            .unwrap_or_else(|| name.to_string())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// The six-step invocation contract (spec §4.C5).
    pub async fn invoke(
        &self,
        name: &str,
        args_raw: Value,
        ctx: ToolContext,
        emit: Option<EmitFn<'_>>,
    ) -> (Value, ToolCallInfo) {
        let Some(entry) = self.tools.get(name) else {
            let message = format!("Unknown tool: {name}");
            let info = ToolCallInfo {
                name: name.to_string(),
                label: name.to_string(),
                duration_ms: 0,
                cache_hit: None,
                error: Some(message.clone()),
            };
            let payload = serde_json::json!({ "error": message });
            if let Some(emit) = emit {
                emit(info.clone());
            }
            return (payload, info);
        };

        let normalized = normalize_numeric_args(args_raw);

        let start = Instant::now();
        let result = (entry.run)(normalized, ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let (payload, error) = match result {
            Ok(payload) => (payload, None),
            Err(err) => (serde_json::json!({ "error": err.to_string() }), Some(err.to_string())),
        };

        let cache_hit = payload.get("cacheHit").and_then(Value::as_bool);

        let info = ToolCallInfo {
            name: name.to_string(),
            label: entry.label.to_string(),
            duration_ms,
            cache_hit,
            error: error.clone(),
        };

        if error.is_none() {
            for hook in &self.hooks {
                hook(name, &payload);
            }
        }

        if let Some(emit) = emit {
            emit(info.clone());
        }

        (payload, info)
    }
}

/// Validation failure convenience: catalog validators return this for
/// malformed or missing arguments (classified as `Error::Validation`,
/// never thrown as a raw string — spec §4.C5 "handler termination").
pub fn validation_error(message: impl Into<String>) -> Error {
    Error::Validation(message.into())
}

/// The LLM tends to emit `10.0` for integer-valued fields. Round any
/// float whose magnitude is already integer-valued into a JSON integer
/// before validators see it, so range/type checks aren't tripped up by
/// float noise (spec §4.C5).
fn normalize_numeric_args(value: Value) -> Value {
    match value {
        Value::Number(n) => {
            if n.is_f64() {
                if let Some(f) = n.as_f64() {
                    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                        return Value::Number((f as i64).into());
                    }
                }
            }
            Value::Number(n)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_numeric_args).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, normalize_numeric_args(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Helper for catalog modules: wraps a typed `validate` + `run` pair into
/// the type-erased [`HandlerFn`] the registry stores.
pub fn erase<A, Fut>(
    validate: impl Fn(&Value) -> Result<A> + Send + Sync + 'static,
    run: impl Fn(A, ToolContext) -> Fut + Send + Sync + 'static,
) -> HandlerFn
where
    A: Send + 'static,
    Fut: Future<Output = Result<Value>> + Send + 'static,
{
    Arc::new(move |raw, ctx| -> BoxFuture<'static, Result<Value>> {
        match validate(&raw) {
            Ok(args) => Box::pin(run(args, ctx)),
            Err(err) => Box::pin(async move { Err(err) }),
        }
    })
}
