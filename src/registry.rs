//! Process-wide symbol registry for operator delegates.
//!
//! External script interpreters resolve operators by name and invoke them
//! with a vector of DSL arguments. Registration is write-once per name and
//! idempotent; the built-in operator set is installed lazily on first use.

use crate::dsl::DslArg;
use crate::pattern::Pattern;
use crate::voice::VoiceData;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, Once, RwLock};
use tracing::debug;

/// A registered operator: takes the raw argument list, returns a pattern.
pub type OpDelegate = Arc<dyn Fn(Vec<DslArg>) -> Pattern<VoiceData> + Send + Sync>;

lazy_static! {
    static ref REGISTRY: RwLock<HashMap<String, OpDelegate>> = RwLock::new(HashMap::new());
}

static INSTALL: Once = Once::new();

/// Register a delegate under a name. The first registration wins; repeats
/// are ignored so installation stays idempotent.
pub fn register(name: &str, delegate: OpDelegate) {
    let mut registry = REGISTRY.write().expect("operator registry poisoned");
    if registry.contains_key(name) {
        debug!(target: "tactus::registry", name, "operator already registered; ignoring");
        return;
    }
    registry.insert(name.to_string(), delegate);
}

fn ensure_installed() {
    INSTALL.call_once(crate::ops::install_default_ops);
}

/// Look an operator up by name.
pub fn lookup(name: &str) -> Option<OpDelegate> {
    ensure_installed();
    REGISTRY
        .read()
        .expect("operator registry poisoned")
        .get(name)
        .cloned()
}

/// Invoke a named operator; unknown names produce silence.
pub fn invoke(name: &str, args: Vec<DslArg>) -> Pattern<VoiceData> {
    match lookup(name) {
        Some(delegate) => delegate(args),
        None => {
            tracing::warn!(target: "tactus::registry", name, "unknown operator; yielding silence");
            Pattern::silence()
        }
    }
}

/// Registered operator names, sorted, for completion tooling.
pub fn names() -> Vec<String> {
    ensure_installed();
    let mut names: Vec<String> = REGISTRY
        .read()
        .expect("operator registry poisoned")
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}
