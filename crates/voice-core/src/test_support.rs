//! Scripted native layer and listener capture shared by unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use serde_json::Value;

use crate::bridge::{NativeBridge, NativeEventBus, NativeMethod, NativeModule};
use crate::errors::VoiceError;
use crate::events::EventListener;
use crate::platform::Platform;
use crate::settle::NativePromise;

/// Records every invocation and answers from per-method queues. Methods
/// without a queued answer resolve with `null`.
#[derive(Default)]
pub struct MockNativeModule {
    calls: Mutex<Vec<NativeMethod>>,
    responses: Mutex<HashMap<String, VecDeque<NativePromise>>>,
}

impl MockNativeModule {
    pub fn respond(&self, method: &str, promise: NativePromise) {
        self.responses
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_default()
            .push_back(promise);
    }

    pub fn respond_value(&self, method: &str, value: Value) {
        self.respond(method, NativePromise::resolved(value));
    }

    pub fn calls(&self) -> Vec<NativeMethod> {
        self.calls.lock().unwrap().clone()
    }
}

fn method_name(method: &NativeMethod) -> String {
    serde_json::to_value(method)
        .ok()
        .and_then(|v| v.get("method").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default()
}

impl NativeModule for MockNativeModule {
    fn invoke(&self, method: NativeMethod) -> BoxFuture<'_, Result<NativePromise, VoiceError>> {
        let name = method_name(&method);
        self.calls.lock().unwrap().push(method);
        let promise = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&name)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| NativePromise::resolved(Value::Null));
        future::ready(Ok(promise)).boxed()
    }
}

pub struct Harness {
    pub bus: Arc<NativeEventBus>,
    pub native: Arc<MockNativeModule>,
    pub bridge: NativeBridge,
}

pub fn harness() -> Harness {
    harness_on(Platform::Ios)
}

pub fn harness_on(platform: Platform) -> Harness {
    let bus = Arc::new(NativeEventBus::new());
    let native = Arc::new(MockNativeModule::default());
    let bridge = NativeBridge::new(native.clone(), bus.clone(), platform.provider());
    Harness { bus, native, bridge }
}

/// Listener that keeps every event it receives.
pub struct Capture<E> {
    events: Arc<Mutex<Vec<E>>>,
}

impl<E: Clone + Send + 'static> Capture<E> {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn listener(&self) -> Arc<dyn EventListener<E>> {
        let events = self.events.clone();
        Arc::new(move |event: E| events.lock().unwrap().push(event))
    }

    pub fn events(&self) -> Vec<E> {
        self.events.lock().unwrap().clone()
    }

    pub fn get(&self, index: usize) -> E {
        self.events.lock().unwrap()[index].clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
