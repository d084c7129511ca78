#![allow(dead_code)]

//! In-memory [`Transport`] with canned responses and a request log.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use automator_client::{Transport, TransportError};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Notify;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum Canned {
    Ok(Value),
    Status(u16, Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sent {
    pub method: &'static str,
    pub path: String,
    pub body: Value,
}

#[derive(Default)]
struct Inner {
    gets: HashMap<String, Canned>,
    mutations: HashMap<(&'static str, String), Canned>,
    get_counts: HashMap<String, usize>,
    sent: Vec<Sent>,
    gate: Option<Arc<Notify>>,
    get_gate: Option<Arc<Notify>>,
}

#[derive(Default)]
pub struct FakeTransport {
    inner: Mutex<Inner>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn set_get(&self, path: &str, body: Value) {
        self.lock().gets.insert(path.to_owned(), Canned::Ok(body));
    }

    pub fn fail_get(&self, path: &str, status: u16) {
        self.lock()
            .gets
            .insert(path.to_owned(), Canned::Status(status, json!({ "detail": "unavailable" })));
    }

    pub fn set_mutation(&self, method: &'static str, path: &str, canned: Canned) {
        self.lock().mutations.insert((method, path.to_owned()), canned);
    }

    /// Hold every mutation after it is recorded until `gate` is notified.
    pub fn gate_mutations(&self, gate: Arc<Notify>) {
        self.lock().gate = Some(gate);
    }

    /// Hold every GET after it is counted until `gate` is notified.
    pub fn gate_gets(&self, gate: Arc<Notify>) {
        self.lock().get_gate = Some(gate);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.lock().sent.clone()
    }

    pub fn get_count(&self, path: &str) -> usize {
        self.lock().get_counts.get(path).copied().unwrap_or(0)
    }

    async fn mutate<B: Serialize>(
        &self,
        method: &'static str,
        path: &str,
        body: &B,
    ) -> Result<Value, TransportError> {
        let body = serde_json::to_value(body)?;
        let (canned, gate) = {
            let mut inner = self.lock();
            inner.sent.push(Sent {
                method,
                path: path.to_owned(),
                body,
            });
            (inner.mutations.get(&(method, path.to_owned())).cloned(), inner.gate.clone())
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        resolve(canned)
    }
}

fn resolve(canned: Option<Canned>) -> Result<Value, TransportError> {
    match canned {
        Some(Canned::Ok(body)) => Ok(body),
        Some(Canned::Status(status, body)) => Err(TransportError::from_status(
            status,
            body.to_string().as_bytes(),
        )),
        None => Err(TransportError::from_status(404, br#"{"detail":"Not Found"}"#)),
    }
}

impl Transport for FakeTransport {
    async fn get(&self, path: &str) -> Result<Value, TransportError> {
        let (canned, gate) = {
            let mut inner = self.lock();
            *inner.get_counts.entry(path.to_owned()).or_default() += 1;
            (inner.gets.get(path).cloned(), inner.get_gate.clone())
        };
        match gate {
            Some(gate) => gate.notified().await,
            None => tokio::task::yield_now().await,
        }
        resolve(canned)
    }

    async fn patch<B>(&self, path: &str, body: &B) -> Result<Value, TransportError>
    where
        B: Serialize + Sync,
    {
        self.mutate("PATCH", path, body).await
    }

    async fn post<B>(&self, path: &str, body: &B) -> Result<Value, TransportError>
    where
        B: Serialize + Sync,
    {
        self.mutate("POST", path, body).await
    }
}

pub fn process_json(name: &str, status: &str, cycle_time: u64, cycles: u64) -> Value {
    json!({
        "name": name,
        "status": status,
        "cycle_time": cycle_time,
        "cycles_completed": cycles,
        "last_cycle_dttm": null,
    })
}

pub fn task_json(name: &str, status: &str, duration: u64, id: u128) -> Value {
    json!({
        "name": name,
        "status": status,
        "duration": duration,
        "start_dttm": null,
        "finish_dttm": null,
        "id": Uuid::from_u128(id).to_string(),
    })
}

pub fn processes_body(items: impl IntoIterator<Item = Value>) -> Value {
    json!({ "processes": items.into_iter().collect::<Vec<_>>() })
}

pub fn tasks_body(items: impl IntoIterator<Item = Value>) -> Value {
    json!({ "tasks": items.into_iter().collect::<Vec<_>>() })
}
