//! # Items y Resultados
//! src/work/item.rs
//!
//! Tipos que viajan por el pipeline:
//! - `WorkItem`: unidad de trabajo inmutable (id + payload + timestamp)
//! - `WorkResult`: resultado de procesar un item, consumido una sola vez
//! - `ProcessingFault`: falla capturada dentro de un worker

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identificador único de un item, asignado por el dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u64);

impl ItemId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    /// Formato: `item-00000000000000ff`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item-{:016x}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix("item-")
            .ok_or_else(|| format!("invalid item id: {}", s))?;
        u64::from_str_radix(hex, 16)
            .map(ItemId)
            .map_err(|_| format!("invalid item id: {}", s))
    }
}

impl Serialize for ItemId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Payload opaco: nombre de tarea + parámetros
///
/// Es lo que llega en el body de `POST /v1/jobs`:
/// ```json
/// {"task": "fibonacci", "params": {"num": "10"}}
/// ```
///
/// Los valores pueden venir como string, número o booleano (`{"num": 10}`);
/// se guardan como string.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Payload {
    pub task: String,

    #[serde(default, deserialize_with = "scalar_params")]
    pub params: BTreeMap<String, String>,
}

impl Payload {
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builder para agregar un parámetro
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(|s| s.as_str())
    }
}

fn scalar_params<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => Ok((key, s)),
            Value::Number(n) => Ok((key, n.to_string())),
            Value::Bool(b) => Ok((key, b.to_string())),
            _ => Err(de::Error::custom(format!(
                "parameter '{}' must be a string, number or boolean",
                key
            ))),
        })
        .collect()
}

/// Unidad de trabajo. Inmutable una vez creada.
#[derive(Debug, Clone)]
pub struct WorkItem {
    id: ItemId,
    payload: Payload,
    submitted_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn new(id: ItemId, payload: Payload) -> Self {
        Self {
            id,
            payload,
            submitted_at: Utc::now(),
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn task(&self) -> &str {
        &self.payload.task
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }
}

/// Falla ocurrida al procesar un item
///
/// Nunca tumba al worker: se guarda en el `WorkResult` correspondiente.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProcessingFault {
    /// El processor devolvió error
    #[error("processing failed: {0}")]
    Failed(String),

    /// El processor hizo panic; el mensaje es interno
    #[error("worker panicked: {0}")]
    Panicked(String),
}

impl ProcessingFault {
    /// Nombre corto del tipo de falla
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingFault::Failed(_) => "failed",
            ProcessingFault::Panicked(_) => "panicked",
        }
    }

    /// Mensaje apto para el cliente: los panics no filtran detalle interno
    pub fn public_message(&self) -> String {
        match self {
            ProcessingFault::Failed(msg) => msg.clone(),
            ProcessingFault::Panicked(_) => "internal processing error".to_string(),
        }
    }
}

/// Resultado de procesar un `WorkItem`
#[derive(Debug, Clone, Serialize)]
pub struct WorkResult {
    pub item_id: ItemId,
    pub task: String,
    /// Índice del worker que lo procesó
    pub worker: usize,
    pub outcome: Result<Value, ProcessingFault>,
    pub submitted_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl WorkResult {
    /// Construye el resultado a partir del item ya procesado
    pub fn from_item(item: &WorkItem, worker: usize, outcome: Result<Value, ProcessingFault>) -> Self {
        Self {
            item_id: item.id(),
            task: item.task().to_string(),
            worker,
            outcome,
            submitted_at: item.submitted_at(),
            completed_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Milisegundos entre submit y fin de procesamiento
    pub fn latency_ms(&self) -> i64 {
        (self.completed_at - self.submitted_at).num_milliseconds().max(0)
    }
}
