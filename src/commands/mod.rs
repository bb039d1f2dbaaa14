//! # Tareas del Servidor
//! src/commands/mod.rs
//!
//! Tareas que los workers saben ejecutar. Cada payload `{"task", "params"}`
//! se convierte en un `Task` tipado; si no se puede, el dispatcher lo rechaza
//! antes de encolarlo.
//!
//! ## Categorías
//!
//! - **basic**: fibonacci, reverse, toupper, hash, sleep
//! - **cpu_bound**: isprime, factor
//! - **text**: wordcount, grep, compress

pub mod basic;
pub mod cpu_bound;
pub mod text;

use crate::work::{Payload, ProcessingFault, Processor, WorkItem};
use regex::Regex;
use serde_json::{json, Value};
use std::time::Instant;

/// Nombres de las tareas soportadas
pub const TASK_NAMES: &[&str] = &[
    "fibonacci",
    "reverse",
    "toupper",
    "hash",
    "sleep",
    "isprime",
    "factor",
    "wordcount",
    "grep",
    "compress",
];

/// Máximo `num` de fibonacci que cabe en u64
pub const MAX_FIBONACCI: u64 = 93;

/// Máximo tiempo de `sleep` en milisegundos
pub const MAX_SLEEP_MS: u64 = 10_000;

/// Máximo número a factorizar
pub const MAX_FACTOR: u64 = 1_000_000_000_000;

/// Tarea ya validada
#[derive(Debug, Clone)]
pub enum Task {
    Fibonacci { num: u64 },
    Reverse { text: String },
    ToUpper { text: String },
    Hash { text: String },
    Sleep { ms: u64 },
    IsPrime { n: u64 },
    Factor { n: u64 },
    WordCount { text: String },
    Grep { pattern: Regex, text: String },
    Compress { text: String },
}

impl Task {
    /// Convierte un payload en una tarea, validando parámetros
    pub fn parse(payload: &Payload) -> Result<Task, String> {
        let task = match payload.task.as_str() {
            "fibonacci" => {
                let num = parse_u64(payload, "num")?;
                if num > MAX_FIBONACCI {
                    return Err(format!("Parameter 'num' must be <= {}", MAX_FIBONACCI));
                }
                Task::Fibonacci { num }
            }
            "reverse" => Task::Reverse {
                text: required(payload, "text")?.to_string(),
            },
            "toupper" => Task::ToUpper {
                text: required(payload, "text")?.to_string(),
            },
            "hash" => Task::Hash {
                text: required(payload, "text")?.to_string(),
            },
            "sleep" => {
                let ms = parse_u64(payload, "ms")?;
                if ms > MAX_SLEEP_MS {
                    return Err(format!("Parameter 'ms' must be <= {}", MAX_SLEEP_MS));
                }
                Task::Sleep { ms }
            }
            "isprime" => {
                let n = parse_u64(payload, "n")?;
                if n < 2 {
                    return Err("Parameter 'n' must be an integer greater than 1".to_string());
                }
                Task::IsPrime { n }
            }
            "factor" => {
                let n = parse_u64(payload, "n")?;
                if !(2..=MAX_FACTOR).contains(&n) {
                    return Err("Parameter 'n' must be between 2 and 10^12".to_string());
                }
                Task::Factor { n }
            }
            "wordcount" => Task::WordCount {
                text: required(payload, "text")?.to_string(),
            },
            "grep" => {
                let raw = required(payload, "pattern")?;
                let pattern = Regex::new(raw).map_err(|e| format!("Invalid pattern: {}", e))?;
                Task::Grep {
                    pattern,
                    text: required(payload, "text")?.to_string(),
                }
            }
            "compress" => Task::Compress {
                text: required(payload, "text")?.to_string(),
            },
            "" => return Err("Missing task name".to_string()),
            other => return Err(format!("Unknown task: {}", other)),
        };

        Ok(task)
    }

    /// Nombre de la tarea
    pub fn name(&self) -> &'static str {
        match self {
            Task::Fibonacci { .. } => "fibonacci",
            Task::Reverse { .. } => "reverse",
            Task::ToUpper { .. } => "toupper",
            Task::Hash { .. } => "hash",
            Task::Sleep { .. } => "sleep",
            Task::IsPrime { .. } => "isprime",
            Task::Factor { .. } => "factor",
            Task::WordCount { .. } => "wordcount",
            Task::Grep { .. } => "grep",
            Task::Compress { .. } => "compress",
        }
    }

    /// Ejecuta la tarea y arma el JSON de resultado
    pub fn run(&self) -> Result<Value, String> {
        let start = Instant::now();

        let mut value = match self {
            Task::Fibonacci { num } => json!({
                "num": num,
                "result": basic::fibonacci(*num)?,
            }),
            Task::Reverse { text } => json!({
                "original": text,
                "reversed": basic::reverse(text),
            }),
            Task::ToUpper { text } => json!({
                "original": text,
                "upper": text.to_uppercase(),
            }),
            Task::Hash { text } => json!({
                "algo": "sha256",
                "hash": basic::sha256_hex(text),
            }),
            Task::Sleep { ms } => {
                basic::sleep_ms(*ms);
                json!({ "slept_ms": ms })
            }
            Task::IsPrime { n } => json!({
                "n": n,
                "is_prime": cpu_bound::is_prime(*n),
                "method": "miller-rabin",
            }),
            Task::Factor { n } => json!({
                "n": n,
                "factors": cpu_bound::factorize(*n),
            }),
            Task::WordCount { text } => {
                let stats = text::word_count(text);
                json!({
                    "lines": stats.lines,
                    "words": stats.words,
                    "bytes": stats.bytes,
                })
            }
            Task::Grep { pattern, text } => {
                let (matches, sample) = text::grep(pattern, text);
                json!({
                    "pattern": pattern.as_str(),
                    "matches": matches,
                    "sample_lines": sample,
                })
            }
            Task::Compress { text } => {
                let (original, compressed) = text::gzip_sizes(text.as_bytes())
                    .map_err(|e| format!("Compression failed: {}", e))?;
                json!({
                    "codec": "gzip",
                    "original_size": original,
                    "compressed_size": compressed,
                })
            }
        };

        if let Value::Object(map) = &mut value {
            map.insert("elapsed_ms".to_string(), json!(start.elapsed().as_millis() as u64));
        }
        Ok(value)
    }
}

/// Processor que ejecuta las tareas integradas
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskProcessor;

impl Processor for TaskProcessor {
    fn validate(&self, payload: &Payload) -> Result<(), String> {
        Task::parse(payload).map(|_| ())
    }

    fn process(&self, item: &WorkItem) -> Result<Value, ProcessingFault> {
        Task::parse(item.payload())
            .and_then(|task| task.run())
            .map_err(ProcessingFault::Failed)
    }
}

/// Parámetro obligatorio
fn required<'a>(payload: &'a Payload, key: &str) -> Result<&'a str, String> {
    payload
        .param(key)
        .ok_or_else(|| format!("Missing required parameter: {}", key))
}

/// Parámetro obligatorio entero no negativo
fn parse_u64(payload: &Payload, key: &str) -> Result<u64, String> {
    required(payload, key)?
        .trim()
        .parse()
        .map_err(|_| format!("Parameter '{}' must be a valid positive integer", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::work::ItemId;

    fn run(payload: Payload) -> Result<Value, ProcessingFault> {
        TaskProcessor.process(&WorkItem::new(ItemId::new(1), payload))
    }

    #[test]
    fn test_every_task_name_parses_with_valid_params() {
        let payloads = vec![
            Payload::new("fibonacci").with_param("num", "10"),
            Payload::new("reverse").with_param("text", "abc"),
            Payload::new("toupper").with_param("text", "abc"),
            Payload::new("hash").with_param("text", "abc"),
            Payload::new("sleep").with_param("ms", "1"),
            Payload::new("isprime").with_param("n", "97"),
            Payload::new("factor").with_param("n", "360"),
            Payload::new("wordcount").with_param("text", "a b"),
            Payload::new("grep").with_param("pattern", "a").with_param("text", "a"),
            Payload::new("compress").with_param("text", "aaaa"),
        ];
        assert_eq!(payloads.len(), TASK_NAMES.len());

        for payload in payloads {
            let task = Task::parse(&payload).unwrap();
            assert_eq!(task.name(), payload.task);
            assert!(TASK_NAMES.contains(&task.name()));
        }
    }

    #[test]
    fn test_validation_errors() {
        let processor = TaskProcessor;

        assert_eq!(
            processor.validate(&Payload::new("nope")),
            Err("Unknown task: nope".to_string())
        );
        assert_eq!(
            processor.validate(&Payload::new("")),
            Err("Missing task name".to_string())
        );
        assert_eq!(
            processor.validate(&Payload::new("reverse")),
            Err("Missing required parameter: text".to_string())
        );
        assert!(processor
            .validate(&Payload::new("fibonacci").with_param("num", "abc"))
            .is_err());
        assert!(processor
            .validate(&Payload::new("fibonacci").with_param("num", "94"))
            .is_err());
        assert!(processor
            .validate(&Payload::new("sleep").with_param("ms", "10001"))
            .is_err());
        assert!(processor
            .validate(&Payload::new("isprime").with_param("n", "1"))
            .is_err());
        assert!(processor
            .validate(&Payload::new("factor").with_param("n", "1000000000001"))
            .is_err());
        assert!(processor
            .validate(&Payload::new("grep").with_param("pattern", "(").with_param("text", "x"))
            .unwrap_err()
            .starts_with("Invalid pattern"));
    }

    #[test]
    fn test_fibonacci_result() {
        let value = run(Payload::new("fibonacci").with_param("num", "10")).unwrap();
        assert_eq!(value["num"], 10);
        assert_eq!(value["result"], 55);
        assert!(value["elapsed_ms"].is_u64());
    }

    #[test]
    fn test_reverse_result() {
        let value = run(Payload::new("reverse").with_param("text", "hola")).unwrap();
        assert_eq!(value["reversed"], "aloh");
    }

    #[test]
    fn test_factor_result() {
        let value = run(Payload::new("factor").with_param("n", "360")).unwrap();
        assert_eq!(value["factors"], json!([[2, 3], [3, 2], [5, 1]]));
    }

    #[test]
    fn test_invalid_payload_fails_in_worker() {
        assert_eq!(
            run(Payload::new("nope")),
            Err(ProcessingFault::Failed("Unknown task: nope".to_string()))
        );
    }
}
