//! # Tareas Básicas
//! src/commands/basic.rs
//!
//! - fibonacci: N-ésimo número de Fibonacci
//! - reverse: invertir texto
//! - hash: SHA256 de un texto
//! - sleep: dormir N milisegundos

use sha2::{Digest, Sha256};
use std::thread;
use std::time::Duration;

/// Calcula el N-ésimo número de Fibonacci
///
/// Usa algoritmo iterativo. `F(93)` es el último que cabe en u64.
pub fn fibonacci(n: u64) -> Result<u64, String> {
    if n == 0 {
        return Ok(0);
    }

    let mut a = 0u64;
    let mut b = 1u64;

    for _ in 2..=n {
        let next = a
            .checked_add(b)
            .ok_or_else(|| format!("fibonacci({}) overflows u64", n))?;
        a = b;
        b = next;
    }

    Ok(b)
}

/// Invierte el texto (por caracteres, no por bytes)
pub fn reverse(text: &str) -> String {
    text.chars().rev().collect()
}

/// Hash SHA256 en hexadecimal
pub fn sha256_hex(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn sleep_ms(ms: u64) {
    thread::sleep(Duration::from_millis(ms));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_fibonacci_calculation() {
        assert_eq!(fibonacci(0), Ok(0));
        assert_eq!(fibonacci(1), Ok(1));
        assert_eq!(fibonacci(2), Ok(1));
        assert_eq!(fibonacci(10), Ok(55));
        assert_eq!(fibonacci(20), Ok(6765));
    }

    #[test]
    fn test_fibonacci_limits() {
        assert_eq!(fibonacci(93), Ok(12_200_160_415_121_876_738));
        assert!(fibonacci(94).is_err());
    }

    #[test]
    fn test_reverse_unicode() {
        assert_eq!(reverse("hello"), "olleh");
        assert_eq!(reverse(""), "");
        assert_eq!(reverse("ñandú"), "údnañ");
    }

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(sha256_hex("x"), sha256_hex("x"));
    }

    #[test]
    fn test_sleep_ms() {
        let start = Instant::now();
        sleep_ms(20);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
