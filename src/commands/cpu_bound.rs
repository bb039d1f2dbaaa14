//! # Tareas CPU-bound
//! src/commands/cpu_bound.rs
//!
//! - isprime: verificación de primalidad (Miller-Rabin determinístico)
//! - factor: factorización en números primos

/// Testigos que hacen a Miller-Rabin determinístico para todo u64
const WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Verifica si un número es primo usando el test de Miller-Rabin
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for p in WITNESSES {
        if n % p == 0 {
            return n == p;
        }
    }

    // Escribir n-1 como 2^r * d
    let mut d = n - 1;
    let mut r = 0;
    while d % 2 == 0 {
        d /= 2;
        r += 1;
    }

    'witness: for a in WITNESSES {
        let mut x = mod_pow(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }

        for _ in 1..r {
            x = mod_mul(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }

        return false;
    }

    true
}

/// Exponenciación modular: (base^exp) % modulus
fn mod_pow(mut base: u64, mut exp: u64, modulus: u64) -> u64 {
    if modulus == 1 {
        return 0;
    }

    let mut result = 1u64;
    base %= modulus;

    while exp > 0 {
        if exp & 1 == 1 {
            result = mod_mul(result, base, modulus);
        }
        exp >>= 1;
        base = mod_mul(base, base, modulus);
    }

    result
}

/// (a * b) % m sin overflow
fn mod_mul(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

/// Factoriza un número en sus factores primos
///
/// Retorna vector de (primo, exponente) en orden creciente.
pub fn factorize(mut n: u64) -> Vec<(u64, u32)> {
    let mut factors = Vec::new();

    let mut take = |n: &mut u64, d: u64| {
        let mut count = 0;
        while *n % d == 0 {
            *n /= d;
            count += 1;
        }
        if count > 0 {
            factors.push((d, count));
        }
    };

    take(&mut n, 2);

    // Divisores impares hasta √n
    let mut d = 3;
    while d * d <= n {
        take(&mut n, d);
        d += 2;
    }

    // Si queda algo, es primo
    if n > 1 {
        factors.push((n, 1));
    }

    factors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_primes() {
        let primes: Vec<u64> = (0..50).filter(|&n| is_prime(n)).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47]);
    }

    #[test]
    fn test_large_values() {
        assert!(is_prime(1_000_000_007));
        assert!(is_prime(18_446_744_073_709_551_557)); // mayor primo u64
        assert!(!is_prime(1_000_000_007 * 3));
        // Pseudoprimo fuerte en base 2
        assert!(!is_prime(2_047));
        // Número de Carmichael
        assert!(!is_prime(561));
    }

    #[test]
    fn test_factorize() {
        assert_eq!(factorize(2), vec![(2, 1)]);
        assert_eq!(factorize(360), vec![(2, 3), (3, 2), (5, 1)]);
        assert_eq!(factorize(97), vec![(97, 1)]);
        assert_eq!(factorize(1_000_000_000_000), vec![(2, 12), (5, 12)]);
    }

    #[test]
    fn test_factorize_product_roundtrip() {
        let n = 600_851_475_143u64;
        let product: u64 = factorize(n).iter().map(|(p, e)| p.pow(*e)).product();
        assert_eq!(product, n);
    }
}
