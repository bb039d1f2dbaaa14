//! # Servidor TCP Concurrente
//! src/server/tcp.rs
//!
//! Un thread por conexión, con un máximo de conexiones simultáneas: cuando se
//! alcanza, la conexión nueva recibe 503 y se cierra sin lanzar thread.
//!
//! El loop de accept termina cuando se dispara el `ShutdownHandle` (que se
//! conecta a sí mismo para despertar al `accept` bloqueado).

use crate::http::{ParseError, Request, Response, StatusCode};
use crate::metrics::{store, CounterStore};
use crate::router::Router;
use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Timeout de lectura/escritura por conexión
const IO_TIMEOUT: Duration = Duration::from_secs(10);

/// Cuánto espera `run` a que terminen las conexiones activas al apagarse
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Lectura breve del request de una conexión que se va a rechazar
const REJECT_READ_TIMEOUT: Duration = Duration::from_millis(200);

const READ_CHUNK: usize = 8192;

/// Estado compartido entre el loop de accept y los threads de conexión
struct ServerShared {
    router: Router,
    counters: Arc<CounterStore>,
    active: AtomicUsize,
    next_request_id: AtomicU64,
}

/// Servidor HTTP/1.0 concurrente
pub struct Server {
    listener: TcpListener,
    shared: Arc<ServerShared>,
    max_connections: usize,
    stop: Arc<AtomicBool>,
}

/// Permite detener el servidor desde otro thread
#[derive(Clone)]
pub struct ShutdownHandle {
    stop: Arc<AtomicBool>,
    addr: SocketAddr,
}

impl ShutdownHandle {
    /// Pide al servidor que deje de aceptar conexiones
    pub fn shutdown(&self) {
        if self.stop.swap(true, Ordering::AcqRel) {
            return;
        }
        // Despertar al accept bloqueado
        if let Err(e) = TcpStream::connect_timeout(&self.addr, Duration::from_secs(1)) {
            debug!("no se pudo despertar al accept: {}", e);
        }
    }
}

/// Decrementa el contador de conexiones activas al salir del thread
struct ConnectionGuard(Arc<ServerShared>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Server {
    /// Hace bind en `address` (ej: "0.0.0.0:8080" o "127.0.0.1:0")
    pub fn bind(
        address: impl ToSocketAddrs,
        router: Router,
        counters: Arc<CounterStore>,
        max_connections: usize,
    ) -> io::Result<Self> {
        let listener = TcpListener::bind(address)?;

        Ok(Self {
            listener,
            shared: Arc::new(ServerShared {
                router,
                counters,
                active: AtomicUsize::new(0),
                next_request_id: AtomicU64::new(1),
            }),
            max_connections: max_connections.max(1),
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn shutdown_handle(&self) -> io::Result<ShutdownHandle> {
        let mut addr = self.local_addr()?;
        // No se puede conectar a 0.0.0.0 / ::
        if addr.ip().is_unspecified() {
            addr.set_ip(match addr {
                SocketAddr::V4(_) => Ipv4Addr::LOCALHOST.into(),
                SocketAddr::V6(_) => Ipv6Addr::LOCALHOST.into(),
            });
        }
        Ok(ShutdownHandle {
            stop: Arc::clone(&self.stop),
            addr,
        })
    }

    /// Conexiones siendo atendidas ahora
    pub fn active_connections(&self) -> usize {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Loop de accept. Bloquea hasta que se dispare el `ShutdownHandle`.
    pub fn run(&self) -> io::Result<()> {
        info!(
            address = %self.local_addr()?,
            max_connections = self.max_connections,
            "servidor escuchando (un thread por conexión)"
        );

        for stream in self.listener.incoming() {
            if self.stop.load(Ordering::Acquire) {
                break;
            }

            match stream {
                Ok(stream) => self.accept(stream),
                Err(e) => warn!("error al aceptar conexión: {}", e),
            }
        }

        self.wait_for_connections();
        info!("servidor detenido");
        Ok(())
    }

    fn accept(&self, mut stream: TcpStream) {
        let active = self.shared.active.fetch_add(1, Ordering::AcqRel);
        let guard = ConnectionGuard(Arc::clone(&self.shared));

        if active >= self.max_connections {
            warn!(active, "demasiadas conexiones, respondiendo 503");
            let response = Response::error(StatusCode::ServiceUnavailable, "too many connections")
                .with_header("Connection", "close");
            self.shared
                .counters
                .increment(&store::http_status_key(response.status().as_u16()));
            // Consumir el request antes de cerrar: cerrar con datos sin leer
            // manda RST y el cliente puede perder la respuesta
            let _ = stream.set_read_timeout(Some(REJECT_READ_TIMEOUT));
            let _ = stream.read(&mut [0u8; READ_CHUNK]);
            let _ = stream.set_write_timeout(Some(IO_TIMEOUT));
            if let Err(e) = stream.write_all(&response.to_bytes()) {
                debug!("no se pudo enviar 503: {}", e);
            }
            return;
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("conn".to_string())
            .spawn(move || {
                let _guard = guard;
                if let Err(e) = Self::handle_connection(stream, &shared) {
                    debug!("error en conexión: {}", e);
                }
            });

        if let Err(e) = spawned {
            // El guard se movió al closure y se soltó con él
            error!("no se pudo lanzar thread de conexión: {}", e);
        }
    }

    /// Espera (acotado) a que terminen las conexiones en curso
    fn wait_for_connections(&self) {
        let deadline = Instant::now() + DRAIN_TIMEOUT;
        while self.active_connections() > 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        let remaining = self.active_connections();
        if remaining > 0 {
            warn!(remaining, "conexiones activas al detener el servidor");
        }
    }

    /// Lee bytes hasta tener el request completo (headers + Content-Length)
    fn read_request(stream: &mut TcpStream) -> Result<Vec<u8>, ParseError> {
        let mut buffer = Vec::with_capacity(READ_CHUNK);
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(total) = Request::expected_len(&buffer)? {
                if buffer.len() >= total {
                    return Ok(buffer);
                }
            }

            match stream.read(&mut chunk) {
                Ok(0) => return Ok(buffer),
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    debug!("error leyendo request: {}", e);
                    return Ok(buffer);
                }
            }
        }
    }

    fn handle_connection(mut stream: TcpStream, shared: &ServerShared) -> io::Result<()> {
        let start = Instant::now();
        stream.set_read_timeout(Some(IO_TIMEOUT))?;
        stream.set_write_timeout(Some(IO_TIMEOUT))?;

        let request_id = shared.next_request_id.fetch_add(1, Ordering::Relaxed);

        let raw = match Self::read_request(&mut stream) {
            Ok(raw) if raw.is_empty() => {
                // El peer cerró sin mandar nada
                return Ok(());
            }
            Ok(raw) => Ok(raw),
            Err(e) => Err(e),
        };

        let (mut response, target) = match raw.and_then(|raw| Request::parse(&raw)) {
            Ok(request) => {
                let target = format!("{} {}", request.method(), request.path());
                (shared.router.route(&request), target)
            }
            Err(e) => {
                let status = match e {
                    ParseError::UnsupportedMethod(_) => StatusCode::MethodNotAllowed,
                    _ => StatusCode::BadRequest,
                };
                let response = Response::error(status, &format!("Invalid request: {}", e))
                    .with_header("Connection", "close");
                (response, "-".to_string())
            }
        };

        response.add_header("X-Request-Id", &format!("{:016x}", request_id));

        let status = response.status().as_u16();
        shared.counters.increment(&store::http_status_key(status));

        stream.write_all(&response.to_bytes())?;
        stream.flush()?;
        debug!(
            request_id,
            %target,
            status,
            latency_ms = start.elapsed().as_secs_f64() * 1000.0,
            "request atendido"
        );

        Ok(())
    }
}
