//! # Cola Acotada
//! src/work/queue.rs
//!
//! Cola FIFO thread-safe con capacidad máxima:
//! - `push` bloquea mientras la cola está llena (backpressure), con timeout
//! - `pop_timeout` bloquea mientras está vacía
//! - `close` deja de aceptar items pero permite vaciar los pendientes
//! - Lo desencolado cuenta como "en proceso" hasta `complete()`, así un item
//!   siempre está en la cola o en proceso, nunca en ninguno de los dos
//!
//! Se usan dos condvars: `not_empty` despierta consumidores y `not_full`
//! despierta productores.

use crate::work::cancel::CancellationToken;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Cada cuánto revisa un productor bloqueado el token de cancelación
const CANCEL_POLL: Duration = Duration::from_millis(10);

/// Motivo por el que `push` no encoló; devuelve el item a quien llama
#[derive(Debug, PartialEq, Eq)]
pub enum PushError<T> {
    /// Venció el timeout con la cola llena
    Full(T),
    /// La cola está cerrada
    Closed(T),
    /// Se canceló mientras esperaba
    Canceled(T),
}

impl<T> PushError<T> {
    pub fn into_inner(self) -> T {
        match self {
            PushError::Full(item) | PushError::Closed(item) | PushError::Canceled(item) => item,
        }
    }
}

/// Resultado de `pop_timeout`
#[derive(Debug, PartialEq, Eq)]
pub enum Pop<T> {
    Item(T),
    /// No llegó nada dentro del timeout
    Empty,
    /// Cerrada y vacía: no llegarán más items
    Closed,
}

struct QueueState<T> {
    items: VecDeque<T>,
    /// Desencolados sin `complete()` todavía
    in_progress: usize,
    closed: bool,
}

/// Cola FIFO acotada
pub struct BoundedQueue<T> {
    state: Mutex<QueueState<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Crea una cola con capacidad máxima
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity.min(1024)),
                in_progress: 0,
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Encola un item
    ///
    /// - `timeout = None`: espera indefinidamente a que haya espacio
    /// - `timeout = Some(Duration::ZERO)`: falla de inmediato si está llena
    pub fn push(
        &self,
        item: T,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<(), PushError<T>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();

        loop {
            if state.closed {
                return Err(PushError::Closed(item));
            }
            if cancel.is_canceled() {
                return Err(PushError::Canceled(item));
            }
            if state.items.len() < self.capacity {
                state.items.push_back(item);
                drop(state);
                self.not_empty.notify_one();
                return Ok(());
            }

            let now = Instant::now();
            let wake_at = match deadline {
                Some(deadline) if deadline <= now => return Err(PushError::Full(item)),
                Some(deadline) => deadline.min(now + CANCEL_POLL),
                None => now + CANCEL_POLL,
            };
            self.not_full.wait_until(&mut state, wake_at);
        }
    }

    /// Desencola el item más antiguo, esperando hasta `timeout`
    pub fn pop_timeout(&self, timeout: Duration) -> Pop<T> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();

        loop {
            if let Some(item) = state.items.pop_front() {
                state.in_progress += 1;
                drop(state);
                self.not_full.notify_one();
                return Pop::Item(item);
            }
            if state.closed {
                return Pop::Closed;
            }
            if self.not_empty.wait_until(&mut state, deadline).timed_out() {
                // Última revisión antes de rendirse
                return match state.items.pop_front() {
                    Some(item) => {
                        state.in_progress += 1;
                        drop(state);
                        self.not_full.notify_one();
                        Pop::Item(item)
                    }
                    None if state.closed => Pop::Closed,
                    None => Pop::Empty,
                };
            }
        }
    }

    /// Intenta desencolar sin bloquear
    pub fn try_pop(&self) -> Option<T> {
        let mut state = self.state.lock();
        let item = state.items.pop_front();
        if item.is_some() {
            state.in_progress += 1;
            drop(state);
            self.not_full.notify_one();
        }
        item
    }

    /// Marca como terminado un item desencolado antes
    pub fn complete(&self) {
        let mut state = self.state.lock();
        state.in_progress = state.in_progress.saturating_sub(1);
    }

    /// Items desencolados que todavía no se completaron
    pub fn in_progress(&self) -> usize {
        self.state.lock().in_progress
    }

    /// (en cola, en proceso) leídos bajo el mismo lock
    pub fn load(&self) -> (usize, usize) {
        let state = self.state.lock();
        (state.items.len(), state.in_progress)
    }

    /// Cierra la cola: no acepta más items, despierta a todos los que esperan
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    /// Vacía la cola devolviendo los items pendientes
    pub fn drain(&self) -> Vec<T> {
        let items: Vec<T> = self.state.lock().items.drain(..).collect();
        self.not_full.notify_all();
        items
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Tamaño actual de la cola
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn token() -> CancellationToken {
        CancellationToken::new()
    }

    #[test]
    fn test_fifo_order() {
        let queue = BoundedQueue::new(10);
        for i in 0..5 {
            queue.push(i, Some(Duration::ZERO), &token()).unwrap();
        }
        for i in 0..5 {
            assert_eq!(queue.try_pop(), Some(i));
        }
        assert_eq!(queue.try_pop(), None);
    }

    #[test]
    fn test_capacity_fail_fast() {
        let queue = BoundedQueue::new(2);
        let cancel = token();

        assert!(queue.push(1, Some(Duration::ZERO), &cancel).is_ok());
        assert!(queue.push(2, Some(Duration::ZERO), &cancel).is_ok());
        assert!(queue.is_full());
        // El item rechazado vuelve intacto
        assert_eq!(queue.push(3, Some(Duration::ZERO), &cancel), Err(PushError::Full(3)));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_push_times_out_when_full() {
        let queue = BoundedQueue::new(1);
        let cancel = token();
        queue.push(1, None, &cancel).unwrap();

        let start = Instant::now();
        let result = queue.push(2, Some(Duration::from_millis(50)), &cancel);
        assert_eq!(result, Err(PushError::Full(2)));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_blocked_push_resumes_when_space_frees() {
        let queue = Arc::new(BoundedQueue::new(1));
        queue.push(1, None, &token()).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(2, Some(Duration::from_secs(5)), &token()))
        };

        thread::sleep(Duration::from_millis(30));
        assert_eq!(queue.try_pop(), Some(1));
        assert_eq!(producer.join().unwrap(), Ok(()));
        assert_eq!(queue.try_pop(), Some(2));
    }

    #[test]
    fn test_blocked_push_observes_cancel() {
        let queue = Arc::new(BoundedQueue::new(1));
        let cancel = token();
        queue.push(1, None, &cancel).unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            let cancel = cancel.clone();
            thread::spawn(move || queue.push(2, None, &cancel))
        };

        thread::sleep(Duration::from_millis(30));
        cancel.cancel();
        assert_eq!(producer.join().unwrap(), Err(PushError::Canceled(2)));
    }

    #[test]
    fn test_closed_queue_rejects_but_drains() {
        let queue = BoundedQueue::new(4);
        queue.push("a", None, &token()).unwrap();
        queue.push("b", None, &token()).unwrap();
        queue.close();

        assert_eq!(queue.push("c", None, &token()), Err(PushError::Closed("c")));
        assert_eq!(queue.pop_timeout(Duration::from_millis(10)), Pop::Item("a"));
        assert_eq!(queue.pop_timeout(Duration::from_millis(10)), Pop::Item("b"));
        assert_eq!(queue.pop_timeout(Duration::from_millis(10)), Pop::Closed);
    }

    #[test]
    fn test_pop_timeout_empty() {
        let queue: BoundedQueue<u32> = BoundedQueue::new(4);
        assert_eq!(queue.pop_timeout(Duration::from_millis(10)), Pop::Empty);
    }

    #[test]
    fn test_close_wakes_blocked_consumer() {
        let queue: Arc<BoundedQueue<u32>> = Arc::new(BoundedQueue::new(4));
        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.pop_timeout(Duration::from_secs(5)))
        };
        thread::sleep(Duration::from_millis(20));
        queue.close();
        assert_eq!(consumer.join().unwrap(), Pop::Closed);
    }

    #[test]
    fn test_drain() {
        let queue = BoundedQueue::new(4);
        queue.push(1, None, &token()).unwrap();
        queue.push(2, None, &token()).unwrap();
        assert_eq!(queue.drain(), vec![1, 2]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_popped_item_counts_as_in_progress() {
        let queue = BoundedQueue::new(4);
        queue.push(1, None, &token()).unwrap();
        queue.push(2, None, &token()).unwrap();
        assert_eq!(queue.load(), (2, 0));

        assert_eq!(queue.pop_timeout(Duration::from_millis(10)), Pop::Item(1));
        assert_eq!(queue.load(), (1, 1));
        assert_eq!(queue.try_pop(), Some(2));
        assert_eq!(queue.load(), (0, 2));

        queue.complete();
        queue.complete();
        assert_eq!(queue.in_progress(), 0);
        // Un complete de más no da la vuelta
        queue.complete();
        assert_eq!(queue.in_progress(), 0);
    }

    #[test]
    fn test_load_never_loses_an_item() {
        let total = 64;
        let queue = Arc::new(BoundedQueue::new(total));
        for i in 0..total {
            queue.push(i, None, &token()).unwrap();
        }

        let worker = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                while let Pop::Item(_) = queue.pop_timeout(Duration::from_millis(10)) {
                    queue.complete();
                }
            })
        };

        // Mientras el worker consume, cada item está en la cola o en proceso
        let mut seen_done = 0;
        loop {
            let (queued, in_progress) = queue.load();
            let done = total - queued - in_progress;
            assert!(done >= seen_done);
            seen_done = done;
            if queued == 0 && in_progress == 0 {
                break;
            }
        }
        queue.close();
        worker.join().unwrap();
    }

    #[test]
    fn test_push_error_into_inner() {
        assert_eq!(PushError::Full(5).into_inner(), 5);
        assert_eq!(PushError::Closed(6).into_inner(), 6);
        assert_eq!(PushError::Canceled(7).into_inner(), 7);
    }
}
