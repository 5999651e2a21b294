//! # Cola de Trabajo
//! src/jobs/queue.rs
//!
//! Cola FIFO acotada y thread-safe entre el `JobManager` (productor) y los
//! workers (consumidores). Encolar nunca bloquea; desencolar bloquea al
//! worker hasta que llegue trabajo o la cola se cierre.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Unidad de trabajo que recibe un worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub job_id: Uuid,
    pub name: String,
}

struct QueueState {
    items: VecDeque<WorkItem>,
    closed: bool,
}

/// Cola acotada compartida (clonar comparte el mismo estado)
#[derive(Clone)]
pub struct JobQueue {
    state: Arc<Mutex<QueueState>>,

    /// Condvar para despertar workers cuando hay trabajo o se cierra la cola
    condvar: Arc<Condvar>,

    max_capacity: usize,
}

/// Error al encolar
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueError {
    Full(WorkItem),
    Closed(WorkItem),
}

impl JobQueue {
    pub fn new(max_capacity: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(QueueState {
                items: VecDeque::new(),
                closed: false,
            })),
            condvar: Arc::new(Condvar::new()),
            max_capacity,
        }
    }

    /// Encola sin bloquear
    pub fn try_enqueue(&self, item: WorkItem) -> Result<(), EnqueueError> {
        let mut state = self.lock();

        if state.closed {
            return Err(EnqueueError::Closed(item));
        }
        if state.items.len() >= self.max_capacity {
            return Err(EnqueueError::Full(item));
        }

        state.items.push_back(item);
        self.condvar.notify_one();
        Ok(())
    }

    /// Desencola el siguiente item
    ///
    /// Bloquea hasta que haya trabajo. Retorna `None` cuando la cola está
    /// cerrada y vacía.
    pub fn dequeue(&self) -> Option<WorkItem> {
        let mut state = self.lock();

        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            if state.closed {
                return None;
            }
            state = self
                .condvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Intenta desencolar sin bloquear
    pub fn try_dequeue(&self) -> Option<WorkItem> {
        self.lock().items.pop_front()
    }

    /// Cierra la cola y despierta a todos los workers
    pub fn close(&self) {
        self.lock().closed = true;
        self.condvar.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn item(name: &str) -> WorkItem {
        WorkItem {
            job_id: Uuid::new_v4(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_queue_fifo_order() {
        let queue = JobQueue::new(100);

        queue.try_enqueue(item("first")).unwrap();
        queue.try_enqueue(item("second")).unwrap();
        queue.try_enqueue(item("third")).unwrap();

        assert_eq!(queue.try_dequeue().unwrap().name, "first");
        assert_eq!(queue.try_dequeue().unwrap().name, "second");
        assert_eq!(queue.try_dequeue().unwrap().name, "third");
        assert!(queue.try_dequeue().is_none());
    }

    #[test]
    fn test_queue_capacity() {
        let queue = JobQueue::new(2);

        assert!(queue.try_enqueue(item("1")).is_ok());
        assert!(queue.try_enqueue(item("2")).is_ok());
        assert!(matches!(
            queue.try_enqueue(item("3")),
            Err(EnqueueError::Full(_))
        )); // Cola llena
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_queue_closed_rejects() {
        let queue = JobQueue::new(2);
        queue.close();

        assert!(queue.is_closed());
        assert!(matches!(
            queue.try_enqueue(item("late")),
            Err(EnqueueError::Closed(_))
        ));
        assert_eq!(queue.dequeue(), None);
    }

    #[test]
    fn test_dequeue_blocks_until_enqueue() {
        let queue = JobQueue::new(10);
        let consumer = {
            let queue = queue.clone();
            thread::spawn(move || queue.dequeue())
        };

        thread::sleep(Duration::from_millis(50));
        queue.try_enqueue(item("wake")).unwrap();

        let received = consumer.join().unwrap();
        assert_eq!(received.unwrap().name, "wake");
    }

    #[test]
    fn test_close_wakes_waiting_workers() {
        let queue = JobQueue::new(10);
        let consumers: Vec<_> = (0..3)
            .map(|_| {
                let queue = queue.clone();
                thread::spawn(move || queue.dequeue())
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        queue.close();

        for consumer in consumers {
            assert_eq!(consumer.join().unwrap(), None);
        }
    }

    #[test]
    fn test_close_drains_remaining_items() {
        let queue = JobQueue::new(10);
        queue.try_enqueue(item("left")).unwrap();
        queue.close();

        assert_eq!(queue.dequeue().unwrap().name, "left");
        assert_eq!(queue.dequeue(), None);
    }
}
