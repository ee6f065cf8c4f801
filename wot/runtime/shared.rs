use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::common::options::Options;

use super::engine::Runtime;

/// A runtime that can be handed to more than one thread. The lock is held for the whole of
/// every operation, collections included.
#[derive(Clone)]
pub struct SharedRuntime(Arc<Mutex<Runtime>>);

impl SharedRuntime {
    pub fn new(options: Options) -> SharedRuntime {
        SharedRuntime(Arc::new(Mutex::new(Runtime::new(options))))
    }

    pub fn lock(&self) -> MutexGuard<'_, Runtime> {
        self.0.lock()
    }

    /// Run `f` with the runtime locked
    pub fn with<T>(&self, f: impl FnOnce(&mut Runtime) -> T) -> T {
        f(&mut self.0.lock())
    }
}

impl From<Runtime> for SharedRuntime {
    fn from(runtime: Runtime) -> Self {
        SharedRuntime(Arc::new(Mutex::new(runtime)))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_updates_from_many_threads() {
        let shared = SharedRuntime::new(Options::default());
        let light = shared.with(|rt| rt.thing("light12")).unwrap();

        let workers: Vec<_> = (0..4)
            .map(|i| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for n in 0..50u32 {
                        shared.with(|rt| {
                            let value = rt.new_unsigned(i * 1000 + n)?;
                            rt.set_property(light, "brightness", value)
                        })
                        .unwrap();
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }

        let rt = shared.lock();
        let brightness = rt.get_property(light, "brightness").unwrap();
        assert!(matches!(rt.value(brightness), Some(wot_gc::Value::UnsignedInt(_))));
        // Overwritten leaves were freed as they were replaced
        assert_eq!(rt.stats().collections, 0);
    }
}
