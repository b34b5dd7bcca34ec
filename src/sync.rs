#[cfg(feature = "loom")]
mod imp {
    pub(crate) use loom::sync::{
        Arc, Condvar, Mutex,
        atomic::{AtomicBool, AtomicU8, AtomicU16, Ordering, fence},
    };

    pub(crate) fn spawn_worker(_name: String, f: impl FnOnce() + Send + 'static) {
        loom::thread::spawn(f);
    }
}

#[cfg(not(feature = "loom"))]
mod imp {
    pub(crate) use std::sync::{
        Arc, Condvar, Mutex,
        atomic::{AtomicBool, AtomicU8, AtomicU16, Ordering, fence},
    };

    pub(crate) fn spawn_worker(name: String, f: impl FnOnce() + Send + 'static) {
        std::thread::Builder::new()
            .name(name)
            .spawn(f)
            .expect("spawn_worker: failed to spawn a worker thread");
    }
}

pub(crate) use imp::*;
