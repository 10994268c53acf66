use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Tracks how many units are currently in flight and the highest number seen at once.
///
/// Owned by an engine instance and shared with its workers or tasks through an [Arc].
#[derive(Debug, Default)]
pub struct ConcurrencyGauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyGauge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Mark one unit as in flight until the returned guard is dropped.
    pub fn enter(self: &Arc<Self>) -> GaugeGuard {
        let now = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak.fetch_max(now, Ordering::AcqRel);
        GaugeGuard {
            gauge: self.clone(),
        }
    }

    pub fn current(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct GaugeGuard {
    gauge: Arc<ConcurrencyGauge>,
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.gauge.current.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_current_and_peak() {
        let gauge = ConcurrencyGauge::new();
        let a = gauge.enter();
        let b = gauge.enter();
        assert_eq!(2, gauge.current());
        drop(a);
        let c = gauge.enter();
        assert_eq!(2, gauge.current());
        drop(b);
        drop(c);
        assert_eq!(0, gauge.current());
        assert_eq!(2, gauge.peak());
    }

    #[test]
    fn peak_across_threads() {
        let gauge = ConcurrencyGauge::new();
        let barrier = Arc::new(std::sync::Barrier::new(4));
        let handles = (0..4)
            .map(|_| {
                let gauge = gauge.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    let _guard = gauge.enter();
                    barrier.wait();
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(4, gauge.peak());
        assert_eq!(0, gauge.current());
    }
}
