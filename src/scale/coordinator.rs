//! Keeps several quantitative scales on one shared domain.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::broadcaster::ListenerKey;
use crate::scale::{QuantitativeScale, Scale};

const COORDINATOR_EPSILON: f64 = 1e-9;

static COORDINATOR_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Links quantitative scales so that a domain change on one is copied to the others.
///
/// The copy sets an explicit domain on every peer. A guard stops the peers'
/// own broadcasts from bouncing back while a rescale is in progress.
#[derive(Debug)]
pub struct ScaleDomainCoordinator {
    scales: Vec<QuantitativeScale>,
    key: ListenerKey,
}

impl ScaleDomainCoordinator {
    /// Link the given scales.
    pub fn new(scales: Vec<QuantitativeScale>) -> Self {
        let id = COORDINATOR_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        let key = ListenerKey::Named(format!("domain-coordinator-{id}"));
        let rescaling = Rc::new(Cell::new(false));
        for scale in &scales {
            let peers = scales.clone();
            let rescaling = rescaling.clone();
            scale.broadcaster().register(key.clone(), move |source: &Scale| {
                if rescaling.get() {
                    return;
                }
                let Some(source) = source.as_quantitative() else {
                    return;
                };
                let (start, end) = source.domain();
                rescaling.set(true);
                for peer in peers.iter().filter(|peer| !peer.ptr_eq(source)) {
                    let (peer_start, peer_end) = peer.domain();
                    if approx_eq(peer_start, start) && approx_eq(peer_end, end) {
                        continue;
                    }
                    if let Err(error) = peer.set_domain(start, end) {
                        tracing::warn!(%error, "coordinated scale rejected domain");
                    }
                }
                rescaling.set(false);
            });
        }
        Self { scales, key }
    }

    /// Linked scales.
    pub fn scales(&self) -> &[QuantitativeScale] {
        &self.scales
    }
}

impl Drop for ScaleDomainCoordinator {
    fn drop(&mut self) {
        for scale in &self.scales {
            scale.broadcaster().deregister(&self.key);
        }
    }
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= COORDINATOR_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setting_one_domain_rescales_peers() {
        let a = QuantitativeScale::linear();
        let b = QuantitativeScale::linear();
        let c = QuantitativeScale::linear();
        let coordinator = ScaleDomainCoordinator::new(vec![a.clone(), b.clone(), c.clone()]);
        b.set_domain(-3.0, 7.0).expect("domain");
        assert_eq!(a.domain(), (-3.0, 7.0));
        assert_eq!(c.domain(), (-3.0, 7.0));
        drop(coordinator);
        a.set_domain(0.0, 1.0).expect("domain");
        assert_eq!(b.domain(), (-3.0, 7.0));
    }
}
