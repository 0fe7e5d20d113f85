//! Blocking ingest worker: the hand-off between gossip decoding and the
//! database.

use crate::db::AtxDb;
use crate::error::AtxError;
use protocol::{ActivationTx, AtxId};
use std::sync::Arc;
use tracing::{error, info, trace, warn};

/// Drains decoded ATXs from the intake and runs each through syntactic
/// validation and [`AtxDb::process_atx`]. Invalid ATXs are logged and
/// dropped; an inconsistent store stops the worker with an error.
#[derive(bon::Builder)]
pub struct AtxWorker {
    db: Arc<AtxDb>,
    intake: flume::Receiver<ActivationTx>,
    shutdown: flume::Receiver<()>,
}

enum AtxOrShutdown {
    Atx(ActivationTx),
    Shutdown,
}

impl From<ActivationTx> for AtxOrShutdown {
    fn from(atx: ActivationTx) -> Self {
        Self::Atx(atx)
    }
}

impl From<()> for AtxOrShutdown {
    fn from(_: ()) -> Self {
        Self::Shutdown
    }
}

impl AtxWorker {
    pub fn process(&mut self) -> anyhow::Result<()> {
        info!("Atx worker started");
        loop {
            match self.select_input()? {
                AtxOrShutdown::Shutdown => {
                    info!("Atx worker received shutdown signal, draining intake first");
                    let rx = std::mem::replace(&mut self.intake, flume::bounded(0).1);
                    rx.drain().try_for_each(|atx| self.handle_atx(atx))?;
                    info!("Draining is done, stopping atx worker");
                    return Ok(());
                }
                AtxOrShutdown::Atx(atx) => self.handle_atx(atx)?,
            }
        }
    }

    fn select_input(&self) -> anyhow::Result<AtxOrShutdown> {
        trace!("Waiting for new atxs or shutdown signal");
        Ok(flume::Selector::new()
            .recv(&self.intake, |r| r.map(AtxOrShutdown::from))
            .recv(&self.shutdown, |r| r.map(AtxOrShutdown::from))
            .wait()?)
    }

    fn handle_atx(&self, atx: ActivationTx) -> anyhow::Result<()> {
        let id = atx.id();
        if let Err(err) = self.db.syntactically_validate_atx(&atx) {
            return self.drop_or_halt(&id, err);
        }
        if let Err(err) = self.db.process_atx(atx) {
            return self.drop_or_halt(&id, err);
        }
        Ok(())
    }

    fn drop_or_halt(&self, id: &AtxId, err: AtxError) -> anyhow::Result<()> {
        if err.is_fatal() {
            error!(atx = %id.short(), %err, "store is inconsistent, stopping ingestion");
            return Err(err.into());
        }
        warn!(atx = %id.short(), %err, "dropping invalid atx");
        self.db.metrics().inc_rejected();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{build_atx, identity, test_db};
    use protocol::{AtxId, EMPTY_ATX_ID};

    const LAYERS_PER_EPOCH: u64 = 4;

    fn spawn_worker(
        db: Arc<AtxDb>,
    ) -> (
        flume::Sender<ActivationTx>,
        flume::Sender<()>,
        std::thread::JoinHandle<anyhow::Result<()>>,
    ) {
        let (atx_tx, atx_rx) = flume::unbounded();
        let (shutdown_tx, shutdown_rx) = flume::unbounded();
        let mut worker = AtxWorker::builder()
            .db(db)
            .intake(atx_rx)
            .shutdown(shutdown_rx)
            .build();
        let handle = std::thread::spawn(move || worker.process());
        (atx_tx, shutdown_tx, handle)
    }

    #[test]
    fn worker_stores_valid_atxs_and_drains_on_shutdown() {
        let (db, _mesh) = test_db(LAYERS_PER_EPOCH);
        let (atx_tx, shutdown_tx, handle) = spawn_worker(db.clone());

        let node = identity("node-1");
        let atx = build_atx(&node, 0, EMPTY_ATX_ID, EMPTY_ATX_ID, 3, 0, Vec::new());
        let id = atx.id();
        atx_tx.send(atx).unwrap();
        shutdown_tx.send(()).unwrap();
        handle.join().unwrap().unwrap();

        assert!(db.has_atx(&id).unwrap());
    }

    #[test]
    fn worker_drops_invalid_atxs_and_keeps_going() {
        let (db, _mesh) = test_db(LAYERS_PER_EPOCH);
        let (atx_tx, shutdown_tx, handle) = spawn_worker(db.clone());

        let node = identity("node-1");
        let invalid = build_atx(&node, 2, EMPTY_ATX_ID, EMPTY_ATX_ID, 3, 0, Vec::new());
        let valid = build_atx(&node, 0, EMPTY_ATX_ID, EMPTY_ATX_ID, 3, 0, Vec::new());
        let valid_id = valid.id();
        atx_tx.send(invalid).unwrap();
        atx_tx.send(valid).unwrap();
        shutdown_tx.send(()).unwrap();
        handle.join().unwrap().unwrap();

        assert!(db.has_atx(&valid_id).unwrap());
        assert_eq!(db.metrics().snapshot().atxs_rejected, 1);
    }

    #[test]
    fn worker_halts_on_an_inconsistent_store() {
        let (db, mesh) = test_db(LAYERS_PER_EPOCH);
        let node = identity("node-1");
        let anchor = build_atx(&node, 0, EMPTY_ATX_ID, EMPTY_ATX_ID, 3, 0, Vec::new());
        let anchor_id = db.process_atx(anchor).unwrap();
        mesh.add_block(1, 3, vec![AtxId([0xEE; 32])], Vec::new());

        let (atx_tx, _shutdown_tx, handle) = spawn_worker(db.clone());
        let poisoned = build_atx(
            &node,
            1,
            anchor_id,
            anchor_id,
            7,
            0,
            vec![crate::testutil::block_id(1)],
        );
        atx_tx.send(poisoned).unwrap();

        assert!(handle.join().unwrap().is_err());
    }
}
