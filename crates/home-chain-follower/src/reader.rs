//! The polling home chain reader.
//!
//! One background task polls the home ledger on a fixed interval and
//! publishes an immutable [`Snapshot`] after every successful cycle.  Read
//! operations only ever touch the published snapshot; they never perform
//! ledger I/O and never block the poll task.
//!
//! A failed cycle is logged and counted, the previous snapshot keeps
//! serving, and the next tick retries unconditionally.  Only a failure of
//! the very first cycle is surfaced, synchronously, to the caller of
//! [`HomeChainReader::start`].

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use strum::IntoEnumIterator;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::sleep,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::{
    chain_config::{ChainConfig, ChainSelector},
    config::ConfigSlots,
    don::{DonId, DonRecord},
    error::{Error, Result},
    ledger::HomeLedger,
    node_info::{project_node_info, NodeInfo},
    peer_id::PeerId,
    plugin_type::PluginType,
    rmn_home::{RmnHomeDynamicConfig, RmnHomeStaticConfig},
    snapshot::Snapshot,
    stats::{ReaderStats, StatsTracker},
};

/// Default interval between home chain poll cycles.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration for a [`HomeChainReader`].
#[derive(Clone, Debug)]
pub struct HomeChainReaderConfig {
    /// Interval between poll cycles.
    poll_interval: Duration,
}

impl Default for HomeChainReaderConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl HomeChainReaderConfig {
    /// Create a config with the default poll interval.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the interval between poll cycles.
    ///
    /// # Arguments
    ///
    /// * `interval`: Time to wait between the end of one cycle and the start
    ///   of the next.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// The polling/caching reader of home chain state.
pub struct HomeChainReader {
    /// The polled home ledger.
    ledger: Arc<dyn HomeLedger>,
    /// Interval between poll cycles.
    poll_interval: Duration,
    /// Receive side of the published snapshot.
    snapshot_rx: watch::Receiver<Option<Arc<Snapshot>>>,
    /// Send side of the published snapshot; handed to the poll task by
    /// [`Self::start`].
    snapshot_tx: Mutex<Option<watch::Sender<Option<Arc<Snapshot>>>>>,
    /// Cancels the poll task.
    cancel: CancellationToken,
    /// Join handle of the running poll task.
    poll_task: Mutex<Option<JoinHandle<()>>>,
    /// Set once the reader has been closed.
    closed: AtomicBool,
    /// Poll statistics of this reader.
    stats: StatsTracker,
}

impl HomeChainReader {
    /// Create a reader polling the given ledger.
    ///
    /// The reader is inert until [`Self::start`] is called.
    #[must_use]
    pub fn new(ledger: Arc<dyn HomeLedger>, config: HomeChainReaderConfig) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        Self {
            ledger,
            poll_interval: config.poll_interval,
            snapshot_rx,
            snapshot_tx: Mutex::new(Some(snapshot_tx)),
            cancel: CancellationToken::new(),
            poll_task: Mutex::new(None),
            closed: AtomicBool::new(false),
            stats: StatsTracker::new(),
        }
    }

    /// Run the first poll cycle and start the recurring poll task.
    ///
    /// Blocks until the first cycle completes.  On failure nothing is
    /// published, the error is returned, and `start` may be retried.
    ///
    /// # Errors
    ///
    /// `Closed` after [`Self::close`], `AlreadyStarted` while the poll task
    /// is running, otherwise whatever the first poll cycle failed with.
    pub async fn start(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        let mut tx_slot = self.snapshot_tx.lock().await;
        let Some(snapshot_tx) = tx_slot.take() else {
            return Err(Error::AlreadyStarted);
        };

        match poll_once(self.ledger.as_ref()).await {
            Ok(snapshot) => {
                self.stats.record_success();
                drop(snapshot_tx.send(Some(Arc::new(snapshot))));
            },
            Err(error) => {
                self.stats.record_failure(&error);
                *tx_slot = Some(snapshot_tx);
                return Err(error);
            },
        }

        let task = tokio::spawn(poll_loop(
            self.ledger.clone(),
            self.poll_interval,
            snapshot_tx,
            self.cancel.clone(),
            self.stats.clone(),
        ));
        *self.poll_task.lock().await = Some(task);

        Ok(())
    }

    /// Has at least one poll cycle succeeded (and the reader not been
    /// closed)?
    #[must_use]
    pub fn ready(&self) -> bool {
        !self.closed.load(Ordering::Acquire) && self.snapshot_rx.borrow().is_some()
    }

    /// Stop the poll task and release the reader.
    ///
    /// The task exits at its next suspension point; a partially-read cycle
    /// is discarded, never published.  Closing twice is harmless.  After
    /// closing, every read fails with `Closed`.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cancel.cancel();
        if let Some(task) = self.poll_task.lock().await.take() {
            if let Err(error) = task.await {
                error!(%error, "home chain reader poll task did not shut down cleanly");
            }
        }
        match serde_json::to_string(&self.stats.current()) {
            Ok(stats) => debug!(stats = %stats, "home chain reader closed"),
            Err(error) => error!(%error, "failed to serialize reader stats"),
        }
    }

    /// Poll statistics of this reader.
    #[must_use]
    pub fn stats(&self) -> ReaderStats {
        self.stats.current()
    }

    /// Config of one chain.
    ///
    /// # Errors
    ///
    /// `Closed` / `NotReady`, or not-found for an unknown selector.
    pub fn chain_config(&self, selector: ChainSelector) -> Result<ChainConfig> {
        self.current_snapshot()?
            .chain_config(selector)
            .cloned()
            .ok_or(Error::ChainConfigNotFound(selector))
    }

    /// All chain configs, keyed by selector.
    ///
    /// # Errors
    ///
    /// `Closed` / `NotReady`.
    pub fn all_chain_configs(&self) -> Result<BTreeMap<ChainSelector, ChainConfig>> {
        Ok(self.current_snapshot()?.chain_configs().clone())
    }

    /// Both config slots of one `(DON, plugin type)` pair.
    ///
    /// # Errors
    ///
    /// `Closed` / `NotReady`, or not-found for an unknown pair.
    pub fn ocr_configs(&self, don_id: DonId, plugin_type: PluginType) -> Result<ConfigSlots> {
        self.current_snapshot()?
            .ocr_configs(don_id, plugin_type)
            .cloned()
            .ok_or(Error::DonConfigNotFound(don_id, plugin_type))
    }

    /// The RMN home static/dynamic config pair.
    ///
    /// # Errors
    ///
    /// `Closed` / `NotReady`.
    pub fn rmn_home_config(&self) -> Result<(RmnHomeStaticConfig, RmnHomeDynamicConfig)> {
        let snapshot = self.current_snapshot()?;
        let (rmn_static, rmn_dynamic) = snapshot.rmn_home();
        Ok((rmn_static.clone(), rmn_dynamic.clone()))
    }

    /// Source chains supported by one peer.
    ///
    /// # Errors
    ///
    /// `Closed` / `NotReady`, or not-found for a peer outside the roster.
    pub fn supported_source_chains(&self, peer_id: PeerId) -> Result<HashSet<ChainSelector>> {
        self.current_snapshot()?
            .supported_source_chains(peer_id)
            .cloned()
            .ok_or(Error::NodeNotFound(peer_id))
    }

    /// Every chain the current snapshot knows about.
    ///
    /// # Errors
    ///
    /// `Closed` / `NotReady`.
    pub fn known_chains(&self) -> Result<Vec<ChainSelector>> {
        Ok(self.current_snapshot()?.known_chains())
    }

    /// The fault threshold of every configured chain.
    ///
    /// # Errors
    ///
    /// `Closed` / `NotReady`.
    pub fn f_chain(&self) -> Result<BTreeMap<ChainSelector, u8>> {
        Ok(self.current_snapshot()?.f_chain())
    }

    /// Node info records of the RMN roster, ascending by ordinal id.
    ///
    /// # Errors
    ///
    /// `Closed` / `NotReady`.
    pub fn rmn_nodes(&self) -> Result<Vec<NodeInfo>> {
        Ok(self.current_snapshot()?.nodes().to_vec())
    }

    /// Registered DONs, ascending by identifier.
    ///
    /// # Errors
    ///
    /// `Closed` / `NotReady`.
    pub fn dons(&self) -> Result<Vec<DonRecord>> {
        Ok(self.current_snapshot()?.dons().to_vec())
    }

    /// The currently published snapshot.
    fn current_snapshot(&self) -> Result<Arc<Snapshot>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed);
        }
        self.snapshot_rx.borrow().clone().ok_or(Error::NotReady)
    }
}

/// Read one full, self-consistent set of home chain state.
async fn poll_once(ledger: &dyn HomeLedger) -> Result<Snapshot> {
    let dons = ledger.list_dons().await?;

    let mut don_configs = HashMap::with_capacity(dons.len() * 2);
    for don in &dons {
        for plugin_type in PluginType::iter() {
            let slots = ledger.get_all_configs(don.id, plugin_type).await?;
            don_configs.insert((don.id, plugin_type), slots);
        }
    }

    let chain_configs = ledger.list_chain_configs().await?;
    let (rmn_static, rmn_dynamic) = ledger.get_rmn_home().await?;
    let nodes = project_node_info(&rmn_static, &rmn_dynamic, &chain_configs)?;

    Ok(Snapshot::new(
        dons,
        don_configs,
        chain_configs,
        rmn_static,
        rmn_dynamic,
        nodes,
    ))
}

/// Runs a [`HomeChainReader`] background poll task.
///
/// The task runs until it is cancelled or the reader is dropped.  Each tick
/// it reads the whole home chain state as one unit of work and publishes the
/// resulting snapshot; a failed cycle only logs, keeping the previously
/// published snapshot in place.
async fn poll_loop(
    ledger: Arc<dyn HomeLedger>, poll_interval: Duration,
    snapshot_tx: watch::Sender<Option<Arc<Snapshot>>>, cancel: CancellationToken,
    stats: StatsTracker,
) {
    'main: loop {
        tokio::select! {
            () = cancel.cancelled() => break 'main,
            () = snapshot_tx.closed() => break 'main,
            () = sleep(poll_interval) => {},
        }

        tokio::select! {
            () = cancel.cancelled() => break 'main,

            result = poll_once(ledger.as_ref()) => {
                match result {
                    Ok(snapshot) => {
                        stats.record_success();
                        if snapshot_tx.send(Some(Arc::new(snapshot))).is_err() {
                            break 'main;
                        }
                    },
                    Err(error) => {
                        stats.record_failure(&error);
                        error!(%error, "home chain poll cycle failed, serving the previous snapshot");
                    },
                }
            }
        }
    }

    debug!("home chain reader poll task shutdown");
}
