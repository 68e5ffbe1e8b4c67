use std::collections::HashMap;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TryRecvError};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};

use dcc_core::{Direction, Packet, SignalDriver};

use crate::config::{self, SchedulerConfig};
use crate::locomotive::Locomotive;

type BoundDriver = Arc<dyn SignalDriver + Send + Sync>;
type Registry = Arc<RwLock<HashMap<String, Locomotive>>>;

/// The scheduler: owns the signal driver, the locomotive registry, the
/// run loop, and the channels used to mutate it from other threads.
///
/// All public operations are safe to call concurrently from arbitrary
/// threads; the run loop itself executes on a dedicated thread spawned by
/// [`Controller::start`]. The registry is read-heavy: readers (the run
/// loop, [`Controller::get`], [`Controller::list`]) proceed in parallel,
/// writers ([`Controller::add`], [`Controller::remove`]) exclude all
/// other access.
pub struct Controller {
    driver: BoundDriver,
    locomotives: Registry,
    command_tx: SyncSender<Packet>,
    command_rx: Mutex<Option<Receiver<Packet>>>,
    shutdown_tx: SyncSender<()>,
    shutdown_rx: Mutex<Option<Receiver<()>>>,
    done_tx: SyncSender<()>,
    done_rx: Mutex<Option<Receiver<()>>>,
    scheduler: SchedulerConfig,
    run_handle: Mutex<Option<JoinHandle<()>>>,
    started: Mutex<bool>,
}

impl Controller {
    /// Creates a controller bound to `driver`, with an empty registry and
    /// stopped run loop. Callers that need to keep inspecting the driver
    /// (e.g. tests using a dummy driver) should hold on to their own clone
    /// of the `Arc` before passing it in.
    pub fn new(driver: BoundDriver) -> Self {
        let scheduler = config::current();
        let (command_tx, command_rx) = sync_channel(scheduler.command_max_queue);
        let (shutdown_tx, shutdown_rx) = sync_channel(0);
        let (done_tx, done_rx) = sync_channel(0);
        Self {
            driver,
            locomotives: Arc::new(RwLock::new(HashMap::new())),
            command_tx,
            command_rx: Mutex::new(Some(command_rx)),
            shutdown_tx,
            shutdown_rx: Mutex::new(Some(shutdown_rx)),
            done_tx,
            done_rx: Mutex::new(Some(done_rx)),
            scheduler,
            run_handle: Mutex::new(None),
            started: Mutex::new(false),
        }
    }

    /// Inserts or replaces a locomotive by name, binding it to this
    /// controller's driver and (re)building its cached packets. Visible to
    /// the run loop no later than its next iteration.
    pub fn add(&self, mut loco: Locomotive) {
        loco.bind_driver(Some(self.driver.clone()));
        log::info!("tracking locomotive {}", loco.name());
        let mut registry = self.locomotives.write().unwrap();
        registry.insert(loco.name().to_string(), loco);
    }

    /// Removes a locomotive by name. No-op if it isn't tracked.
    pub fn remove(&self, name: &str) {
        let mut registry = self.locomotives.write().unwrap();
        if registry.remove(name).is_some() {
            log::info!("dropped locomotive {name}");
        }
    }

    /// Returns the signal driver this controller is bound to, so callers
    /// can construct one-shot packets (e.g. for [`Controller::command`])
    /// that will actually reach the track.
    pub fn driver(&self) -> BoundDriver {
        self.driver.clone()
    }

    /// Returns a snapshot of the locomotive with this name, if tracked.
    pub fn get(&self, name: &str) -> Option<Locomotive> {
        self.locomotives.read().unwrap().get(name).cloned()
    }

    /// Returns an independent snapshot of all tracked locomotives.
    /// Mutating the returned vector never affects the live registry.
    pub fn list(&self) -> Vec<Locomotive> {
        self.locomotives.read().unwrap().values().cloned().collect()
    }

    /// Enqueues a one-shot packet to be sent `CommandRepeat` times by the
    /// run loop. Blocks if the command channel is full. If the controller
    /// hasn't been started yet, sends the packet inline instead.
    pub fn command(&self, packet: Packet) {
        if !*self.started.lock().unwrap() {
            for _ in 0..self.scheduler.command_repeat {
                packet.send();
            }
            return;
        }
        if self.command_tx.send(packet).is_err() {
            log::warn!("command channel closed, dropping packet");
        }
    }

    /// Energizes the tracks and spawns the run loop thread. No-op if
    /// already started.
    pub fn start(&self) {
        let mut started = self.started.lock().unwrap();
        if *started {
            log::warn!("start() called while already running, ignoring");
            return;
        }

        let command_rx = self
            .command_rx
            .lock()
            .unwrap()
            .take()
            .expect("command receiver already taken");
        let shutdown_rx = self
            .shutdown_rx
            .lock()
            .unwrap()
            .take()
            .expect("shutdown receiver already taken");
        let done_tx = self.done_tx.clone();
        let driver = self.driver.clone();
        let locomotives = self.locomotives.clone();
        let scheduler = self.scheduler;

        driver.tracks_on();
        let handle = thread::spawn(move || {
            run_loop(driver, locomotives, command_rx, shutdown_rx, done_tx, scheduler);
        });
        *self.run_handle.lock().unwrap() = Some(handle);
        *started = true;
    }

    /// If started: signals shutdown, waits for the run loop's
    /// acknowledgement, and marks the controller stopped. No-op otherwise.
    pub fn stop(&self) {
        let mut started = self.started.lock().unwrap();
        if !*started {
            return;
        }
        let _ = self.shutdown_tx.send(());
        if let Some(rx) = self.done_rx.lock().unwrap().as_ref() {
            let _ = rx.recv();
        }
        if let Some(handle) = self.run_handle.lock().unwrap().take() {
            let _ = handle.join();
        }
        *started = false;
        log::info!("controller stopped, tracks off");
    }
}

fn run_loop(
    driver: BoundDriver,
    locomotives: Registry,
    command_rx: Receiver<Packet>,
    shutdown_rx: Receiver<()>,
    done_tx: SyncSender<()>,
    scheduler: SchedulerConfig,
) {
    let idle = Packet::broadcast_idle(Some(driver.clone()));
    let stop = Packet::broadcast_stop(Some(driver.clone()), Direction::Forward, false, true);

    loop {
        match shutdown_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                for _ in 0..scheduler.command_repeat {
                    stop.send();
                }
                driver.tracks_off();
                let _ = done_tx.send(());
                return;
            }
            Err(TryRecvError::Empty) => {}
        }

        match command_rx.try_recv() {
            Ok(packet) => {
                for _ in 0..scheduler.command_repeat {
                    packet.send();
                }
                continue;
            }
            Err(TryRecvError::Disconnected) => {}
            Err(TryRecvError::Empty) => {}
        }

        let registry = locomotives.read().unwrap();
        if registry.is_empty() {
            idle.send();
        } else {
            for loco in registry.values() {
                loco.send_repeated(scheduler.command_repeat);
            }
        }
        drop(registry);
        idle.packet_pause();
    }
}
