// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Consumer-side execution of deferred resource commands.

use crate::command_buffer::ResourceCommandBuffer;
use crate::fence::FenceCounter;
use garnet_core::{
    FenceId, GpuBackend, GpuCommand, GpuResourceHandle, NativeResourceId, ResourceError,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Executes drained commands against the concrete backend.
///
/// Owned and driven by exactly one consumer thread (native graphics devices
/// of this engine's generation have single-thread affinity), so it needs no
/// internal locking for the handle-to-native map.
///
/// A command has no failure state of its own: when a backend call fails the
/// failure is logged here and the command is still considered complete; the
/// queue keeps no record and nothing retries.
#[derive(Debug)]
pub struct CommandDispatcher {
    backend: Arc<dyn GpuBackend>,
    commands: Arc<ResourceCommandBuffer>,
    fence: Arc<FenceCounter>,
    natives: HashMap<GpuResourceHandle, NativeResourceId>,
}

impl CommandDispatcher {
    /// Creates a dispatcher draining `commands` into `backend`.
    pub fn new(
        backend: Arc<dyn GpuBackend>,
        commands: Arc<ResourceCommandBuffer>,
        fence: Arc<FenceCounter>,
    ) -> Self {
        Self {
            backend,
            commands,
            fence,
            natives: HashMap::new(),
        }
    }

    /// Drains and executes every command eligible at the current fence.
    /// Returns the number executed.
    pub fn dispatch_ready(&mut self) -> usize {
        let current = self.fence.current();
        let mut executed = 0;
        while let Some(command) = self.commands.pop_ready(current) {
            self.execute(command);
            executed += 1;
        }
        executed
    }

    /// Marks a unit of render work complete, releasing commands gated on the
    /// next fence value.
    pub fn advance_fence(&mut self) -> FenceId {
        self.fence.advance()
    }

    /// Number of commands still queued, eligible or not.
    pub fn pending(&self) -> usize {
        self.commands.len()
    }

    /// Number of live native objects this dispatcher has created.
    pub fn native_count(&self) -> usize {
        self.natives.len()
    }

    fn execute(&mut self, command: GpuCommand) {
        match command {
            GpuCommand::Create { handle, desc } => {
                match self.backend.create_resource(&desc) {
                    Ok(native) => {
                        if let Some(stale) = self.natives.insert(handle, native) {
                            // The slot was reused before its destroy reached
                            // us; the old native object must not leak.
                            log::warn!(
                                "{handle:?} recreated while native object {stale:?} was live; \
                                 destroying the old one"
                            );
                            if let Err(err) = self.backend.destroy_resource(stale) {
                                log::error!(
                                    "backend '{}' failed to destroy {stale:?}: {err}",
                                    self.backend.name()
                                );
                            }
                        }
                        log::trace!("created native object {native:?} for {handle:?}");
                    }
                    Err(err) => log::error!(
                        "backend '{}' failed to create {handle:?}: {err}",
                        self.backend.name()
                    ),
                }
            }
            GpuCommand::Update {
                handle,
                offset,
                data,
                flag,
            } => match self.natives.get(&handle) {
                Some(&native) => {
                    if let Err(err) = self.backend.update_resource(native, offset, &data, flag) {
                        log::error!(
                            "backend '{}' failed to update {handle:?}: {err}",
                            self.backend.name()
                        );
                    }
                    // `data` drops here, releasing the producer's deep copy.
                }
                None => log::error!("update targets {handle:?}, which has no native object"),
            },
            GpuCommand::Destroy { handle } => match self.natives.remove(&handle) {
                Some(native) => {
                    if let Err(err) = self.backend.destroy_resource(native) {
                        log::error!(
                            "backend '{}' failed to destroy {handle:?}: {err}",
                            self.backend.name()
                        );
                    }
                }
                None => log::debug!("destroy of {handle:?} ignored: no native object"),
            },
            GpuCommand::Readback { handle, reply } => {
                let result = match self.natives.get(&handle) {
                    Some(&native) => self
                        .backend
                        .read_back(native)
                        .map_err(ResourceError::from),
                    None => Err(ResourceError::StaleHandle(handle)),
                };
                if let Err(err) = &result {
                    log::error!("readback of {handle:?} failed: {err}");
                }
                if reply.send(result).is_err() {
                    log::debug!("readback receiver for {handle:?} dropped before the reply");
                }
            }
        }
    }
}

/// The consumer thread: drains eligible commands at a fixed cadence and
/// advances the draw fence once per tick.
///
/// Dropping the handle stops and joins the thread; [`stop`](Self::stop) does
/// the same explicitly.
#[derive(Debug)]
pub struct DispatchThread {
    shutdown: flume::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl DispatchThread {
    /// Spawns the consumer loop around `dispatcher`.
    ///
    /// Each tick executes everything eligible, then advances the fence: one
    /// tick is one unit of render progress.
    pub fn spawn(mut dispatcher: CommandDispatcher, poll_interval: Duration) -> Self {
        let (shutdown, signal) = flume::bounded::<()>(1);
        let join = thread::Builder::new()
            .name("garnet-dispatch".to_string())
            .spawn(move || {
                log::debug!(
                    "dispatch thread running against backend '{}'",
                    dispatcher.backend.name()
                );
                loop {
                    match signal.recv_timeout(poll_interval) {
                        Err(flume::RecvTimeoutError::Timeout) => {
                            dispatcher.dispatch_ready();
                            dispatcher.advance_fence();
                        }
                        Ok(()) | Err(flume::RecvTimeoutError::Disconnected) => break,
                    }
                }
                // Final drain so shutdown-time destroys still reach the
                // backend; commands gated on future fences are dropped.
                dispatcher.dispatch_ready();
                let abandoned = dispatcher.pending();
                if abandoned > 0 {
                    log::warn!(
                        "dispatch thread exiting with {abandoned} fence-blocked commands unexecuted"
                    );
                }
            })
            .expect("failed to spawn the garnet-dispatch thread");
        Self {
            shutdown,
            join: Some(join),
        }
    }

    /// Signals the loop to exit and joins it.
    pub fn stop(mut self) {
        self.shutdown_and_join();
    }

    fn shutdown_and_join(&mut self) {
        if let Some(join) = self.join.take() {
            // A full channel or a gone receiver both mean the loop is
            // already stopping.
            let _ = self.shutdown.try_send(());
            if join.join().is_err() {
                log::error!("dispatch thread panicked");
            }
        }
    }
}

impl Drop for DispatchThread {
    fn drop(&mut self) {
        self.shutdown_and_join();
    }
}
