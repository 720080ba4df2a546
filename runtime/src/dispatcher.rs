/*++

Licensed under the Apache-2.0 license.

File Name:

    dispatcher.rs

Abstract:

    File contains the command dispatcher: the request queue, resource
    acquisition, handler invocation and resumption of requests waiting on
    a DMA transfer.

--*/

use crate::drivers::Env;
use crate::module::{CmdStatus, ModuleRegistry};
use crate::request::{Request, RequestHeader, Response, MAX_PAYLOAD_LEN};
use asufw_drivers::{cprintln, AsufwError, AsufwResult, DmaId, DmaStatus};

/// Number of request slots.
pub const QUEUE_DEPTH: usize = 8;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum SlotState {
    Free,
    /// Submitted, not yet dispatched
    Queued,
    /// Handler returned InProgress on `dma`
    Waiting { dma: DmaId, polls: u32 },
    /// Terminal response ready for the host
    Complete,
}

/// Host visible progress of a submitted request.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RequestState {
    Queued,
    /// Suspended on a DMA transfer
    Waiting,
    /// Response ready for `take_response`
    Complete,
}

struct Slot {
    state: SlotState,
    req: Request,
}

pub struct Dispatcher {
    slots: [Slot; QUEUE_DEPTH],
    dma_wait_budget: u32,
}

impl Dispatcher {
    /// # Arguments
    ///
    /// * `dma_wait_budget` - Polls a request may wait on its DMA engine
    ///   before it fails with `DMA_TIMEOUT`
    pub fn new(dma_wait_budget: u32) -> Self {
        Self {
            slots: core::array::from_fn(|_| Slot {
                state: SlotState::Free,
                req: Request::default(),
            }),
            dma_wait_budget,
        }
    }

    /// Queue a command.
    pub fn submit(
        &mut self,
        header: RequestHeader,
        req_id: u32,
        payload: &[u8],
    ) -> AsufwResult<()> {
        if self
            .slots
            .iter()
            .any(|slot| slot.state != SlotState::Free && slot.req.req_id() == req_id)
        {
            return Err(AsufwError::DUPLICATE_REQ_ID);
        }
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(AsufwError::INVALID_PAYLOAD_LEN);
        }
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.state == SlotState::Free)
            .ok_or(AsufwError::QUEUE_FULL)?;
        slot.req.start(header, req_id, payload)?;
        slot.state = SlotState::Queued;
        Ok(())
    }

    /// Run one scheduling pass: resume or time out waiting requests, then
    /// dispatch queued ones in slot order.
    ///
    /// # Returns
    ///
    /// * `usize` - Requests that reached their terminal response in this pass
    pub fn poll(&mut self, modules: &ModuleRegistry, env: &mut Env) -> usize {
        let budget = self.dma_wait_budget;
        let mut completed = 0;

        for slot in self.slots.iter_mut() {
            if let SlotState::Waiting { dma, polls } = slot.state {
                match env.drivers.dma(dma).status() {
                    DmaStatus::Busy if polls + 1 >= budget => {
                        cprintln!("[rt] DMA wait timed out, req_id={}", slot.req.req_id());
                        Self::terminate(slot, env, AsufwError::DMA_TIMEOUT);
                    }
                    DmaStatus::Busy => {
                        slot.state = SlotState::Waiting {
                            dma,
                            polls: polls + 1,
                        }
                    }
                    _ => {
                        let result = env
                            .drivers
                            .dma(dma)
                            .complete()
                            .and_then(|_| Self::invoke(modules, env, &mut slot.req));
                        Self::settle(slot, env, result);
                    }
                }
                if slot.state == SlotState::Complete {
                    completed += 1;
                }
            }
        }

        for slot in self.slots.iter_mut() {
            if slot.state == SlotState::Queued {
                let result = Self::dispatch(modules, env, &mut slot.req);
                Self::settle(slot, env, result);
                if slot.state == SlotState::Complete {
                    completed += 1;
                }
            }
        }
        completed
    }

    /// Hand out the terminal response of `req_id` and free its slot.
    pub fn take_response(&mut self, req_id: u32) -> Option<Response> {
        let slot = self
            .slots
            .iter_mut()
            .find(|slot| slot.state == SlotState::Complete && slot.req.req_id() == req_id)?;
        slot.state = SlotState::Free;
        Some(slot.req.to_response())
    }

    /// State of the slot holding `req_id`, or None once its response was
    /// taken.
    pub fn request_state(&self, req_id: u32) -> Option<RequestState> {
        let slot = self
            .slots
            .iter()
            .find(|slot| slot.state != SlotState::Free && slot.req.req_id() == req_id)?;
        match slot.state {
            SlotState::Free => None,
            SlotState::Queued => Some(RequestState::Queued),
            SlotState::Waiting { .. } => Some(RequestState::Waiting),
            SlotState::Complete => Some(RequestState::Complete),
        }
    }

    /// Requests queued or waiting on a transfer.
    pub fn pending(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot.state, SlotState::Queued | SlotState::Waiting { .. }))
            .count()
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == 0
    }

    fn dispatch(
        modules: &ModuleRegistry,
        env: &mut Env,
        req: &mut Request,
    ) -> AsufwResult<CmdStatus> {
        let hdr = req.header();
        cprintln!(
            "[rt] Received command module={} cmd={} req_id={} len={}",
            hdr.module_id(),
            hdr.command_id(),
            req.req_id(),
            req.args().len()
        );
        let (module, cmd) = modules.command(hdr.module_id(), hdr.command_id())?;
        (module.resource_handler)(env.resources, req, cmd.resources)?;
        (cmd.handler)(env, req)
    }

    /// Re-enter the handler of a request whose transfer completed.
    fn invoke(
        modules: &ModuleRegistry,
        env: &mut Env,
        req: &mut Request,
    ) -> AsufwResult<CmdStatus> {
        let hdr = req.header();
        let (_, cmd) = modules.command(hdr.module_id(), hdr.command_id())?;
        (cmd.handler)(env, req)
    }

    fn settle(slot: &mut Slot, env: &mut Env, result: AsufwResult<CmdStatus>) {
        match result {
            Ok(CmdStatus::Done) => slot.state = SlotState::Complete,
            Ok(CmdStatus::InProgress(dma)) => {
                slot.state = SlotState::Waiting { dma, polls: 0 }
            }
            Err(err) => Self::terminate(slot, env, err),
        }
    }

    /// Fail the request, force-release what it owns and reset those engines.
    fn terminate(slot: &mut Slot, env: &mut Env, err: AsufwError) {
        let req = &mut slot.req;
        req.fail(err);
        let released = env.resources.release_all(req.req_id());
        env.drivers.reset_released(released, *env.kat_status);
        req.dma = None;
        cprintln!(
            "[rt] Command failed req_id={} status=0x{:x}",
            req.req_id(),
            req.status.to_word()
        );
        slot.state = SlotState::Complete;
    }
}
