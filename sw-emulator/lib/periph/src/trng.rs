/*++

Licensed under the Apache-2.0 license.

File Name:

    trng.rs

Abstract:

    File contains the emulated TRNG core: reseed through the TEST register
    or the entropy source, burst generation, health test fail flags and
    the auto-proc output FIFO.

--*/

mod ctr_drbg;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use asufw_drivers::trng_regs::*;
use asufw_drivers::TrngRegs;
use ctr_drbg::{CtrDrbg, BLOCK_LEN_BYTES};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

const PERS_WORDS: usize = 12;
const BURST_WORDS: usize = 4;
const GENERATE_WORDS: usize = 8;
const FIFO_CAPACITY_WORDS: usize = 64;
const DEFAULT_LATENCY: u32 = 3;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum Reseed {
    Idle,
    /// Collecting seed bits through the TEST register
    Collecting,
    /// Completes after this many STATUS reads
    Pending(u32),
    Complete,
}

/// Output the core produces for one DRBG sequence, as measured on silicon.
///
/// A vector applies to the first generate after its last seed when the
/// seeds consumed since the core left reset, the personalization string
/// mixed into the first of them, the DF length and the single generate
/// mode all match. Any other sequence gets the model's own DRBG output.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct DrbgVector {
    /// Instantiate seed followed by any reseed seeds, in order
    pub seeds: Vec<Vec<u8>>,
    /// Personalization string as firmware supplies it
    pub pers: Option<Vec<u8>>,
    pub df_length: u8,
    pub pred_resistance: bool,
    pub output: Vec<u8>,
}

struct SeedRecord {
    seed: Vec<u8>,
    pers: Option<[u32; PERS_WORDS]>,
}

/// Personalization bytes in firmware order; the first word sits in
/// PER_STRNG_11.
fn pers_bytes(words: &[u32; PERS_WORDS]) -> Vec<u8> {
    words.iter().rev().flat_map(|word| word.to_be_bytes()).collect()
}

struct TrngModel {
    in_reset: bool,
    ctrl: TrngCtrl,
    conf0: TrngConf0,
    conf1: TrngConf1,
    osc_en: bool,
    pers: [u32; PERS_WORDS],

    reseed: Reseed,
    seed: Vec<u8>,
    bit_acc: u8,
    bit_count: u8,
    last_seed: Vec<u8>,
    last_pers: Option<[u32; PERS_WORDS]>,
    history: Vec<SeedRecord>,
    fresh_seed: bool,
    known_answers: Vec<DrbgVector>,

    drbg: CtrDrbg,
    entropy: StdRng,
    output: VecDeque<u32>,
    certf: bool,
    dtf: bool,

    autoproc: bool,
    nrnps: u32,
    fifo: VecDeque<u32>,

    latency: u32,
    inject_ctf: bool,
    inject_dtf: bool,
    stall: bool,
    delay_us: u64,
    reseeds: u32,
    generates: u32,
}

impl TrngModel {
    fn new() -> Self {
        Self {
            in_reset: true,
            ctrl: TrngCtrl(0),
            conf0: TrngConf0(0),
            conf1: TrngConf1(0),
            osc_en: false,
            pers: [0; PERS_WORDS],
            reseed: Reseed::Idle,
            seed: vec![],
            bit_acc: 0,
            bit_count: 0,
            last_seed: vec![],
            last_pers: None,
            history: vec![],
            fresh_seed: false,
            known_answers: vec![],
            drbg: CtrDrbg::new(),
            entropy: StdRng::seed_from_u64(0x7265_6e67),
            output: VecDeque::new(),
            certf: false,
            dtf: false,
            autoproc: false,
            nrnps: 0,
            fifo: VecDeque::new(),
            latency: DEFAULT_LATENCY,
            inject_ctf: false,
            inject_dtf: false,
            stall: false,
            delay_us: 0,
            reseeds: 0,
            generates: 0,
        }
    }

    fn seed_len(&self) -> usize {
        (usize::from(self.conf1.dlen()) + 1) * BLOCK_LEN_BYTES
    }

    fn clear_drbg(&mut self) {
        self.drbg.uninstantiate();
        self.history.clear();
        self.fresh_seed = false;
    }

    fn reset_core(&mut self) {
        self.clear_drbg();
        self.ctrl = TrngCtrl(0);
        self.reseed = Reseed::Idle;
        self.seed.clear();
        self.bit_acc = 0;
        self.bit_count = 0;
        self.output.clear();
        self.certf = false;
        self.dtf = false;
        self.autoproc = false;
        self.fifo.clear();
    }

    fn status(&mut self) -> u32 {
        if let Reseed::Pending(polls) = self.reseed {
            if !self.stall {
                self.reseed = match polls {
                    0 => Reseed::Complete,
                    n => Reseed::Pending(n - 1),
                };
            }
        }
        let mut status = TrngStatus(0);
        status.set_done(self.reseed == Reseed::Complete);
        status.set_certf(self.certf);
        status.set_dtf(self.dtf);
        if !self.stall {
            status.set_qcnt(self.output.len().min(BURST_WORDS) as u8);
        }
        status.0
    }

    fn write_ctrl(&mut self, val: u32) {
        let old = self.ctrl;
        let new = TrngCtrl(val);
        self.ctrl = new;
        if self.in_reset {
            return;
        }
        if new.prngsrst() {
            self.clear_drbg();
            self.output.clear();
            self.reseed = Reseed::Idle;
            return;
        }
        if !new.prngstart() {
            if self.reseed == Reseed::Complete {
                self.reseed = Reseed::Idle;
            }
            return;
        }
        if old.prngstart() {
            return;
        }
        if new.prngmode() {
            self.start_generate();
        } else if new.tstmode() {
            self.seed.clear();
            self.bit_acc = 0;
            self.bit_count = 0;
            self.reseed = Reseed::Collecting;
        } else if new.trssen() && self.osc_en {
            let mut seed = vec![0u8; self.seed_len()];
            self.entropy.fill_bytes(&mut seed);
            self.complete_reseed(seed);
        }
    }

    fn write_test(&mut self, val: u32) {
        if self.reseed != Reseed::Collecting {
            return;
        }
        self.bit_acc = (self.bit_acc << 1) | (val & TRNG_TEST_SEED_BIT) as u8;
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.seed.push(self.bit_acc);
            self.bit_acc = 0;
            self.bit_count = 0;
            if self.seed.len() == self.seed_len() {
                let seed = std::mem::take(&mut self.seed);
                self.complete_reseed(seed);
            }
        }
    }

    fn complete_reseed(&mut self, seed: Vec<u8>) {
        self.reseeds += 1;
        if self.inject_ctf {
            self.inject_ctf = false;
            self.certf = true;
        } else {
            let mut material = seed.clone();
            if !self.ctrl.persodisable() {
                for word in self.pers.iter() {
                    material.extend_from_slice(&word.to_be_bytes());
                }
                self.last_pers = Some(self.pers);
            } else {
                self.last_pers = None;
            }
            self.drbg.reseed(&material);
            self.history.push(SeedRecord {
                seed: seed.clone(),
                pers: self.last_pers,
            });
            self.fresh_seed = true;
        }
        self.last_seed = seed;
        self.reseed = Reseed::Pending(self.latency);
    }

    fn start_generate(&mut self) {
        self.generates += 1;
        self.output.clear();
        if self.inject_dtf {
            self.inject_dtf = false;
            self.dtf = true;
        }
        let mut block = [0u8; GENERATE_WORDS * 4];
        if self.ctrl.eumode() {
            self.entropy.fill_bytes(&mut block);
        } else {
            self.drbg.generate(&mut block);
            if let Some(answer) = self.known_answer() {
                let len = answer.output.len().min(block.len());
                block[..len].copy_from_slice(&answer.output[..len]);
            }
            self.fresh_seed = false;
        }
        for chunk in block.chunks_exact(4) {
            self.output
                .push_back(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
    }

    fn known_answer(&self) -> Option<&DrbgVector> {
        if !self.fresh_seed {
            return None;
        }
        let pers = self
            .history
            .first()
            .and_then(|first| first.pers.as_ref())
            .map(pers_bytes);
        self.known_answers.iter().find(|vector| {
            vector.df_length == self.conf1.dlen()
                && vector.pred_resistance == self.ctrl.singlegenmode()
                && vector.pers == pers
                && vector.seeds.len() == self.history.len()
                && vector
                    .seeds
                    .iter()
                    .zip(self.history.iter())
                    .all(|(seed, record)| *seed == record.seed)
        })
    }

    fn refill_fifo(&mut self) {
        if !self.autoproc || self.in_reset {
            return;
        }
        while self.fifo.len() + GENERATE_WORDS <= FIFO_CAPACITY_WORDS {
            let mut block = [0u8; GENERATE_WORDS * 4];
            self.drbg.generate(&mut block);
            for chunk in block.chunks_exact(4) {
                self.fifo
                    .push_back(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
            }
        }
    }
}

/// Emulated TRNG core. Clones share the same core, so tests keep a handle
/// for fault injection while firmware owns another.
#[derive(Clone)]
pub struct EmuTrng {
    model: Rc<RefCell<TrngModel>>,
}

impl Default for EmuTrng {
    fn default() -> Self {
        Self::new()
    }
}

impl EmuTrng {
    pub fn new() -> Self {
        Self {
            model: Rc::new(RefCell::new(TrngModel::new())),
        }
    }

    /// Register the silicon output of a DRBG sequence. Registrations
    /// persist across resets.
    pub fn add_known_answer(&self, vector: DrbgVector) {
        self.model.borrow_mut().known_answers.push(vector);
    }

    pub fn clear_known_answers(&self) {
        self.model.borrow_mut().known_answers.clear();
    }

    /// Words currently queued in the auto-proc FIFO, oldest first.
    pub fn fifo_words(&self) -> Vec<u32> {
        let mut model = self.model.borrow_mut();
        model.refill_fifo();
        model.fifo.iter().copied().collect()
    }

    /// Raise CERTF on the next reseed.
    pub fn inject_ctf(&self) {
        self.model.borrow_mut().inject_ctf = true;
    }

    /// Raise DTF on the next generate.
    pub fn inject_dtf(&self) {
        self.model.borrow_mut().inject_dtf = true;
    }

    /// Stop reporting completion of reseeds and bursts.
    pub fn set_stall(&self, stall: bool) {
        self.model.borrow_mut().stall = stall;
    }

    pub fn set_latency(&self, polls: u32) {
        self.model.borrow_mut().latency = polls;
    }

    /// Seed bytes consumed by the last reseed.
    pub fn last_seed(&self) -> Vec<u8> {
        self.model.borrow().last_seed.clone()
    }

    /// Personalization words mixed into the last reseed, if enabled.
    pub fn last_pers(&self) -> Option<[u32; PERS_WORDS]> {
        self.model.borrow().last_pers
    }

    pub fn df_length(&self) -> u8 {
        self.model.borrow().conf1.dlen()
    }

    pub fn adapt_cutoff(&self) -> u16 {
        self.model.borrow().conf1.adaptprop_cutoff()
    }

    pub fn rep_cutoff(&self) -> u16 {
        self.model.borrow().conf0.repcount_cutoff()
    }

    pub fn osc_enabled(&self) -> bool {
        self.model.borrow().osc_en
    }

    pub fn autoproc_enabled(&self) -> bool {
        self.model.borrow().autoproc
    }

    pub fn reseed_count(&self) -> u32 {
        self.model.borrow().reseeds
    }

    pub fn generate_count(&self) -> u32 {
        self.model.borrow().generates
    }

    /// Total requested delay in microseconds.
    pub fn elapsed_delay_us(&self) -> u64 {
        self.model.borrow().delay_us
    }
}

impl TrngRegs for EmuTrng {
    fn read(&mut self, offset: u32) -> u32 {
        let mut model = self.model.borrow_mut();
        match offset {
            TRNG_STATUS => model.status(),
            TRNG_CTRL => model.ctrl.0,
            TRNG_CONF0 => model.conf0.0,
            TRNG_CONF1 => model.conf1.0,
            TRNG_CORE_OUTPUT => model.output.pop_front().unwrap_or(0),
            TRNG_RESET => u32::from(model.in_reset),
            TRNG_OSC_EN => u32::from(model.osc_en),
            TRNG_NRN_AVAIL => {
                model.refill_fifo();
                model.fifo.len() as u32
            }
            TRNG_NRNPS => model.nrnps,
            TRNG_AUTOPROC => u32::from(model.autoproc),
            TRNG_INTR_STS => u32::from(!model.fifo.is_empty()),
            TRNG_PER_STRNG_0..=TRNG_PER_STRNG_11 => {
                model.pers[((offset - TRNG_PER_STRNG_0) / 4) as usize]
            }
            _ => 0,
        }
    }

    fn write(&mut self, offset: u32, val: u32) {
        let mut model = self.model.borrow_mut();
        match offset {
            TRNG_CTRL => model.write_ctrl(val),
            TRNG_CONF0 => model.conf0 = TrngConf0(val),
            TRNG_CONF1 => model.conf1 = TrngConf1(val),
            TRNG_TEST => model.write_test(val),
            TRNG_RESET => {
                model.in_reset = val & TRNG_RESET_ASSERT != 0;
                if model.in_reset {
                    model.reset_core();
                }
            }
            TRNG_OSC_EN => model.osc_en = val & TRNG_OSC_EN_VAL != 0,
            TRNG_NRNPS => model.nrnps = val,
            TRNG_AUTOPROC => {
                model.autoproc = val & TRNG_AUTOPROC_ENABLE != 0 && !model.in_reset;
                if !model.autoproc {
                    model.fifo.clear();
                }
            }
            TRNG_PER_STRNG_0..=TRNG_PER_STRNG_11 => {
                model.pers[((offset - TRNG_PER_STRNG_0) / 4) as usize] = val;
            }
            _ => {}
        }
    }

    fn read_fifo(&mut self) -> u32 {
        let mut model = self.model.borrow_mut();
        model.refill_fifo();
        model.fifo.pop_front().unwrap_or(0)
    }

    fn delay_us(&mut self, us: u32) {
        self.model.borrow_mut().delay_us += u64::from(us);
    }
}
