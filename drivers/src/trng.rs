/*++

Licensed under the Apache-2.0 license.

File Name:

    trng.rs

Abstract:

    File contains API for the TRNG core operated in DRNG, PTRNG and HRNG
    modes, including auto-proc (FIFO) mode.

--*/

use crate::trng_regs::*;
use crate::{cprintln, wait};
use asufw_error::{AsufwError, AsufwResult};

/// Bytes produced by one generate request (security strength).
pub const TRNG_SEC_STRENGTH_BYTES: usize = 32;
/// Personalization string length in bytes.
pub const TRNG_PERS_STRING_LEN: usize = 48;
pub const TRNG_MIN_DF_LENGTH: u8 = 2;
pub const TRNG_MAX_DF_LENGTH: u8 = 0x1f;
pub const TRNG_MIN_SEED_LIFE: u32 = 1;
pub const TRNG_MAX_SEED_LIFE: u32 = 0x80000;
pub const TRNG_MAX_ADAPT_CUTOFF: u16 = 0x3ff;
pub const TRNG_MAX_REP_CUTOFF: u16 = 0x1ff;

const BLOCK_LEN_BYTES: usize = 16;
const WORD_LEN_BYTES: usize = 4;
const BURST_WORDS: usize = 4;
const BURSTS_PER_GENERATE: usize = 2;
const FIFO_BLOCK_WORDS: u32 = (TRNG_SEC_STRENGTH_BYTES / WORD_LEN_BYTES) as u32;

const RESEED_TIMEOUT_US: u32 = 1_500_000;
const GENERATE_TIMEOUT_US: u32 = 1_500_000;
const RESET_DELAY_US: u32 = 10;
const DF_SHORT_DELAY_US: u32 = 4;
const DF_LONG_DELAY_US: u32 = 10;
const DF_BYTES_BEFORE_LONG_DELAY: usize = 8;

const DIT_DEFAULT: u8 = 0xc;
const AUTOPROC_NRNPS: u32 = 0x3f;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TrngMode {
    /// Deterministic, caller seeded
    Drng,
    /// Entropy source output only
    Ptrng,
    /// DRBG reseeded from the entropy source
    Hrng,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TrngState {
    Uninitialized,
    Instantiated,
    Reseeded,
    Generating,
    AutoProc,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TrngErrorState {
    Healthy,
    Unhealthy,
    Catastrophic,
    Error,
    StartupTest,
}

/// TRNG user configuration
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TrngUserConfig {
    pub mode: TrngMode,
    pub df_length: u8,
    pub seed_life: u32,
    pub adapt_prop_cutoff: u16,
    pub rep_count_cutoff: u16,
    /// Wait for the auto-proc FIFO instead of failing when it is empty.
    pub is_blocking: bool,
    pub pred_resistance: bool,
}

impl TrngUserConfig {
    pub const DEFAULT: Self = Self {
        mode: TrngMode::Hrng,
        df_length: 7,
        seed_life: 256,
        adapt_prop_cutoff: 645,
        rep_count_cutoff: 66,
        is_blocking: false,
        pred_resistance: false,
    };

    /// Seed length required by a DF length.
    pub const fn seed_len(df_length: u8) -> usize {
        (df_length as usize + 1) * BLOCK_LEN_BYTES
    }

    /// Range checks of the configuration and, in DRNG mode, the length of
    /// the caller's seed.
    pub fn check(&self, seed_len: Option<usize>) -> AsufwResult<()> {
        if !(TRNG_MIN_DF_LENGTH..=TRNG_MAX_DF_LENGTH).contains(&self.df_length) {
            return Err(AsufwError::TRNG_INVALID_DF_LENGTH);
        }
        if let Some(len) = seed_len {
            if len != Self::seed_len(self.df_length) {
                return Err(AsufwError::TRNG_INVALID_SEED_LENGTH);
            }
        }
        if !(TRNG_MIN_SEED_LIFE..=TRNG_MAX_SEED_LIFE).contains(&self.seed_life) {
            return Err(AsufwError::TRNG_INVALID_SEED_LIFE);
        }
        if self.mode != TrngMode::Drng {
            if !(1..=TRNG_MAX_ADAPT_CUTOFF).contains(&self.adapt_prop_cutoff) {
                return Err(AsufwError::TRNG_INVALID_ADAPT_CUTOFF);
            }
            if !(1..=TRNG_MAX_REP_CUTOFF).contains(&self.rep_count_cutoff) {
                return Err(AsufwError::TRNG_INVALID_REP_CUTOFF);
            }
        }
        Ok(())
    }
}

impl Default for TrngUserConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// TRNG instance
pub struct Trng<'a> {
    regs: &'a mut dyn TrngRegs,
    cfg: TrngUserConfig,
    state: TrngState,
    error_state: TrngErrorState,
    elapsed_seed_life: u32,
}

impl<'a> Trng<'a> {
    pub fn new(regs: &'a mut dyn TrngRegs) -> Self {
        Self {
            regs,
            cfg: TrngUserConfig::DEFAULT,
            state: TrngState::Uninitialized,
            error_state: TrngErrorState::StartupTest,
            elapsed_seed_life: 0,
        }
    }

    pub fn mode(&self) -> TrngMode {
        self.cfg.mode
    }

    pub fn state(&self) -> TrngState {
        self.state
    }

    pub fn error_state(&self) -> TrngErrorState {
        self.error_state
    }

    pub fn config(&self) -> &TrngUserConfig {
        &self.cfg
    }

    pub fn elapsed_seed_life(&self) -> u32 {
        self.elapsed_seed_life
    }

    /// Instantiate the TRNG
    ///
    /// # Arguments
    ///
    /// * `seed` - External seed, required in DRNG mode and forbidden otherwise
    /// * `pers` - Optional personalization string
    /// * `cfg` - User configuration
    ///
    /// # Returns
    ///
    /// * `AsufwResult<()>` - Ok when the core is instantiated (and reseeded
    ///   unless in PTRNG mode)
    pub fn instantiate(
        &mut self,
        seed: Option<&[u8]>,
        pers: Option<&[u8; TRNG_PERS_STRING_LEN]>,
        cfg: &TrngUserConfig,
    ) -> AsufwResult<()> {
        self.check_instantiate(seed, cfg)?;
        let result = self.instantiate_core(seed, pers, cfg);
        self.note_failure(&result);
        result
    }

    fn check_instantiate(&self, seed: Option<&[u8]>, cfg: &TrngUserConfig) -> AsufwResult<()> {
        match (cfg.mode, seed) {
            (TrngMode::Drng, None) | (TrngMode::Hrng | TrngMode::Ptrng, Some(_)) => {
                return Err(AsufwError::TRNG_INVALID_SEED_VALUE)
            }
            _ => {}
        }
        if self.state != TrngState::Uninitialized {
            return Err(AsufwError::TRNG_INVALID_STATE);
        }
        self.check_health()?;
        cfg.check(seed.map(<[u8]>::len))
    }

    fn instantiate_core(
        &mut self,
        seed: Option<&[u8]>,
        pers: Option<&[u8; TRNG_PERS_STRING_LEN]>,
        cfg: &TrngUserConfig,
    ) -> AsufwResult<()> {
        self.cfg = *cfg;
        self.elapsed_seed_life = 0;
        self.set_core();

        if cfg.mode != TrngMode::Drng {
            self.configure_health_tests(cfg);
        }
        self.state = TrngState::Instantiated;

        if cfg.mode != TrngMode::Ptrng {
            self.reseed_internal(seed, cfg.df_length, pers)?;
        }
        self.error_state = TrngErrorState::Healthy;
        Ok(())
    }

    /// Reseed the DRBG
    ///
    /// # Arguments
    ///
    /// * `seed` - External seed (DRNG mode only)
    /// * `df_length` - Derivation function length for this reseed
    pub fn reseed(&mut self, seed: Option<&[u8]>, df_length: u8) -> AsufwResult<()> {
        match (self.cfg.mode, seed) {
            (TrngMode::Drng, None) | (TrngMode::Hrng, Some(_)) => {
                return Err(AsufwError::TRNG_INVALID_SEED_VALUE)
            }
            _ => {}
        }
        Self::check_df_length(df_length)?;
        if self.cfg.mode == TrngMode::Ptrng {
            return Err(AsufwError::TRNG_INVALID_MODE);
        }
        match self.state {
            TrngState::Instantiated | TrngState::Reseeded | TrngState::Generating => {}
            TrngState::Uninitialized | TrngState::AutoProc => {
                return Err(AsufwError::TRNG_INVALID_STATE)
            }
        }
        self.check_health()?;
        if let Some(seed) = seed {
            if seed.len() != TrngUserConfig::seed_len(df_length) {
                return Err(AsufwError::TRNG_INVALID_SEED_LENGTH);
            }
        }

        let result = self.reseed_internal(seed, df_length, None);
        self.note_failure(&result);
        result
    }

    /// Generate random data
    ///
    /// # Arguments
    ///
    /// * `out` - Output buffer; 4 to 32 bytes, a multiple of 4
    /// * `pred_resistance` - Request prediction resistance
    ///
    /// # Returns
    ///
    /// * `AsufwResult<()>` - On failure `out` is zeroized
    ///
    /// State, buffer size, prediction resistance, health and reseed-required
    /// checks fail before the core is touched and leave the error state as
    /// it was. Only a failure inside the core moves the instance to
    /// `TrngErrorState::Error`.
    pub fn generate(&mut self, out: &mut [u8], pred_resistance: bool) -> AsufwResult<()> {
        let ready = match self.cfg.mode {
            TrngMode::Ptrng => matches!(
                self.state,
                TrngState::Instantiated | TrngState::Generating
            ),
            TrngMode::Drng | TrngMode::Hrng => {
                matches!(self.state, TrngState::Reseeded | TrngState::Generating)
            }
        };
        if !ready {
            return Err(AsufwError::TRNG_INVALID_STATE);
        }
        if out.is_empty()
            || out.len() > TRNG_SEC_STRENGTH_BYTES
            || out.len() % WORD_LEN_BYTES != 0
        {
            return Err(AsufwError::TRNG_INVALID_BUF_SIZE);
        }
        if self.cfg.mode == TrngMode::Ptrng && pred_resistance {
            return Err(AsufwError::TRNG_INVALID_PRED_RES_VALUE);
        }
        self.check_health()?;
        if self.cfg.mode == TrngMode::Drng
            && ((pred_resistance && self.elapsed_seed_life > 0)
                || self.elapsed_seed_life >= self.cfg.seed_life)
        {
            return Err(AsufwError::TRNG_RESEED_REQUIRED);
        }

        let result = self.generate_core(out, pred_resistance);
        if result.is_err() {
            out.fill(0);
        }
        self.note_failure(&result);
        result
    }

    fn generate_core(&mut self, out: &mut [u8], pred_resistance: bool) -> AsufwResult<()> {
        self.cfg.pred_resistance = pred_resistance;
        match self.cfg.mode {
            TrngMode::Hrng => {
                if self.elapsed_seed_life >= self.cfg.seed_life || pred_resistance {
                    self.reseed_internal(None, self.cfg.df_length, None)?;
                }
            }
            TrngMode::Ptrng => {
                self.regs.write(TRNG_OSC_EN, TRNG_OSC_EN_VAL);
                let mut ctrl = self.ctrl();
                ctrl.set_prngxs(false);
                ctrl.set_trssen(true);
                ctrl.set_eumode(true);
                self.set_ctrl(ctrl);
            }
            TrngMode::Drng => {}
        }

        self.collect_random_data(out)?;
        self.elapsed_seed_life += 1;
        self.state = TrngState::Generating;
        Ok(())
    }

    /// Uninstantiate the TRNG. Legal from any state.
    pub fn uninstantiate(&mut self) -> AsufwResult<()> {
        self.regs.write(TRNG_RESET, TRNG_RESET_ASSERT);
        self.regs.write(TRNG_OSC_EN, 0);
        self.cfg.pred_resistance = false;
        self.state = TrngState::Uninitialized;
        self.error_state = TrngErrorState::StartupTest;
        self.elapsed_seed_life = 0;
        Ok(())
    }

    /// Uninstantiate if needed and instantiate the default configuration in `mode`.
    pub fn init_and_cfg_mode(&mut self, mode: TrngMode) -> AsufwResult<()> {
        if mode == TrngMode::Drng {
            return Err(AsufwError::TRNG_INVALID_MODE);
        }
        if self.state == TrngState::AutoProc {
            self.disable_autoproc()?;
        } else if self.state != TrngState::Uninitialized {
            self.uninstantiate()?;
        }
        let cfg = TrngUserConfig {
            mode,
            ..TrngUserConfig::DEFAULT
        };
        self.check_instantiate(None, &cfg)?;
        let result = self.instantiate_core(None, None, &cfg);
        self.note_failure(&result);
        if result.is_err() {
            // Half configured core; leave it in reset.
            self.uninstantiate()?;
        }
        result
    }

    /// Switch the core to continuous generation into the output FIFO.
    pub fn enable_autoproc(&mut self) -> AsufwResult<()> {
        if self.state == TrngState::Uninitialized {
            return Err(AsufwError::TRNG_INVALID_STATE);
        }
        self.check_health()?;
        self.regs.write(TRNG_NRNPS, AUTOPROC_NRNPS);
        self.regs.write(TRNG_AUTOPROC, TRNG_AUTOPROC_ENABLE);
        self.state = TrngState::AutoProc;
        cprintln!("[trng] Auto-proc mode enabled");
        Ok(())
    }

    /// Leave auto-proc mode. The core ends uninstantiated.
    pub fn disable_autoproc(&mut self) -> AsufwResult<()> {
        if self.state != TrngState::AutoProc {
            return Err(AsufwError::TRNG_INVALID_STATE);
        }
        self.regs.write(TRNG_AUTOPROC, 0);
        let regs = &mut *self.regs;
        let result = wait::poll_until(GENERATE_TIMEOUT_US, AsufwError::TRNG_TIMEOUT, || {
            if regs.read(TRNG_AUTOPROC) & TRNG_AUTOPROC_ENABLE == 0 {
                return true;
            }
            regs.delay_us(1);
            false
        });
        if let Err(err) = result {
            self.error_state = TrngErrorState::Error;
            return Err(err);
        }
        self.regs.write(TRNG_INTR_STS, TRNG_INTR_STS_ALL);
        self.uninstantiate()
    }

    /// Number of 32-bit words waiting in the auto-proc FIFO.
    pub fn fifo_level(&mut self) -> u32 {
        self.regs.read(TRNG_NRN_AVAIL)
    }

    /// Whether the FIFO holds at least one full block of random data.
    pub fn is_random_num_available(&mut self) -> bool {
        self.fifo_level() >= FIFO_BLOCK_WORDS
    }

    /// Read one block of random data from the auto-proc FIFO.
    ///
    /// FIFO words are copied out in register (little-endian) byte order,
    /// unlike the CORE_OUTPUT words returned by `generate`.
    pub fn read_fifo(&mut self, out: &mut [u8]) -> AsufwResult<()> {
        if self.state != TrngState::AutoProc {
            return Err(AsufwError::TRNG_INVALID_STATE);
        }
        if out.len() != TRNG_SEC_STRENGTH_BYTES {
            return Err(AsufwError::TRNG_INVALID_BUF_SIZE);
        }
        self.check_health()?;
        if !self.is_random_num_available() {
            if !self.cfg.is_blocking {
                return Err(AsufwError::TRNG_RANDOM_NUM_NOT_AVAILABLE);
            }
            let regs = &mut *self.regs;
            wait::poll_until(GENERATE_TIMEOUT_US, AsufwError::TRNG_TIMEOUT, || {
                if regs.read(TRNG_NRN_AVAIL) >= FIFO_BLOCK_WORDS {
                    return true;
                }
                regs.delay_us(1);
                false
            })?;
        }
        for chunk in out.chunks_exact_mut(WORD_LEN_BYTES) {
            let word = self.regs.read_fifo();
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        Ok(())
    }

    /// Flag the instance unhealthy after a failed self test. Cleared by
    /// `uninstantiate`.
    pub fn mark_unhealthy(&mut self) {
        if self.error_state != TrngErrorState::Catastrophic {
            self.error_state = TrngErrorState::Unhealthy;
        }
    }

    fn check_health(&self) -> AsufwResult<()> {
        match self.error_state {
            TrngErrorState::Healthy | TrngErrorState::StartupTest => Ok(()),
            _ => Err(AsufwError::TRNG_UNHEALTHY_STATE),
        }
    }

    fn check_df_length(df_length: u8) -> AsufwResult<()> {
        if !(TRNG_MIN_DF_LENGTH..=TRNG_MAX_DF_LENGTH).contains(&df_length) {
            return Err(AsufwError::TRNG_INVALID_DF_LENGTH);
        }
        Ok(())
    }

    fn note_failure(&mut self, result: &AsufwResult<()>) {
        if let Err(err) = result {
            if self.error_state != TrngErrorState::Catastrophic {
                self.error_state = TrngErrorState::Error;
            }
            cprintln!("[trng] Operation failed, error=0x{:x}", u32::from(*err));
        }
    }

    fn ctrl(&mut self) -> TrngCtrl {
        TrngCtrl(self.regs.read(TRNG_CTRL))
    }

    fn set_ctrl(&mut self, ctrl: TrngCtrl) {
        self.regs.write(TRNG_CTRL, ctrl.0);
    }

    fn status(&mut self) -> TrngStatus {
        TrngStatus(self.regs.read(TRNG_STATUS))
    }

    /// Pulse the core and PRNG resets.
    fn set_core(&mut self) {
        self.regs.write(TRNG_RESET, TRNG_RESET_ASSERT);
        self.regs.delay_us(RESET_DELAY_US);
        self.regs.write(TRNG_RESET, 0);

        let mut ctrl = self.ctrl();
        ctrl.set_prngsrst(true);
        self.set_ctrl(ctrl);
        self.regs.delay_us(RESET_DELAY_US);
        ctrl.set_prngsrst(false);
        self.set_ctrl(ctrl);
    }

    fn configure_health_tests(&mut self, cfg: &TrngUserConfig) {
        let mut conf1 = TrngConf1(self.regs.read(TRNG_CONF1));
        conf1.set_adaptprop_cutoff(cfg.adapt_prop_cutoff);
        self.regs.write(TRNG_CONF1, conf1.0);

        let mut conf0 = TrngConf0(self.regs.read(TRNG_CONF0));
        conf0.set_repcount_cutoff(cfg.rep_count_cutoff);
        conf0.set_dit(DIT_DEFAULT);
        self.regs.write(TRNG_CONF0, conf0.0);
    }

    fn reseed_internal(
        &mut self,
        seed: Option<&[u8]>,
        df_length: u8,
        pers: Option<&[u8; TRNG_PERS_STRING_LEN]>,
    ) -> AsufwResult<()> {
        let mut conf1 = TrngConf1(self.regs.read(TRNG_CONF1));
        conf1.set_dlen(df_length);
        self.regs.write(TRNG_CONF1, conf1.0);

        if let Some(pers) = pers {
            self.write_pers_string(pers);
        }
        let mut ctrl = self.ctrl();
        ctrl.set_persodisable(pers.is_none());
        ctrl.set_prngstart(false);
        self.set_ctrl(ctrl);

        match seed {
            Some(seed) => {
                ctrl.set_prngmode(false);
                ctrl.set_tstmode(true);
                ctrl.set_trssen(true);
                self.set_ctrl(ctrl);
                ctrl.set_prngstart(true);
                self.set_ctrl(ctrl);
                self.write_seed(seed)?;
            }
            None => {
                self.regs.write(TRNG_OSC_EN, TRNG_OSC_EN_VAL);
                ctrl.set_prngmode(false);
                ctrl.set_prngxs(false);
                ctrl.set_trssen(true);
                self.set_ctrl(ctrl);
                ctrl.set_prngstart(true);
                self.set_ctrl(ctrl);
            }
        }

        self.wait_for_reseed()?;
        self.state = TrngState::Reseeded;
        self.elapsed_seed_life = 0;
        Ok(())
    }

    /// Words are loaded big-endian, last register first.
    fn write_pers_string(&mut self, pers: &[u8; TRNG_PERS_STRING_LEN]) {
        for (idx, word) in pers.chunks_exact(WORD_LEN_BYTES).enumerate() {
            let val = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
            self.regs
                .write(TRNG_PER_STRNG_11 - (idx * WORD_LEN_BYTES) as u32, val);
        }
    }

    /// Feed the seed MSB first, one bit per TEST register write.
    fn write_seed(&mut self, seed: &[u8]) -> AsufwResult<()> {
        for (idx, &byte) in seed.iter().enumerate() {
            let mut rebuilt = 0u8;
            for shift in (0..8).rev() {
                let bit = (byte >> shift) & 1;
                self.regs.write(TRNG_TEST, u32::from(bit) & TRNG_TEST_SEED_BIT);
                rebuilt = (rebuilt << 1) | bit;
            }
            if rebuilt != byte {
                return Err(AsufwError::TRNG_SEED_WRITE_FAILED);
            }
            self.regs.delay_us(DF_SHORT_DELAY_US);
            if idx % DF_BYTES_BEFORE_LONG_DELAY != 0 {
                self.regs.delay_us(DF_LONG_DELAY_US);
            }
        }
        Ok(())
    }

    fn wait_for_reseed(&mut self) -> AsufwResult<()> {
        let regs = &mut *self.regs;
        wait::poll_until(RESEED_TIMEOUT_US * 2, AsufwError::TRNG_TIMEOUT, || {
            if TrngStatus(regs.read(TRNG_STATUS)).done() {
                return true;
            }
            regs.delay_us(1);
            false
        })?;

        if self.status().certf() {
            self.error_state = TrngErrorState::Catastrophic;
            return Err(AsufwError::TRNG_CATASTROPHIC_CTF);
        }

        let mut ctrl = self.ctrl();
        ctrl.set_prngstart(false);
        ctrl.set_trssen(false);
        self.set_ctrl(ctrl);
        Ok(())
    }

    fn collect_random_data(&mut self, out: &mut [u8]) -> AsufwResult<()> {
        let mut ctrl = self.ctrl();
        ctrl.set_prngmode(true);
        ctrl.set_singlegenmode(self.cfg.pred_resistance);
        ctrl.set_prngstart(false);
        self.set_ctrl(ctrl);
        ctrl.set_prngstart(true);
        self.set_ctrl(ctrl);

        let out_words = out.len() / WORD_LEN_BYTES;
        for burst in 0..BURSTS_PER_GENERATE {
            let regs = &mut *self.regs;
            wait::poll_until(GENERATE_TIMEOUT_US, AsufwError::TRNG_TIMEOUT, || {
                if usize::from(TrngStatus(regs.read(TRNG_STATUS)).qcnt()) == BURST_WORDS {
                    return true;
                }
                regs.delay_us(1);
                false
            })?;

            if self.status().dtf() {
                self.error_state = TrngErrorState::Catastrophic;
                return Err(AsufwError::TRNG_CATASTROPHIC_DTF);
            }

            for idx in 0..BURST_WORDS {
                let word = self.regs.read(TRNG_CORE_OUTPUT);
                let word_idx = burst * BURST_WORDS + idx;
                if word_idx < out_words {
                    let offset = word_idx * WORD_LEN_BYTES;
                    out[offset..offset + WORD_LEN_BYTES]
                        .copy_from_slice(&word.swap_bytes().to_le_bytes());
                }
            }
        }
        Ok(())
    }
}
