/*++

Licensed under the Apache-2.0 license.

File Name:

    trng_regs.rs

Abstract:

    File contains the TRNG core register map and the register access
    interface implemented by the platform (silicon or emulator).

--*/

use bitfield::bitfield;

pub const TRNG_STATUS: u32 = 0x04;
pub const TRNG_CTRL: u32 = 0x08;
pub const TRNG_CONF0: u32 = 0x0c;
pub const TRNG_CONF1: u32 = 0x10;
pub const TRNG_TEST: u32 = 0x14;
pub const TRNG_PER_STRNG_0: u32 = 0x40;
pub const TRNG_PER_STRNG_11: u32 = 0x6c;
pub const TRNG_CORE_OUTPUT: u32 = 0xc0;
pub const TRNG_RESET: u32 = 0xd0;
pub const TRNG_OSC_EN: u32 = 0xd4;
pub const TRNG_NRN_AVAIL: u32 = 0x100;
pub const TRNG_NRNPS: u32 = 0x104;
pub const TRNG_AUTOPROC: u32 = 0x108;
pub const TRNG_INTR_STS: u32 = 0x10c;

pub const TRNG_RESET_ASSERT: u32 = 1;
pub const TRNG_OSC_EN_VAL: u32 = 1;
pub const TRNG_AUTOPROC_ENABLE: u32 = 1;
pub const TRNG_TEST_SEED_BIT: u32 = 1;
pub const TRNG_INTR_STS_ALL: u32 = 0x3;

bitfield! {
    /// TRNG status register
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    pub struct TrngStatus(u32);

    /// Reseed complete
    pub done, set_done: 0;

    /// Catastrophic data test failure
    pub dtf, set_dtf: 1;

    /// Catastrophic entropy (reseed) test failure
    pub certf, set_certf: 3;

    /// Words available in the current output burst
    pub u8, qcnt, set_qcnt: 11, 9;
}

bitfield! {
    /// TRNG control register
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    pub struct TrngCtrl(u32);

    /// PRNG soft reset
    pub prngsrst, set_prngsrst: 0;

    /// Entropy source enable
    pub trssen, set_trssen: 2;

    /// External seed select
    pub prngxs, set_prngxs: 3;

    /// Start reseed or generate
    pub prngstart, set_prngstart: 5;

    /// Seed is supplied through the TEST register
    pub tstmode, set_tstmode: 6;

    /// 1 = generate, 0 = reseed
    pub prngmode, set_prngmode: 7;

    /// Entropy source used as output (PTRNG)
    pub eumode, set_eumode: 8;

    /// One generate per reseed
    pub singlegenmode, set_singlegenmode: 9;

    /// Ignore the personalization string
    pub persodisable, set_persodisable: 10;
}

bitfield! {
    /// TRNG configuration register 0
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    pub struct TrngConf0(u32);

    /// Digitization interval
    pub u8, dit, set_dit: 4, 0;

    /// Repetition count test cutoff
    pub u16, repcount_cutoff, set_repcount_cutoff: 25, 17;
}

bitfield! {
    /// TRNG configuration register 1
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    pub struct TrngConf1(u32);

    /// Derivation function length in 128-bit blocks, minus one
    pub u8, dlen, set_dlen: 12, 8;

    /// Adaptive proportion test cutoff
    pub u16, adaptprop_cutoff, set_adaptprop_cutoff: 28, 19;
}

/// Register access to one TRNG core.
pub trait TrngRegs {
    fn read(&mut self, offset: u32) -> u32;

    fn write(&mut self, offset: u32, val: u32);

    /// Pop one word from the auto-proc output FIFO.
    fn read_fifo(&mut self) -> u32;

    fn delay_us(&mut self, us: u32);
}
