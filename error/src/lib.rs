/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    File contains the error codes used across the firmware and the packed
    error status word returned with every command response.

--*/
#![cfg_attr(not(any(feature = "std", test)), no_std)]
use core::convert::From;
use core::num::NonZeroU32;

/// Width of one error slot in the status word.
pub const ERROR_SLOT_BITS: u32 = 10;
const ERROR_SLOT_MASK: u32 = (1 << ERROR_SLOT_BITS) - 1;

/// Firmware Error Type
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AsufwError(pub NonZeroU32);

/// Returned when a raw value cannot name an error code.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InvalidErrorCode(pub u32);

/// Macro to define error constants ensuring uniqueness
///
/// This macro takes a list of (name, value, doc) tuples and generates
/// constant definitions for each error code.
#[macro_export]
macro_rules! define_error_constants {
    ($(($name:ident, $value:expr, $doc:expr)),* $(,)?) => {
        $(
            #[doc = $doc]
            pub const $name: AsufwError = AsufwError::new_const($value);
        )*

        #[cfg(test)]
        /// Returns a vector of all defined error constants for testing uniqueness
        pub fn all_constants() -> Vec<(&'static str, u32)> {
            vec![
                $(
                    (stringify!($name), $value),
                )*
            ]
        }
    };
}

impl AsufwError {
    /// Create an error from const contexts only. A zero value or a value that
    /// does not fit one status word slot fails the build.
    const fn new_const(val: u32) -> Self {
        if val > ERROR_SLOT_MASK {
            panic!("AsufwError must fit in 10 bits");
        }
        match NonZeroU32::new(val) {
            Some(val) => Self(val),
            None => panic!("AsufwError cannot be 0"),
        }
    }

    define_error_constants![
        (INTERNAL, 0x001, "Internal error"),
        (MODULE_NOT_REGISTERED, 0x002, "Module is not registered"),
        (INVALID_COMMAND, 0x003, "Command id out of range for module"),
        (MODULE_TABLE_FULL, 0x004, "Module table capacity exhausted"),
        (
            MODULE_ALREADY_REGISTERED,
            0x005,
            "Module id registered twice"
        ),
        (QUEUE_FULL, 0x006, "No free request queue slot"),
        (DUPLICATE_REQ_ID, 0x007, "Request id already in flight"),
        (INVALID_PAYLOAD_LEN, 0x008, "Request payload length invalid"),
        (INVALID_PARAM, 0x009, "Invalid command parameter"),
        (RESOURCE_UNAVAILABLE, 0x010, "Resource is busy"),
        (
            RELEASE_NOT_ALLOWED,
            0x011,
            "Resource not owned by the releasing request"
        ),
        (DMA_ALLOCATION_FAILED, 0x012, "No idle DMA engine"),
        (
            RESOURCE_OWNER_MISMATCH,
            0x013,
            "Continuation chunk does not own the engine"
        ),
        (DMA_BUSY, 0x020, "DMA engine already running"),
        (DMA_TIMEOUT, 0x021, "DMA transfer did not complete in time"),
        (DMA_TRANSFER_FAILED, 0x022, "DMA transfer reported an error"),
        (DMA_INVALID_PARAM, 0x023, "Invalid DMA transfer parameter"),
        (SHA_INVALID_STATE, 0x040, "SHA operation out of order"),
        (SHA_INVALID_MODE, 0x041, "SHA mode not supported by engine"),
        (SHA_INVALID_PARAM, 0x042, "Invalid SHA parameter"),
        (SHA_TIMEOUT, 0x043, "SHA digest not ready in time"),
        (SHA_KAT_FAILED, 0x044, "SHA known answer test failed"),
        (SHA_INVALID_FLAGS, 0x045, "Invalid SHA operation flags"),
        (SHA_KAT_MISMATCH, 0x046, "SHA KAT digest mismatch"),
        (HMAC_INVALID_STATE, 0x050, "HMAC operation out of order"),
        (HMAC_INVALID_PARAM, 0x051, "Invalid HMAC parameter"),
        (HMAC_INVALID_KEY_LEN, 0x052, "Invalid HMAC key length"),
        (HMAC_KAT_FAILED, 0x053, "HMAC known answer test failed"),
        (HMAC_KAT_MISMATCH, 0x054, "HMAC KAT MAC mismatch"),
        (AES_INVALID_STATE, 0x060, "AES operation out of order"),
        (AES_INVALID_MODE, 0x061, "AES mode or direction not supported"),
        (AES_INVALID_PARAM, 0x062, "Invalid AES parameter"),
        (AES_KAT_FAILED, 0x063, "AES known answer test failed"),
        (AES_KAT_MISMATCH, 0x064, "AES KAT ciphertext mismatch"),
        (TRNG_INVALID_PARAM, 0x080, "Invalid TRNG parameter"),
        (
            TRNG_INVALID_SEED_VALUE,
            0x081,
            "Seed presence does not match the TRNG mode"
        ),
        (TRNG_INVALID_STATE, 0x082, "TRNG operation not legal in state"),
        (TRNG_UNHEALTHY_STATE, 0x083, "TRNG error state is not healthy"),
        (TRNG_INVALID_MODE, 0x084, "TRNG mode not valid for operation"),
        (TRNG_INVALID_DF_LENGTH, 0x085, "DF length out of range"),
        (TRNG_INVALID_SEED_LENGTH, 0x086, "Seed length mismatch"),
        (TRNG_INVALID_SEED_LIFE, 0x087, "Seed life out of range"),
        (
            TRNG_INVALID_ADAPT_CUTOFF,
            0x088,
            "Adaptive proportion cutoff out of range"
        ),
        (
            TRNG_INVALID_REP_CUTOFF,
            0x089,
            "Repetition count cutoff out of range"
        ),
        (TRNG_INVALID_BUF_SIZE, 0x08a, "Invalid random buffer size"),
        (
            TRNG_INVALID_PRED_RES_VALUE,
            0x08b,
            "Prediction resistance not supported in mode"
        ),
        (TRNG_RESEED_REQUIRED, 0x08c, "Reseed required before generate"),
        (TRNG_TIMEOUT, 0x08d, "TRNG completion wait timed out"),
        (TRNG_CATASTROPHIC_CTF, 0x08e, "Catastrophic reseed test failure"),
        (TRNG_CATASTROPHIC_DTF, 0x08f, "Catastrophic data test failure"),
        (TRNG_SEED_WRITE_FAILED, 0x090, "Seed bit-serial write mismatch"),
        (
            TRNG_RANDOM_NUM_NOT_AVAILABLE,
            0x091,
            "Auto-proc FIFO has no complete block"
        ),
        (TRNG_KAT_FAILED, 0x092, "TRNG known answer test failed"),
        (TRNG_KAT_MISMATCH, 0x093, "TRNG KAT output mismatch"),
    ];
}

impl From<core::num::NonZeroU32> for crate::AsufwError {
    fn from(val: core::num::NonZeroU32) -> Self {
        crate::AsufwError(val)
    }
}

impl From<AsufwError> for core::num::NonZeroU32 {
    fn from(val: AsufwError) -> Self {
        val.0
    }
}

impl From<AsufwError> for u32 {
    fn from(val: AsufwError) -> Self {
        core::num::NonZeroU32::from(val).get()
    }
}

impl TryFrom<u32> for AsufwError {
    type Error = InvalidErrorCode;
    fn try_from(val: u32) -> Result<Self, InvalidErrorCode> {
        if val > ERROR_SLOT_MASK {
            return Err(InvalidErrorCode(val));
        }
        match NonZeroU32::new(val) {
            Some(val) => Ok(AsufwError(val)),
            None => Err(InvalidErrorCode(val)),
        }
    }
}

pub type AsufwResult<T> = Result<T, AsufwError>;

/// Outcome of sanitizing a response or output buffer after a failure.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum BufStatus {
    #[default]
    Untouched,
    Cleared,
    ClearFailed,
}

impl BufStatus {
    const fn bits(self) -> u32 {
        match self {
            BufStatus::Untouched => 0b00,
            BufStatus::Cleared => 0b01,
            BufStatus::ClearFailed => 0b10,
        }
    }

    fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => BufStatus::Untouched,
            0b01 => BufStatus::Cleared,
            _ => BufStatus::ClearFailed,
        }
    }
}

/// Rolling status of one request.
///
/// Holds up to three errors: the first failure, the second one, and the most
/// recent one after that. Packs into the 32-bit status word:
///
/// * bits[9:0]   first error
/// * bits[19:10] second error
/// * bits[29:20] last error
/// * bits[31:30] buffer sanitization outcome
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct ErrorStatus {
    slots: [Option<AsufwError>; 3],
    buf: BufStatus,
}

impl ErrorStatus {
    pub const fn new() -> Self {
        Self {
            slots: [None; 3],
            buf: BufStatus::Untouched,
        }
    }

    /// Record a failure. The first two failures are kept; every later one
    /// replaces the last slot.
    pub fn push(&mut self, err: AsufwError) {
        match self.slots.iter().position(Option::is_none) {
            Some(idx) => self.slots[idx] = Some(err),
            None => self.slots[2] = Some(err),
        }
    }

    pub fn set_buf_status(&mut self, status: BufStatus) {
        self.buf = status;
    }

    pub fn buf_status(&self) -> BufStatus {
        self.buf
    }

    pub fn is_ok(&self) -> bool {
        self.slots[0].is_none()
    }

    pub fn first(&self) -> Option<AsufwError> {
        self.slots[0]
    }

    pub fn second(&self) -> Option<AsufwError> {
        self.slots[1]
    }

    pub fn last(&self) -> Option<AsufwError> {
        self.slots[2]
    }

    /// Most recently recorded error.
    pub fn latest(&self) -> Option<AsufwError> {
        self.slots.iter().rev().find_map(|e| *e)
    }

    pub fn to_word(&self) -> u32 {
        let mut word = 0;
        for (idx, slot) in self.slots.iter().enumerate() {
            if let Some(err) = slot {
                word |= (u32::from(*err) & ERROR_SLOT_MASK) << (idx as u32 * ERROR_SLOT_BITS);
            }
        }
        word | (self.buf.bits() << 30)
    }

    pub fn from_word(word: u32) -> Self {
        let mut slots = [None; 3];
        for (idx, slot) in slots.iter_mut().enumerate() {
            *slot = AsufwError::try_from((word >> (idx as u32 * ERROR_SLOT_BITS)) & ERROR_SLOT_MASK)
                .ok();
        }
        Self {
            slots,
            buf: BufStatus::from_bits(word >> 30),
        }
    }
}

impl From<ErrorStatus> for u32 {
    fn from(val: ErrorStatus) -> Self {
        val.to_word()
    }
}

/// Fold a failure into a request status and report a caller-level error in its place.
pub trait ResultExt<T> {
    fn chain_err(self, status: &mut ErrorStatus, outer: AsufwError) -> AsufwResult<T>;
}

impl<T> ResultExt<T> for AsufwResult<T> {
    fn chain_err(self, status: &mut ErrorStatus, outer: AsufwError) -> AsufwResult<T> {
        self.map_err(|err| {
            status.push(err);
            outer
        })
    }
}
