// Licensed under the Apache-2.0 license

use asufw_drivers::{AesDirection, AesMode, ShaMode};
use asufw_emu_periph::{DrbgVector, EmuSoc, HOST_MEMORY_BASE};
use asufw_kat::{
    TRNG_KAT_DF_LENGTH, TRNG_KAT_EXPECTED, TRNG_KAT_PERS, TRNG_KAT_RESEED, TRNG_KAT_SEED,
};
use asufw_runtime::{
    aes::AesOperationReq, hmac::HmacComputeReq, sha::ShaOperationReq, sha::StreamFlags,
    DriverBackends, Drivers, ModuleId, RequestHeader, Response, Runtime, RuntimeConfig,
};
use sha2::Digest;

/// Message buffers in host memory.
pub const DATA_ADDR: u64 = HOST_MEMORY_BASE;
pub const KEY_ADDR: u64 = HOST_MEMORY_BASE + 0x8000;
pub const SEED_ADDR: u64 = HOST_MEMORY_BASE + 0xa000;
pub const PERS_ADDR: u64 = HOST_MEMORY_BASE + 0xb000;
pub const AES_OUT_ADDR: u64 = HOST_MEMORY_BASE + 0xc000;
/// First address past the emulated host memory window.
pub const UNMAPPED_ADDR: u64 = HOST_MEMORY_BASE + 0x2_0000;

pub fn boot_with(soc: &mut EmuSoc, config: RuntimeConfig) -> Runtime<'_> {
    let [dma0, dma1] = &mut soc.dma;
    let drivers = Drivers::new(DriverBackends {
        trng: &mut soc.trng,
        sha2: &mut soc.sha2,
        sha3: &mut soc.sha3,
        aes: &mut soc.aes,
        dma0,
        dma1,
    });
    Runtime::new(drivers, config).unwrap()
}

/// Output of the TRNG KAT sequence: instantiate with the KAT seed and
/// personalization, reseed, then one prediction resistant generate.
pub fn kat_vector() -> DrbgVector {
    DrbgVector {
        seeds: vec![TRNG_KAT_SEED.to_vec(), TRNG_KAT_RESEED.to_vec()],
        pers: Some(TRNG_KAT_PERS.to_vec()),
        df_length: TRNG_KAT_DF_LENGTH,
        pred_resistance: true,
        output: TRNG_KAT_EXPECTED.to_vec(),
    }
}

/// Boot with default configuration and the TRNG KAT answer registered, so
/// the health gate passes.
pub fn boot(soc: &mut EmuSoc) -> Runtime<'_> {
    soc.trng.add_known_answer(kat_vector());
    boot_with(soc, RuntimeConfig::default())
}

pub fn hdr(module: ModuleId, cmd: u8) -> RequestHeader {
    RequestHeader::new(module.into(), cmd)
}

/// Submit one request and poll until the dispatcher is idle.
pub fn exec(rt: &mut Runtime, header: RequestHeader, req_id: u32, payload: &[u8]) -> Response {
    rt.submit(header, req_id, payload).unwrap();
    assert!(rt.run_until_idle(100));
    rt.take_response(req_id).unwrap()
}

pub fn addr_lo(addr: u64) -> u32 {
    addr as u32
}

pub fn addr_hi(addr: u64) -> u32 {
    (addr >> 32) as u32
}

pub fn sha_op(addr: u64, size: usize, mode: ShaMode, flags: StreamFlags) -> ShaOperationReq {
    ShaOperationReq {
        data_addr_lo: addr_lo(addr),
        data_addr_hi: addr_hi(addr),
        data_size: size as u32,
        sha_mode: mode as u32,
        flags: flags.bits(),
    }
}

pub fn hmac_op(
    key_len: usize,
    msg_addr: u64,
    msg_len: usize,
    mode: ShaMode,
    flags: StreamFlags,
) -> HmacComputeReq {
    HmacComputeReq {
        key_addr_lo: addr_lo(KEY_ADDR),
        key_addr_hi: addr_hi(KEY_ADDR),
        key_len: key_len as u32,
        msg_addr_lo: addr_lo(msg_addr),
        msg_addr_hi: addr_hi(msg_addr),
        msg_len: msg_len as u32,
        sha_mode: mode as u32,
        flags: flags.bits(),
    }
}

pub fn aes_op(
    key: [u8; 32],
    iv: [u8; 16],
    size: usize,
    chunk_size: usize,
    mode: AesMode,
    dir: AesDirection,
) -> AesOperationReq {
    AesOperationReq {
        key,
        iv,
        src_addr_lo: addr_lo(DATA_ADDR),
        src_addr_hi: addr_hi(DATA_ADDR),
        dst_addr_lo: addr_lo(AES_OUT_ADDR),
        dst_addr_hi: addr_hi(AES_OUT_ADDR),
        data_size: size as u32,
        chunk_size: chunk_size as u32,
        mode: mode as u32,
        direction: dir as u32,
    }
}

pub fn message(len: usize) -> Vec<u8> {
    (0..len).map(|idx| (idx * 13 + 5) as u8).collect()
}

/// HMAC computed on the host with `D` and block length `block_len`.
pub fn reference_hmac<D: Digest>(block_len: usize, key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut k0 = if key.len() > block_len {
        D::digest(key).to_vec()
    } else {
        key.to_vec()
    };
    k0.resize(block_len, 0);

    let mut inner = D::new();
    inner.update(k0.iter().map(|b| b ^ 0x36).collect::<Vec<u8>>());
    inner.update(data);
    let inner = inner.finalize();

    let mut outer = D::new();
    outer.update(k0.iter().map(|b| b ^ 0x5c).collect::<Vec<u8>>());
    outer.update(inner);
    outer.finalize().to_vec()
}
