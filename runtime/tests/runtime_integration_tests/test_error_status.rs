// Licensed under the Apache-2.0 license

use crate::common::{boot, boot_with, exec, hdr, kat_vector, message, sha_op, DATA_ADDR};
use asufw_drivers::{AsufwError, BufStatus, ShaMode};
use asufw_emu_periph::EmuSoc;
use asufw_runtime::{sha, sha::StreamFlags, trng, ModuleId, ResourceKind, RuntimeConfig};
use sha2::{Digest, Sha512};
use zerocopy::IntoBytes;

#[test]
fn test_dma_timeout_force_release() {
    let mut soc = EmuSoc::new();
    let emu = soc.clone();
    soc.trng.add_known_answer(kat_vector());
    let config = RuntimeConfig {
        dma_wait_budget: 5,
        ..RuntimeConfig::default()
    };
    let mut rt = boot_with(&mut soc, config);
    let data = message(128);
    emu.memory.write(DATA_ADDR, &data);
    emu.dma[0].set_stall(true);

    let sha2 = hdr(ModuleId::Sha2, sha::cmd::OPERATION);
    let op = sha_op(DATA_ADDR, 128, ShaMode::Sha2_512, StreamFlags::all());
    rt.submit(sha2, 1, op.as_bytes()).unwrap();
    for _ in 0..5 {
        assert_eq!(rt.poll(), 0);
    }
    assert!(emu.dma[0].is_busy());
    assert_eq!(rt.poll(), 1);

    let resp = rt.take_response(1).unwrap();
    let status = resp.error_status();
    assert_eq!(status.first(), Some(AsufwError::DMA_TIMEOUT));
    assert_eq!(status.second(), None);
    assert_eq!(status.buf_status(), BufStatus::Untouched);
    assert_eq!(resp.status, 0x021);

    // Every engine the request held is idle again and usable.
    assert!(ResourceKind::ALL
        .iter()
        .all(|&kind| !rt.resources().is_busy(kind)));
    assert!(!emu.dma[0].is_busy());
    assert!(rt.drivers().sha2.is_idle());

    emu.dma[0].set_stall(false);
    let resp = exec(&mut rt, sha2, 2, op.as_bytes());
    assert!(resp.is_ok());
    assert_eq!(resp.data(), Sha512::digest(&data).as_slice());
}

#[test]
fn test_status_word_layout() {
    let mut soc = EmuSoc::new();
    let emu = soc.clone();
    let mut rt = boot(&mut soc);

    emu.sha3.set_stall(true);
    let resp = exec(&mut rt, hdr(ModuleId::Sha3, sha::cmd::KAT), 1, &[]);
    // SHA_TIMEOUT in bits[9:0], SHA_KAT_FAILED in bits[19:10].
    assert_eq!(resp.status, 0x043 | (0x044 << 10));
    assert_eq!(resp.len, 0);
}

#[test]
fn test_failed_response_is_sanitized() {
    let mut soc = EmuSoc::new();
    let emu = soc.clone();
    let mut rt = boot(&mut soc);

    emu.trng.set_stall(true);
    let resp = exec(
        &mut rt,
        hdr(ModuleId::Trng, trng::cmd::GET_RANDOM_BYTES),
        1,
        &[],
    );
    let status = resp.error_status();
    assert!(!status.is_ok());
    assert_eq!(status.buf_status(), BufStatus::Cleared);
    assert_eq!(resp.status >> 30, 0b01);
    assert_eq!(resp.len, 0);
    assert!(resp.data.iter().all(|&b| b == 0));
}
