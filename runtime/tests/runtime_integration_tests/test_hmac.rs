// Licensed under the Apache-2.0 license

use crate::common::{
    boot, exec, hdr, hmac_op, message, reference_hmac, sha_op, DATA_ADDR, KEY_ADDR,
};
use asufw_drivers::{AsufwError, ShaMode, HMAC_MAX_KEY_LEN};
use asufw_emu_periph::EmuSoc;
use asufw_runtime::{hmac, sha, sha::StreamFlags, KatStatus, ModuleId, ResourceKind};
use sha3::Sha3_384;
use zerocopy::IntoBytes;

#[test]
fn test_hmac_one_shot() {
    let mut soc = EmuSoc::new();
    let emu = soc.clone();
    let mut rt = boot(&mut soc);
    // RFC 4231, test case 1
    emu.memory.write(KEY_ADDR, &[0x0b; 20]);
    emu.memory.write(DATA_ADDR, b"Hi There");

    let op = hmac_op(20, DATA_ADDR, 8, ShaMode::Sha2_256, StreamFlags::all());
    let resp = exec(
        &mut rt,
        hdr(ModuleId::Hmac, hmac::cmd::COMPUTE),
        1,
        op.as_bytes(),
    );
    assert!(resp.is_ok());
    assert_eq!(
        resp.data(),
        [
            0xb0, 0x34, 0x4c, 0x61, 0xd8, 0xdb, 0x38, 0x53, 0x5c, 0xa8, 0xaf, 0xce, 0xaf, 0x0b,
            0xf1, 0x2b, 0x88, 0x1d, 0xc2, 0x00, 0xc9, 0x83, 0x3d, 0xa7, 0x26, 0xe9, 0x37, 0x6c,
            0x2e, 0x32, 0xcf, 0xf7,
        ]
    );
    assert!(rt.drivers().hmac.is_idle());
    assert!(ResourceKind::ALL
        .iter()
        .all(|&kind| !rt.resources().is_busy(kind)));
}

#[test]
fn test_hmac_streaming_sha3() {
    let mut soc = EmuSoc::new();
    let emu = soc.clone();
    let mut rt = boot(&mut soc);
    let key = message(150);
    let data = message(600);
    emu.memory.write(KEY_ADDR, &key);
    emu.memory.write(DATA_ADDR, &data);
    let compute = hdr(ModuleId::Hmac, hmac::cmd::COMPUTE);
    let mode = ShaMode::Sha3_384;

    let flags = StreamFlags::INIT | StreamFlags::UPDATE;
    let init = hmac_op(key.len(), DATA_ADDR, 250, mode, flags);
    assert!(exec(&mut rt, compute, 7, init.as_bytes()).is_ok());
    assert_eq!(
        rt.resources().owner(ResourceKind::Sha3).map(|o| o.req_id),
        Some(7)
    );
    assert_eq!(
        rt.resources().owner(ResourceKind::Hmac).map(|o| o.req_id),
        Some(7)
    );

    let flags = StreamFlags::UPDATE | StreamFlags::FINAL;
    let last = hmac_op(0, DATA_ADDR + 250, 350, mode, flags);
    let resp = exec(&mut rt, compute, 7, last.as_bytes());
    assert!(resp.is_ok());
    assert_eq!(resp.data(), reference_hmac::<Sha3_384>(104, &key, &data));
    assert!(!rt.resources().is_busy(ResourceKind::Sha3));
    assert!(!rt.resources().is_busy(ResourceKind::Hmac));
}

#[test]
fn test_hmac_mode_change_mid_stream() {
    let mut soc = EmuSoc::new();
    let emu = soc.clone();
    let mut rt = boot(&mut soc);
    emu.memory.write(KEY_ADDR, &[0x42; 32]);
    emu.memory.write(DATA_ADDR, &message(128));
    let compute = hdr(ModuleId::Hmac, hmac::cmd::COMPUTE);

    let init = hmac_op(32, DATA_ADDR, 0, ShaMode::Sha2_256, StreamFlags::INIT);
    assert!(exec(&mut rt, compute, 1, init.as_bytes()).is_ok());

    let update = hmac_op(0, DATA_ADDR, 128, ShaMode::Sha2_384, StreamFlags::UPDATE);
    let resp = exec(&mut rt, compute, 1, update.as_bytes());
    assert_eq!(
        resp.error_status().first(),
        Some(AsufwError::HMAC_INVALID_PARAM)
    );
    // The failed chunk ends the stream.
    assert!(!rt.resources().is_busy(ResourceKind::Sha2));
    assert!(!rt.resources().is_busy(ResourceKind::Hmac));
    assert!(rt.drivers().hmac.is_idle());
    assert!(rt.drivers().sha2.is_idle());
}

#[test]
fn test_hmac_invalid_key_len() {
    let mut soc = EmuSoc::new();
    let mut rt = boot(&mut soc);
    let compute = hdr(ModuleId::Hmac, hmac::cmd::COMPUTE);

    for (req_id, key_len) in [(1, 0), (2, HMAC_MAX_KEY_LEN + 1)] {
        let op = hmac_op(key_len, DATA_ADDR, 16, ShaMode::Sha2_512, StreamFlags::all());
        let resp = exec(&mut rt, compute, req_id, op.as_bytes());
        assert_eq!(
            resp.error_status().first(),
            Some(AsufwError::HMAC_INVALID_KEY_LEN)
        );
    }

    let op = hmac_op(16, DATA_ADDR, 16, ShaMode::Sha2_512, StreamFlags::from_bits_retain(0x10));
    let resp = exec(&mut rt, compute, 3, op.as_bytes());
    assert_eq!(
        resp.error_status().first(),
        Some(AsufwError::HMAC_INVALID_PARAM)
    );
}

#[test]
fn test_hmac_kat_command() {
    let mut soc = EmuSoc::new();
    let emu = soc.clone();
    let mut rt = boot(&mut soc);

    let resp = exec(&mut rt, hdr(ModuleId::Hmac, hmac::cmd::KAT), 1, &[]);
    assert!(resp.is_ok());
    assert!(rt.kat_status().contains(KatStatus::HMAC));

    // The KAT needs SHA2, which an open digest stream holds.
    emu.memory.write(DATA_ADDR, &message(64));
    let flags = StreamFlags::INIT | StreamFlags::UPDATE;
    let op = sha_op(DATA_ADDR, 64, ShaMode::Sha2_256, flags);
    let sha2 = hdr(ModuleId::Sha2, sha::cmd::OPERATION);
    assert!(exec(&mut rt, sha2, 2, op.as_bytes()).is_ok());
    let resp = exec(&mut rt, hdr(ModuleId::Hmac, hmac::cmd::KAT), 3, &[]);
    assert_eq!(
        resp.error_status().first(),
        Some(AsufwError::RESOURCE_UNAVAILABLE)
    );
    assert!(rt.kat_status().contains(KatStatus::HMAC));
    assert_eq!(
        rt.resources().owner(ResourceKind::Sha2).map(|o| o.req_id),
        Some(2)
    );
    assert!(!rt.resources().is_busy(ResourceKind::Hmac));
}
