// Licensed under the Apache-2.0 license

use crate::common::{boot, boot_with, exec, hdr, kat_vector};
use asufw_drivers::{AsufwError, BufStatus, TrngErrorState, TrngMode, TrngState};
use asufw_emu_periph::EmuSoc;
use asufw_runtime::{
    aes, hmac, sha, trng, KatStatus, ModuleId, ModuleInfoResp, ResourceKind, RuntimeConfig,
};
use zerocopy::FromBytes;

#[test]
fn test_boot() {
    let mut soc = EmuSoc::new();
    let mut rt = boot(&mut soc);

    assert_eq!(rt.kat_status(), KatStatus::all());
    assert_eq!(rt.modules().len(), 5);
    assert!(ResourceKind::ALL
        .iter()
        .all(|&kind| !rt.resources().is_busy(kind)));

    let trng = &rt.drivers().trng;
    assert_eq!(trng.mode(), TrngMode::Hrng);
    assert_eq!(trng.state(), TrngState::Reseeded);
    assert_eq!(trng.error_state(), TrngErrorState::Healthy);
}

#[test]
fn test_get_info_reports_kat_status() {
    let mut soc = EmuSoc::new();
    let mut rt = boot(&mut soc);

    for (req_id, (module, cmd)) in [
        (ModuleId::Sha2, sha::cmd::GET_INFO),
        (ModuleId::Sha3, sha::cmd::GET_INFO),
        (ModuleId::Trng, trng::cmd::GET_INFO),
        (ModuleId::Hmac, hmac::cmd::GET_INFO),
        (ModuleId::Aes, aes::cmd::GET_INFO),
    ]
    .into_iter()
    .enumerate()
    {
        let resp = exec(&mut rt, hdr(module, cmd), req_id as u32, &[]);
        assert!(resp.is_ok());
        let info = ModuleInfoResp::read_from_bytes(resp.data()).unwrap();
        assert_eq!(
            info,
            ModuleInfoResp {
                module_id: u32::from(u8::from(module)),
                version: 1,
                kat_passed: 1,
            }
        );
    }
}

#[test]
fn test_boot_trng_gate_failure() {
    // Without the known answer registered the TRNG KAT mismatches.
    let mut soc = EmuSoc::new();
    let emu = soc.clone();
    let mut rt = boot_with(&mut soc, RuntimeConfig::default());

    assert_eq!(
        rt.kat_status(),
        KatStatus::SHA2 | KatStatus::SHA3 | KatStatus::HMAC | KatStatus::AES
    );
    assert_eq!(rt.drivers().trng.state(), TrngState::Uninitialized);
    assert_eq!(rt.drivers().trng.error_state(), TrngErrorState::Unhealthy);

    let resp = exec(&mut rt, hdr(ModuleId::Trng, trng::cmd::GET_INFO), 1, &[]);
    let info = ModuleInfoResp::read_from_bytes(resp.data()).unwrap();
    assert_eq!(info.kat_passed, 0);

    let resp = exec(
        &mut rt,
        hdr(ModuleId::Trng, trng::cmd::GET_RANDOM_BYTES),
        2,
        &[],
    );
    let status = resp.error_status();
    assert_eq!(status.first(), Some(AsufwError::TRNG_INVALID_STATE));
    assert_eq!(status.buf_status(), BufStatus::Cleared);
    assert_eq!(resp.len, 0);
    // Terminating the request does not bring up an instance the gate refused.
    assert_eq!(rt.drivers().trng.state(), TrngState::Uninitialized);
    assert_eq!(rt.drivers().trng.error_state(), TrngErrorState::Unhealthy);

    // The KAT command re-runs the gate and restores the production instance.
    emu.trng.add_known_answer(kat_vector());
    let resp = exec(&mut rt, hdr(ModuleId::Trng, trng::cmd::KAT), 3, &[]);
    assert!(resp.is_ok());
    assert!(rt.kat_status().contains(KatStatus::TRNG));
    assert_eq!(rt.drivers().trng.mode(), TrngMode::Hrng);
    assert_eq!(rt.drivers().trng.error_state(), TrngErrorState::Healthy);

    let resp = exec(
        &mut rt,
        hdr(ModuleId::Trng, trng::cmd::GET_RANDOM_BYTES),
        4,
        &[],
    );
    assert!(resp.is_ok());
    assert_eq!(resp.len, 32);
}

#[test]
fn test_boot_without_kats() {
    let mut soc = EmuSoc::new();
    let emu = soc.clone();
    let config = RuntimeConfig {
        boot_kats: false,
        ..RuntimeConfig::default()
    };
    let mut rt = boot_with(&mut soc, config);

    assert_eq!(rt.kat_status(), KatStatus::empty());
    assert!(!rt.config().boot_kats);
    assert_eq!(rt.drivers().trng.state(), TrngState::Reseeded);
    assert_eq!(emu.trng.generate_count(), 0);
}

#[test]
fn test_boot_autoproc() {
    let mut soc = EmuSoc::new();
    let emu = soc.clone();
    soc.trng.add_known_answer(kat_vector());
    let config = RuntimeConfig {
        trng_autoproc: true,
        ..RuntimeConfig::default()
    };
    let mut rt = boot_with(&mut soc, config);

    assert_eq!(rt.drivers().trng.state(), TrngState::AutoProc);
    assert!(emu.trng.autoproc_enabled());

    let first = exec(
        &mut rt,
        hdr(ModuleId::Trng, trng::cmd::GET_RANDOM_BYTES),
        1,
        &[],
    );
    let second = exec(
        &mut rt,
        hdr(ModuleId::Trng, trng::cmd::GET_RANDOM_BYTES),
        2,
        &[],
    );
    assert!(first.is_ok() && second.is_ok());
    assert_eq!(first.len, 32);
    assert_ne!(first.data(), second.data());

    // The KAT command leaves auto-proc running again.
    let resp = exec(&mut rt, hdr(ModuleId::Trng, trng::cmd::KAT), 3, &[]);
    assert!(resp.is_ok());
    assert_eq!(rt.drivers().trng.state(), TrngState::AutoProc);
    assert!(emu.trng.autoproc_enabled());
}
