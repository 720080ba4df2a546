// Licensed under the Apache-2.0 license

use asufw_drivers::{
    AsufwError, Trng, TrngErrorState, TrngMode, TrngState, TrngUserConfig,
    TRNG_PERS_STRING_LEN, TRNG_SEC_STRENGTH_BYTES,
};
use asufw_emu_periph::{DrbgVector, EmuTrng};

const DF_LENGTH: u8 = 7;
const SEED_LEN: usize = TrngUserConfig::seed_len(DF_LENGTH);

fn seed(salt: u8) -> [u8; SEED_LEN] {
    core::array::from_fn(|idx| (idx as u8).wrapping_mul(31) ^ salt)
}

fn drng_config() -> TrngUserConfig {
    TrngUserConfig {
        mode: TrngMode::Drng,
        df_length: DF_LENGTH,
        seed_life: 2,
        ..TrngUserConfig::DEFAULT
    }
}

/// Known answer for instantiate(seed(1), 0x3c pers), reseed(seed(2)),
/// generate with prediction resistance.
fn seeded_vector(output: &[u8]) -> DrbgVector {
    DrbgVector {
        seeds: vec![seed(1).to_vec(), seed(2).to_vec()],
        pers: Some(vec![0x3c; TRNG_PERS_STRING_LEN]),
        df_length: DF_LENGTH,
        pred_resistance: true,
        output: output.to_vec(),
    }
}

fn hrng_config() -> TrngUserConfig {
    TrngUserConfig {
        mode: TrngMode::Hrng,
        ..TrngUserConfig::DEFAULT
    }
}

#[test]
fn test_generate_before_instantiate() {
    let mut regs = EmuTrng::new();
    let mut trng = Trng::new(&mut regs);
    let mut out = [0u8; TRNG_SEC_STRENGTH_BYTES];
    assert_eq!(trng.generate(&mut out, false), Err(AsufwError::TRNG_INVALID_STATE));
    assert_eq!(trng.state(), TrngState::Uninitialized);
}

#[test]
fn test_drng_seed_delivery() {
    let mut regs = EmuTrng::new();
    let emu = regs.clone();
    let expected: [u8; TRNG_SEC_STRENGTH_BYTES] = core::array::from_fn(|idx| idx as u8);
    emu.add_known_answer(seeded_vector(&expected));
    let mut trng = Trng::new(&mut regs);

    let pers = [0x3cu8; TRNG_PERS_STRING_LEN];
    trng.instantiate(Some(&seed(1)), Some(&pers), &drng_config()).unwrap();
    assert_eq!(trng.state(), TrngState::Reseeded);
    assert_eq!(trng.error_state(), TrngErrorState::Healthy);
    assert_eq!(emu.last_seed(), seed(1).to_vec());
    assert_eq!(emu.last_pers(), Some([0x3c3c_3c3c; 12]));

    trng.reseed(Some(&seed(2)), DF_LENGTH).unwrap();
    assert_eq!(emu.last_seed(), seed(2).to_vec());
    assert_eq!(emu.last_pers(), None);
    assert_eq!(trng.elapsed_seed_life(), 0);

    let mut out = [0u8; TRNG_SEC_STRENGTH_BYTES];
    trng.generate(&mut out, true).unwrap();
    assert_eq!(out, expected);
    assert_eq!(trng.state(), TrngState::Generating);
    assert_eq!(trng.elapsed_seed_life(), 1);
}

#[test]
fn test_drng_skipped_reseed_misses_known_answer() {
    let mut regs = EmuTrng::new();
    let emu = regs.clone();
    let expected = [0x5au8; TRNG_SEC_STRENGTH_BYTES];
    emu.add_known_answer(seeded_vector(&expected));
    let mut trng = Trng::new(&mut regs);

    let pers = [0x3cu8; TRNG_PERS_STRING_LEN];
    trng.instantiate(Some(&seed(1)), Some(&pers), &drng_config()).unwrap();
    let mut out = [0u8; TRNG_SEC_STRENGTH_BYTES];
    trng.generate(&mut out, true).unwrap();
    assert_ne!(out, expected);
}

#[test]
fn test_drng_wrong_personalization_misses_known_answer() {
    let mut regs = EmuTrng::new();
    let emu = regs.clone();
    let expected = [0x5au8; TRNG_SEC_STRENGTH_BYTES];
    emu.add_known_answer(seeded_vector(&expected));
    let mut trng = Trng::new(&mut regs);

    let pers = [0x3du8; TRNG_PERS_STRING_LEN];
    trng.instantiate(Some(&seed(1)), Some(&pers), &drng_config()).unwrap();
    trng.reseed(Some(&seed(2)), DF_LENGTH).unwrap();
    let mut out = [0u8; TRNG_SEC_STRENGTH_BYTES];
    trng.generate(&mut out, true).unwrap();
    assert_ne!(out, expected);
}

#[test]
fn test_drng_reseed_required() {
    let mut regs = EmuTrng::new();
    let mut trng = Trng::new(&mut regs);
    trng.instantiate(Some(&seed(0)), None, &drng_config()).unwrap();

    let mut out = [0u8; TRNG_SEC_STRENGTH_BYTES];
    trng.generate(&mut out, true).unwrap();
    assert_eq!(trng.generate(&mut out, true), Err(AsufwError::TRNG_RESEED_REQUIRED));

    // Validation failures do not disturb the instance.
    assert_eq!(trng.error_state(), TrngErrorState::Healthy);
    assert_eq!(trng.state(), TrngState::Generating);
    trng.reseed(Some(&seed(1)), DF_LENGTH).unwrap();
    trng.generate(&mut out, true).unwrap();
}

#[test]
fn test_drng_seed_life_exhausted() {
    let mut regs = EmuTrng::new();
    let mut trng = Trng::new(&mut regs);
    trng.instantiate(Some(&seed(0)), None, &drng_config()).unwrap();

    let mut out = [0u8; 16];
    trng.generate(&mut out, false).unwrap();
    trng.generate(&mut out, false).unwrap();
    assert_eq!(trng.generate(&mut out, false), Err(AsufwError::TRNG_RESEED_REQUIRED));
}

#[test]
fn test_hrng_rejects_seed() {
    let mut regs = EmuTrng::new();
    let mut trng = Trng::new(&mut regs);
    assert_eq!(
        trng.instantiate(Some(&seed(0)), None, &hrng_config()),
        Err(AsufwError::TRNG_INVALID_SEED_VALUE)
    );

    trng.instantiate(None, None, &hrng_config()).unwrap();
    assert_eq!(trng.reseed(Some(&seed(1)), DF_LENGTH), Err(AsufwError::TRNG_INVALID_SEED_VALUE));
    assert_eq!(trng.state(), TrngState::Reseeded);
}

#[test]
fn test_drng_requires_seed() {
    let mut regs = EmuTrng::new();
    let mut trng = Trng::new(&mut regs);
    assert_eq!(
        trng.instantiate(None, None, &drng_config()),
        Err(AsufwError::TRNG_INVALID_SEED_VALUE)
    );
    assert_eq!(
        trng.instantiate(Some(&seed(0)[..64]), None, &drng_config()),
        Err(AsufwError::TRNG_INVALID_SEED_LENGTH)
    );
    assert_eq!(trng.state(), TrngState::Uninitialized);
}

#[test]
fn test_instantiate_config_checks() {
    let mut regs = EmuTrng::new();
    let mut trng = Trng::new(&mut regs);

    let cfg = TrngUserConfig {
        df_length: 1,
        ..hrng_config()
    };
    assert_eq!(trng.instantiate(None, None, &cfg), Err(AsufwError::TRNG_INVALID_DF_LENGTH));

    let cfg = TrngUserConfig {
        seed_life: 0,
        ..hrng_config()
    };
    assert_eq!(trng.instantiate(None, None, &cfg), Err(AsufwError::TRNG_INVALID_SEED_LIFE));

    let cfg = TrngUserConfig {
        adapt_prop_cutoff: 1024,
        ..hrng_config()
    };
    assert_eq!(trng.instantiate(None, None, &cfg), Err(AsufwError::TRNG_INVALID_ADAPT_CUTOFF));

    let cfg = TrngUserConfig {
        rep_count_cutoff: 0,
        ..hrng_config()
    };
    assert_eq!(trng.instantiate(None, None, &cfg), Err(AsufwError::TRNG_INVALID_REP_CUTOFF));

    trng.instantiate(None, None, &hrng_config()).unwrap();
    assert_eq!(trng.instantiate(None, None, &hrng_config()), Err(AsufwError::TRNG_INVALID_STATE));
}

#[test]
fn test_health_test_cutoffs_programmed() {
    let mut regs = EmuTrng::new();
    let emu = regs.clone();
    let mut trng = Trng::new(&mut regs);
    trng.instantiate(None, None, &hrng_config()).unwrap();
    assert_eq!(emu.adapt_cutoff(), 645);
    assert_eq!(emu.rep_cutoff(), 66);
    assert_eq!(emu.df_length(), 7);
    assert!(emu.osc_enabled());
}

#[test]
fn test_generate_buffer_size() {
    let mut regs = EmuTrng::new();
    let mut trng = Trng::new(&mut regs);
    trng.instantiate(None, None, &hrng_config()).unwrap();

    for len in [0usize, 6, 36] {
        let mut out = vec![0u8; len];
        assert_eq!(trng.generate(&mut out, false), Err(AsufwError::TRNG_INVALID_BUF_SIZE));
        assert_eq!(trng.error_state(), TrngErrorState::Healthy);
    }
    let mut out = [0u8; 12];
    trng.generate(&mut out, false).unwrap();
}

#[test]
fn test_hrng_reseeds_at_seed_life() {
    let mut regs = EmuTrng::new();
    let emu = regs.clone();
    let mut trng = Trng::new(&mut regs);
    let cfg = TrngUserConfig {
        seed_life: 2,
        ..hrng_config()
    };
    trng.instantiate(None, None, &cfg).unwrap();
    assert_eq!(emu.reseed_count(), 1);

    let mut out = [0u8; TRNG_SEC_STRENGTH_BYTES];
    trng.generate(&mut out, false).unwrap();
    trng.generate(&mut out, false).unwrap();
    assert_eq!(emu.reseed_count(), 1);
    trng.generate(&mut out, false).unwrap();
    assert_eq!(emu.reseed_count(), 2);
    assert_eq!(trng.elapsed_seed_life(), 1);

    trng.generate(&mut out, true).unwrap();
    assert_eq!(emu.reseed_count(), 3);
}

#[test]
fn test_ptrng_generate() {
    let mut regs = EmuTrng::new();
    let emu = regs.clone();
    let mut trng = Trng::new(&mut regs);
    let cfg = TrngUserConfig {
        mode: TrngMode::Ptrng,
        ..TrngUserConfig::DEFAULT
    };
    trng.instantiate(None, None, &cfg).unwrap();
    assert_eq!(trng.state(), TrngState::Instantiated);
    assert_eq!(emu.reseed_count(), 0);

    let mut out = [0u8; TRNG_SEC_STRENGTH_BYTES];
    assert_eq!(trng.generate(&mut out, true), Err(AsufwError::TRNG_INVALID_PRED_RES_VALUE));
    trng.generate(&mut out, false).unwrap();
    assert!(emu.osc_enabled());
    assert_eq!(trng.reseed(None, 7), Err(AsufwError::TRNG_INVALID_MODE));
}

#[test]
fn test_reseed_catastrophic_failure() {
    let mut regs = EmuTrng::new();
    let emu = regs.clone();
    let mut trng = Trng::new(&mut regs);
    trng.instantiate(None, None, &hrng_config()).unwrap();

    emu.inject_ctf();
    assert_eq!(trng.reseed(None, 7), Err(AsufwError::TRNG_CATASTROPHIC_CTF));
    assert_eq!(trng.error_state(), TrngErrorState::Catastrophic);

    let mut out = [0u8; TRNG_SEC_STRENGTH_BYTES];
    assert_eq!(trng.generate(&mut out, false), Err(AsufwError::TRNG_UNHEALTHY_STATE));

    trng.uninstantiate().unwrap();
    assert_eq!(trng.error_state(), TrngErrorState::StartupTest);
    trng.instantiate(None, None, &hrng_config()).unwrap();
    trng.generate(&mut out, false).unwrap();
}

#[test]
fn test_generate_catastrophic_failure_zeroizes_output() {
    let mut regs = EmuTrng::new();
    let emu = regs.clone();
    let mut trng = Trng::new(&mut regs);
    trng.instantiate(None, None, &hrng_config()).unwrap();

    emu.inject_dtf();
    let mut out = [0xa5u8; TRNG_SEC_STRENGTH_BYTES];
    assert_eq!(trng.generate(&mut out, false), Err(AsufwError::TRNG_CATASTROPHIC_DTF));
    assert_eq!(out, [0u8; TRNG_SEC_STRENGTH_BYTES]);
    assert_eq!(trng.error_state(), TrngErrorState::Catastrophic);
}

#[test]
fn test_reseed_timeout() {
    let mut regs = EmuTrng::new();
    let emu = regs.clone();
    let mut trng = Trng::new(&mut regs);
    trng.instantiate(None, None, &hrng_config()).unwrap();

    emu.set_stall(true);
    assert_eq!(trng.reseed(None, 7), Err(AsufwError::TRNG_TIMEOUT));
    assert_eq!(trng.error_state(), TrngErrorState::Error);
}

#[test]
fn test_autoproc_fifo() {
    let mut regs = EmuTrng::new();
    let emu = regs.clone();
    let mut trng = Trng::new(&mut regs);

    let mut out = [0u8; TRNG_SEC_STRENGTH_BYTES];
    assert_eq!(trng.enable_autoproc(), Err(AsufwError::TRNG_INVALID_STATE));

    trng.init_and_cfg_mode(TrngMode::Hrng).unwrap();
    assert_eq!(trng.read_fifo(&mut out), Err(AsufwError::TRNG_INVALID_STATE));

    trng.enable_autoproc().unwrap();
    assert_eq!(trng.state(), TrngState::AutoProc);
    assert!(emu.autoproc_enabled());
    assert!(trng.is_random_num_available());
    assert_eq!(trng.read_fifo(&mut out[..16]), Err(AsufwError::TRNG_INVALID_BUF_SIZE));
    let words = emu.fifo_words();
    trng.read_fifo(&mut out).unwrap();
    assert_ne!(out, [0u8; TRNG_SEC_STRENGTH_BYTES]);
    let raw: Vec<u8> = words[..8].iter().flat_map(|word| word.to_le_bytes()).collect();
    assert_eq!(out.to_vec(), raw);

    // Generate is bypassed in auto-proc mode.
    assert_eq!(trng.generate(&mut out, false), Err(AsufwError::TRNG_INVALID_STATE));

    trng.disable_autoproc().unwrap();
    assert_eq!(trng.state(), TrngState::Uninitialized);
    assert!(!emu.autoproc_enabled());
}

#[test]
fn test_init_and_cfg_mode() {
    let mut regs = EmuTrng::new();
    let mut trng = Trng::new(&mut regs);
    assert_eq!(trng.init_and_cfg_mode(TrngMode::Drng), Err(AsufwError::TRNG_INVALID_MODE));

    trng.init_and_cfg_mode(TrngMode::Hrng).unwrap();
    assert_eq!(trng.state(), TrngState::Reseeded);

    trng.init_and_cfg_mode(TrngMode::Ptrng).unwrap();
    assert_eq!(trng.mode(), TrngMode::Ptrng);
    assert_eq!(trng.state(), TrngState::Instantiated);
}

#[test]
fn test_init_and_cfg_mode_failure_leaves_core_in_reset() {
    let mut regs = EmuTrng::new();
    let emu = regs.clone();
    let mut trng = Trng::new(&mut regs);
    trng.init_and_cfg_mode(TrngMode::Hrng).unwrap();

    emu.set_stall(true);
    assert_eq!(trng.init_and_cfg_mode(TrngMode::Hrng), Err(AsufwError::TRNG_TIMEOUT));
    assert_eq!(trng.state(), TrngState::Uninitialized);
    assert!(!emu.osc_enabled());

    emu.set_stall(false);
    trng.init_and_cfg_mode(TrngMode::Hrng).unwrap();
    assert_eq!(trng.state(), TrngState::Reseeded);
}

#[test]
fn test_init_and_cfg_mode_keeps_unhealthy_gate() {
    let mut regs = EmuTrng::new();
    let mut trng = Trng::new(&mut regs);
    trng.mark_unhealthy();
    assert_eq!(
        trng.init_and_cfg_mode(TrngMode::Hrng),
        Err(AsufwError::TRNG_UNHEALTHY_STATE)
    );
    assert_eq!(trng.error_state(), TrngErrorState::Unhealthy);
}

#[test]
fn test_unhealthy_blocks_instantiate() {
    let mut regs = EmuTrng::new();
    let mut trng = Trng::new(&mut regs);
    trng.mark_unhealthy();
    assert_eq!(trng.instantiate(None, None, &hrng_config()), Err(AsufwError::TRNG_UNHEALTHY_STATE));
    trng.uninstantiate().unwrap();
    trng.instantiate(None, None, &hrng_config()).unwrap();
}
