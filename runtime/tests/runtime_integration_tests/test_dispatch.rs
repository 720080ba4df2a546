// Licensed under the Apache-2.0 license

use crate::common::{
    addr_hi, addr_lo, boot, exec, hdr, hmac_op, message, sha_op, DATA_ADDR, KEY_ADDR, SEED_ADDR,
};
use asufw_drivers::{AsufwError, DmaId, ShaMode};
use asufw_emu_periph::EmuSoc;
use asufw_runtime::{
    hmac, sha, sha::StreamFlags, trng, trng::DrbgReseedReq, ModuleId, ModuleInfoResp,
    RequestHeader, ResourceKind, Response, Runtime, MAX_PAYLOAD_LEN, QUEUE_DEPTH,
};
use zerocopy::{FromBytes, IntoBytes};

#[test]
fn test_unknown_module_and_command() {
    let mut soc = EmuSoc::new();
    let mut rt = boot(&mut soc);

    let resp = exec(&mut rt, RequestHeader::new(9, 0), 1, &[]);
    assert_eq!(
        resp.error_status().first(),
        Some(AsufwError::MODULE_NOT_REGISTERED)
    );

    let resp = exec(&mut rt, hdr(ModuleId::Sha2, 7), 2, &[]);
    assert_eq!(
        resp.error_status().first(),
        Some(AsufwError::INVALID_COMMAND)
    );
    assert_eq!(resp.req_id, 2);
}

#[test]
fn test_submit_rejections() {
    let mut soc = EmuSoc::new();
    let mut rt = boot(&mut soc);
    let info = hdr(ModuleId::Sha2, sha::cmd::GET_INFO);

    assert_eq!(
        rt.submit(info, 1, &[0u8; MAX_PAYLOAD_LEN + 1]),
        Err(AsufwError::INVALID_PAYLOAD_LEN)
    );

    for req_id in 0..QUEUE_DEPTH as u32 {
        rt.submit(info, req_id, &[]).unwrap();
    }
    assert_eq!(rt.submit(info, 3, &[]), Err(AsufwError::DUPLICATE_REQ_ID));
    assert_eq!(rt.submit(info, 100, &[]), Err(AsufwError::QUEUE_FULL));

    assert_eq!(rt.poll(), QUEUE_DEPTH);
    // A completed request keeps its id until the response is taken.
    assert_eq!(rt.submit(info, 3, &[]), Err(AsufwError::DUPLICATE_REQ_ID));
    assert!(rt.take_response(3).is_some());
    assert!(rt.take_response(3).is_none());
    rt.submit(info, 3, &[]).unwrap();
}

#[test]
fn test_short_payload() {
    let mut soc = EmuSoc::new();
    let mut rt = boot(&mut soc);

    let resp = exec(
        &mut rt,
        hdr(ModuleId::Sha2, sha::cmd::OPERATION),
        1,
        &[1, 0, 0, 0],
    );
    assert_eq!(
        resp.error_status().first(),
        Some(AsufwError::INVALID_PAYLOAD_LEN)
    );
}

#[test]
fn test_get_info_while_engines_busy() {
    let mut soc = EmuSoc::new();
    let emu = soc.clone();
    let mut rt = boot(&mut soc);
    emu.memory.write(KEY_ADDR, &[0x0b; 20]);
    emu.memory.write(DATA_ADDR, &message(512));

    // HMAC over SHA2 holds SHA2 and the HMAC unit between chunks.
    let init = hmac_op(20, DATA_ADDR, 0, ShaMode::Sha2_256, StreamFlags::INIT);
    let resp = exec(
        &mut rt,
        hdr(ModuleId::Hmac, hmac::cmd::COMPUTE),
        1,
        init.as_bytes(),
    );
    assert!(resp.is_ok());

    for dma in emu.dma.iter() {
        dma.set_stall(true);
    }
    let sha3 = sha_op(
        DATA_ADDR,
        256,
        ShaMode::Sha3_256,
        StreamFlags::INIT | StreamFlags::UPDATE,
    );
    rt.submit(hdr(ModuleId::Sha3, sha::cmd::OPERATION), 2, sha3.as_bytes())
        .unwrap();
    let update = hmac_op(20, DATA_ADDR, 256, ShaMode::Sha2_256, StreamFlags::UPDATE);
    rt.submit(hdr(ModuleId::Hmac, hmac::cmd::COMPUTE), 1, update.as_bytes())
        .unwrap();
    assert_eq!(rt.poll(), 0);

    for kind in [
        ResourceKind::Dma0,
        ResourceKind::Dma1,
        ResourceKind::Sha2,
        ResourceKind::Sha3,
        ResourceKind::Hmac,
    ] {
        assert!(rt.resources().is_busy(kind));
    }
    let owner = |kind| rt.resources().owner(kind).map(|o| o.req_id);
    assert_eq!(owner(ResourceKind::Dma0), Some(2));
    assert_eq!(owner(ResourceKind::Dma1), Some(1));

    rt.submit(hdr(ModuleId::Sha2, sha::cmd::GET_INFO), 3, &[])
        .unwrap();
    assert_eq!(rt.poll(), 1);
    let resp = rt.take_response(3).unwrap();
    assert!(resp.is_ok());
    let info = ModuleInfoResp::read_from_bytes(resp.data()).unwrap();
    assert_eq!(info.module_id, 0);
    assert_eq!(info.kat_passed, 1);

    for dma in emu.dma.iter() {
        dma.set_stall(false);
    }
    assert!(rt.run_until_idle(10));
    assert!(rt.take_response(1).unwrap().is_ok());
    assert!(rt.take_response(2).unwrap().is_ok());
    assert!(!rt.resources().is_busy(ResourceKind::Dma0));
    assert!(!rt.resources().is_busy(ResourceKind::Dma1));
    assert!(rt.resources().is_busy(ResourceKind::Sha3));
}

#[test]
fn test_contention() {
    let mut soc = EmuSoc::new();
    let emu = soc.clone();
    let mut rt = boot(&mut soc);
    emu.memory.write(DATA_ADDR, &message(128));
    emu.dma[0].set_stall(true);

    let op = sha_op(
        DATA_ADDR,
        128,
        ShaMode::Sha2_512,
        StreamFlags::INIT | StreamFlags::UPDATE | StreamFlags::FINAL,
    );
    let sha2 = hdr(ModuleId::Sha2, sha::cmd::OPERATION);
    rt.submit(sha2, 1, op.as_bytes()).unwrap();
    rt.poll();

    rt.submit(sha2, 2, op.as_bytes()).unwrap();
    rt.poll();
    let resp = rt.take_response(2).unwrap();
    assert_eq!(
        resp.error_status().first(),
        Some(AsufwError::RESOURCE_UNAVAILABLE)
    );

    // The loser got DMA1 before failing on SHA2; only its own engines were
    // released.
    let owner = |kind| rt.resources().owner(kind).map(|o| o.req_id);
    assert_eq!(owner(ResourceKind::Sha2), Some(1));
    assert_eq!(owner(ResourceKind::Dma0), Some(1));
    assert!(!rt.resources().is_busy(ResourceKind::Dma1));
    assert!(!rt.drivers().sha2.is_idle());

    emu.dma[0].set_stall(false);
    assert!(rt.run_until_idle(10));
    let resp = rt.take_response(1).unwrap();
    assert!(resp.is_ok());
    assert_eq!(resp.len, 64);
}

#[test]
fn test_dma_exhausted() {
    let mut soc = EmuSoc::new();
    let emu = soc.clone();
    let mut rt = boot(&mut soc);
    emu.memory.write(DATA_ADDR, &message(64));
    for dma in emu.dma.iter() {
        dma.set_stall(true);
    }

    let stream = StreamFlags::INIT | StreamFlags::UPDATE;
    let sha2 = sha_op(DATA_ADDR, 64, ShaMode::Sha2_256, stream);
    let sha3 = sha_op(DATA_ADDR, 64, ShaMode::Sha3_256, stream);
    rt.submit(hdr(ModuleId::Sha2, sha::cmd::OPERATION), 1, sha2.as_bytes())
        .unwrap();
    rt.submit(hdr(ModuleId::Sha3, sha::cmd::OPERATION), 2, sha3.as_bytes())
        .unwrap();
    rt.poll();
    assert_eq!(rt.resources().idle_dma_count(), 0);

    let reseed = DrbgReseedReq {
        seed_addr_lo: addr_lo(SEED_ADDR),
        seed_addr_hi: addr_hi(SEED_ADDR),
        seed_len: 128,
        df_length: 7,
    };
    let resp = exec_one(
        &mut rt,
        hdr(ModuleId::Trng, trng::cmd::DRBG_RESEED),
        3,
        reseed.as_bytes(),
    );
    assert_eq!(
        resp.error_status().first(),
        Some(AsufwError::DMA_ALLOCATION_FAILED)
    );
    assert!(!rt.resources().is_busy(ResourceKind::Trng));

    // Commands without DMA still run.
    let resp = exec_one(
        &mut rt,
        hdr(ModuleId::Trng, trng::cmd::GET_RANDOM_BYTES),
        4,
        &[],
    );
    assert!(resp.is_ok());
    assert_eq!(rt.resources().idle_dma_count(), 0);
    assert_eq!(
        rt.resources().owner(ResourceKind::dma(DmaId::Dma1)).map(|o| o.req_id),
        Some(2)
    );
}

/// Submit and run a single dispatcher pass.
fn exec_one(rt: &mut Runtime, header: RequestHeader, req_id: u32, payload: &[u8]) -> Response {
    rt.submit(header, req_id, payload).unwrap();
    rt.poll();
    rt.take_response(req_id).unwrap()
}
