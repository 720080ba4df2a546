/*++

Licensed under the Apache-2.0 license.

File Name:

    request.rs

Abstract:

    File contains the request, continuation and response types carried by
    the command queue.

--*/

use crate::module::ModuleId;
use crate::resource::Owner;
use asufw_drivers::{secure_zeroize, AsufwError, AsufwResult, DmaId, ErrorStatus};
use bitfield::bitfield;
use zerocopy::{FromBytes, Immutable, IntoBytes};

/// Largest command payload in bytes.
pub const MAX_PAYLOAD_LEN: usize = 256;
/// Largest response payload in bytes.
pub const MAX_RESPONSE_LEN: usize = 64;

bitfield! {
    /// Command header
    #[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
    pub struct RequestHeader(u32);

    pub u8, command_id, set_command_id: 7, 0;

    pub u8, module_id, set_module_id: 19, 16;
}

impl RequestHeader {
    pub fn new(module_id: u8, command_id: u8) -> Self {
        let mut hdr = Self(0);
        hdr.set_module_id(module_id);
        hdr.set_command_id(command_id);
        hdr
    }
}

impl From<RequestHeader> for u32 {
    fn from(hdr: RequestHeader) -> u32 {
        hdr.0
    }
}

impl From<u32> for RequestHeader {
    fn from(val: u32) -> Self {
        Self(val)
    }
}

/// Whether a DMA transfer issued by a streaming handler is outstanding.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub enum Continuation {
    /// First invocation
    #[default]
    Start,
    /// Hash update transfer issued; resume with `update_done`
    ShaUpdate,
    /// HMAC message transfer issued; resume with `update_done`
    HmacUpdate,
    /// Cipher transfer issued; `done` bytes will have been processed once
    /// it completes
    AesChunk { done: u32 },
}

/// One in-flight command.
pub struct Request {
    header: RequestHeader,
    req_id: u32,
    args: [u8; MAX_PAYLOAD_LEN],
    args_len: usize,
    resp: [u8; MAX_RESPONSE_LEN],
    resp_len: usize,
    resp_touched: bool,
    pub status: ErrorStatus,
    /// DMA engine allocated to this request
    pub dma: Option<DmaId>,
    pub cont: Continuation,
}

impl Default for Request {
    fn default() -> Self {
        Self {
            header: RequestHeader::default(),
            req_id: 0,
            args: [0; MAX_PAYLOAD_LEN],
            args_len: 0,
            resp: [0; MAX_RESPONSE_LEN],
            resp_len: 0,
            resp_touched: false,
            status: ErrorStatus::new(),
            dma: None,
            cont: Continuation::Start,
        }
    }
}

impl Request {
    /// Load a new command into this request.
    pub fn start(&mut self, header: RequestHeader, req_id: u32, payload: &[u8]) -> AsufwResult<()> {
        let args = self
            .args
            .get_mut(..payload.len())
            .ok_or(AsufwError::INVALID_PAYLOAD_LEN)?;
        args.copy_from_slice(payload);
        self.args[payload.len()..].fill(0);
        self.args_len = payload.len();
        self.header = header;
        self.req_id = req_id;
        self.resp = [0; MAX_RESPONSE_LEN];
        self.resp_len = 0;
        self.resp_touched = false;
        self.status = ErrorStatus::new();
        self.dma = None;
        self.cont = Continuation::Start;
        Ok(())
    }

    pub fn header(&self) -> RequestHeader {
        self.header
    }

    pub fn req_id(&self) -> u32 {
        self.req_id
    }

    pub fn module_id(&self) -> AsufwResult<ModuleId> {
        ModuleId::try_from(self.header.module_id())
    }

    /// Resource owner token for this request.
    pub fn owner(&self) -> AsufwResult<Owner> {
        Ok(Owner {
            module: self.module_id()?,
            req_id: self.req_id,
        })
    }

    pub fn args(&self) -> &[u8] {
        &self.args[..self.args_len]
    }

    /// Decode the payload prefix as `T`.
    pub fn args_as<T: FromBytes>(&self) -> AsufwResult<T> {
        T::read_from_prefix(self.args())
            .map(|(args, _)| args)
            .map_err(|_| AsufwError::INVALID_PAYLOAD_LEN)
    }

    /// Write `data` as the response payload.
    pub fn set_response(&mut self, data: &[u8]) -> AsufwResult<()> {
        let resp = self
            .resp
            .get_mut(..data.len())
            .ok_or(AsufwError::INTERNAL)?;
        self.resp_touched = true;
        resp.copy_from_slice(data);
        self.resp_len = data.len();
        Ok(())
    }

    /// Encode `val` as the response payload.
    pub fn set_response_as<T: IntoBytes + Immutable>(&mut self, val: &T) -> AsufwResult<()> {
        self.set_response(val.as_bytes())
    }

    /// Response area for handlers producing output in place; `len` bytes
    /// become the response.
    pub fn response_mut(&mut self, len: usize) -> AsufwResult<&mut [u8]> {
        let resp = self.resp.get_mut(..len).ok_or(AsufwError::INTERNAL)?;
        self.resp_touched = true;
        self.resp_len = len;
        Ok(resp)
    }

    pub fn response(&self) -> &[u8] {
        &self.resp[..self.resp_len]
    }

    /// Record a terminal failure and sanitize any written response.
    pub fn fail(&mut self, err: AsufwError) {
        self.status.push(err);
        if self.resp_touched {
            let buf_status = secure_zeroize(&mut self.resp);
            self.status.set_buf_status(buf_status);
        }
        self.resp_len = 0;
    }

    /// Terminal response for the host.
    pub fn to_response(&self) -> Response {
        let mut data = [0u8; MAX_RESPONSE_LEN];
        data[..self.resp_len].copy_from_slice(self.response());
        Response {
            req_id: self.req_id,
            status: self.status.to_word(),
            len: self.resp_len,
            data,
        }
    }
}

/// Terminal response of one request.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Response {
    pub req_id: u32,
    /// Packed error status word; 0 on success
    pub status: u32,
    pub len: usize,
    pub data: [u8; MAX_RESPONSE_LEN],
}

impl Response {
    pub fn data(&self) -> &[u8] {
        &self.data[..self.len]
    }

    pub fn is_ok(&self) -> bool {
        self.status == 0
    }

    pub fn error_status(&self) -> ErrorStatus {
        ErrorStatus::from_word(self.status)
    }
}
