//! CAPI message codec: 8-byte header plus little-endian words, dwords and
//! length-prefixed structs, per the CAPI 2.0 message layouts.

use crate::error::Error;

/// Fixed header size: length, appl-id, command, subcommand, message number.
pub const HEADER_LEN: usize = 8;

/// CAPI command bytes (first classifier octet of the header).
pub mod command {
    pub const ALERT: u8 = 0x01;
    pub const CONNECT: u8 = 0x02;
    pub const CONNECT_ACTIVE: u8 = 0x03;
    pub const DISCONNECT: u8 = 0x04;
    pub const LISTEN: u8 = 0x05;
    pub const INFO: u8 = 0x08;
    pub const SELECT_B_PROTOCOL: u8 = 0x41;
    pub const FACILITY: u8 = 0x80;
    pub const CONNECT_B3: u8 = 0x82;
    pub const CONNECT_B3_ACTIVE: u8 = 0x83;
    pub const DISCONNECT_B3: u8 = 0x84;
    pub const DATA_B3: u8 = 0x86;
}

/// CAPI subcommand bytes (second classifier octet).
pub mod subcommand {
    pub const REQ: u8 = 0x80;
    pub const CONF: u8 = 0x81;
    pub const IND: u8 = 0x82;
    pub const RESP: u8 = 0x83;
}

/// Decoded message header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Total message length including the header itself.
    pub length: u16,
    pub appl_id: u16,
    pub command: u8,
    pub subcommand: u8,
    pub msg_nr: u16,
}

impl Header {
    /// Parse the fixed header from the front of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Header, Error> {
        if buf.len() < HEADER_LEN {
            return Err(Error::Protocol(format!(
                "message shorter than header ({} bytes)",
                buf.len()
            )));
        }
        Ok(Header {
            length: u16::from_le_bytes([buf[0], buf[1]]),
            appl_id: u16::from_le_bytes([buf[2], buf[3]]),
            command: buf[4],
            subcommand: buf[5],
            msg_nr: u16::from_le_bytes([buf[6], buf[7]]),
        })
    }
}

/// Encode a CAPI struct: one length octet for up to 254 content bytes,
/// 0xFF escape plus a length word beyond that. An empty struct is a single
/// zero octet.
pub fn cstruct_bytes(content: &[u8]) -> Vec<u8> {
    debug_assert!(
        content.len() <= u16::MAX as usize,
        "struct content exceeds the 16-bit length field"
    );
    let mut out = Vec::with_capacity(content.len() + 3);
    if content.len() < 0xFF {
        out.push(content.len() as u8);
    } else {
        out.push(0xFF);
        out.extend_from_slice(&(content.len() as u16).to_le_bytes());
    }
    out.extend_from_slice(content);
    out
}

/// Builds one outbound message; `finish` patches the total length.
pub struct MessageBuilder {
    buf: Vec<u8>,
}

impl MessageBuilder {
    pub fn new(appl_id: u16, command: u8, subcommand: u8, msg_nr: u16) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&[0, 0]); // length, patched in finish()
        buf.extend_from_slice(&appl_id.to_le_bytes());
        buf.push(command);
        buf.push(subcommand);
        buf.extend_from_slice(&msg_nr.to_le_bytes());
        MessageBuilder { buf }
    }

    pub fn word(mut self, v: u16) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn dword(mut self, v: u32) -> Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Append a length-prefixed CAPI struct with the given content.
    pub fn cstruct(mut self, content: &[u8]) -> Self {
        self.buf.extend_from_slice(&cstruct_bytes(content));
        self
    }

    /// Append raw bytes without a length prefix (in-line data payload).
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        debug_assert!(
            self.buf.len() <= u16::MAX as usize,
            "message exceeds the 16-bit length field"
        );
        let len = self.buf.len() as u16;
        self.buf[..2].copy_from_slice(&len.to_le_bytes());
        self.buf
    }
}

/// Checked reader over an inbound message. All reads fail with a protocol
/// error on truncation rather than panicking.
pub struct MessageReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> MessageReader<'a> {
    /// Parse the header and position a reader on the first parameter octet.
    pub fn after_header(buf: &'a [u8]) -> Result<(Header, MessageReader<'a>), Error> {
        let header = Header::parse(buf)?;
        Ok((
            header,
            MessageReader {
                buf,
                pos: HEADER_LEN,
            },
        ))
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.buf.len() - self.pos < n {
            return Err(Error::Protocol(format!(
                "truncated message: wanted {} bytes at offset {}, have {}",
                n,
                self.pos,
                self.buf.len() - self.pos
            )));
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn word(&mut self) -> Result<u16, Error> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn dword(&mut self) -> Result<u32, Error> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a length-prefixed CAPI struct, returning its content.
    pub fn cstruct(&mut self) -> Result<&'a [u8], Error> {
        let first = self.take(1)?[0];
        let len = if first == 0xFF {
            let b = self.take(2)?;
            u16::from_le_bytes([b[0], b[1]]) as usize
        } else {
            first as usize
        };
        self.take(len)
    }

    /// Read `n` raw bytes (in-line data payload).
    pub fn bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        self.take(n)
    }

    /// Remaining unread bytes.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_patches_length_and_roundtrips() {
        let msg = MessageBuilder::new(7, command::LISTEN, subcommand::REQ, 42)
            .dword(1)
            .dword(0x03FF)
            .dword(0x0001_0012)
            .dword(0)
            .cstruct(&[])
            .cstruct(&[])
            .finish();
        let (header, mut rd) = MessageReader::after_header(&msg).unwrap();
        assert_eq!(header.length as usize, msg.len());
        assert_eq!(header.appl_id, 7);
        assert_eq!(header.command, command::LISTEN);
        assert_eq!(header.subcommand, subcommand::REQ);
        assert_eq!(header.msg_nr, 42);
        assert_eq!(rd.dword().unwrap(), 1);
        assert_eq!(rd.dword().unwrap(), 0x03FF);
        assert_eq!(rd.dword().unwrap(), 0x0001_0012);
        assert_eq!(rd.dword().unwrap(), 0);
        assert_eq!(rd.cstruct().unwrap(), &[] as &[u8]);
        assert_eq!(rd.cstruct().unwrap(), &[] as &[u8]);
        assert!(rd.rest().is_empty());
    }

    #[test]
    fn cstruct_roundtrip_short_and_escaped() {
        let short = cstruct_bytes(b"abc");
        assert_eq!(short, vec![3, b'a', b'b', b'c']);

        let long_content = vec![0x55u8; 300];
        let long = cstruct_bytes(&long_content);
        assert_eq!(long[0], 0xFF);
        assert_eq!(u16::from_le_bytes([long[1], long[2]]), 300);

        let msg = MessageBuilder::new(1, command::FACILITY, subcommand::REQ, 1)
            .dword(0x101)
            .word(1)
            .cstruct(&long_content)
            .finish();
        let (_, mut rd) = MessageReader::after_header(&msg).unwrap();
        rd.dword().unwrap();
        rd.word().unwrap();
        assert_eq!(rd.cstruct().unwrap(), long_content.as_slice());
    }

    #[test]
    fn empty_struct_is_single_zero_octet() {
        assert_eq!(cstruct_bytes(&[]), vec![0]);
    }

    #[test]
    #[should_panic(expected = "16-bit length field")]
    fn oversized_struct_content_asserts() {
        cstruct_bytes(&vec![0u8; 70_000]);
    }

    #[test]
    #[should_panic(expected = "16-bit length field")]
    fn oversized_message_asserts() {
        MessageBuilder::new(1, command::DATA_B3, subcommand::REQ, 1)
            .raw(&vec![0u8; 70_000])
            .finish();
    }

    #[test]
    fn truncated_reads_are_protocol_errors() {
        assert!(matches!(Header::parse(&[1, 2, 3]), Err(Error::Protocol(_))));

        let msg = MessageBuilder::new(1, command::DATA_B3, subcommand::CONF, 9)
            .dword(0x10101)
            .finish();
        let (_, mut rd) = MessageReader::after_header(&msg).unwrap();
        rd.dword().unwrap();
        assert!(matches!(rd.word(), Err(Error::Protocol(_))));

        // Struct length prefix pointing past the end of the buffer.
        let mut bad = MessageBuilder::new(1, command::CONNECT, subcommand::IND, 9)
            .dword(0x101)
            .word(1)
            .finish();
        bad.push(10); // struct claims 10 content bytes, none follow
        let (_, mut rd) = MessageReader::after_header(&bad).unwrap();
        rd.dword().unwrap();
        rd.word().unwrap();
        assert!(matches!(rd.cstruct(), Err(Error::Protocol(_))));
    }
}
