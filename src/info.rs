//! Textual descriptions for CAPI 2.0 info (result) codes.

/// Describe a CAPI info code in plain text. Unknown codes get a generic string
/// instead of an error; the table covers the code classes of CAPI 2.0
/// (informative 0x00xx, registration 0x10xx, message exchange 0x11xx, coding
/// 0x20xx, requested service 0x30xx, protocol/network 0x33xx-0x34xx).
pub fn describe_param_info(info: u16) -> &'static str {
    match info {
        0x0000 => "request accepted",
        0x0001 => "warning: NCPI not supported, ignored",
        0x0002 => "warning: flags not supported, ignored",
        0x0003 => "warning: alert already sent by another application",

        0x1001 => "too many applications",
        0x1002 => "logical block size too small, must be at least 128 bytes",
        0x1003 => "buffer exceeds 64 kbytes",
        0x1004 => "message buffer size too small, must be at least 1024 bytes",
        0x1005 => "max. number of logical connections not supported",
        0x1007 => "the message could not be accepted because of an internal busy condition",
        0x1008 => "OS resource error (out of memory?)",
        0x1009 => "CAPI not installed",
        0x100A => "controller does not support external equipment",
        0x100B => "controller does only support external equipment",

        0x1101 => "illegal application number",
        0x1102 => "illegal command or subcommand, or message length less than 12 octets",
        0x1103 => "the message could not be accepted because of a queue full condition",
        0x1104 => "queue is empty",
        0x1105 => "queue overflow: a message was lost",
        0x1106 => "unknown notification parameter",
        0x1107 => "the message could not be accepted because of an internal busy condition",
        0x1108 => "OS resource error (out of memory?)",
        0x1109 => "CAPI not installed",
        0x110A => "controller does not support external equipment",
        0x110B => "controller does only support external equipment",

        0x2001 => "message not supported in current state",
        0x2002 => "illegal controller, PLCI or NCCI",
        0x2003 => "no PLCI available",
        0x2004 => "no NCCI available",
        0x2005 => "no listen resources available",
        0x2007 => "illegal message parameter coding",
        0x2008 => "no fax resources available (feature not implemented)",

        0x3001 => "B1 protocol not supported",
        0x3002 => "B2 protocol not supported",
        0x3003 => "B3 protocol not supported",
        0x3004 => "B1 protocol parameter not supported",
        0x3005 => "B2 protocol parameter not supported",
        0x3006 => "B3 protocol parameter not supported",
        0x3007 => "B protocol combination not supported",
        0x3008 => "primary rate interface not supported",
        0x3009 => "request not supported in this interoperability mode",
        0x300A => "facility not supported",
        0x300B => "data length not supported by current protocol",
        0x300C => "reset procedure not supported by current protocol",

        0x3301 => "protocol error, layer 1 (broken line or B channel removed by signalling protocol)",
        0x3302 => "protocol error, layer 2",
        0x3303 => "protocol error, layer 3",
        0x3304 => "another application got that call",

        0x3311 => "connection not successful (remote station is no fax G3 machine)",
        0x3312 => "connection not successful (training error)",
        0x3313 => "disconnected before transfer (remote station does not support transfer mode)",
        0x3314 => "disconnected during transfer (remote abort)",
        0x3315 => "disconnected during transfer (remote procedure error)",
        0x3316 => "disconnected during transfer (local tx data underrun)",
        0x3317 => "disconnected during transfer (local rx data overflow)",
        0x3318 => "disconnected during transfer (local abort)",
        0x3319 => "illegal parameter coding",

        0x3481 => "unallocated (unassigned) number",
        0x3490 => "normal call clearing",
        0x3491 => "user busy",
        0x3495 => "call rejected",
        0x349C => "invalid number format",
        0x34A2 => "no circuit / channel available",

        _ => "unknown error code",
    }
}
