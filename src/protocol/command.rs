use crate::constant::CommandByte;
use crate::protocol::packet::write_packet_header;
use crate::protocol::primitive::write_int_1;

/// Append a framed COM_QUERY packet. Commands start a new exchange, so the
/// sequence number is 0.
pub fn write_query(out: &mut Vec<u8>, sql: &str) {
    write_packet_header(out, 0, 1 + sql.len());
    write_int_1(out, CommandByte::Query as u8);
    out.extend_from_slice(sql.as_bytes());
}

/// Append a framed COM_PING packet.
pub fn write_ping(out: &mut Vec<u8>) {
    write_packet_header(out, 0, 1);
    write_int_1(out, CommandByte::Ping as u8);
}

/// Append a framed COM_QUIT packet.
pub fn write_quit(out: &mut Vec<u8>) {
    write_packet_header(out, 0, 1);
    write_int_1(out, CommandByte::Quit as u8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_query_framing() {
        let mut out = Vec::new();
        write_query(&mut out, "SELECT 1");
        assert_eq!(&out[..4], &[0x09, 0x00, 0x00, 0x00]);
        assert_eq!(out[4], 0x03);
        assert_eq!(&out[5..], b"SELECT 1");
    }

    #[test]
    fn test_write_ping_and_quit() {
        let mut out = Vec::new();
        write_ping(&mut out);
        write_quit(&mut out);
        assert_eq!(&out[..5], &[0x01, 0x00, 0x00, 0x00, 0x0e]);
        assert_eq!(&out[5..], &[0x01, 0x00, 0x00, 0x00, 0x01]);
    }
}
