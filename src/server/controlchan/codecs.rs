use super::{command::Command, error::ControlChanError, line_parser, Reply};

use bytes::BytesMut;
use std::io::Write;
use tokio_util::codec::{Decoder, Encoder};

// FtpCodec implements tokio's `Decoder` and `Encoder` traits for the control
// channel, that we'll use to decode FTP commands and encode their replies.
pub struct FtpCodec {
    // Stored index of the next index to examine for a '\n' character. This is
    // used to optimize searching. For example, if `decode` was called with
    // `abc`, it would hold `3`, because that is the next index to examine.
    // The next time `decode` is called with `abcde\n`, we will only look at
    // `de\n` before returning.
    next_index: usize,
}

impl FtpCodec {
    pub fn new() -> Self {
        FtpCodec { next_index: 0 }
    }
}

impl Decoder for FtpCodec {
    type Item = Command;
    type Error = ControlChanError;

    // Here we decode the incoming bytes into a meaningful command. We'll
    // split on newlines and parse the resulting line with the line parser.
    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Command>, Self::Error> {
        if let Some(newline_offset) = buf[self.next_index..].iter().position(|b| *b == b'\n') {
            let newline_index = newline_offset + self.next_index;
            let line = buf.split_to(newline_index + 1);
            self.next_index = 0;
            Ok(Some(line_parser::parse(line)?))
        } else {
            self.next_index = buf.len();
            Ok(None)
        }
    }
}

impl Encoder<Reply> for FtpCodec {
    type Error = ControlChanError;

    // Encode the outgoing reply. Missing messages are filled from the static
    // per-code table; multi line replies follow the RFC 959 continuation
    // style.
    fn encode(&mut self, reply: Reply, buf: &mut BytesMut) -> Result<(), Self::Error> {
        let mut buffer = vec![];
        match reply {
            Reply::None => {
                return Ok(());
            }
            Reply::CodeAndMsg { code, msg } => {
                if msg.is_empty() {
                    writeln!(buffer, "{} {}\r", code as u32, code.default_message())?;
                } else {
                    writeln!(buffer, "{} {}\r", code as u32, msg)?;
                }
            }
            Reply::MultiLine { code, mut lines } => {
                // Get the last line since it needs to be preceded by the reply code.
                let last_line = lines.pop().unwrap_or_default();

                // Continuation lines starting with a digit must be indented
                // so clients can not mistake them for the final line.
                for it in lines.iter_mut() {
                    if it.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
                        it.insert(0, ' ');
                    }
                }
                if lines.is_empty() {
                    writeln!(buffer, "{} {}\r", code as u32, last_line)?;
                } else {
                    write!(buffer, "{}-{}\r\n{} {}\r\n", code as u32, lines.join("\r\n"), code as u32, last_line)?;
                }
            }
        }
        buf.extend(&buffer);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::controlchan::ReplyCode;
    use pretty_assertions::assert_eq;

    fn encode(reply: Reply) -> String {
        let mut codec = FtpCodec::new();
        let mut buf = BytesMut::new();
        codec.encode(reply, &mut buf).unwrap();
        String::from_utf8(buf.to_vec()).unwrap()
    }

    #[test]
    fn encodes_single_line() {
        assert_eq!(encode(Reply::new(ReplyCode::CommandOkay, "OK")), "200 OK\r\n");
    }

    #[test]
    fn encodes_empty_message_from_table() {
        assert_eq!(
            encode(Reply::new_with_string(ReplyCode::ServiceReady, String::new())),
            "220 Service ready for new user\r\n"
        );
    }

    #[test]
    fn encodes_multi_line_with_continuation() {
        let reply = Reply::new_multiline(ReplyCode::SystemStatus, vec!["Extensions supported:", " SIZE", "END"]);
        assert_eq!(encode(reply), "211-Extensions supported:\r\n SIZE\r\n211 END\r\n");
    }

    #[test]
    fn encodes_nothing_for_none() {
        assert_eq!(encode(Reply::none()), "");
    }

    #[test]
    fn decodes_across_buffer_boundaries() {
        let mut codec = FtpCodec::new();
        let mut buf = BytesMut::from(&b"NO"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(b"OP\r\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Command::Noop));
    }
}
