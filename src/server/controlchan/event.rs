use crate::server::chancomms::ControlChanMsg;
use crate::server::controlchan::command::Command;

/// Events that can happen on the control channel: either the client sent us a
/// command, or one of our own loops sent us an internal message.
#[derive(Debug)]
pub enum Event {
    /// A command from a client (e.g. `USER`, `PASV` etc.)
    Command(Command),
    /// An internal message, e.g. from the data channel loop.
    InternalMsg(ControlChanMsg),
}
