use crate::error::Error;
use crate::packet::Packet;

/// Sequential pull of decoded packets, in capture order.
///
/// The pull is blocking: implementations backed by an external dissector
/// return the next frame once it has been decoded, with no engine-level
/// timeout.
pub trait PacketSource {
    fn next_packet(&mut self) -> Result<Option<Packet>, Error>;
}

/// Any in-memory packet iterator is a valid source
impl<I> PacketSource for I
where
    I: Iterator<Item = Packet>,
{
    fn next_packet(&mut self) -> Result<Option<Packet>, Error> {
        Ok(self.next())
    }
}

/// Count the packets yielded by a source (a display filter may already have
/// been applied when opening the capture)
pub fn packet_count<S: PacketSource>(source: &mut S) -> Result<u64, Error> {
    let mut cnt = 0;
    while (source.next_packet()?).is_some() {
        cnt += 1;
    }
    Ok(cnt)
}
