use crate::types::Channel;

/// Sink for decoded values, one call per enabled and supported channel.
pub trait Publish {
    fn publish(&mut self, channel: Channel, value: f32);
}

impl<F> Publish for F
where
    F: FnMut(Channel, f32),
{
    fn publish(&mut self, channel: Channel, value: f32) {
        self(channel, value)
    }
}
