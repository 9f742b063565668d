use embedded_hal::i2c::I2c;

/// Default I²C address of the SEN6x family.
pub const DEFAULT_ADDRESS: u8 = 0x6b;

/// Raw byte transfers to one 7-bit address.
///
/// No retries and no waiting: execution times are honoured by the caller and
/// retry policy belongs to the poller.
pub struct Transport<I2C> {
    i2c: I2C,
    address: u8,
}

impl<I2C: I2c> Transport<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Transport { i2c, address }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn write(&mut self, bytes: &[u8]) -> Result<(), I2C::Error> {
        self.i2c.write(self.address, bytes)
    }

    /// Fills `buf` with `buf.len()` bytes from the device.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<(), I2C::Error> {
        self.i2c.read(self.address, buf)
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}
