//! One async I2C bus shared by several drivers

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

pub type SharedBus<T> = Mutex<CriticalSectionRawMutex, T>;

/// Handle onto a [`SharedBus`]. Each transaction holds the bus lock for its
/// whole duration and yields to the executor while waiting for it.
pub struct BusDevice<'a, T> {
    bus: &'a SharedBus<T>,
}

impl<'a, T> BusDevice<'a, T> {
    pub const fn new(bus: &'a SharedBus<T>) -> Self {
        Self { bus }
    }
}

impl<T: ErrorType> ErrorType for BusDevice<'_, T> {
    type Error = T::Error;
}

// read, write and write_read default to `transaction`
impl<T: I2c> I2c for BusDevice<'_, T> {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.bus.lock().await.transaction(address, operations).await
    }
}
